//! Refiner - answer refinement with Monte Carlo Tree Search
//!
//! A one-shot CLI that:
//! 1. Perturbs the question and streams an initial answer from the backend
//! 2. Searches a tree of critiqued revisions of that answer, scoring each
//!    with the same model
//! 3. Prints the best-scoring revision to stdout
//!
//! Streamed model output and status lines go to stderr.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mcts::{EpisodeController, Progress, ProgressEvent, RefinementResult, SearchContext};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::future::Future;
use std::io::{IsTerminal, Write};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

mod config;
mod llm;
mod oracle;
mod perturb;
mod prompts;

use crate::config::Config;
use crate::llm::ChatClient;
use crate::oracle::LlmOracle;
use crate::perturb::{modify_text, replace_with_mapping, WordMapping};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

async fn read_question(config: &Config) -> Result<String> {
    let question = match &config.question {
        Some(q) => q.clone(),
        None => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            input
        }
    };

    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(anyhow!("question cannot be empty (pass --question or pipe it on stdin)"));
    }
    Ok(question)
}

fn spinner() -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

/// Drain progress events until every sender is gone.
async fn render_progress(mut rx: UnboundedReceiver<ProgressEvent>, spinner: Option<ProgressBar>) {
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Chunk(chunk) => {
                let write = || {
                    let mut stderr = std::io::stderr().lock();
                    let _ = stderr.write_all(chunk.as_bytes());
                    let _ = stderr.flush();
                };
                match &spinner {
                    Some(pb) => pb.suspend(write),
                    None => write(),
                }
            }
            ProgressEvent::Status { message, done } => match &spinner {
                Some(pb) => {
                    pb.suspend(|| info!(done, "{}", message));
                    pb.set_message(message);
                    if done {
                        pb.finish_and_clear();
                    }
                }
                None => info!(done, "{}", message),
            },
            ProgressEvent::Graph(graph) => debug!("{}", graph),
        }
    }
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }
}

/// Scramble the question for the initial prompt, or pass it through
/// untouched when `percent` is 0.
fn perturb_question<R: Rng + ?Sized>(
    question: &str,
    percent: u8,
    rng: &mut R,
) -> Result<(String, WordMapping)> {
    if percent == 0 {
        return Ok((question.to_string(), WordMapping::new()));
    }
    Ok(modify_text(question, percent.into(), rng)?)
}

/// Run `work` unless `interrupt` fires first.
///
/// If the interrupt source itself fails, `work` runs to completion.
async fn until_interrupted<F, I>(work: F, interrupt: I) -> Option<F::Output>
where
    F: Future,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(work);
    tokio::select! {
        output = &mut work => Some(output),
        signal = interrupt => match signal {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C, running to completion");
                Some(work.await)
            }
        },
    }
}

async fn refine(
    config: &Config,
    client: ChatClient,
    progress: Progress,
    question: &str,
    perturbed: &str,
    mapping: &WordMapping,
    rng: &mut ChaCha20Rng,
) -> Result<RefinementResult<String>> {
    progress.status("Preparing initial thoughts...");
    debug!(model = client.model(), "Requesting initial answer");
    let initial = client
        .stream_completion(&prompts::initial(perturbed), &progress)
        .await?;
    let initial = replace_with_mapping(&initial, mapping);
    progress.chunk("\n");

    let oracle = LlmOracle::new(client, progress.clone());
    let controller = EpisodeController::new(
        &oracle,
        &oracle,
        SearchContext::new(question),
        config.search_config(),
    )?
    .with_progress(progress.clone());

    let result = controller.run(initial, rng).await?;
    progress.done("Fin.");
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::load();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;
    info!(
        model = %config.model,
        max_children = config.max_children,
        num_simulations = config.num_simulations,
        num_episodes = config.num_episodes,
        "Refiner starting"
    );

    let question = read_question(&config).await?;

    let mut rng = match config.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    let (perturbed, mapping) = perturb_question(&question, config.perturb_percent, &mut rng)?;
    debug!(question = %perturbed, changed_words = mapping.len(), "Perturbed question");

    let client = ChatClient::new(
        &config.base_url,
        config.model.clone(),
        config.api_key.clone(),
        config.request_timeout(),
    )?;
    info!(endpoint = client.endpoint(), "Using chat backend");

    let (progress, rx) = Progress::channel();
    let renderer = tokio::spawn(render_progress(rx, spinner()));

    // Interrupting abandons the search; nothing is persisted
    let outcome = until_interrupted(
        refine(&config, client, progress, &question, &perturbed, &mapping, &mut rng),
        signal::ctrl_c(),
    )
    .await;

    // The refine future (and every progress sender) is gone by now
    let _ = renderer.await;

    match outcome {
        Some(Ok(result)) => {
            info!(
                score = result.score,
                best_episode = result.best_episode,
                episodes = result.episodes,
                nodes = result.tree.len(),
                simulations = result.stats.simulations,
                evaluation_fallbacks = result.stats.evaluation_fallbacks,
                "Refinement finished"
            );
            println!("{}", result.content);
            Ok(())
        }
        Some(Err(e)) => {
            error!("Refinement failed: {}", e);
            Err(e)
        }
        None => {
            warn!("Interrupted, search abandoned");
            Err(anyhow!("interrupted before refinement finished"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_server::{serve_events, sse_body};

    const QUESTION: &str = "What is the capital of France?";

    fn config(base_url: &str) -> Config {
        Config {
            question: Some(QUESTION.into()),
            base_url: base_url.into(),
            model: "test-model".into(),
            api_key: None,
            request_timeout_secs: 5,
            log_level: "info".into(),
            max_children: 2,
            exploration_weight: 1.414,
            num_simulations: 1,
            num_episodes: 1,
            reuse_tree: true,
            perturb_percent: 15,
            seed: Some(0),
        }
    }

    #[tokio::test]
    async fn refine_restores_echoed_words_and_searches_the_real_question() {
        let bodies = vec![
            // initial answer, echoing the scrambled word
            sse_body(&["Paris is the capital of ", "Fr4nce."]),
            // no critiques, so the root is simulated directly
            sse_body(&[]),
            sse_body(&["7"]),
            // re-score of the best leaf
            sse_body(&["7"]),
        ];
        let (base_url, server) = serve_events(bodies).await;
        let config = config(&base_url);
        let client = ChatClient::new(
            &config.base_url,
            config.model.clone(),
            None,
            config.request_timeout(),
        )
        .unwrap();

        let mut mapping = WordMapping::new();
        mapping.insert("Fr4nce".into(), "France".into());
        let perturbed = "What is the capital of Fr4nce?";
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let result = refine(
            &config,
            client,
            Progress::disabled(),
            QUESTION,
            perturbed,
            &mapping,
            &mut rng,
        )
        .await
        .unwrap();

        assert_eq!(result.content, "Paris is the capital of France.");
        assert!((result.score - 7.0).abs() < 1e-12);
        assert_eq!(result.tree.len(), 1);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].contains(perturbed));
        assert!(!requests[0].contains(QUESTION));
        for request in &requests[1..] {
            assert!(request.contains(QUESTION), "{request}");
            assert!(!request.contains("Fr4nce"), "{request}");
        }
    }

    #[test]
    fn zero_percent_leaves_the_question_alone() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let (perturbed, mapping) = perturb_question(QUESTION, 0, &mut rng).unwrap();
        assert_eq!(perturbed, QUESTION);
        assert!(mapping.is_empty());
    }

    #[test]
    fn nonzero_percent_perturbs() {
        let question = "Explain the borrow checker in simple terms please";
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let (_, mapping) = perturb_question(question, 30, &mut rng).unwrap();
        assert!(!mapping.is_empty());

        assert!(perturb_question(question, 101, &mut rng).is_err());
    }

    #[tokio::test]
    async fn interrupt_abandons_pending_work() {
        let outcome = until_interrupted(std::future::pending::<()>(), async { Ok(()) }).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn failed_interrupt_lets_work_finish() {
        let work = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            42
        };
        let interrupt = async { Err(std::io::Error::other("no signal handler")) };
        assert_eq!(until_interrupted(work, interrupt).await, Some(42));
    }

    #[tokio::test]
    async fn renderer_drains_until_senders_are_gone() {
        let (progress, rx) = Progress::channel();
        let pb = ProgressBar::hidden();
        progress.status("Thinking about aaaa...");
        progress.chunk("");
        progress.done("Fin.");
        drop(progress);

        render_progress(rx, Some(pb.clone())).await;
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "Fin.");
    }
}
