//! Episode control: repeated searches with best-answer tracking.
//!
//! A simple hill climb around [`SearchEngine`]: run a fixed number of
//! episodes, re-score each episode's most visited leaf, and keep the best.
//! There is no early stopping; every configured episode runs.

use std::marker::PhantomData;

use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::graph::render_mermaid;
use crate::node::NodeId;
use crate::oracle::{EvaluationOracle, ExpansionOracle, SearchContext};
use crate::progress::Progress;
use crate::search::{Revision, SearchEngine, SearchError, SearchStats};
use crate::tree::SearchTree;

/// Outcome of a full refinement run.
#[derive(Debug, Clone)]
pub struct RefinementResult<T> {
    /// Best revision seen across all episodes
    pub content: T,

    /// Score the evaluation oracle gave that revision on re-scoring
    pub score: f64,

    /// Node that held the best revision, in the tree it came from
    pub node: NodeId,

    /// Episode (1-based) that produced the best revision
    pub best_episode: u32,

    /// Number of episodes run
    pub episodes: u32,

    /// Stats accumulated over every episode
    pub stats: SearchStats,

    /// Tree `node` belongs to: the last episode's tree when trees are reused,
    /// otherwise the tree of the best episode
    pub tree: SearchTree<T>,
}

/// Runs a bounded number of search episodes.
pub struct EpisodeController<'a, T, X, E>
where
    T: Revision,
    X: ExpansionOracle<T>,
    E: EvaluationOracle<T>,
{
    expander: &'a X,
    evaluator: &'a E,
    context: SearchContext,
    config: SearchConfig,
    progress: Progress,
    _content: PhantomData<fn() -> T>,
}

impl<'a, T, X, E> EpisodeController<'a, T, X, E>
where
    T: Revision,
    X: ExpansionOracle<T>,
    E: EvaluationOracle<T>,
{
    pub fn new(
        expander: &'a X,
        evaluator: &'a E,
        context: SearchContext,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            expander,
            evaluator,
            context,
            config,
            progress: Progress::disabled(),
            _content: PhantomData,
        })
    }

    /// Attach a progress handle, shared with every engine this controller creates.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn new_engine(&self, root_content: T) -> Result<SearchEngine<'a, T, X, E>, SearchError> {
        Ok(SearchEngine::new(
            self.expander,
            self.evaluator,
            self.context.clone(),
            &self.config,
            root_content,
        )?
        .with_progress(self.progress.clone()))
    }

    /// Refine `initial` and return the best revision found.
    ///
    /// Ties keep the earlier answer.
    pub async fn run(
        &self,
        initial: T,
        rng: &mut ChaCha20Rng,
    ) -> Result<RefinementResult<T>, SearchError> {
        let num_episodes = self.config.num_episodes;
        let mut engine = self.new_engine(initial.clone())?;
        let mut stats = SearchStats::default();
        let mut best: Option<(T, f64, NodeId, u32)> = None;
        // Tree of the best episode, once a fresh tree has replaced it
        let mut best_tree: Option<SearchTree<T>> = None;

        for episode in 1..=num_episodes {
            if episode > 1 && !self.config.reuse_tree {
                stats.add(engine.stats());
                let finished = std::mem::replace(&mut engine, self.new_engine(initial.clone())?);
                if matches!(&best, Some((_, _, _, best_episode)) if *best_episode == episode - 1) {
                    best_tree = Some(finished.into_tree());
                }
            }

            info!(episode, num_episodes, "Starting episode");
            engine
                .run_episode(self.config.num_simulations, rng)
                .await?;
            debug!("Tree after episode {}:{}", episode, engine.render_graph(None));

            let leaf = engine.best_leaf();
            let score = engine.evaluate(leaf).await;

            info!(
                episode,
                node = %leaf,
                score,
                nodes = engine.tree().len(),
                "Episode finished"
            );

            let improved = match &best {
                Some((_, best_score, _, _)) => score > *best_score,
                None => true,
            };
            if improved {
                best = Some((engine.tree().content(leaf).clone(), score, leaf, episode));
            }
        }

        stats.add(engine.stats());

        let (content, score, node, best_episode) = best.ok_or_else(|| {
            SearchError::InvalidConfig("num_episodes must be greater than 0".into())
        })?;
        let tree = match best_tree {
            Some(tree) if best_episode < num_episodes => tree,
            _ => engine.into_tree(),
        };
        self.progress.graph(render_mermaid(&tree, Some(node)));

        info!(score, best_episode, simulations = stats.simulations, "Refinement complete");

        Ok(RefinementResult {
            content,
            score,
            node,
            best_episode,
            episodes: num_episodes,
            stats,
            tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{AppendCritiqueExpander, FixedScoreEvaluator, OracleError};
    use async_trait::async_trait;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores follow a fixed sequence, repeating the last value.
    struct SequenceEvaluator {
        scores: Vec<f64>,
        calls: AtomicUsize,
    }

    impl SequenceEvaluator {
        fn new(scores: Vec<f64>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EvaluationOracle<String> for SequenceEvaluator {
        async fn evaluate_answer(
            &self,
            _ctx: &SearchContext,
            _content: &String,
        ) -> Result<f64, OracleError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores[i.min(self.scores.len() - 1)])
        }
    }

    fn ctx() -> SearchContext {
        SearchContext::new("q")
    }

    #[tokio::test]
    async fn test_single_episode_returns_best_leaf() {
        let expander = AppendCritiqueExpander::new(["a", "b"]);
        let evaluator = FixedScoreEvaluator::new(7.0);
        let config = SearchConfig::default().with_simulations(1);
        let controller = EpisodeController::new(&expander, &evaluator, ctx(), config).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        let result = controller.run("X".to_string(), &mut rng).await.unwrap();

        assert!((result.score - 7.0).abs() < 1e-12);
        assert!(result.content == "X+a" || result.content == "X+b");
        assert_eq!(result.tree.content(result.node), &result.content);
        assert_eq!(result.episodes, 1);
        assert_eq!(result.best_episode, 1);
        // One simulation plus one re-score
        assert_eq!(result.stats.evaluations, 2);
    }

    #[tokio::test]
    async fn test_ties_keep_earlier_answer() {
        let expander = AppendCritiqueExpander::new(["a"]);
        let evaluator = FixedScoreEvaluator::new(5.0);
        let config = SearchConfig::default()
            .with_max_children(1)
            .with_simulations(1)
            .with_episodes(3);
        let controller = EpisodeController::new(&expander, &evaluator, ctx(), config).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let result = controller.run("X".to_string(), &mut rng).await.unwrap();

        // The chain grows by one revision per episode; the first stays best.
        assert_eq!(result.best_episode, 1);
        assert_eq!(result.content, "X+a");
        assert_eq!(result.episodes, 3);
        assert_eq!(result.tree.len(), 4);
    }

    #[tokio::test]
    async fn test_strictly_better_later_episode_wins() {
        let expander = AppendCritiqueExpander::new(["a"]);
        // episode 1: simulate 1, re-score 2; episode 2: simulate 3, re-score 9
        let evaluator = SequenceEvaluator::new(vec![1.0, 2.0, 3.0, 9.0]);
        let config = SearchConfig::default()
            .with_max_children(1)
            .with_simulations(1)
            .with_episodes(2);
        let controller = EpisodeController::new(&expander, &evaluator, ctx(), config).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let result = controller.run("X".to_string(), &mut rng).await.unwrap();

        assert_eq!(result.best_episode, 2);
        assert_eq!(result.content, "X+a+a");
        assert!((result.score - 9.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_fresh_tree_per_episode() {
        let expander = AppendCritiqueExpander::new(["a"]);
        let evaluator = FixedScoreEvaluator::new(5.0);
        let config = SearchConfig::default()
            .with_max_children(1)
            .with_simulations(1)
            .with_episodes(3)
            .with_reuse_tree(false);
        let controller = EpisodeController::new(&expander, &evaluator, ctx(), config).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let result = controller.run("X".to_string(), &mut rng).await.unwrap();

        assert_eq!(result.tree.len(), 2);
        assert_eq!(result.tree.get(result.tree.root()).visits, 1);
        assert_eq!(result.content, "X+a");
        assert_eq!(result.stats.simulations, 3);
    }

    #[tokio::test]
    async fn test_fresh_trees_return_the_best_episodes_tree() {
        let expander = AppendCritiqueExpander::new(["a"]);
        // episode 1: simulate 1, 1, re-score 9; episode 2: simulate 5, 5, re-score 2
        let evaluator = SequenceEvaluator::new(vec![1.0, 1.0, 9.0, 5.0, 5.0, 2.0]);
        let config = SearchConfig::default()
            .with_max_children(1)
            .with_simulations(2)
            .with_episodes(2)
            .with_reuse_tree(false);
        let (progress, mut rx) = Progress::channel();
        let controller = EpisodeController::new(&expander, &evaluator, ctx(), config)
            .unwrap()
            .with_progress(progress);
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let result = controller.run("X".to_string(), &mut rng).await.unwrap();

        assert_eq!(result.best_episode, 1);
        assert!((result.score - 9.0).abs() < 1e-12);
        assert_eq!(result.tree.content(result.node), &result.content);
        let root = result.tree.get(result.tree.root());
        assert!((root.value - 2.0).abs() < 1e-12);

        let mut last_graph = None;
        while let Ok(event) = rx.try_recv() {
            if let crate::progress::ProgressEvent::Graph(g) = event {
                last_graph = Some(g);
            }
        }
        let label = result.node.label();
        assert!(last_graph
            .unwrap()
            .contains(&format!("style {label} stroke:#0ff")));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let expander = AppendCritiqueExpander::new(["a"]);
        let evaluator = FixedScoreEvaluator::new(5.0);
        let config = SearchConfig::default().with_episodes(0);
        let result = EpisodeController::new(&expander, &evaluator, ctx(), config);
        assert!(matches!(result, Err(SearchError::InvalidConfig(_))));
    }
}
