//! Oracles backed by a chat model.
//!
//! One [`LlmOracle`] plays both roles: it critiques and rewrites answers
//! for expansion, and rates them for evaluation. Prompts always carry the
//! unperturbed question from the [`SearchContext`].

use crate::llm::ChatClient;
use crate::prompts;
use async_trait::async_trait;
use mcts::{
    parse_score, parse_thoughts, EvaluationOracle, ExpansionOracle, OracleError, Progress,
    SearchContext,
};
use tracing::debug;

pub struct LlmOracle {
    client: ChatClient,
    progress: Progress,
}

impl LlmOracle {
    pub fn new(client: ChatClient, progress: Progress) -> Self {
        Self { client, progress }
    }
}

#[async_trait]
impl ExpansionOracle<String> for LlmOracle {
    async fn generate_thoughts(
        &self,
        ctx: &SearchContext,
        content: &String,
    ) -> Result<Vec<String>, OracleError> {
        let prompt = prompts::thoughts(&ctx.query, content);
        let reply = self
            .client
            .stream_completion(&prompt, &self.progress)
            .await
            .map_err(|e| OracleError::GenerationFailed(e.to_string()))?;

        let thoughts = parse_thoughts(&reply);
        debug!(count = thoughts.len(), "Generated thoughts");
        Ok(thoughts)
    }

    async fn update_approach(
        &self,
        ctx: &SearchContext,
        content: &String,
        critique: &str,
    ) -> Result<String, OracleError> {
        let prompt = prompts::update(&ctx.query, content, critique);
        let revised = self
            .client
            .stream_completion(&prompt, &self.progress)
            .await
            .map_err(|e| OracleError::GenerationFailed(e.to_string()))?;
        Ok(revised)
    }
}

#[async_trait]
impl EvaluationOracle<String> for LlmOracle {
    async fn evaluate_answer(
        &self,
        ctx: &SearchContext,
        content: &String,
    ) -> Result<f64, OracleError> {
        let prompt = prompts::evaluate(&ctx.query, content);
        let reply = self
            .client
            .stream_completion(&prompt, &self.progress)
            .await?;
        Ok(parse_score(&reply))
    }
}
