//! Oracle traits for revision generation and scoring.
//!
//! The engine never produces or judges content itself. An
//! [`ExpansionOracle`] proposes critiques of a revision and rewrites it
//! according to each one; an [`EvaluationOracle`] scores a revision. In the
//! reference setup both are backed by a language model, but any
//! implementation works, including the fixed doubles below for tests.

use async_trait::async_trait;
use thiserror::Error;

/// Score used whenever an evaluation cannot produce a number.
pub const SCORE_FALLBACK: f64 = 0.0;

/// Errors that can occur inside an oracle call.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Episode-scoped context handed to every oracle call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchContext {
    /// The question the revisions are trying to answer.
    pub query: String,
}

impl SearchContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// Proposes new revisions of a piece of content.
#[async_trait]
pub trait ExpansionOracle<T: Send + Sync>: Send + Sync {
    /// Suggest critiques of `content`, one string per idea.
    ///
    /// Any count is acceptable, including none.
    async fn generate_thoughts(
        &self,
        ctx: &SearchContext,
        content: &T,
    ) -> Result<Vec<String>, OracleError>;

    /// Rewrite `content` so that it addresses `critique`.
    async fn update_approach(
        &self,
        ctx: &SearchContext,
        content: &T,
        critique: &str,
    ) -> Result<T, OracleError>;
}

/// Scores a revision. Higher is better.
#[async_trait]
pub trait EvaluationOracle<T: Send + Sync>: Send + Sync {
    /// Score `content`. The reference convention is 1 to 10.
    ///
    /// Errors are not fatal to a search: the engine substitutes
    /// [`SCORE_FALLBACK`].
    async fn evaluate_answer(&self, ctx: &SearchContext, content: &T)
        -> Result<f64, OracleError>;
}

/// Extract a score from free-form oracle output.
///
/// Takes the first run of ASCII digits; returns [`SCORE_FALLBACK`] when the
/// text contains none.
pub fn parse_score(text: &str) -> f64 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<f64>().unwrap_or(SCORE_FALLBACK)
}

/// Split oracle output into critiques, one per non-empty line.
pub fn parse_thoughts(text: &str) -> Vec<String> {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Expander with a fixed list of critiques.
///
/// Revisions are `content + "+" + critique`, which makes tree shapes easy to
/// assert on. Useful for testing the engine without a model.
#[derive(Debug, Clone, Default)]
pub struct AppendCritiqueExpander {
    pub critiques: Vec<String>,
}

impl AppendCritiqueExpander {
    pub fn new<I, S>(critiques: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            critiques: critiques.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ExpansionOracle<String> for AppendCritiqueExpander {
    async fn generate_thoughts(
        &self,
        _ctx: &SearchContext,
        _content: &String,
    ) -> Result<Vec<String>, OracleError> {
        Ok(self.critiques.clone())
    }

    async fn update_approach(
        &self,
        _ctx: &SearchContext,
        content: &String,
        critique: &str,
    ) -> Result<String, OracleError> {
        Ok(format!("{content}+{critique}"))
    }
}

/// Evaluator that gives every revision the same score.
#[derive(Debug, Clone, Copy)]
pub struct FixedScoreEvaluator {
    pub score: f64,
}

impl FixedScoreEvaluator {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

#[async_trait]
impl<T: Send + Sync> EvaluationOracle<T> for FixedScoreEvaluator {
    async fn evaluate_answer(
        &self,
        _ctx: &SearchContext,
        _content: &T,
    ) -> Result<f64, OracleError> {
        Ok(self.score)
    }
}
