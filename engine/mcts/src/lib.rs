//! Monte Carlo Tree Search (MCTS) over revisions of an answer.
//!
//! This crate refines a piece of content (in practice, an answer to a
//! question) by searching a tree of revisions. It never writes or judges
//! content itself: children come from an [`ExpansionOracle`] and scores from
//! an [`EvaluationOracle`], both supplied by the embedder.
//!
//! # Overview
//!
//! Each simulation round consists of four phases:
//!
//! 1. **Selection**: Descend from the root by UCT (Upper Confidence bound
//!    applied to Trees) until reaching a node with no children
//! 2. **Expansion**: If that node can take more children, ask the oracle for
//!    critiques and add one revision per critique, then pick one child at
//!    random
//! 3. **Simulation**: Score the picked revision
//! 4. **Backpropagation**: Add one visit and the score to every node on the
//!    path back to the root
//!
//! An [`EpisodeController`] runs a fixed number of such episodes and keeps
//! the best-scoring revision.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{
//!     AppendCritiqueExpander, EpisodeController, FixedScoreEvaluator, SearchConfig,
//!     SearchContext,
//! };
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let expander = AppendCritiqueExpander::new(["a", "b"]);
//! let evaluator = FixedScoreEvaluator::new(7.0);
//! let config = SearchConfig::default().with_simulations(2);
//!
//! let controller =
//!     EpisodeController::new(&expander, &evaluator, SearchContext::new("q"), config)?;
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let result = controller.run("X".to_string(), &mut rng).await?;
//!
//! println!("Best: {} (score {})", result.content, result.score);
//! ```
//!
//! # Configuration
//!
//! The [`SearchConfig`] struct controls search behavior:
//!
//! - `max_children`: Branching factor (default: 2)
//! - `exploration_weight`: UCT exploration constant (default: 1.414)
//! - `num_simulations`: Rounds per episode (default: 2)
//! - `num_episodes`: Episodes per run (default: 1)
//! - `reuse_tree`: Keep one tree across episodes (default: true)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      EpisodeController                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        SearchEngine                         │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌──────────────────┐│
//! │  │ SearchTree  │  │ ExpansionOracle  │  │ EvaluationOracle ││
//! │  │  (arena)    │  │ (new revisions)  │  │    (scores)      ││
//! │  └──────┬──────┘  └────────┬─────────┘  └────────┬─────────┘│
//! │         ▼                  ▼                    ▼           │
//! │     select  →  expand  →  simulate  →  backpropagate        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod episode;
pub mod graph;
pub mod node;
pub mod oracle;
pub mod progress;
pub mod search;
pub mod tree;

// Re-export main types
pub use config::SearchConfig;
pub use episode::{EpisodeController, RefinementResult};
pub use graph::render_mermaid;
pub use node::{ExpansionState, NodeId, RevisionNode, UCT_EPSILON};
pub use oracle::{
    parse_score, parse_thoughts, AppendCritiqueExpander, EvaluationOracle, ExpansionOracle,
    FixedScoreEvaluator, OracleError, SearchContext, SCORE_FALLBACK,
};
pub use progress::{Progress, ProgressEvent};
pub use search::{Revision, SearchEngine, SearchError, SearchStats};
pub use tree::{SearchTree, TreeStats};
