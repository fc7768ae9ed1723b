//! Revision search implementation.
//!
//! Implements one search episode over a [`SearchTree`]:
//! 1. Selection: descend from the root by UCT until reaching a node with no children
//! 2. Expansion: ask the expansion oracle for critiques and add one revision per critique
//! 3. Simulation: score one revision with the evaluation oracle
//! 4. Backpropagation: add the visit and score to every node up to the root

use std::fmt;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::SearchConfig;
use crate::graph::render_mermaid;
use crate::node::NodeId;
use crate::oracle::{EvaluationOracle, ExpansionOracle, SearchContext, SCORE_FALLBACK};
use crate::progress::Progress;
use crate::tree::SearchTree;

/// Content the engine can search over.
///
/// `Display` is used for graph labels and logs.
pub trait Revision: Clone + Send + Sync + fmt::Display {}

impl<T: Clone + Send + Sync + fmt::Display> Revision for T {}

/// Errors that can occur during a search.
///
/// Oracle failures are not among them: they degrade the affected branch
/// instead of aborting the search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Node {0} does not belong to this tree")]
    UnknownNode(NodeId),
}

/// Counters and timings collected while searching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// Completed select/expand/simulate/backpropagate rounds
    pub simulations: u32,
    /// Expansion attempts (nodes that were not yet fully expanded)
    pub expansions: u32,
    /// Revisions added to the tree
    pub children_created: u32,
    /// Evaluation oracle calls
    pub evaluations: u32,
    /// Evaluations that failed and were scored with the fallback
    pub evaluation_fallbacks: u32,
    /// Thought generation calls that failed
    pub generation_failures: u32,
    /// Revision calls that failed, cutting an expansion short
    pub revision_failures: u32,
    /// Time spent in expansion, oracle calls included (microseconds)
    pub expansion_time_us: u64,
    /// Time spent in evaluation oracle calls (microseconds)
    pub evaluation_time_us: u64,
    /// Wall-clock time across episodes (microseconds)
    pub total_time_us: u64,
}

impl SearchStats {
    /// Accumulate another set of stats into this one.
    pub fn add(&mut self, other: &SearchStats) {
        self.simulations += other.simulations;
        self.expansions += other.expansions;
        self.children_created += other.children_created;
        self.evaluations += other.evaluations;
        self.evaluation_fallbacks += other.evaluation_fallbacks;
        self.generation_failures += other.generation_failures;
        self.revision_failures += other.revision_failures;
        self.expansion_time_us += other.expansion_time_us;
        self.evaluation_time_us += other.evaluation_time_us;
        self.total_time_us += other.total_time_us;
    }
}

/// Search state for one tree.
pub struct SearchEngine<'a, T, X, E>
where
    T: Revision,
    X: ExpansionOracle<T>,
    E: EvaluationOracle<T>,
{
    tree: SearchTree<T>,
    expander: &'a X,
    evaluator: &'a E,
    context: SearchContext,
    /// Weight given to nodes this engine creates
    exploration_weight: f64,
    progress: Progress,
    selected: Option<NodeId>,
    stats: SearchStats,
}

impl<'a, T, X, E> SearchEngine<'a, T, X, E>
where
    T: Revision,
    X: ExpansionOracle<T>,
    E: EvaluationOracle<T>,
{
    /// Create a new search rooted at `root_content`.
    pub fn new(
        expander: &'a X,
        evaluator: &'a E,
        context: SearchContext,
        config: &SearchConfig,
        root_content: T,
    ) -> Result<Self, SearchError> {
        config.validate_tree()?;

        let tree = SearchTree::new(root_content, config.max_children, config.exploration_weight);

        Ok(Self {
            tree,
            expander,
            evaluator,
            context,
            exploration_weight: config.exploration_weight,
            progress: Progress::disabled(),
            selected: None,
            stats: SearchStats::default(),
        })
    }

    /// Attach a progress handle for status and graph events.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Change the weight given to nodes created from now on.
    ///
    /// Existing nodes keep the weight they were created with.
    pub fn set_exploration_weight(&mut self, weight: f64) -> Result<(), SearchError> {
        SearchConfig::default()
            .with_exploration_weight(weight)
            .validate_tree()?;
        self.exploration_weight = weight;
        Ok(())
    }

    pub fn exploration_weight(&self) -> f64 {
        self.exploration_weight
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &SearchTree<T> {
        &self.tree
    }

    pub fn into_tree(self) -> SearchTree<T> {
        self.tree
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// The node most recently returned by selection in `run_episode`.
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// The most visited leaf below the root.
    pub fn best_leaf(&self) -> NodeId {
        self.tree.best_leaf(self.tree.root())
    }

    /// Render the current tree, highlighting `highlighted` or, failing that,
    /// the last selected node.
    pub fn render_graph(&self, highlighted: Option<NodeId>) -> String {
        render_mermaid(&self.tree, highlighted.or(self.selected))
    }

    fn check(&self, id: NodeId) -> Result<(), SearchError> {
        match self.tree.try_get(id) {
            Some(_) => Ok(()),
            None => Err(SearchError::UnknownNode(id)),
        }
    }

    fn emit_graph(&self, highlighted: Option<NodeId>) {
        if self.progress.is_enabled() {
            self.progress.graph(self.render_graph(highlighted));
        }
    }

    /// Run `num_simulations` rounds and return the last selected node.
    pub async fn run_episode(
        &mut self,
        num_simulations: u32,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<NodeId>, SearchError> {
        debug!(num_simulations, "Starting search");
        let start = Instant::now();

        for round in 0..num_simulations {
            let leaf = self.select();
            self.selected = Some(leaf);

            let target = if self.tree.fully_expanded(leaf) {
                leaf
            } else {
                self.expand(leaf, rng).await?
            };

            let score = self.simulate(target).await?;
            self.backpropagate(target, score)?;
            self.stats.simulations += 1;

            trace!(
                round,
                selected = %leaf,
                simulated = %target,
                score,
                nodes = self.tree.len(),
                "Simulation complete"
            );
        }

        self.stats.total_time_us += start.elapsed().as_micros() as u64;
        Ok(self.selected)
    }

    /// Descend from the root by UCT until reaching a node with no children.
    ///
    /// A node with some children is descended into even if it could take
    /// more; widening happens only once selection lands on it again as a
    /// leaf.
    pub fn select(&self) -> NodeId {
        let mut current = self.tree.root();
        while let Some(child) = self.tree.select_child(current) {
            current = child;
        }
        trace!(node = %current, "Selected node");
        current
    }

    /// Expand a node (if it can take more children) and pick one of its
    /// children at random to simulate.
    ///
    /// Returns the node itself when it still has no children, e.g. because
    /// the oracle proposed nothing.
    pub async fn expand(
        &mut self,
        node_id: NodeId,
        rng: &mut ChaCha20Rng,
    ) -> Result<NodeId, SearchError> {
        self.check(node_id)?;

        if !self.tree.fully_expanded(node_id) {
            self.grow(node_id).await;
        }

        Ok(self
            .tree
            .get(node_id)
            .children
            .choose(rng)
            .copied()
            .unwrap_or(node_id))
    }

    /// Ask the expansion oracle for critiques and add one revision each.
    ///
    /// Children are committed one at a time, so a failure part-way leaves
    /// the ones already created in place and the tree consistent.
    async fn grow(&mut self, node_id: NodeId) {
        let start = Instant::now();
        debug!(node = %node_id, "Expanding node");
        self.progress.status(format!("Thinking about {node_id}..."));
        self.emit_graph(Some(node_id));
        self.stats.expansions += 1;

        let content = self.tree.content(node_id).clone();

        let thoughts = match self
            .expander
            .generate_thoughts(&self.context, &content)
            .await
        {
            Ok(thoughts) => thoughts,
            Err(e) => {
                warn!(node = %node_id, error = %e, "Thought generation failed, node stays as is");
                self.stats.generation_failures += 1;
                Vec::new()
            }
        };

        let capacity = self.tree.get(node_id).remaining_capacity();
        if thoughts.len() > capacity {
            debug!(
                node = %node_id,
                proposed = thoughts.len(),
                capacity,
                "Dropping critiques beyond branching limit"
            );
        }

        for thought in thoughts.into_iter().take(capacity) {
            match self
                .expander
                .update_approach(&self.context, &content, &thought)
                .await
            {
                Ok(revised) => {
                    let child = self
                        .tree
                        .add_child(node_id, revised, self.exploration_weight);
                    self.stats.children_created += 1;
                    trace!(parent = %node_id, child = %child, critique = %thought, "Added revision");
                }
                Err(e) => {
                    warn!(node = %node_id, error = %e, "Revision failed, stopping expansion");
                    self.stats.revision_failures += 1;
                    break;
                }
            }
        }

        self.stats.expansion_time_us += start.elapsed().as_micros() as u64;
    }

    /// Score a node for this round, reporting progress.
    pub async fn simulate(&mut self, node_id: NodeId) -> Result<f64, SearchError> {
        self.check(node_id)?;
        debug!(node = %node_id, "Simulating node");
        self.progress.status(format!("Thinking about {node_id}..."));
        self.emit_graph(self.selected);

        Ok(self.evaluate(node_id).await)
    }

    /// Score a node with the evaluation oracle.
    ///
    /// Oracle errors resolve to [`SCORE_FALLBACK`].
    pub async fn evaluate(&mut self, node_id: NodeId) -> f64 {
        let start = Instant::now();
        self.stats.evaluations += 1;

        let content = self.tree.content(node_id);
        let score = match self.evaluator.evaluate_answer(&self.context, content).await {
            Ok(score) => score,
            Err(e) => {
                warn!(node = %node_id, error = %e, "Evaluation failed, using fallback score");
                self.stats.evaluation_fallbacks += 1;
                SCORE_FALLBACK
            }
        };

        self.stats.evaluation_time_us += start.elapsed().as_micros() as u64;
        score
    }

    /// Add one visit and `score` to the node and every ancestor.
    pub fn backpropagate(&mut self, node_id: NodeId, score: f64) -> Result<(), SearchError> {
        self.check(node_id)?;
        debug!(node = %node_id, score, "Backpropagating");
        self.tree.backpropagate(node_id, score);
        Ok(())
    }
}
