//! Search configuration parameters.

use crate::search::SearchError;

/// Configuration for the revision search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Branching factor: most children any node may get from expansion.
    pub max_children: usize,

    /// Exploration constant for UCT. Higher values favor less-visited
    /// revisions, lower values favor revisions that already scored well.
    /// Each node keeps the value that was active when it was created.
    pub exploration_weight: f64,

    /// Number of select/expand/simulate/backpropagate rounds per episode.
    pub num_simulations: u32,

    /// Number of episodes the controller runs. Always runs all of them.
    pub num_episodes: u32,

    /// Keep one tree across episodes (statistics accumulate) instead of
    /// starting each episode from a fresh root.
    pub reuse_tree: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_children: 2,
            exploration_weight: 1.414,
            num_simulations: 2,
            num_episodes: 1,
            reuse_tree: true,
        }
    }
}

impl SearchConfig {
    /// Create a small config for testing.
    pub fn for_testing() -> Self {
        Self {
            max_children: 2,
            exploration_weight: 1.414,
            num_simulations: 4,
            num_episodes: 1,
            reuse_tree: true,
        }
    }

    /// Builder pattern: set branching factor.
    pub fn with_max_children(mut self, n: usize) -> Self {
        self.max_children = n;
        self
    }

    /// Builder pattern: set UCT exploration weight.
    pub fn with_exploration_weight(mut self, w: f64) -> Self {
        self.exploration_weight = w;
        self
    }

    /// Builder pattern: set number of simulations per episode.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: set number of episodes.
    pub fn with_episodes(mut self, n: u32) -> Self {
        self.num_episodes = n;
        self
    }

    /// Builder pattern: reuse or rebuild the tree between episodes.
    pub fn with_reuse_tree(mut self, reuse: bool) -> Self {
        self.reuse_tree = reuse;
        self
    }

    /// Reject configurations a controller cannot run with.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.validate_tree()?;

        if self.num_episodes == 0 {
            return Err(SearchError::InvalidConfig(
                "num_episodes must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Check only the settings a single tree reads.
    pub fn validate_tree(&self) -> Result<(), SearchError> {
        if self.max_children == 0 {
            return Err(SearchError::InvalidConfig(
                "max_children must be greater than 0".into(),
            ));
        }

        if !self.exploration_weight.is_finite() || self.exploration_weight < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "exploration_weight must be a finite non-negative number, got {}",
                self.exploration_weight
            )));
        }

        Ok(())
    }
}
