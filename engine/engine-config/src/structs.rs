//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_base_url() -> String {
    defaults::llm_base_url().into()
}
fn d_model() -> String {
    defaults::llm_model().into()
}
fn d_request_timeout() -> u64 {
    defaults::request_timeout_secs()
}
fn d_max_children() -> usize {
    defaults::max_children()
}
fn d_exploration_weight() -> f64 {
    defaults::exploration_weight()
}
fn d_num_sims() -> u32 {
    defaults::num_simulations()
}
fn d_num_episodes() -> u32 {
    defaults::num_episodes()
}
fn d_reuse_tree() -> bool {
    defaults::reuse_tree()
}
fn d_perturb_percent() -> u8 {
    defaults::perturb_percent()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub refiner: RefinerConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level().into(),
        }
    }
}

/// Chat-completion backend used by the oracles
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (e.g. Ollama's /v1)
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Bearer token, if the backend wants one
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::llm_base_url().into(),
            model: defaults::llm_model().into(),
            api_key: None,
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }
}

/// MCTS (Monte Carlo Tree Search) configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MctsConfig {
    #[serde(default = "d_max_children")]
    pub max_children: usize,
    #[serde(default = "d_exploration_weight")]
    pub exploration_weight: f64,
    #[serde(default = "d_num_sims")]
    pub num_simulations: u32,
    #[serde(default = "d_num_episodes")]
    pub num_episodes: u32,
    #[serde(default = "d_reuse_tree")]
    pub reuse_tree: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            max_children: defaults::max_children(),
            exploration_weight: defaults::exploration_weight(),
            num_simulations: defaults::num_simulations(),
            num_episodes: defaults::num_episodes(),
            reuse_tree: defaults::reuse_tree(),
        }
    }
}

/// Refiner CLI configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefinerConfig {
    /// Share of question characters perturbed before the first answer (0-100)
    #[serde(default = "d_perturb_percent")]
    pub perturb_percent: u8,
    /// Fixed RNG seed (None = seeded from entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            perturb_percent: defaults::perturb_percent(),
            seed: None,
        }
    }
}
