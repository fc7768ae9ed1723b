//! Default configuration values loaded from config.defaults.toml.
//!
//! This module loads defaults from the shared TOML file at compile time,
//! so every binary in the workspace starts from identical values.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    llm: LlmDefaults,
    mcts: MctsDefaults,
    refiner: RefinerDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct LlmDefaults {
    base_url: String,
    model: String,
    request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    max_children: usize,
    exploration_weight: f64,
    num_simulations: u32,
    num_episodes: u32,
    reuse_tree: bool,
}

#[derive(Debug, Deserialize)]
struct RefinerDefaults {
    perturb_percent: u8,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// LLM
pub fn llm_base_url() -> &'static str {
    &DEFAULTS.llm.base_url
}
pub fn llm_model() -> &'static str {
    &DEFAULTS.llm.model
}
pub fn request_timeout_secs() -> u64 {
    DEFAULTS.llm.request_timeout_secs
}

// MCTS
pub fn max_children() -> usize {
    DEFAULTS.mcts.max_children
}
pub fn exploration_weight() -> f64 {
    DEFAULTS.mcts.exploration_weight
}
pub fn num_simulations() -> u32 {
    DEFAULTS.mcts.num_simulations
}
pub fn num_episodes() -> u32 {
    DEFAULTS.mcts.num_episodes
}
pub fn reuse_tree() -> bool {
    DEFAULTS.mcts.reuse_tree
}

// Refiner
pub fn perturb_percent() -> u8 {
    DEFAULTS.refiner.perturb_percent
}
