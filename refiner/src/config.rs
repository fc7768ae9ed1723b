//! Configuration for the refiner CLI
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use engine_config::{load_config, CentralConfig};
use mcts::SearchConfig;
use once_cell::sync::Lazy;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

// Default value functions that read from central config
fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_base_url() -> String {
    CENTRAL_CONFIG.llm.base_url.clone()
}

fn default_model() -> String {
    CENTRAL_CONFIG.llm.model.clone()
}

fn default_request_timeout() -> u64 {
    CENTRAL_CONFIG.llm.request_timeout_secs
}

fn default_max_children() -> usize {
    CENTRAL_CONFIG.mcts.max_children
}

fn default_exploration_weight() -> f64 {
    CENTRAL_CONFIG.mcts.exploration_weight
}

fn default_num_simulations() -> u32 {
    CENTRAL_CONFIG.mcts.num_simulations
}

fn default_num_episodes() -> u32 {
    CENTRAL_CONFIG.mcts.num_episodes
}

fn default_reuse_tree() -> bool {
    CENTRAL_CONFIG.mcts.reuse_tree
}

fn default_perturb_percent() -> u8 {
    CENTRAL_CONFIG.refiner.perturb_percent
}

#[derive(Parser, Debug, Clone)]
#[command(name = "refiner")]
#[command(about = "Refine an LLM answer with Monte Carlo Tree Search")]
#[command(
    long_about = "Asks a chat-completion backend for an initial answer, then searches a tree
of critiqued and rewritten revisions of it, scoring each with the same model.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Question to answer (read from stdin when omitted)
    #[arg(long, short)]
    pub question: Option<String>,

    /// Base URL of an OpenAI-compatible chat API
    #[arg(long, default_value_t = default_base_url())]
    pub base_url: String,

    /// Model name passed to the backend
    #[arg(long, default_value_t = default_model())]
    pub model: String,

    /// Bearer token for the backend
    #[arg(long)]
    pub api_key: Option<String>,

    /// Timeout per completion request in seconds
    #[arg(long, default_value_t = default_request_timeout())]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Maximum revisions generated per node
    #[arg(long, default_value_t = default_max_children())]
    pub max_children: usize,

    /// UCT exploration constant
    #[arg(long, default_value_t = default_exploration_weight())]
    pub exploration_weight: f64,

    /// Simulation rounds per episode
    #[arg(long, default_value_t = default_num_simulations())]
    pub num_simulations: u32,

    /// Number of search episodes
    #[arg(long, default_value_t = default_num_episodes())]
    pub num_episodes: u32,

    /// Keep one tree across episodes (false starts each episode fresh)
    #[arg(long, default_value_t = default_reuse_tree(), action = ArgAction::Set)]
    pub reuse_tree: bool,

    /// Percentage of question characters perturbed before the first answer (0 disables)
    #[arg(long, default_value_t = default_perturb_percent())]
    pub perturb_percent: u8,

    /// RNG seed for reproducible searches
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    /// Parse CLI arguments, falling back to the central config for optional values.
    pub fn load() -> Self {
        Self::parse().with_central_fallbacks(&CENTRAL_CONFIG)
    }

    /// Fill optional fields the CLI left unset.
    pub fn with_central_fallbacks(mut self, central: &CentralConfig) -> Self {
        if self.api_key.is_none() {
            self.api_key = central.llm.api_key.clone();
        }
        if self.seed.is_none() {
            self.seed = central.refiner.seed;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow!("base_url cannot be empty"));
        }

        if self.model.is_empty() {
            return Err(anyhow!("model cannot be empty"));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be greater than 0"));
        }

        if self.perturb_percent > 100 {
            return Err(anyhow!(
                "perturb_percent must be between 0 and 100, got {}",
                self.perturb_percent
            ));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        self.search_config()
            .validate()
            .map_err(|e| anyhow!("invalid search settings: {e}"))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            max_children: self.max_children,
            exploration_weight: self.exploration_weight,
            num_simulations: self.num_simulations,
            num_episodes: self.num_episodes,
            reuse_tree: self.reuse_tree,
        }
    }
}
