//! Centralized configuration loading from config.toml.
//!
//! This crate provides configuration structs and loading logic shared
//! across the workspace (the search engine's embedders and the refiner CLI).
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`REFINE_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml, compiled in)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! REFINE_<SECTION>_<KEY>=value
//!
//! Examples:
//!     REFINE_COMMON_LOG_LEVEL=debug
//!     REFINE_LLM_BASE_URL=http://localhost:11434/v1
//!     REFINE_LLM_MODEL=qwen2.5:7b
//!     REFINE_MCTS_MAX_CHILDREN=3
//!     REFINE_MCTS_NUM_SIMULATIONS=8
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use structs::*;
