//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from subdirectory)
    "/app/config.toml", // Docker container
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by REFINE_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
/// 4. Docker container path (/app/config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    // Check for explicit config path
    if let Ok(path) = std::env::var("REFINE_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from REFINE_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!(
            "REFINE_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    // Search default locations
    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    // Fall back to defaults
    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = v;
        }
    };
    // Optional string field
    ($config:expr, $section:ident . $field:ident, $key:expr, optional) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = Some(v);
        }
    };
    // Optional parseable field (Option<u64>, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = Some(v);
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: REFINE_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.log_level, "REFINE_COMMON_LOG_LEVEL");

    // LLM
    env_override!(config, llm.base_url, "REFINE_LLM_BASE_URL");
    env_override!(config, llm.model, "REFINE_LLM_MODEL");
    env_override!(config, llm.api_key, "REFINE_LLM_API_KEY", optional);
    env_override!(
        config,
        llm.request_timeout_secs,
        "REFINE_LLM_REQUEST_TIMEOUT_SECS",
        parse
    );

    // MCTS
    env_override!(
        config,
        mcts.max_children,
        "REFINE_MCTS_MAX_CHILDREN",
        parse
    );
    env_override!(
        config,
        mcts.exploration_weight,
        "REFINE_MCTS_EXPLORATION_WEIGHT",
        parse
    );
    env_override!(
        config,
        mcts.num_simulations,
        "REFINE_MCTS_NUM_SIMULATIONS",
        parse
    );
    env_override!(
        config,
        mcts.num_episodes,
        "REFINE_MCTS_NUM_EPISODES",
        parse
    );
    env_override!(config, mcts.reuse_tree, "REFINE_MCTS_REUSE_TREE", parse);

    // Refiner
    env_override!(
        config,
        refiner.perturb_percent,
        "REFINE_REFINER_PERTURB_PERCENT",
        parse
    );
    env_override!(
        config,
        refiner.seed,
        "REFINE_REFINER_SEED",
        optional_parse
    );

    config
}
