//! CLI Command Implementations

pub mod config;
pub mod simulate;

use anyhow::{bail, Context, Result};
use raffle_core::EngineConfig;
use std::path::PathBuf;

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("raffle")
        .join("config.json")
}

/// Load config from an explicit file, the default file if present, or the environment.
pub fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => (default_config_path(), false),
    };

    if path.exists() {
        EngineConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))
    } else if explicit {
        bail!("config file {} does not exist", path.display())
    } else {
        EngineConfig::from_env().context("loading config from environment")
    }
}
