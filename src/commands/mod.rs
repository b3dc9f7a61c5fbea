//! CLI command implementations.

pub mod config;
pub mod create;
pub mod destroy;
pub mod list;
pub mod modify;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::cli::Overrides;
use crate::config::Config;
use crate::firewall::Firewall;

/// Config file (when present) with flag and environment overrides, validated.
pub fn load_config(config_path: &Path, overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load_or_default(config_path)?;
    overrides.apply(&mut config);
    config
        .validate()
        .context("Invalid configuration after applying overrides")?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

pub(crate) fn open_firewall(config: Config) -> Result<Firewall> {
    let fw = config.fw.clone();
    Firewall::new(config).with_context(|| format!("Cannot use firewall backend '{}'", fw))
}
