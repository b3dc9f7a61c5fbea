//! Config command implementation.

use anyhow::Result;
use std::path::Path;

use crate::cli::Overrides;

/// Print the effective configuration
pub fn run(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = super::load_config(config_path, overrides)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
