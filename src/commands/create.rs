//! Create command implementation.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::cli::Overrides;
use crate::enforcer::check_root;
use crate::lock::LockGuard;

/// Run the create command
pub fn run(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = super::load_config(config_path, overrides)?;
    check_root()?;
    let _lock = LockGuard::acquire()?;

    info!(
        "Creating sets {} and {} in table {} ({})",
        config.set_accept, config.set_drop, config.table, config.fw
    );
    let table = config.table.clone();
    let mut firewall = super::open_firewall(config)?;
    firewall.create()?;

    println!("[OK] Firewall sets created in table {}", table);
    Ok(())
}
