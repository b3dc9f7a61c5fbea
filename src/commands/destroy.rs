//! Destroy command implementation.

use anyhow::Result;
use std::path::Path;

use crate::cli::Overrides;
use crate::enforcer::check_root;
use crate::lock::LockGuard;

/// Run the destroy command
pub fn run(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = super::load_config(config_path, overrides)?;
    check_root()?;
    let _lock = LockGuard::acquire()?;

    let mut firewall = super::open_firewall(config)?;
    firewall.destroy()?;

    println!("[OK] Firewall sets removed");
    Ok(())
}
