//! Add and del command implementation.

use anyhow::Result;
use std::path::Path;

use crate::cli::Overrides;
use crate::enforcer::check_root;
use crate::firewall::{normalize_all, Modification};
use crate::lock::LockGuard;

/// Run the add or del command
pub fn run(
    modification: Modification,
    networks: &[String],
    config_path: &Path,
    overrides: &Overrides,
) -> Result<()> {
    let config = super::load_config(config_path, overrides)?;

    // Malformed input is reported without requiring root
    normalize_all(networks)?;

    check_root()?;
    let _lock = LockGuard::acquire()?;

    let verdict = overrides.verdict();
    let mut firewall = super::open_firewall(config)?;
    firewall.modify(verdict, modification, networks)?;

    let (action, preposition) = match modification {
        Modification::Add => ("Added", "to"),
        Modification::Remove => ("Removed", "from"),
    };
    println!(
        "[OK] {} {} network(s) {} the {} set",
        action,
        networks.len(),
        preposition,
        verdict
    );
    Ok(())
}
