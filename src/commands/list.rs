//! List command implementation.

use anyhow::Result;
use std::path::Path;

use crate::cli::Overrides;
use crate::enforcer::{check_root, Verdict};

/// Run the list command
pub fn run(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = super::load_config(config_path, overrides)?;
    check_root()?;

    let firewall = super::open_firewall(config)?;
    let allowed = firewall.list(Verdict::Accept)?;
    let blocked = firewall.list(Verdict::Drop)?;

    print!("{}", format_listing(&allowed, &blocked));
    Ok(())
}

fn format_listing(allowed: &[String], blocked: &[String]) -> String {
    let mut out = String::new();
    for (title, networks) in [("Allowed networks:", allowed), ("Blocked networks:", blocked)] {
        out.push_str(title);
        out.push('\n');
        for network in networks {
            out.push_str("  ");
            out.push_str(network);
            out.push('\n');
        }
    }
    out
}
