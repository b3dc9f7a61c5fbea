//! Configuration for fwset.
//!
//! Values come from defaults, then the YAML file (when present), then
//! command-line flags and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::addr::Family;
use crate::enforcer::Verdict;
use crate::validation::{validate_backend, validate_identifier};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fwset/config.yaml";

/// Suffix appended to set names for the IPv6 family
pub const V6_SUFFIX: &str = "_v6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend: `nft` or `ipset`
    pub fw: String,
    pub table: String,
    /// Hook chain; upper-cased for iptables
    pub chain: String,
    pub set_drop: String,
    pub set_accept: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fw: "nft".to_string(),
            table: "myfirewall".to_string(),
            chain: "input".to_string(),
            set_drop: "blocked_nets".to_string(),
            set_accept: "allowed_nets".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_backend(&self.fw)?;
        validate_identifier("table", &self.table)?;
        validate_identifier("chain", &self.chain)?;
        validate_identifier("set_drop", &self.set_drop)?;
        validate_identifier("set_accept", &self.set_accept)?;

        if self.set_drop == self.set_accept {
            anyhow::bail!(
                "set_drop and set_accept must differ (both are '{}')",
                self.set_drop
            );
        }

        Ok(())
    }

    /// Name of the set holding `verdict` networks of `family`.
    pub fn set_name(&self, verdict: Verdict, family: Family) -> String {
        let base = match verdict {
            Verdict::Accept => &self.set_accept,
            Verdict::Drop => &self.set_drop,
        };
        match family {
            Family::V4 => base.clone(),
            Family::V6 => format!("{}{}", base, V6_SUFFIX),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }
}
