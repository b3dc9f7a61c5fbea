//! CLI argument parsing with clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::enforcer::Verdict;

#[derive(Parser)]
#[command(name = "fwset")]
#[command(author, version, about = "Manage kernel firewall sets of blocked and allowed networks")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (used when it exists)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output, including generated scripts)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Settings that override the config file; each also reads an environment
/// variable.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Operate on the accept set instead of the drop set
    #[arg(long, env = "ACCEPT", global = true)]
    pub accept: bool,

    /// Firewall backend (nft, ipset)
    #[arg(long, env = "FW", global = true)]
    pub fw: Option<String>,

    /// Table name
    #[arg(long, env = "TABLE", global = true)]
    pub table: Option<String>,

    /// Chain the filter rules are attached to
    #[arg(long, env = "CHAIN", global = true)]
    pub chain: Option<String>,

    /// Name of the set of dropped networks
    #[arg(long, env = "SET_DROP", global = true)]
    pub set_drop: Option<String>,

    /// Name of the set of accepted networks
    #[arg(long, env = "SET_ACCEPT", global = true)]
    pub set_accept: Option<String>,
}

impl Overrides {
    /// Overlay the given values onto `config`.
    pub fn apply(&self, config: &mut Config) {
        let fields = [
            (&self.fw, &mut config.fw),
            (&self.table, &mut config.table),
            (&self.chain, &mut config.chain),
            (&self.set_drop, &mut config.set_drop),
            (&self.set_accept, &mut config.set_accept),
        ];
        for (value, target) in fields {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_accept(self.accept)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the table, chain, sets and filter rules
    Create,

    /// Remove the sets, their rules and the table
    Destroy,

    /// Add networks (IP, CIDR or IP-IP range) to the drop set, or the accept set with --accept
    Add {
        #[arg(required = true, value_name = "NETWORK")]
        networks: Vec<String>,
    },

    /// Delete networks from the drop set, or the accept set with --accept
    Del {
        #[arg(required = true, value_name = "NETWORK")]
        networks: Vec<String>,
    },

    /// List allowed and blocked networks
    List,

    /// Print the effective configuration as YAML
    Config,
}
