//! Firewall enforcement backends (nftables interval sets, ipset hash sets).

mod ipset;
mod memory;
mod nft_driver;
mod nftables;

use std::fmt;

use tracing::debug;

pub use ipset::IpsetBackend;
pub use memory::MemoryDriver;
pub use nft_driver::NftCliDriver;
pub use nftables::NftablesBackend;

use crate::addr::Family;
use crate::cmd_abstraction::{args_to_strings, CommandExecutor, CommandOutput, RealCommandExecutor};
use crate::config::Config;
use crate::error::{FwsetError, Result};
use crate::interval::BoundaryElement;
use crate::range::AddressRange;

/// What happens to packets whose source matches a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    Accept,
    Drop,
}

impl Verdict {
    pub fn from_accept(accept: bool) -> Self {
        if accept {
            Verdict::Accept
        } else {
            Verdict::Drop
        }
    }

    /// nftables statement keyword
    pub fn nft_keyword(self) -> &'static str {
        match self {
            Verdict::Accept => "accept",
            Verdict::Drop => "drop",
        }
    }

    /// iptables jump target
    pub fn iptables_target(self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Drop => "DROP",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nft_keyword())
    }
}

/// Coordinates of one kernel set and the rule that applies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedSet {
    pub table: String,
    pub chain: String,
    pub name: String,
    pub verdict: Verdict,
    pub family: Family,
}

impl NamedSet {
    pub fn new(config: &Config, verdict: Verdict, family: Family) -> Self {
        Self {
            table: config.table.clone(),
            chain: config.chain.clone(),
            name: config.set_name(verdict, family),
            verdict,
            family,
        }
    }
}

impl fmt::Display for NamedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", nft_family(self.family), self.table, self.name)
    }
}

/// nftables family keyword for a table
pub(crate) fn nft_family(family: Family) -> &'static str {
    match family {
        Family::V4 => "ip",
        Family::V6 => "ip6",
    }
}

/// Set-level operations of a firewall backend.
///
/// Ranges passed to `add`/`remove` are already normalized and are all valid.
pub trait FirewallBackend: Send {
    /// Provision table, chain, the `verdict` sets and their filter rules.
    fn create(&mut self, verdict: Verdict) -> Result<()>;

    fn add(&mut self, verdict: Verdict, ranges: &[AddressRange]) -> Result<()>;

    fn remove(&mut self, verdict: Verdict, ranges: &[AddressRange]) -> Result<()>;

    /// Rendered networks, IPv4 first, each family in address order.
    fn list(&self, verdict: Verdict) -> Result<Vec<String>>;

    /// Remove every set, rule and the table; absent objects are not an error.
    fn destroy(&mut self) -> Result<()>;
}

/// Primitive operations on boundary-encoded interval sets.
///
/// Mutations may be buffered until [`commit`](Self::commit).
pub trait IntervalDriver: Send {
    /// Table, chain, filter rule and an empty set holding only the terminator.
    fn create_set(&mut self, set: &NamedSet) -> Result<()>;

    fn add_boundaries(&mut self, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()>;

    /// Exact-match delete; elements that are not stored fail at commit.
    fn remove_boundaries(&mut self, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()>;

    /// Committed elements, terminator included, in no particular order.
    fn read_boundaries(&self, set: &NamedSet) -> Result<Vec<BoundaryElement>>;

    /// Remove the set and rules referencing it.
    fn destroy_set(&mut self, set: &NamedSet) -> Result<()>;

    /// Remove the table if nothing is left in it.
    fn destroy_table(&mut self, family: Family, table: &str) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    /// Discard uncommitted mutations.
    fn rollback(&mut self);
}

/// Build the backend selected by `config.fw`.
pub fn create_backend(config: &Config) -> Result<Box<dyn FirewallBackend>> {
    match config.fw.as_str() {
        "nft" => Ok(Box::new(NftablesBackend::new(
            config.clone(),
            NftCliDriver::new(RealCommandExecutor::new()),
        ))),
        "ipset" => Ok(Box::new(IpsetBackend::new(
            config.clone(),
            RealCommandExecutor::new(),
        ))),
        other => Err(FwsetError::NotImplemented(other.to_string())),
    }
}

/// Run a command, mapping spawn errors to [`FwsetError::BackendFailure`].
pub(crate) fn exec<E: CommandExecutor + ?Sized>(
    executor: &E,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput> {
    debug!("Running {} {}", program, args.join(" "));
    executor
        .execute(program, &args_to_strings(args))
        .map_err(|e| FwsetError::backend(format!("{}: {:#}", program, e)))
}

/// Check if running as root (effective UID == 0)
pub fn check_root() -> anyhow::Result<()> {
    // SAFETY: geteuid() has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        anyhow::bail!(
            "This operation requires root privileges. Please run with sudo.\n\
             Alternatively, ensure the process has the CAP_NET_ADMIN capability."
        )
    }
    Ok(())
}
