//! # fwset - kernel firewall sets for blocked and allowed networks
//!
//! fwset keeps two named sets per address family in the kernel packet filter:
//! packets from networks in the drop set are dropped, packets from networks
//! in the accept set are accepted. Networks are given as a single address,
//! a CIDR block or an explicit `A-B` range.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (clap)                                                 │
//! │    └── Commands: create, destroy, add, del, list, config    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml + flag/env overrides)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Firewall facade                                            │
//! │    └── token normalization (range) before any change        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Enforcer (FirewallBackend trait)                           │
//! │    ├── NftablesBackend<IntervalDriver>                      │
//! │    │     ├── interval: boundary encoding                    │
//! │    │     ├── NftCliDriver (nft -f / nft -j)                 │
//! │    │     └── MemoryDriver (in-process)                      │
//! │    └── IpsetBackend (hash:net + iptables)                   │
//! │          └── decompose: range to CIDR blocks                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  addr: successor / predecessor arithmetic                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use fwset::config::Config;
//! use fwset::enforcer::{MemoryDriver, NftablesBackend, Verdict};
//! use fwset::firewall::Firewall;
//!
//! let config = Config::default();
//! let backend = NftablesBackend::new(config.clone(), MemoryDriver::new());
//! let mut firewall = Firewall::with_backend(config, Box::new(backend));
//!
//! firewall.create()?;
//! firewall.add(Verdict::Drop, &["10.10.2.0-10.10.2.16".to_string()])?;
//! assert_eq!(firewall.list(Verdict::Drop)?, ["10.10.2.0-10.10.2.16"]);
//! # Ok::<(), fwset::error::FwsetError>(())
//! ```

pub mod addr;
pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod decompose;
pub mod enforcer;
pub mod error;
pub mod firewall;
pub mod interval;
pub mod lock;
pub mod range;
pub mod validation;
