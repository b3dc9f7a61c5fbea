//! Interval driver speaking to the `nft` binary.
//!
//! Mutations are buffered as nft script lines and applied with a single
//! `nft -f -`, which the kernel executes as one transaction. Reads use the
//! JSON output of `nft -j`.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{exec, nft_family, IntervalDriver, NamedSet};
use crate::addr::Family;
use crate::cmd_abstraction::{args_to_strings, CommandExecutor};
use crate::error::{FwsetError, Result};
use crate::interval::{boundaries, decode, terminator, BoundaryElement};
use crate::range::{parse_network, AddressRange};

const NFT: &str = "nft";

/// nft's message for a missing table, chain or set
const NOT_FOUND: &str = "No such file or directory";

type SetKey = (Family, String, String);

fn set_key(set: &NamedSet) -> SetKey {
    (set.family, set.table.clone(), set.name.clone())
}

/// Top level of `nft -j` output
#[derive(Debug, Deserialize)]
struct NftJson {
    #[serde(default)]
    nftables: Vec<Value>,
}

pub struct NftCliDriver<E: CommandExecutor> {
    executor: E,
    pending: Vec<String>,
    /// Sets known to exist in the kernel
    known: HashSet<SetKey>,
    /// Sets created by the uncommitted batch
    staged: HashSet<SetKey>,
}

impl<E: CommandExecutor> NftCliDriver<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            pending: Vec::new(),
            known: HashSet::new(),
            staged: HashSet::new(),
        }
    }

    /// Script lines waiting for the next commit
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    fn list(&self, args: &[&str]) -> Result<Option<String>> {
        let output = exec(&self.executor, NFT, args)?;
        if output.success {
            Ok(Some(output.stdout))
        } else if output.stderr.contains(NOT_FOUND) {
            Ok(None)
        } else {
            Err(FwsetError::backend(format!(
                "nft {} failed: {}",
                args.join(" "),
                output.failure_message()
            )))
        }
    }

    fn set_exists(&self, set: &NamedSet) -> Result<bool> {
        let key = set_key(set);
        if self.known.contains(&key) || self.staged.contains(&key) {
            return Ok(true);
        }
        let listed = self.list(&["list", "set", nft_family(set.family), &set.table, &set.name])?;
        Ok(listed.is_some())
    }

    fn ensure_set(&mut self, set: &NamedSet) -> Result<()> {
        if !self.set_exists(set)? {
            return Err(FwsetError::SetNotFound(set.name.clone()));
        }
        self.known.insert(set_key(set));
        Ok(())
    }

    fn push_elements(&mut self, verb: &str, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()> {
        let ranges = decode(elements)?;
        if ranges.is_empty() {
            return Ok(());
        }
        let listed: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
        self.pending.push(format!(
            "{} element {} {} {} {{ {} }}",
            verb,
            nft_family(set.family),
            set.table,
            set.name,
            listed.join(", ")
        ));
        Ok(())
    }
}

impl<E: CommandExecutor> IntervalDriver for NftCliDriver<E> {
    fn create_set(&mut self, set: &NamedSet) -> Result<()> {
        let family = nft_family(set.family);
        let addr_type = match set.family {
            Family::V4 => "ipv4_addr",
            Family::V6 => "ipv6_addr",
        };

        self.pending.push(format!("add table {} {}", family, set.table));
        self.pending.push(format!(
            "add chain {} {} {} {{ type filter hook input priority 0; policy accept; }}",
            family, set.table, set.chain
        ));
        self.pending.push(format!(
            "add set {} {} {} {{ type {}; flags interval; }}",
            family, set.table, set.name, addr_type
        ));

        let chain = self.list(&["list", "chain", family, &set.table, &set.chain])?;
        let has_rule = chain.is_some_and(|listing| listing.contains(&format!("@{} ", set.name)));
        if !has_rule {
            self.pending.push(format!(
                "add rule {} {} {} {} saddr @{} counter log prefix \"{}: \" {}",
                family,
                set.table,
                set.chain,
                family,
                set.name,
                set.name,
                set.verdict.nft_keyword()
            ));
        }

        self.staged.insert(set_key(set));
        Ok(())
    }

    fn add_boundaries(&mut self, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()> {
        self.ensure_set(set)?;
        self.push_elements("add", set, elements)
    }

    fn remove_boundaries(&mut self, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()> {
        self.ensure_set(set)?;
        self.push_elements("delete", set, elements)
    }

    fn read_boundaries(&self, set: &NamedSet) -> Result<Vec<BoundaryElement>> {
        let json = self
            .list(&["-j", "list", "set", nft_family(set.family), &set.table, &set.name])?
            .ok_or_else(|| FwsetError::SetNotFound(set.name.clone()))?;

        let mut elements = vec![terminator(set.family)];
        for range in parse_set_elements(&json)? {
            elements.extend(boundaries(&range));
        }
        Ok(elements)
    }

    fn destroy_set(&mut self, set: &NamedSet) -> Result<()> {
        let family = nft_family(set.family);

        if let Some(listing) = self.list(&["-a", "list", "chain", family, &set.table, &set.chain])? {
            for handle in rule_handles(&listing, &set.name) {
                self.pending.push(format!(
                    "delete rule {} {} {} handle {}",
                    family, set.table, set.chain, handle
                ));
            }
        }

        if self.list(&["list", "set", family, &set.table, &set.name])?.is_some() {
            self.pending
                .push(format!("delete set {} {} {}", family, set.table, set.name));
        } else {
            debug!("Set {} already absent", set);
        }
        self.known.remove(&set_key(set));
        Ok(())
    }

    fn destroy_table(&mut self, family: Family, table: &str) -> Result<()> {
        let family = nft_family(family);
        let Some(json) = self.list(&["-j", "list", "table", family, table])? else {
            debug!("Table {} {} already absent", family, table);
            return Ok(());
        };

        if table_is_empty(&json)? {
            self.pending.push(format!("delete table {} {}", family, table));
        } else {
            debug!("Table {} {} still has sets or rules, keeping it", family, table);
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut script = std::mem::take(&mut self.pending).join("\n");
        script.push('\n');
        let staged = std::mem::take(&mut self.staged);

        debug!("Executing nft script:\n{}", script);
        let output = self
            .executor
            .execute_with_stdin(NFT, &args_to_strings(&["-f", "-"]), &script)
            .map_err(|e| FwsetError::backend(format!("nft: {:#}", e)))?;

        if !output.success {
            return Err(FwsetError::backend(format!(
                "nft failed: {}",
                output.failure_message()
            )));
        }
        self.known.extend(staged);
        Ok(())
    }

    fn rollback(&mut self) {
        self.pending.clear();
        self.staged.clear();
    }
}

/// Ranges of the first set in `nft -j list set` output.
fn parse_set_elements(json: &str) -> Result<Vec<AddressRange>> {
    let output: NftJson = serde_json::from_str(json)
        .map_err(|e| FwsetError::backend(format!("unreadable nft JSON output: {}", e)))?;

    let Some(set) = output.nftables.iter().find_map(|item| item.get("set")) else {
        return Err(FwsetError::backend("nft output contains no set"));
    };

    match set.get("elem") {
        Some(Value::Array(items)) => items.iter().map(element_range).collect(),
        _ => Ok(Vec::new()),
    }
}

/// One set element: bare address, `prefix`, `range`, or `elem` wrapping one
/// of those (elements carrying counters or timeouts).
fn element_range(value: &Value) -> Result<AddressRange> {
    let token = match value {
        Value::String(addr) => addr.clone(),
        Value::Object(map) => {
            if let Some(prefix) = map.get("prefix") {
                format!(
                    "{}/{}",
                    prefix["addr"].as_str().unwrap_or_default(),
                    prefix["len"].as_u64().unwrap_or_default()
                )
            } else if let Some(Value::Array(bounds)) = map.get("range") {
                match bounds.as_slice() {
                    [Value::String(start), Value::String(end)] => format!("{}-{}", start, end),
                    _ => return Err(unexpected(value)),
                }
            } else if let Some(elem) = map.get("elem") {
                return element_range(&elem["val"]);
            } else {
                return Err(unexpected(value));
            }
        }
        _ => return Err(unexpected(value)),
    };

    parse_network(&token)
        .map(|parsed| parsed.range)
        .map_err(|_| unexpected(value))
}

fn unexpected(value: &Value) -> FwsetError {
    FwsetError::backend(format!("unexpected set element in nft output: {}", value))
}

/// Handles of the rules in an `nft -a list chain` listing that use `@set`.
fn rule_handles(listing: &str, set_name: &str) -> Vec<u64> {
    let reference = format!("@{} ", set_name);
    listing
        .lines()
        .filter(|line| line.contains(&reference))
        .filter_map(|line| extract_number_after(line, "# handle"))
        .collect()
}

/// Whether `nft -j list table` shows no sets and no rules.
fn table_is_empty(json: &str) -> Result<bool> {
    let output: NftJson = serde_json::from_str(json)
        .map_err(|e| FwsetError::backend(format!("unreadable nft JSON output: {}", e)))?;
    Ok(!output
        .nftables
        .iter()
        .any(|item| item.get("set").is_some() || item.get("rule").is_some()))
}

/// Extract a number after a keyword in a string
fn extract_number_after(s: &str, keyword: &str) -> Option<u64> {
    let idx = s.find(keyword)?;
    let after = &s[idx + keyword.len()..];
    let num_str: String = after
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    num_str.parse().ok()
}
