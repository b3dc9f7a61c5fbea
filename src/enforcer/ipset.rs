//! ipset backend: CIDR blocks in `hash:net` sets matched by iptables.

use tracing::{debug, info};

use super::{exec, FirewallBackend, Verdict};
use crate::addr::{from_bits, Family};
use crate::cmd_abstraction::CommandExecutor;
use crate::config::Config;
use crate::decompose::{decompose, render, CidrBlock};
use crate::error::{FwsetError, Result};
use crate::firewall::Modification;
use crate::range::{parse_network, AddressRange};

const IPSET: &str = "ipset";

/// Upper bound on duplicate match rules removed per set
const MAX_RULE_DELETES: usize = 32;

pub struct IpsetBackend<E: CommandExecutor> {
    config: Config,
    executor: E,
}

impl<E: CommandExecutor> IpsetBackend<E> {
    pub fn new(config: Config, executor: E) -> Self {
        Self { config, executor }
    }

    fn iptables(family: Family) -> &'static str {
        match family {
            Family::V4 => "iptables",
            Family::V6 => "ip6tables",
        }
    }

    fn chain(&self) -> String {
        self.config.chain.to_uppercase()
    }

    /// Run ipset against `set`, translating "does not exist" into SetNotFound.
    fn ipset(&self, set: &str, args: &[&str]) -> Result<String> {
        let output = exec(&self.executor, IPSET, args)?;
        if output.success {
            return Ok(output.stdout);
        }
        if output.stderr.contains("does not exist") {
            return Err(FwsetError::SetNotFound(set.to_string()));
        }
        Err(FwsetError::backend(format!(
            "ipset {} failed: {}",
            args.join(" "),
            output.failure_message()
        )))
    }

    fn match_rule<'a>(action: &'a str, chain: &'a str, set: &'a str, verdict: Verdict) -> [&'a str; 10] {
        [
            action,
            chain,
            "-m",
            "set",
            "--match-set",
            set,
            "src",
            "-j",
            verdict.iptables_target(),
            "-w",
        ]
    }

    fn rule_exists(&self, family: Family, set: &str, verdict: Verdict) -> Result<bool> {
        let chain = self.chain();
        let args = Self::match_rule("-C", &chain, set, verdict);
        Ok(exec(&self.executor, Self::iptables(family), &args)?.success)
    }

    /// Append (`-A`) or delete (`-D`) the match rule of `set`.
    fn change_rule(&self, action: &str, family: Family, set: &str, verdict: Verdict) -> Result<()> {
        let chain = self.chain();
        let args = Self::match_rule(action, &chain, set, verdict);
        let output = exec(&self.executor, Self::iptables(family), &args)?;
        if !output.success {
            return Err(FwsetError::backend(format!(
                "{} {} {} failed: {}",
                Self::iptables(family),
                action,
                chain,
                output.failure_message()
            )));
        }
        Ok(())
    }

    fn modify(&self, verdict: Verdict, modification: Modification, ranges: &[AddressRange]) -> Result<()> {
        for range in ranges {
            let set = self.config.set_name(verdict, range.family());
            for block in ipset_blocks(range) {
                let cidr = block.cidr();
                debug!("{:?} {} in ipset {}", modification, cidr, set);
                match modification {
                    Modification::Add => self.ipset(&set, &["add", &set, &cidr, "-exist"])?,
                    Modification::Remove => self.ipset(&set, &["del", &set, &cidr])?,
                };
            }
        }
        Ok(())
    }
}

impl<E: CommandExecutor> FirewallBackend for IpsetBackend<E> {
    fn create(&mut self, verdict: Verdict) -> Result<()> {
        let chain = self.chain();
        for family in Family::ALL {
            let set = self.config.set_name(verdict, family);
            let inet = match family {
                Family::V4 => "inet",
                Family::V6 => "inet6",
            };
            self.ipset(&set, &["create", &set, "hash:net", "family", inet, "-exist"])?;

            if !self.rule_exists(family, &set, verdict)? {
                self.change_rule("-A", family, &set, verdict)?;
            }
        }
        info!("Created {} ipsets bound to chain {}", verdict, chain);
        Ok(())
    }

    fn add(&mut self, verdict: Verdict, ranges: &[AddressRange]) -> Result<()> {
        self.modify(verdict, Modification::Add, ranges)?;
        info!("Added {} network(s) to {} set", ranges.len(), verdict);
        Ok(())
    }

    fn remove(&mut self, verdict: Verdict, ranges: &[AddressRange]) -> Result<()> {
        self.modify(verdict, Modification::Remove, ranges)?;
        info!("Removed {} network(s) from {} set", ranges.len(), verdict);
        Ok(())
    }

    fn list(&self, verdict: Verdict) -> Result<Vec<String>> {
        let mut listed = Vec::new();
        for family in Family::ALL {
            let set = self.config.set_name(verdict, family);
            let output = self.ipset(&set, &["list", &set])?;
            listed.extend(parse_members(&output)?.iter().map(render));
        }
        Ok(listed)
    }

    fn destroy(&mut self) -> Result<()> {
        for verdict in [Verdict::Accept, Verdict::Drop] {
            for family in Family::ALL {
                let set = self.config.set_name(verdict, family);

                // Every duplicate rule has to go before the set can be destroyed
                let mut deleted = 0;
                while deleted < MAX_RULE_DELETES && self.rule_exists(family, &set, verdict)? {
                    self.change_rule("-D", family, &set, verdict)?;
                    deleted += 1;
                }

                match self.ipset(&set, &["destroy", &set]) {
                    Ok(_) | Err(FwsetError::SetNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        info!("Destroyed fwset ipsets");
        Ok(())
    }
}

/// CIDR blocks of `range` as `hash:net` stores them; a /0 prefix is not
/// accepted there, so the whole address space becomes its two /1 halves.
fn ipset_blocks(range: &AddressRange) -> Vec<CidrBlock> {
    let family = range.family();
    if range.start() != family.zero() || !range.reaches_max() {
        return decompose(range);
    }
    let half = 1u128 << (family.width() - 1);
    let lower = AddressRange::from_bounds(family.zero(), from_bits(family, half - 1));
    let upper = AddressRange::from_bounds(from_bits(family, half), family.max());
    decompose(&lower).into_iter().chain(decompose(&upper)).collect()
}

/// Entries after the `Members:` line of `ipset list`, in address order.
fn parse_members(output: &str) -> Result<Vec<AddressRange>> {
    let mut members = output
        .lines()
        .skip_while(|line| !line.starts_with("Members:"))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            // Entries may carry options such as "timeout 60"
            let entry = line.split_whitespace().next().unwrap_or(line);
            parse_network(entry)
                .map(|parsed| parsed.range)
                .map_err(|_| FwsetError::backend(format!("unexpected ipset member: {}", line)))
        })
        .collect::<Result<Vec<_>>>()?;
    members.sort();
    Ok(members)
}
