//! nftables backend: ranges stored in interval sets.

use tracing::{debug, info, warn};

use super::{FirewallBackend, IntervalDriver, NamedSet, Verdict};
use crate::addr::Family;
use crate::config::Config;
use crate::decompose::render;
use crate::error::Result;
use crate::firewall::Modification;
use crate::interval::{boundaries, decode};
use crate::range::AddressRange;

/// Interval-set backend generic over the driver that talks to the kernel.
pub struct NftablesBackend<D: IntervalDriver> {
    config: Config,
    driver: D,
}

impl<D: IntervalDriver> NftablesBackend<D> {
    pub fn new(config: Config, driver: D) -> Self {
        Self { config, driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn named_set(&self, verdict: Verdict, family: Family) -> NamedSet {
        NamedSet::new(&self.config, verdict, family)
    }

    fn modify(
        &mut self,
        verdict: Verdict,
        modification: Modification,
        ranges: &[AddressRange],
    ) -> Result<()> {
        if ranges.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.stage(verdict, modification, ranges) {
            self.driver.rollback();
            return Err(e);
        }
        self.driver.commit()?;

        info!(
            "{} {} network(s) {} {} set",
            match modification {
                Modification::Add => "Added",
                Modification::Remove => "Removed",
            },
            ranges.len(),
            match modification {
                Modification::Add => "to",
                Modification::Remove => "from",
            },
            verdict
        );
        Ok(())
    }

    fn stage(
        &mut self,
        verdict: Verdict,
        modification: Modification,
        ranges: &[AddressRange],
    ) -> Result<()> {
        for range in ranges {
            let set = self.named_set(verdict, range.family());
            let elements = boundaries(range);
            debug!("{:?} {} in {}", modification, range, set);
            match modification {
                Modification::Add => self.driver.add_boundaries(&set, &elements)?,
                Modification::Remove => self.driver.remove_boundaries(&set, &elements)?,
            }
        }
        Ok(())
    }
}

impl<D: IntervalDriver> FirewallBackend for NftablesBackend<D> {
    fn create(&mut self, verdict: Verdict) -> Result<()> {
        for family in Family::ALL {
            let set = self.named_set(verdict, family);
            if let Err(e) = self.driver.create_set(&set) {
                self.driver.rollback();
                return Err(e);
            }
        }
        self.driver.commit()?;
        info!("Created {} sets in table {}", verdict, self.config.table);
        Ok(())
    }

    fn add(&mut self, verdict: Verdict, ranges: &[AddressRange]) -> Result<()> {
        self.modify(verdict, Modification::Add, ranges)
    }

    fn remove(&mut self, verdict: Verdict, ranges: &[AddressRange]) -> Result<()> {
        self.modify(verdict, Modification::Remove, ranges)
    }

    fn list(&self, verdict: Verdict) -> Result<Vec<String>> {
        let mut listed = Vec::new();
        for family in Family::ALL {
            let set = self.named_set(verdict, family);
            let elements = self.driver.read_boundaries(&set)?;
            listed.extend(decode(&elements)?.iter().map(render));
        }
        Ok(listed)
    }

    fn destroy(&mut self) -> Result<()> {
        for verdict in [Verdict::Accept, Verdict::Drop] {
            for family in Family::ALL {
                let set = self.named_set(verdict, family);
                if let Err(e) = self.driver.destroy_set(&set) {
                    self.driver.rollback();
                    return Err(e);
                }
            }
        }
        self.driver.commit()?;

        // Table removal sees the committed state
        for family in Family::ALL {
            if let Err(e) = self.driver.destroy_table(family, &self.config.table) {
                warn!("Keeping table {} {}: {}", super::nft_family(family), self.config.table, e);
                self.driver.rollback();
                return Err(e);
            }
        }
        self.driver.commit()?;
        info!("Destroyed fwset sets in table {}", self.config.table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::MemoryDriver;
    use crate::error::FwsetError;

    fn backend() -> NftablesBackend<MemoryDriver> {
        NftablesBackend::new(Config::default(), MemoryDriver::new())
    }

    fn ranges(tokens: &[&str]) -> Vec<AddressRange> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_fresh_sets_list_empty() {
        let mut backend = backend();
        backend.create(Verdict::Drop).unwrap();
        assert!(backend.list(Verdict::Drop).unwrap().is_empty());
    }

    #[test]
    fn test_add_then_remove_single_host() {
        let mut backend = backend();
        backend.create(Verdict::Drop).unwrap();

        backend.add(Verdict::Drop, &ranges(&["8.8.8.8"])).unwrap();
        assert_eq!(backend.list(Verdict::Drop).unwrap(), vec!["8.8.8.8"]);

        backend.remove(Verdict::Drop, &ranges(&["8.8.8.8"])).unwrap();
        assert!(backend.list(Verdict::Drop).unwrap().is_empty());
    }

    #[test]
    fn test_list_renders_cidr_or_range() {
        let mut backend = backend();
        backend.create(Verdict::Drop).unwrap();
        backend
            .add(
                Verdict::Drop,
                &ranges(&["10.10.2.0-10.10.2.16", "2001:db8::/32", "192.168.0.0/16"]),
            )
            .unwrap();

        assert_eq!(
            backend.list(Verdict::Drop).unwrap(),
            vec!["10.10.2.0-10.10.2.16", "192.168.0.0/16", "2001:db8::/32"]
        );
    }

    #[test]
    fn test_verdict_sets_are_separate() {
        let mut backend = backend();
        backend.create(Verdict::Accept).unwrap();
        backend.create(Verdict::Drop).unwrap();

        backend.add(Verdict::Accept, &ranges(&["10.0.0.1"])).unwrap();
        assert_eq!(backend.list(Verdict::Accept).unwrap(), vec!["10.0.0.1"]);
        assert!(backend.list(Verdict::Drop).unwrap().is_empty());
    }

    #[test]
    fn test_ipv6_lands_in_suffixed_set() {
        let mut backend = backend();
        backend.create(Verdict::Drop).unwrap();
        backend.add(Verdict::Drop, &ranges(&["2001:db8::1"])).unwrap();

        let v6 = NamedSet::new(&Config::default(), Verdict::Drop, Family::V6);
        assert_eq!(v6.name, "blocked_nets_v6");
        assert_eq!(decode(&backend.driver().read_boundaries(&v6).unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_batch_leaves_nothing_applied() {
        let mut backend = backend();
        backend.create(Verdict::Drop).unwrap();
        backend.add(Verdict::Drop, &ranges(&["10.0.0.0/24"])).unwrap();

        // Second range overlaps the first
        let err = backend
            .add(Verdict::Drop, &ranges(&["172.16.0.1", "10.0.0.128/25"]))
            .unwrap_err();
        assert!(matches!(err, FwsetError::BackendFailure(_)));
        assert_eq!(backend.list(Verdict::Drop).unwrap(), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_add_without_create_is_set_not_found() {
        let mut backend = backend();
        let err = backend.add(Verdict::Drop, &ranges(&["8.8.8.8"])).unwrap_err();
        assert!(matches!(err, FwsetError::SetNotFound(ref name) if name == "blocked_nets"));
    }

    #[test]
    fn test_destroy_twice_is_ok() {
        let mut backend = backend();
        backend.create(Verdict::Accept).unwrap();
        backend.create(Verdict::Drop).unwrap();
        backend.destroy().unwrap();
        backend.destroy().unwrap();
        assert!(backend.driver().is_empty());
    }
}
