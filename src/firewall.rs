//! Firewall facade: the operations the CLI exposes, over any backend.

use tracing::debug;

use crate::config::Config;
use crate::enforcer::{create_backend, FirewallBackend, Verdict};
use crate::error::Result;
use crate::range::{parse_network, AddressRange};

/// Direction of a set change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Add,
    Remove,
}

/// A configured firewall: one accept and one drop set per address family.
pub struct Firewall {
    config: Config,
    backend: Box<dyn FirewallBackend>,
}

impl Firewall {
    /// Firewall using the backend named by `config.fw`.
    ///
    /// # Errors
    /// [`FwsetError::NotImplemented`](crate::error::FwsetError::NotImplemented)
    /// for an unknown backend.
    pub fn new(config: Config) -> Result<Self> {
        let backend = create_backend(&config)?;
        Ok(Self { config, backend })
    }

    pub fn with_backend(config: Config, backend: Box<dyn FirewallBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Provision both sets and their rules; safe to repeat.
    pub fn create(&mut self) -> Result<()> {
        self.backend.create(Verdict::Accept)?;
        self.backend.create(Verdict::Drop)
    }

    pub fn add(&mut self, verdict: Verdict, tokens: &[String]) -> Result<()> {
        self.modify(verdict, Modification::Add, tokens)
    }

    pub fn remove(&mut self, verdict: Verdict, tokens: &[String]) -> Result<()> {
        self.modify(verdict, Modification::Remove, tokens)
    }

    /// Normalize every token, then apply the change in one backend call.
    ///
    /// A malformed token fails the call before anything is sent to the
    /// backend.
    pub fn modify(
        &mut self,
        verdict: Verdict,
        modification: Modification,
        tokens: &[String],
    ) -> Result<()> {
        let ranges = normalize_all(tokens)?;
        debug!("{:?} {} range(s) on {} set", modification, ranges.len(), verdict);
        match modification {
            Modification::Add => self.backend.add(verdict, &ranges),
            Modification::Remove => self.backend.remove(verdict, &ranges),
        }
    }

    pub fn list(&self, verdict: Verdict) -> Result<Vec<String>> {
        self.backend.list(verdict)
    }

    pub fn destroy(&mut self) -> Result<()> {
        self.backend.destroy()
    }
}

/// Parse every token up front, stopping at the first malformed one.
pub fn normalize_all<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<AddressRange>> {
    tokens
        .iter()
        .map(|token| parse_network(token.as_ref()).map(|parsed| parsed.range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcer::{MemoryDriver, NftablesBackend};
    use crate::error::FwsetError;

    fn firewall() -> Firewall {
        let config = Config::default();
        let backend = NftablesBackend::new(config.clone(), MemoryDriver::new());
        Firewall::with_backend(config, Box::new(backend))
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_unknown_backend() {
        let config = Config {
            fw: "pf".to_string(),
            ..Config::default()
        };
        let err = Firewall::new(config).err().unwrap();
        assert_eq!(err.to_string(), "Firewall type not implemented: pf");
    }

    #[test]
    fn test_create_add_list_remove() {
        let mut fw = firewall();
        fw.create().unwrap();
        assert!(fw.list(Verdict::Drop).unwrap().is_empty());
        assert!(fw.list(Verdict::Accept).unwrap().is_empty());

        fw.add(Verdict::Drop, &tokens(&["8.8.8.8"])).unwrap();
        assert_eq!(fw.list(Verdict::Drop).unwrap(), vec!["8.8.8.8"]);

        fw.remove(Verdict::Drop, &tokens(&["8.8.8.8"])).unwrap();
        assert!(fw.list(Verdict::Drop).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_token_applies_nothing() {
        let mut fw = firewall();
        fw.create().unwrap();

        let err = fw
            .add(Verdict::Drop, &tokens(&["10.0.0.1", "10.0.0.300", "10.0.0.2"]))
            .unwrap_err();
        assert!(matches!(err, FwsetError::InvalidNetworkSpec { ref token, .. } if token == "10.0.0.300"));
        assert!(fw.list(Verdict::Drop).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_all() {
        let ranges = normalize_all(&["192.168.1.1", "10.0.0.0/24"]).unwrap();
        assert_eq!(ranges[0].to_string(), "192.168.1.1");
        assert_eq!(ranges[1].to_string(), "10.0.0.0-10.0.0.255");
        assert!(normalize_all(&["invalid"]).is_err());
        assert!(normalize_all::<&str>(&[]).unwrap().is_empty());
    }
}
