//! Firewall scenarios over the in-process interval driver.

use fwset::addr::Family;
use fwset::config::Config;
use fwset::enforcer::{FirewallBackend, IntervalDriver, MemoryDriver, NamedSet, NftablesBackend, Verdict};
use fwset::error::FwsetError;
use fwset::firewall::Firewall;
use fwset::interval::{decode, terminator};

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn created() -> Firewall {
    let config = Config::default();
    let backend = NftablesBackend::new(config.clone(), MemoryDriver::new());
    let mut firewall = Firewall::with_backend(config, Box::new(backend));
    firewall.create().unwrap();
    firewall
}

#[test]
fn fresh_sets_list_empty() {
    let firewall = created();
    assert!(firewall.list(Verdict::Drop).unwrap().is_empty());
    assert!(firewall.list(Verdict::Accept).unwrap().is_empty());
}

#[test]
fn add_and_remove_single_address() {
    let mut firewall = created();
    firewall.add(Verdict::Drop, &tokens(&["8.8.8.8"])).unwrap();
    assert_eq!(firewall.list(Verdict::Drop).unwrap(), ["8.8.8.8"]);

    firewall.remove(Verdict::Drop, &tokens(&["8.8.8.8"])).unwrap();
    assert!(firewall.list(Verdict::Drop).unwrap().is_empty());
}

#[test]
fn add_twice_is_idempotent() {
    let mut firewall = created();
    let networks = tokens(&["10.0.0.0/24", "2001:db8::1"]);
    firewall.add(Verdict::Drop, &networks).unwrap();
    let first = firewall.list(Verdict::Drop).unwrap();

    firewall.add(Verdict::Drop, &networks).unwrap();
    assert_eq!(firewall.list(Verdict::Drop).unwrap(), first);
    assert_eq!(first, ["10.0.0.0/24", "2001:db8::1"]);
}

#[test]
fn remove_restores_previous_listing() {
    let mut firewall = created();
    firewall.add(Verdict::Accept, &tokens(&["192.168.0.0/16"])).unwrap();
    let before = firewall.list(Verdict::Accept).unwrap();

    let extra = tokens(&["10.10.2.0-10.10.2.16", "172.16.0.0/12", "fe80::/10"]);
    firewall.add(Verdict::Accept, &extra).unwrap();
    firewall.remove(Verdict::Accept, &extra).unwrap();
    assert_eq!(firewall.list(Verdict::Accept).unwrap(), before);
}

#[test]
fn listing_uses_cidr_when_exact() {
    let mut firewall = created();
    firewall
        .add(
            Verdict::Drop,
            &tokens(&["10.10.2.0-10.10.2.255", "10.20.0.0-10.20.0.16", "1.2.3.4/32"]),
        )
        .unwrap();
    assert_eq!(
        firewall.list(Verdict::Drop).unwrap(),
        ["1.2.3.4", "10.10.2.0/24", "10.20.0.0-10.20.0.16"]
    );
}

#[test]
fn ranges_reaching_family_max() {
    let mut firewall = created();
    let networks = tokens(&["255.255.255.0/24", "ffff::/16"]);
    firewall.add(Verdict::Drop, &networks).unwrap();
    assert_eq!(
        firewall.list(Verdict::Drop).unwrap(),
        ["255.255.255.0/24", "ffff::/16"]
    );

    firewall.remove(Verdict::Drop, &networks).unwrap();
    assert!(firewall.list(Verdict::Drop).unwrap().is_empty());
}

#[test]
fn whole_address_space() {
    let mut firewall = created();
    firewall.add(Verdict::Drop, &tokens(&["0.0.0.0/0", "::/0"])).unwrap();
    assert_eq!(firewall.list(Verdict::Drop).unwrap(), ["0.0.0.0/0", "::/0"]);
}

#[test]
fn adjacent_ranges_stay_separate_entries() {
    let mut firewall = created();
    firewall
        .add(Verdict::Drop, &tokens(&["10.0.0.0/25", "10.0.0.128/25"]))
        .unwrap();
    assert_eq!(
        firewall.list(Verdict::Drop).unwrap(),
        ["10.0.0.0/25", "10.0.0.128/25"]
    );
}

#[test]
fn overlapping_add_is_rejected() {
    let mut firewall = created();
    firewall.add(Verdict::Drop, &tokens(&["10.0.0.0/16"])).unwrap();

    let err = firewall.add(Verdict::Drop, &tokens(&["10.0.5.0/24"])).unwrap_err();
    assert!(matches!(err, FwsetError::BackendFailure(_)));
    assert_eq!(firewall.list(Verdict::Drop).unwrap(), ["10.0.0.0/16"]);
}

#[test]
fn range_spanning_stored_ranges_is_rejected() {
    let mut firewall = created();
    let stored = tokens(&["10.0.0.0-10.0.0.9", "10.0.0.20-10.0.0.29"]);
    firewall.add(Verdict::Drop, &stored).unwrap();

    let err = firewall
        .add(Verdict::Drop, &tokens(&["10.0.0.0-10.0.0.29"]))
        .unwrap_err();
    assert!(matches!(err, FwsetError::BackendFailure(_)));
    assert_eq!(
        firewall.list(Verdict::Drop).unwrap(),
        ["10.0.0.0-10.0.0.9", "10.0.0.20-10.0.0.29"]
    );

    firewall.remove(Verdict::Drop, &stored).unwrap();
    assert!(firewall.list(Verdict::Drop).unwrap().is_empty());
}

#[test]
fn removing_absent_network_fails() {
    let mut firewall = created();
    firewall.add(Verdict::Drop, &tokens(&["10.0.0.0/24"])).unwrap();

    let err = firewall.remove(Verdict::Drop, &tokens(&["10.0.0.1"])).unwrap_err();
    assert!(matches!(err, FwsetError::BackendFailure(_)));
    assert_eq!(firewall.list(Verdict::Drop).unwrap(), ["10.0.0.0/24"]);
}

#[test]
fn operations_before_create_report_missing_set() {
    let config = Config::default();
    let backend = NftablesBackend::new(config.clone(), MemoryDriver::new());
    let mut firewall = Firewall::with_backend(config, Box::new(backend));

    assert!(matches!(
        firewall.list(Verdict::Drop),
        Err(FwsetError::SetNotFound(_))
    ));
    assert!(matches!(
        firewall.add(Verdict::Accept, &tokens(&["8.8.8.8"])),
        Err(FwsetError::SetNotFound(_))
    ));
}

#[test]
fn destroy_then_recreate() {
    let mut firewall = created();
    firewall.add(Verdict::Drop, &tokens(&["8.8.8.8"])).unwrap();
    firewall.destroy().unwrap();
    firewall.destroy().unwrap();

    firewall.create().unwrap();
    assert!(firewall.list(Verdict::Drop).unwrap().is_empty());
}

#[test]
fn ipv6_ranges_use_suffixed_set() {
    let config = Config::default();
    let mut backend = NftablesBackend::new(config.clone(), MemoryDriver::new());
    backend.create(Verdict::Drop).unwrap();
    backend
        .add(Verdict::Drop, &["2001:db8::/48".parse().unwrap()])
        .unwrap();

    let v4 = NamedSet::new(&config, Verdict::Drop, Family::V4);
    let v6 = NamedSet::new(&config, Verdict::Drop, Family::V6);
    assert_eq!(v6.name, "blocked_nets_v6");
    assert_eq!(
        backend.driver().read_boundaries(&v4).unwrap(),
        [terminator(Family::V4)]
    );
    let stored = decode(&backend.driver().read_boundaries(&v6).unwrap()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].to_string(), "2001:db8::-2001:db8:0:ffff:ffff:ffff:ffff:ffff");
}

#[test]
fn create_is_idempotent() {
    let config = Config::default();
    let mut backend = NftablesBackend::new(config.clone(), MemoryDriver::new());
    backend.create(Verdict::Drop).unwrap();
    backend.create(Verdict::Drop).unwrap();

    let set = NamedSet::new(&config, Verdict::Drop, Family::V4);
    assert_eq!(backend.driver().rule_count(&set), 1);
}
