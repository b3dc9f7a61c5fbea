//! Validation of names that end up on backend command lines.
//!
//! Table, chain and set names are interpolated into nft scripts and passed
//! as ipset/iptables arguments, so they are restricted to a plain identifier
//! alphabet.

use anyhow::{bail, Result};

/// Longest accepted name; leaves room for the `_v6` suffix within ipset's
/// 31-character limit.
pub const MAX_IDENTIFIER_LEN: usize = 28;

/// Supported backend names
pub const VALID_BACKENDS: &[&str] = &["nft", "ipset"];

/// Whether `name` is an ASCII letter followed by letters, digits or `_`.
///
/// # Examples
/// ```
/// use fwset::validation::is_valid_identifier;
/// assert!(is_valid_identifier("blocked_nets"));
/// assert!(!is_valid_identifier("1table"));
/// assert!(!is_valid_identifier("evil; flush ruleset"));
/// ```
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a configured identifier, naming the field in the error.
pub fn validate_identifier(field: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("{} must not be empty", field);
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        bail!(
            "{} '{}' is too long ({} characters, maximum {})",
            field,
            name,
            name.len(),
            MAX_IDENTIFIER_LEN
        );
    }
    if !is_valid_identifier(name) {
        bail!(
            "Invalid {} '{}'. Use an ASCII letter followed by letters, digits or '_'",
            field,
            name
        );
    }
    Ok(())
}

/// Validate the backend name.
pub fn validate_backend(fw: &str) -> Result<()> {
    if !VALID_BACKENDS.contains(&fw) {
        bail!(
            "Firewall type not implemented: {}. Valid values: {}",
            fw,
            VALID_BACKENDS.join(", ")
        );
    }
    Ok(())
}
