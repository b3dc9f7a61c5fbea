//! Address ranges and network token normalization.
//!
//! Every network token (`A`, `A/n` or `A-B`) is reduced to a closed
//! [`AddressRange`] before it reaches a backend.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::addr::{self, Family};
use crate::error::{FwsetError, Result};

/// Closed range `[start, end]` of same-family addresses with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressRange {
    start: IpAddr,
    end: IpAddr,
}

impl AddressRange {
    /// Build a range, rejecting mixed families and reversed bounds.
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self> {
        if Family::of(&start) != Family::of(&end) {
            return Err(FwsetError::invalid(
                &format!("{}-{}", start, end),
                "start and end belong to different address families",
            ));
        }
        if start > end {
            return Err(FwsetError::invalid(
                &format!("{}-{}", start, end),
                "start address is greater than end address",
            ));
        }
        Ok(Self { start, end })
    }

    /// Range holding exactly one address
    pub fn single(addr: IpAddr) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Bounds already known to be ordered and of one family.
    pub(crate) fn from_bounds(start: IpAddr, end: IpAddr) -> Self {
        debug_assert!(Family::of(&start) == Family::of(&end) && start <= end);
        Self { start, end }
    }

    /// Every address of a network, host bits ignored.
    pub fn from_net(net: &IpNet) -> Self {
        Self {
            start: net.network(),
            end: net.broadcast(),
        }
    }

    pub fn start(&self) -> IpAddr {
        self.start
    }

    pub fn end(&self) -> IpAddr {
        self.end
    }

    pub fn family(&self) -> Family {
        Family::of(&self.start)
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Whether the range runs up to the all-ones address of its family
    pub fn reaches_max(&self) -> bool {
        self.end == self.family().max()
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        Family::of(addr) == self.family() && *addr >= self.start && *addr <= self.end
    }

    /// Whether the two ranges share at least one address
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.family() == other.family() && self.start <= other.end && other.start <= self.end
    }

    /// Number of addresses covered, saturating at `u128::MAX` for `::/0`.
    pub fn len(&self) -> u128 {
        (addr::to_bits(self.end) - addr::to_bits(self.start)).saturating_add(1)
    }

    /// Ranges are never empty; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for AddressRange {
    type Err = FwsetError;

    fn from_str(s: &str) -> Result<Self> {
        parse_network(s).map(|parsed| parsed.range)
    }
}

/// Outcome of normalizing one network token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedNetwork {
    pub range: AddressRange,
    pub family: Family,
    /// Full width for a bare address, `n` for `A/n`, `None` for `A-B`
    pub prefix_len: Option<u8>,
}

/// Normalize a bare address, CIDR literal or explicit `A-B` range.
///
/// # Errors
/// Any malformed token is reported as [`FwsetError::InvalidNetworkSpec`].
///
/// # Examples
/// ```
/// use fwset::range::parse_network;
/// let parsed = parse_network("10.0.0.0/24").unwrap();
/// assert_eq!(parsed.range.to_string(), "10.0.0.0-10.0.0.255");
/// assert!(parse_network("invalid").is_err());
/// ```
pub fn parse_network(token: &str) -> Result<ParsedNetwork> {
    if token.is_empty() {
        return Err(FwsetError::invalid(token, "empty network"));
    }

    if let Some((first, last)) = token.split_once('-') {
        let start = parse_addr(token, first, "first")?;
        let end = parse_addr(token, last, "last")?;
        let range = AddressRange::new(start, end).map_err(|e| match e {
            FwsetError::InvalidNetworkSpec { reason, .. } => FwsetError::invalid(token, reason),
            other => other,
        })?;
        return Ok(ParsedNetwork {
            range,
            family: range.family(),
            prefix_len: None,
        });
    }

    if token.contains('/') {
        let net: IpNet = token
            .parse()
            .map_err(|_| FwsetError::invalid(token, "invalid CIDR"))?;
        let range = AddressRange::from_net(&net);
        return Ok(ParsedNetwork {
            range,
            family: range.family(),
            prefix_len: Some(net.prefix_len()),
        });
    }

    let ip = parse_addr(token, token, "IP")?;
    let family = Family::of(&ip);
    Ok(ParsedNetwork {
        range: AddressRange::single(ip),
        family,
        prefix_len: Some(family.width()),
    })
}

fn parse_addr(token: &str, part: &str, which: &str) -> Result<IpAddr> {
    part.parse()
        .map_err(|_| FwsetError::invalid(token, format!("invalid {} address '{}'", which, part)))
}
