//! Range to CIDR decomposition.
//!
//! Any closed range splits into a unique minimal sequence of aligned
//! power-of-two blocks. Listings use that to show a range as a single CIDR
//! when one exists and fall back to `A-B` otherwise.

use std::fmt;
use std::net::IpAddr;

use crate::addr::{self, Family};
use crate::range::AddressRange;

/// Network address plus prefix length.
///
/// Always constructed aligned: host bits of `network` are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CidrBlock {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrBlock {
    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn family(&self) -> Family {
        Family::of(&self.network)
    }

    /// Whether the block holds a single address (/32 or /128)
    pub fn is_host(&self) -> bool {
        self.prefix_len == self.family().width()
    }

    /// The exact range covered by this block
    pub fn range(&self) -> AddressRange {
        let host_bits = u32::from(self.family().width() - self.prefix_len);
        let last = addr::to_bits(self.network) | host_mask(host_bits);
        AddressRange::from_bounds(self.network, addr::from_bits(self.family(), last))
    }

    /// `a/n` notation, prefix always present
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix_len)
    }
}

impl fmt::Display for CidrBlock {
    /// Host blocks drop the trailing prefix.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "{}", self.network)
        } else {
            write!(f, "{}/{}", self.network, self.prefix_len)
        }
    }
}

fn host_mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Minimal ordered list of CIDR blocks whose union is exactly `range`.
///
/// # Examples
/// ```
/// use fwset::decompose::decompose;
/// let blocks = decompose(&"10.10.2.0-10.10.2.16".parse().unwrap());
/// let shown: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
/// assert_eq!(shown, ["10.10.2.0/28", "10.10.2.16"]);
/// ```
pub fn decompose(range: &AddressRange) -> Vec<CidrBlock> {
    let family = range.family();
    let width = u32::from(family.width());
    let end = addr::to_bits(range.end());
    let mut current = addr::to_bits(range.start());
    let mut blocks = Vec::new();

    loop {
        // Largest block aligned at `current`, shrunk until it stays within `end`
        let mut host_bits = current.trailing_zeros().min(width);
        while host_bits > 0 && (current | host_mask(host_bits)) > end {
            host_bits -= 1;
        }

        let last = current | host_mask(host_bits);
        blocks.push(CidrBlock {
            network: addr::from_bits(family, current),
            prefix_len: (width - host_bits) as u8,
        });

        if last >= end {
            break;
        }
        current = last + 1;
    }

    blocks
}

/// Listing form of a range: its single covering block, or `A-B`.
pub fn render(range: &AddressRange) -> String {
    match decompose(range).as_slice() {
        [block] => block.to_string(),
        _ => format!("{}-{}", range.start(), range.end()),
    }
}
