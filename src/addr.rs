//! Family-aware IP address arithmetic.
//!
//! Addresses are treated as big-endian unsigned integers of their family's
//! width. Stepping is done on the octet array from the least significant byte,
//! so an IPv4 address always yields an IPv4 address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{FwsetError, Result};

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Both families, IPv4 first
    pub const ALL: [Family; 2] = [Family::V4, Family::V6];

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    /// Address width in bits
    pub fn width(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// The all-zero address
    pub fn zero(self) -> IpAddr {
        match self {
            Family::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Family::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// The all-ones address
    pub fn max(self) -> IpAddr {
        match self {
            Family::V4 => IpAddr::V4(Ipv4Addr::BROADCAST),
            Family::V6 => IpAddr::V6(Ipv6Addr::from(u128::MAX)),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

fn increment<const N: usize>(mut octets: [u8; N]) -> Option<[u8; N]> {
    for byte in octets.iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            return Some(octets);
        }
    }
    None
}

fn decrement<const N: usize>(mut octets: [u8; N]) -> Option<[u8; N]> {
    for byte in octets.iter_mut().rev() {
        let (next, borrow) = byte.overflowing_sub(1);
        *byte = next;
        if !borrow {
            return Some(octets);
        }
    }
    None
}

/// Numerically next address of the same family.
///
/// # Errors
/// [`FwsetError::AddressOverflow`] when `addr` is the all-ones address.
///
/// # Examples
/// ```
/// use fwset::addr::successor;
/// let next = successor("192.168.0.255".parse().unwrap()).unwrap();
/// assert_eq!(next.to_string(), "192.168.1.0");
/// ```
pub fn successor(addr: IpAddr) -> Result<IpAddr> {
    let next = match addr {
        IpAddr::V4(a) => increment(a.octets()).map(|o| IpAddr::V4(Ipv4Addr::from(o))),
        IpAddr::V6(a) => increment(a.octets()).map(|o| IpAddr::V6(Ipv6Addr::from(o))),
    };
    next.ok_or(FwsetError::AddressOverflow(addr))
}

/// Numerically previous address of the same family.
///
/// # Errors
/// [`FwsetError::AddressUnderflow`] when `addr` is the all-zero address.
pub fn predecessor(addr: IpAddr) -> Result<IpAddr> {
    let prev = match addr {
        IpAddr::V4(a) => decrement(a.octets()).map(|o| IpAddr::V4(Ipv4Addr::from(o))),
        IpAddr::V6(a) => decrement(a.octets()).map(|o| IpAddr::V6(Ipv6Addr::from(o))),
    };
    prev.ok_or(FwsetError::AddressUnderflow(addr))
}

/// Address as an unsigned integer (IPv4 occupies the low 32 bits).
pub fn to_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(a) => u128::from(u32::from(a)),
        IpAddr::V6(a) => u128::from(a),
    }
}

/// Inverse of [`to_bits`]; IPv4 keeps only the low 32 bits.
pub fn from_bits(family: Family, bits: u128) -> IpAddr {
    match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
        Family::V6 => IpAddr::V6(Ipv6Addr::from(bits)),
    }
}
