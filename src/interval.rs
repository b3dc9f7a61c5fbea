//! Boundary encoding of interval sets.
//!
//! Kernel interval sets store ranges as a flat, address-ordered sequence of
//! elements: a start element opens a range and an end-flagged element closes
//! it at the address *after* its last member. Every set also holds an
//! end-flagged all-zero element from the moment it is created (the
//! terminator), which never describes a real range.
//!
//! A range ending at the family's all-ones address has no successor to close
//! it. Such a range is stored as a lone start element: its end is the
//! terminator, reached by wrapping around. The terminator is owned by the set,
//! so it is never added or deleted on behalf of a single range.
//!
//! Nothing outside this module deals with the flat encoding directly.

use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

use crate::addr::{self, Family};
use crate::error::{FwsetError, Result};
use crate::range::AddressRange;

/// One entry of an interval set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryElement {
    pub key: IpAddr,
    pub interval_end: bool,
}

impl BoundaryElement {
    pub fn start(key: IpAddr) -> Self {
        Self {
            key,
            interval_end: false,
        }
    }

    pub fn end(key: IpAddr) -> Self {
        Self {
            key,
            interval_end: true,
        }
    }

    pub fn family(&self) -> Family {
        Family::of(&self.key)
    }

    /// Whether this is the set-wide end marker at the zero address
    pub fn is_terminator(&self) -> bool {
        self.interval_end && self.key == self.family().zero()
    }
}

/// Address order; on equal keys the end of one range sorts before the start
/// of the adjacent one.
impl Ord for BoundaryElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.interval_end.cmp(&self.interval_end))
    }
}

impl PartialOrd for BoundaryElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BoundaryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interval_end {
            write!(f, "{} [end]", self.key)
        } else {
            write!(f, "{}", self.key)
        }
    }
}

/// The element every interval set of `family` is created with.
pub fn terminator(family: Family) -> BoundaryElement {
    BoundaryElement::end(family.zero())
}

/// Elements that store `range`; the same elements are deleted to remove it.
pub fn boundaries(range: &AddressRange) -> Vec<BoundaryElement> {
    match addr::successor(range.end()) {
        Ok(after) => vec![BoundaryElement::start(range.start()), BoundaryElement::end(after)],
        // Closed by the terminator
        Err(_) => vec![BoundaryElement::start(range.start())],
    }
}

/// Rebuild the stored ranges from a set's elements, in address order.
///
/// # Errors
/// [`FwsetError::BackendFailure`] when the elements do not form a well-formed
/// alternating sequence.
pub fn decode(elements: &[BoundaryElement]) -> Result<Vec<AddressRange>> {
    let mut sorted: Vec<BoundaryElement> = elements
        .iter()
        .filter(|e| !e.is_terminator())
        .copied()
        .collect();
    sorted.sort();

    if let (Some(first), Some(last)) = (sorted.first(), sorted.last()) {
        if first.family() != last.family() {
            return Err(malformed("elements of both address families in one set"));
        }
    }

    let mut ranges = Vec::new();
    let mut open: Option<IpAddr> = None;

    for element in sorted {
        if element.interval_end {
            let start = open
                .take()
                .ok_or_else(|| malformed(format!("end boundary {} has no start", element.key)))?;
            let last = addr::predecessor(element.key)?;
            ranges.push(
                AddressRange::new(start, last)
                    .map_err(|_| malformed(format!("empty interval at {}", start)))?,
            );
        } else if let Some(start) = open.replace(element.key) {
            return Err(malformed(format!(
                "interval starting at {} is not closed before {}",
                start, element.key
            )));
        }
    }

    if let Some(start) = open {
        // Lone trailing start: runs up to the end of the address space
        let family = Family::of(&start);
        ranges.push(AddressRange::from_bounds(start, family.max()));
    }

    Ok(ranges)
}

fn malformed(detail: impl fmt::Display) -> FwsetError {
    FwsetError::backend(format!("malformed interval set: {}", detail))
}
