// SPDX-License-Identifier: CC0-1.0

//! Absolute Locktimes

use core::{cmp, fmt};

use bitcoin::absolute;

/// Largest value accepted by an `after` fragment.
pub const MAX_ABSOLUTE_LOCKTIME: u32 = 0x8000_0000;

/// Smallest value accepted by an `after` fragment.
///
/// Zero is a valid nLockTime but the fragment templates use the pushed value
/// as a boolean, so Miniscript forbids it.
pub const MIN_ABSOLUTE_LOCKTIME: u32 = 1;

/// An `after` argument which was out of range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AbsLockTimeError {
    value: u32,
}

impl AbsLockTimeError {
    /// The rejected value.
    pub fn value(&self) -> u32 { self.value }
}

impl fmt::Display for AbsLockTimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.value < MIN_ABSOLUTE_LOCKTIME {
            f.write_str("absolute locktime «0» is not allowed; the minimum is 1")
        } else {
            write!(
                f,
                "absolute locktime «{}» exceeds the maximum of {}",
                self.value, MAX_ABSOLUTE_LOCKTIME
            )
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AbsLockTimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { None }
}

/// The argument of an `after` fragment.
///
/// Values below 500_000_000 are block heights, the rest are UNIX timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbsLockTime(absolute::LockTime);

impl AbsLockTime {
    /// Validates a consensus-encoded `CHECKLOCKTIMEVERIFY` argument.
    pub fn from_consensus(n: u32) -> Result<Self, AbsLockTimeError> {
        if (MIN_ABSOLUTE_LOCKTIME..=MAX_ABSOLUTE_LOCKTIME).contains(&n) {
            Ok(AbsLockTime(absolute::LockTime::from_consensus(n)))
        } else {
            Err(AbsLockTimeError { value: n })
        }
    }

    /// The value pushed before `CHECKLOCKTIMEVERIFY`.
    pub fn to_consensus_u32(self) -> u32 { self.0.to_consensus_u32() }

    /// Whether this is a height-based locktime.
    pub fn is_block_height(&self) -> bool { self.0.is_block_height() }

    /// Whether this is a time-based locktime.
    pub fn is_block_time(&self) -> bool { self.0.is_block_time() }
}

impl From<AbsLockTime> for absolute::LockTime {
    fn from(lock_time: AbsLockTime) -> absolute::LockTime { lock_time.0 }
}

impl cmp::PartialOrd for AbsLockTime {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { Some(self.cmp(other)) }
}

impl cmp::Ord for AbsLockTime {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.to_consensus_u32().cmp(&other.to_consensus_u32())
    }
}

impl fmt::Display for AbsLockTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.to_consensus_u32(), f)
    }
}
