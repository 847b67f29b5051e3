// SPDX-License-Identifier: CC0-1.0

//! Relative Locktimes

use core::{cmp, convert, fmt};

use bitcoin::{relative, Sequence};

/// An `older` argument which is not a usable BIP68 relative locktime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RelLockTimeError {
    value: u32,
}

impl RelLockTimeError {
    /// The rejected value.
    pub fn value(&self) -> u32 { self.value }
}

impl fmt::Display for RelLockTimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.value == 0 {
            f.write_str("relative locktime «0» is not allowed; the minimum is 1")
        } else {
            write!(f, "value «{}» has the BIP68 disable flag set", self.value)
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RelLockTimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { None }
}

/// The argument of an `older` fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelLockTime(Sequence);

impl RelLockTime {
    /// Validates a consensus-encoded `CHECKSEQUENCEVERIFY` argument.
    pub fn from_consensus(n: u32) -> Result<Self, RelLockTimeError> {
        convert::TryFrom::try_from(Sequence::from_consensus(n))
    }

    /// The value pushed before `CHECKSEQUENCEVERIFY`.
    pub fn to_consensus_u32(self) -> u32 { self.0.to_consensus_u32() }

    /// A relative locktime of `height` blocks. Fails for zero.
    pub fn from_height(height: u16) -> Result<Self, RelLockTimeError> {
        Self::try_from(Sequence::from_height(height))
    }

    /// A relative locktime of `intervals` 512-second units. Fails for zero.
    pub fn from_512_second_intervals(intervals: u16) -> Result<Self, RelLockTimeError> {
        Self::try_from(Sequence::from_512_second_intervals(intervals))
    }

    /// Whether this timelock is blockheight-based.
    pub fn is_height_locked(&self) -> bool { self.0.is_height_locked() }

    /// Whether this timelock is time-based.
    pub fn is_time_locked(&self) -> bool { self.0.is_time_locked() }

    /// The BIP68 view of the lock, if the low bits are meaningful.
    pub fn to_relative_lock_time(self) -> Option<relative::LockTime> {
        self.0.to_relative_lock_time()
    }
}

impl convert::TryFrom<Sequence> for RelLockTime {
    type Error = RelLockTimeError;
    fn try_from(seq: Sequence) -> Result<Self, RelLockTimeError> {
        let value = seq.to_consensus_u32();
        if value != 0 && seq.is_relative_lock_time() {
            Ok(RelLockTime(seq))
        } else {
            Err(RelLockTimeError { value })
        }
    }
}

impl From<RelLockTime> for Sequence {
    fn from(lock_time: RelLockTime) -> Sequence { lock_time.0 }
}

impl cmp::PartialOrd for RelLockTime {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { Some(self.cmp(other)) }
}

impl cmp::Ord for RelLockTime {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.to_consensus_u32().cmp(&other.to_consensus_u32())
    }
}

impl fmt::Display for RelLockTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.to_consensus_u32(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_disabled() {
        assert_eq!(RelLockTime::from_consensus(0).unwrap_err().value(), 0);
        assert!(RelLockTime::from_height(0).is_err());
        assert!(RelLockTime::from_consensus(1 << 31).is_err());
        assert!(RelLockTime::from_consensus(0x7fff_ffff).is_ok());
    }

    #[test]
    fn height_and_time() {
        let blocks = RelLockTime::from_height(144).unwrap();
        assert!(blocks.is_height_locked());
        assert_eq!(blocks.to_consensus_u32(), 144);

        let time = RelLockTime::from_512_second_intervals(2).unwrap();
        assert!(time.is_time_locked());
        assert_eq!(time.to_consensus_u32(), (1 << 22) | 2);
        assert!(blocks < time);
    }
}
