// SPDX-License-Identifier: CC0-1.0

//! Thresholds
//!
//! A k-of-n collection shared by `thresh`, `multi` and `multi_a`.

use core::{fmt, slice};

/// A threshold whose `k` or `n` was out of range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThresholdError {
    k: usize,
    n: usize,
    max: Option<usize>,
}

impl ThresholdError {
    /// The requested threshold value.
    pub fn k(&self) -> usize { self.k }

    /// The number of sub-items supplied.
    pub fn n(&self) -> usize { self.n }

    /// The maximum number of sub-items for the fragment, if it has one.
    pub fn max(&self) -> Option<usize> { self.max }
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            _ if self.n == 0 => f.write_str("threshold has no sub-items"),
            _ if self.k == 0 => f.write_str("threshold «k» must be at least 1"),
            _ if self.k > self.n => {
                write!(f, "threshold «{}-of-{}» has k larger than n", self.k, self.n)
            }
            Some(max) => {
                write!(f, "threshold «{}-of-{}» exceeds the limit of {} items", self.k, self.n, max)
            }
            None => write!(f, "invalid threshold «{}-of-{}»", self.k, self.n),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ThresholdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { None }
}

/// A k-of-n collection of `T`.
///
/// `1 <= k <= n` always holds. When `MAX` is nonzero it also caps `n`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold<T, const MAX: usize> {
    k: usize,
    inner: Vec<T>,
}

impl<T, const MAX: usize> Threshold<T, MAX> {
    /// Checks `k` against the collection and wraps it.
    pub fn new(k: usize, inner: Vec<T>) -> Result<Self, ThresholdError> {
        let n = inner.len();
        if k == 0 || k > n || (MAX > 0 && n > MAX) {
            Err(ThresholdError { k, n, max: if MAX > 0 { Some(MAX) } else { None } })
        } else {
            Ok(Threshold { k, inner })
        }
    }

    /// Collects an iterator and checks it as in [`Threshold::new`].
    pub fn from_iter<I: IntoIterator<Item = T>>(k: usize, iter: I) -> Result<Self, ThresholdError> {
        Self::new(k, iter.into_iter().collect())
    }

    /// Number of sub-items.
    pub fn n(&self) -> usize { self.inner.len() }

    /// Number of sub-items which must be satisfied.
    pub const fn k(&self) -> usize { self.k }

    /// The sub-items, in order.
    pub fn data(&self) -> &[T] { &self.inner }

    /// Iterates over the sub-items.
    pub fn iter(&self) -> slice::Iter<'_, T> { self.inner.iter() }

    /// Builds a threshold of already-processed children.
    ///
    /// Post-order passes store one result per visited node; `child_indices`
    /// locates this node's children among them.
    pub fn map_from_post_order_iter<U: Clone>(
        &self,
        child_indices: &[usize],
        processed: &[U],
    ) -> Threshold<U, MAX> {
        debug_assert_eq!(self.inner.len(), child_indices.len());
        Threshold { k: self.k, inner: child_indices.iter().map(|&i| processed[i].clone()).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(Threshold::<u8, 0>::new(0, vec![1, 2]).is_err());
        assert!(Threshold::<u8, 0>::new(3, vec![1, 2]).is_err());
        assert!(Threshold::<u8, 0>::new(1, vec![]).is_err());
        let thresh = Threshold::<u8, 0>::new(2, vec![1, 2]).unwrap();
        assert_eq!((thresh.k(), thresh.n()), (2, 2));
        assert_eq!(thresh.data(), &[1, 2]);

        let err = Threshold::<u8, 3>::from_iter(1, 0..4).unwrap_err();
        assert_eq!((err.k(), err.n(), err.max()), (1, 4, Some(3)));
        assert!(err.to_string().contains("limit of 3"));
    }
}
