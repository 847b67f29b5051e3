// SPDX-License-Identifier: CC0-1.0

//! Malleability-related Type properties

/// Whether the fragment has a dissatisfaction, and if so, whether it is
/// unique. Third parties are assumed able to produce any dissatisfaction.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub enum Dissat {
    /// No dissatisfaction; non-satisfying input aborts.
    None,
    /// Exactly one dissatisfaction, always available, leaving 0.
    /// Together with `Input::Zero` this means the fragment is unsatisfiable.
    Unique,
    /// Nothing can be assumed.
    Unknown,
}

impl Dissat {
    /// `Unique` if the wrapped fragment had none, otherwise `Unknown`.
    /// Used by wrappers which add a fresh `0` path.
    fn added_zero_path(self) -> Self {
        if self == Dissat::None {
            Dissat::Unique
        } else {
            Dissat::Unknown
        }
    }
}

/// Type properties relevant to malleability analysis
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub struct Malleability {
    /// Properties of dissatisfying inputs
    pub dissat: Dissat,
    /// Whether every satisfaction needs a signature, so that nobody who has
    /// not seen one can produce it. Hashes and timelocks are not safe.
    pub safe: bool,
    /// Whether a non-malleable satisfaction is guaranteed to exist.
    pub non_malleable: bool,
}

impl Malleability {
    /// `1`
    pub const TRUE: Self = Malleability { dissat: Dissat::None, safe: false, non_malleable: true };

    /// `0`
    pub const FALSE: Self =
        Malleability { dissat: Dissat::Unique, safe: true, non_malleable: true };

    /// Signature-checking leaves: `pk_k`, `pk_h`, `multi` and `multi_a`.
    pub const fn key() -> Self {
        Malleability { dissat: Dissat::Unique, safe: true, non_malleable: true }
    }

    /// Any of the hash fragments.
    pub const fn hash() -> Self {
        Malleability { dissat: Dissat::Unknown, safe: false, non_malleable: true }
    }

    /// `after` or `older`.
    pub const fn time() -> Self {
        Malleability { dissat: Dissat::None, safe: false, non_malleable: true }
    }

    /// `a:`, `s:`, `c:` and `n:` leave malleability unchanged.
    pub const fn cast_transparent(self) -> Self { self }

    /// `d:`
    pub fn cast_dupif(self) -> Self { Malleability { dissat: self.dissat.added_zero_path(), ..self } }

    /// `v:`
    pub fn cast_verify(self) -> Self { Malleability { dissat: Dissat::None, ..self } }

    /// `j:`
    pub fn cast_nonzero(self) -> Self { Malleability { dissat: self.dissat.added_zero_path(), ..self } }

    /// `and_b`
    pub fn and_b(left: Self, right: Self) -> Self {
        Malleability {
            dissat: match (left.dissat, right.dissat) {
                (Dissat::None, Dissat::None) => Dissat::None,
                (Dissat::None, _) if left.safe => Dissat::None,
                (_, Dissat::None) if right.safe => Dissat::None,
                (Dissat::Unique, Dissat::Unique) if left.safe && right.safe => Dissat::Unique,
                _ => Dissat::Unknown,
            },
            safe: left.safe || right.safe,
            non_malleable: left.non_malleable && right.non_malleable,
        }
    }

    /// `and_v`
    pub fn and_v(left: Self, right: Self) -> Self {
        Malleability {
            dissat: if right.dissat == Dissat::None || left.safe {
                Dissat::None
            } else {
                Dissat::Unknown
            },
            safe: left.safe || right.safe,
            non_malleable: left.non_malleable && right.non_malleable,
        }
    }

    /// `or_b`
    pub fn or_b(left: Self, right: Self) -> Self {
        Malleability {
            dissat: Dissat::Unique,
            safe: left.safe && right.safe,
            non_malleable: left.non_malleable
                && left.dissat == Dissat::Unique
                && right.non_malleable
                && right.dissat == Dissat::Unique
                && (left.safe || right.safe),
        }
    }

    /// `or_d`
    pub fn or_d(left: Self, right: Self) -> Self {
        Malleability {
            dissat: right.dissat,
            safe: left.safe && right.safe,
            non_malleable: left.non_malleable
                && left.dissat == Dissat::Unique
                && right.non_malleable
                && (left.safe || right.safe),
        }
    }

    /// `or_c`
    pub fn or_c(left: Self, right: Self) -> Self {
        Malleability { dissat: Dissat::None, ..Self::or_d(left, right) }
    }

    /// `or_i`
    pub fn or_i(left: Self, right: Self) -> Self {
        Malleability {
            dissat: match (left.dissat, right.dissat) {
                (Dissat::None, Dissat::None) => Dissat::None,
                (Dissat::Unique, Dissat::None) | (Dissat::None, Dissat::Unique) => Dissat::Unique,
                _ => Dissat::Unknown,
            },
            safe: left.safe && right.safe,
            non_malleable: left.non_malleable && right.non_malleable && (left.safe || right.safe),
        }
    }

    /// `andor`
    pub fn and_or(a: Self, b: Self, c: Self) -> Self {
        Malleability {
            dissat: match (a.safe, b.dissat, c.dissat) {
                (_, Dissat::None, Dissat::Unique) | (true, _, Dissat::Unique) => Dissat::Unique,
                (_, Dissat::None, Dissat::None) | (true, _, Dissat::None) => Dissat::None,
                _ => Dissat::Unknown,
            },
            safe: (a.safe || b.safe) && c.safe,
            non_malleable: a.non_malleable
                && c.non_malleable
                && a.dissat == Dissat::Unique
                && b.non_malleable
                && (a.safe || b.safe || c.safe),
        }
    }

    /// `thresh`
    pub fn threshold<'a, I>(k: usize, subs: I) -> Self
    where
        I: ExactSizeIterator<Item = &'a Self>,
    {
        let n = subs.len();
        let mut safe_count = 0;
        let mut all_unique = true;
        let mut all_non_malleable = true;
        for sub in subs {
            safe_count += usize::from(sub.safe);
            all_unique &= sub.dissat == Dissat::Unique;
            all_non_malleable &= sub.non_malleable;
        }

        Malleability {
            dissat: if all_unique && safe_count == n { Dissat::Unique } else { Dissat::Unknown },
            safe: safe_count > n - k,
            non_malleable: all_non_malleable && safe_count >= n - k && all_unique,
        }
    }
}
