// SPDX-License-Identifier: CC0-1.0

//! Miniscript Types
//!
//! Correctness and malleability properties of each fragment, inferred
//! from its children, together with the resource estimates in
//! [`ExtData`].

pub mod correctness;
pub mod extra_props;
pub mod malleability;

use core::fmt;
#[cfg(feature = "std")]
use std::error;

pub use self::correctness::{Base, Correctness, Input};
pub use self::extra_props::{ExtData, LockPaths, SatData, TimelockInfo};
pub use self::malleability::{Dissat, Malleability};
use crate::miniscript::terminal::Terminal;
use crate::miniscript::Node;
use crate::{MiniscriptKey, ScriptContext};

/// Detailed type of a typechecker error
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ErrorKind {
    /// `d:` was applied to a fragment which consumes stack input.
    NonZeroDupIf,
    /// Disjunctions other than `or_i`, and `andor`, need a dissatisfiable
    /// left child.
    LeftNotDissatisfiable,
    /// `or_b` needs a dissatisfiable right child.
    RightNotDissatisfiable,
    /// `s:` was applied to a fragment which does not take exactly one input.
    SwapNonOne,
    /// `j:` was applied to a fragment which might be satisfied by an empty
    /// input.
    NonZeroZero,
    /// `or_c`, `or_d` and `andor` need a unit left child.
    LeftNotUnit,
    /// A wrapper's child had the wrong base type.
    ChildBase1 {
        /// The base type the wrapper accepts.
        expected: Base,
        /// The base type of the child.
        found: Base,
    },
    /// A binary fragment's children had an unsupported combination of base
    /// types.
    ChildBase2 {
        /// The accepted combinations.
        expected: &'static [(Base, Base)],
        /// The children's base types.
        found: (Base, Base),
    },
    /// An `andor`'s children had an unsupported combination of base types.
    ChildBase3 {
        /// The accepted combinations.
        expected: &'static [(Base, Base, Base)],
        /// The children's base types.
        found: (Base, Base, Base),
    },
    /// A `thresh` child had the wrong base type: the first must be `B`, the
    /// rest `W`.
    ThresholdBase {
        /// Position of the child.
        index: usize,
        /// The base type required at that position.
        expected: Base,
        /// The base type of the child.
        found: Base,
    },
    /// The nth child of a threshold fragment was not dissatisfiable.
    ThresholdDissat(usize),
    /// The nth child of a threshold fragment was not a unit.
    ThresholdNonUnit(usize),
}

/// Error type for typechecking
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Error {
    /// The kind of the fragment which failed, e.g. `and_v`.
    pub fragment_name: &'static str,
    /// The fragment that failed typecheck, in Miniscript notation.
    pub fragment_string: String,
    /// The reason that typechecking failed
    pub error: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error {
            ErrorKind::NonZeroDupIf => write!(
                f,
                "fragment «{}» applies `d:` to a fragment which consumes stack input",
                self.fragment_string,
            ),
            ErrorKind::LeftNotDissatisfiable => write!(
                f,
                "fragment «{}» requires its left child be dissatisfiable",
                self.fragment_string,
            ),
            ErrorKind::RightNotDissatisfiable => write!(
                f,
                "fragment «{}» requires its right child be dissatisfiable",
                self.fragment_string,
            ),
            ErrorKind::SwapNonOne => write!(
                f,
                "fragment «{}» attempts to use `SWAP` to prefix something \
                 which does not take exactly one input",
                self.fragment_string,
            ),
            ErrorKind::NonZeroZero => write!(
                f,
                "fragment «{}» attempts to use the `j:` wrapper around a \
                 fragment which might be satisfied by an input of size zero",
                self.fragment_string,
            ),
            ErrorKind::LeftNotUnit => write!(
                f,
                "fragment «{}» requires its left child be a unit (outputs \
                 exactly 1 given a satisfying input)",
                self.fragment_string,
            ),
            ErrorKind::ChildBase1 { expected, found } => write!(
                f,
                "fragment «{}» ({}) expects a child of type {:?} but found {:?}",
                self.fragment_string, self.fragment_name, expected, found,
            ),
            ErrorKind::ChildBase2 { expected, found } => write!(
                f,
                "fragment «{}» ({}) cannot accept children of types {:?} and {:?}; expected one of {:?}",
                self.fragment_string, self.fragment_name, found.0, found.1, expected,
            ),
            ErrorKind::ChildBase3 { expected, found } => write!(
                f,
                "fragment «{}» cannot accept children of types {:?}, {:?} and {:?}; expected one of {:?}",
                self.fragment_string, found.0, found.1, found.2, expected,
            ),
            ErrorKind::ThresholdBase { index, expected, found } => write!(
                f,
                "fragment «{}» sub-fragment {} has type {:?} rather than {:?}",
                self.fragment_string, index, found, expected,
            ),
            ErrorKind::ThresholdDissat(idx) => write!(
                f,
                "fragment «{}» sub-fragment {} can not be dissatisfied \
                 and cannot be used in a threshold",
                self.fragment_string, idx,
            ),
            ErrorKind::ThresholdNonUnit(idx) => write!(
                f,
                "fragment «{}» sub-fragment {} is not a unit (does not put \
                 exactly 1 on the stack given a satisfying input)",
                self.fragment_string, idx,
            ),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> { None }
}

/// Structure representing the type of a Miniscript fragment, including all
/// properties relevant to the main codebase
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub struct Type {
    /// Correctness/soundness properties
    pub corr: Correctness,
    /// Malleability properties
    pub mall: Malleability,
}

impl Type {
    /// Type of the `1` fragment.
    pub const TRUE: Self = Type { corr: Correctness::TRUE, mall: Malleability::TRUE };

    /// Type of the `0` fragment.
    pub const FALSE: Self = Type { corr: Correctness::FALSE, mall: Malleability::FALSE };

    /// `a:`
    pub fn cast_alt(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_alt()?, mall: self.mall.cast_transparent() })
    }

    /// `s:`
    pub fn cast_swap(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_swap()?, mall: self.mall.cast_transparent() })
    }

    /// `c:`
    pub fn cast_check(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_check()?, mall: self.mall.cast_transparent() })
    }

    /// `d:`
    pub fn cast_dupif(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_dupif()?, mall: self.mall.cast_dupif() })
    }

    /// `v:`
    pub fn cast_verify(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_verify()?, mall: self.mall.cast_verify() })
    }

    /// `j:`
    pub fn cast_nonzero(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_nonzero()?, mall: self.mall.cast_nonzero() })
    }

    /// `n:`
    pub fn cast_zeronotequal(self) -> Result<Self, ErrorKind> {
        Ok(Type { corr: self.corr.cast_zeronotequal()?, mall: self.mall.cast_transparent() })
    }

    /// `and_b`
    pub fn and_b(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::and_b(left.corr, right.corr)?,
            mall: Malleability::and_b(left.mall, right.mall),
        })
    }

    /// `and_v`
    pub fn and_v(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::and_v(left.corr, right.corr)?,
            mall: Malleability::and_v(left.mall, right.mall),
        })
    }

    /// `or_b`
    pub fn or_b(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::or_b(left.corr, right.corr)?,
            mall: Malleability::or_b(left.mall, right.mall),
        })
    }

    /// `or_d`
    pub fn or_d(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::or_d(left.corr, right.corr)?,
            mall: Malleability::or_d(left.mall, right.mall),
        })
    }

    /// `or_c`
    pub fn or_c(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::or_c(left.corr, right.corr)?,
            mall: Malleability::or_c(left.mall, right.mall),
        })
    }

    /// `or_i`
    pub fn or_i(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::or_i(left.corr, right.corr)?,
            mall: Malleability::or_i(left.mall, right.mall),
        })
    }

    /// `andor`
    pub fn and_or(a: Self, b: Self, c: Self) -> Result<Self, ErrorKind> {
        Ok(Type {
            corr: Correctness::and_or(a.corr, b.corr, c.corr)?,
            mall: Malleability::and_or(a.mall, b.mall, c.mall),
        })
    }

    /// `thresh`
    pub fn threshold<I>(k: usize, subs: I) -> Result<Self, ErrorKind>
    where
        I: ExactSizeIterator<Item = Self> + Clone,
    {
        Ok(Type {
            corr: Correctness::threshold(k, subs.clone().map(|s| s.corr).collect::<Vec<_>>().iter())?,
            mall: Malleability::threshold(k, subs.map(|s| s.mall).collect::<Vec<_>>().iter()),
        })
    }

    /// Whether the fragment is a valid top-level Miniscript: base `B`.
    pub fn is_toplevel(&self) -> bool { self.corr.base == Base::B }

    /// Computes the type of `fragment` from the cached types of its children.
    pub fn type_check<Pk, Ctx>(fragment: &Node<Pk, Ctx>) -> Result<Self, Error>
    where
        Pk: MiniscriptKey,
        Ctx: ScriptContext,
    {
        let wrap_err = |result: Result<Self, ErrorKind>| {
            result.map_err(|error| Error {
                fragment_name: fragment.fragment_name(),
                fragment_string: fragment.to_string(),
                error,
            })
        };

        let ret = match *fragment {
            Terminal::True => Ok(Self::TRUE),
            Terminal::False => Ok(Self::FALSE),
            Terminal::PkK(..) => Ok(Type { corr: Correctness::pk_k(), mall: Malleability::key() }),
            Terminal::PkH(..) => Ok(Type { corr: Correctness::pk_h(), mall: Malleability::key() }),
            Terminal::Multi(..) => Ok(Type { corr: Correctness::multi(), mall: Malleability::key() }),
            Terminal::MultiA(..) => {
                Ok(Type { corr: Correctness::multi_a(), mall: Malleability::key() })
            }
            Terminal::After(..) | Terminal::Older(..) => {
                Ok(Type { corr: Correctness::time(), mall: Malleability::time() })
            }
            Terminal::Sha256(..)
            | Terminal::Hash256(..)
            | Terminal::Ripemd160(..)
            | Terminal::Hash160(..) => Ok(Type { corr: Correctness::hash(), mall: Malleability::hash() }),
            Terminal::Alt(ref sub) => sub.ty.cast_alt(),
            Terminal::Swap(ref sub) => sub.ty.cast_swap(),
            Terminal::Check(ref sub) => sub.ty.cast_check(),
            Terminal::DupIf(ref sub) => sub.ty.cast_dupif(),
            Terminal::Verify(ref sub) => sub.ty.cast_verify(),
            Terminal::NonZero(ref sub) => sub.ty.cast_nonzero(),
            Terminal::ZeroNotEqual(ref sub) => sub.ty.cast_zeronotequal(),
            Terminal::AndB(ref l, ref r) => Self::and_b(l.ty, r.ty),
            Terminal::AndV(ref l, ref r) => Self::and_v(l.ty, r.ty),
            Terminal::OrB(ref l, ref r) => Self::or_b(l.ty, r.ty),
            Terminal::OrD(ref l, ref r) => Self::or_d(l.ty, r.ty),
            Terminal::OrC(ref l, ref r) => Self::or_c(l.ty, r.ty),
            Terminal::OrI(ref l, ref r) => Self::or_i(l.ty, r.ty),
            Terminal::AndOr(ref a, ref b, ref c) => Self::and_or(a.ty, b.ty, c.ty),
            Terminal::Thresh(ref thresh) => Self::threshold(thresh.k(), thresh.iter().map(|s| s.ty)),
        };
        wrap_err(ret)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self.corr.base {
            Base::B => "B",
            Base::K => "K",
            Base::V => "V",
            Base::W => "W",
        })?;
        f.write_str("/")?;
        let flags = [
            ('z', self.corr.input == Input::Zero),
            ('o', matches!(self.corr.input, Input::One | Input::OneNonZero)),
            ('n', matches!(self.corr.input, Input::OneNonZero | Input::AnyNonZero)),
            ('d', self.corr.dissatisfiable),
            ('u', self.corr.unit),
            ('e', self.mall.dissat == Dissat::Unique),
            ('f', self.mall.dissat == Dissat::None),
            ('s', self.mall.safe),
            ('m', self.mall.non_malleable),
        ];
        for (flag, set) in flags {
            if set {
                write!(f, "{}", flag)?;
            }
        }
        Ok(())
    }
}
