// SPDX-License-Identifier: CC0-1.0

//! Correctness/Soundness type properties

use super::ErrorKind;

/// Basic type representing where the fragment can go
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub enum Base {
    /// Takes its inputs from the top of the stack. Pushes nonzero if the
    /// condition is satisfied, otherwise 0 if it does not abort.
    B,
    /// Takes its inputs from the top of the stack and pushes a public key,
    /// regardless of satisfaction. Must be wrapped in `c:`.
    K,
    /// Takes its inputs from the top of the stack, which must satisfy the
    /// condition. Pushes nothing.
    V,
    /// Takes from the stack its inputs plus the element at the top, and
    /// pushes its result one below the top.
    W,
}

/// How many stack elements a fragment consumes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub enum Input {
    /// None, under any circumstances.
    Zero,
    /// Exactly one.
    One,
    /// Any number.
    Any,
    /// Exactly one, which is nonzero whenever the fragment is satisfied.
    OneNonZero,
    /// One or more; the top one is nonzero whenever the fragment is
    /// satisfied. Never applies to a `W`.
    AnyNonZero,
}

impl Input {
    fn is_one(self) -> bool { matches!(self, Input::One | Input::OneNonZero) }

    fn is_nonzero(self) -> bool { matches!(self, Input::OneNonZero | Input::AnyNonZero) }

    /// The input of `X Y` where both run on the same stack, `X` deepest.
    fn sequence(x: Self, y: Self) -> Self {
        match (x, y) {
            (Input::Zero, Input::Zero) => Input::Zero,
            (Input::Zero, Input::One) | (Input::One, Input::Zero) => Input::One,
            (Input::Zero, Input::OneNonZero) | (Input::OneNonZero, Input::Zero) => Input::OneNonZero,
            (Input::OneNonZero, _) | (Input::AnyNonZero, _) | (Input::Zero, Input::AnyNonZero) => {
                Input::AnyNonZero
            }
            _ => Input::Any,
        }
    }
}

/// Type properties relevant to completeness (every branch is reachable
/// given a valid witness) and soundness (nothing satisfies the Script
/// without satisfying a branch).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub struct Correctness {
    /// The base type
    pub base: Base,
    /// Properties of the inputs
    pub input: Input,
    /// Whether a dissatisfaction is guaranteed to exist. `false` does not
    /// mean there is none.
    pub dissatisfiable: bool,
    /// Whether a satisfied fragment always leaves exactly `1`.
    pub unit: bool,
}

impl Correctness {
    /// `1`
    pub const TRUE: Self =
        Correctness { base: Base::B, input: Input::Zero, dissatisfiable: false, unit: true };

    /// `0`
    pub const FALSE: Self =
        Correctness { base: Base::B, input: Input::Zero, dissatisfiable: true, unit: true };

    /// `pk_k`
    pub const fn pk_k() -> Self {
        Correctness { base: Base::K, input: Input::OneNonZero, dissatisfiable: true, unit: true }
    }

    /// `pk_h`
    pub const fn pk_h() -> Self {
        Correctness { base: Base::K, input: Input::AnyNonZero, dissatisfiable: true, unit: true }
    }

    /// `multi`
    pub const fn multi() -> Self {
        Correctness { base: Base::B, input: Input::AnyNonZero, dissatisfiable: true, unit: true }
    }

    /// `multi_a`
    pub const fn multi_a() -> Self {
        Correctness { base: Base::B, input: Input::Any, dissatisfiable: true, unit: true }
    }

    /// Any of the four hash fragments.
    pub const fn hash() -> Self {
        Correctness { base: Base::B, input: Input::OneNonZero, dissatisfiable: true, unit: true }
    }

    /// `after` or `older`.
    pub const fn time() -> Self {
        Correctness { base: Base::B, input: Input::Zero, dissatisfiable: false, unit: false }
    }

    fn require_base(self, expected: Base) -> Result<Self, ErrorKind> {
        if self.base == expected {
            Ok(self)
        } else {
            Err(ErrorKind::ChildBase1 { expected, found: self.base })
        }
    }

    /// `a:`
    pub fn cast_alt(self) -> Result<Self, ErrorKind> {
        self.require_base(Base::B)?;
        Ok(Correctness { base: Base::W, input: Input::Any, ..self })
    }

    /// `s:`
    pub fn cast_swap(self) -> Result<Self, ErrorKind> {
        self.require_base(Base::B)?;
        if !self.input.is_one() {
            return Err(ErrorKind::SwapNonOne);
        }
        Ok(Correctness { base: Base::W, input: Input::Any, ..self })
    }

    /// `c:`
    pub fn cast_check(self) -> Result<Self, ErrorKind> {
        self.require_base(Base::K)?;
        Ok(Correctness { base: Base::B, unit: true, ..self })
    }

    /// `d:`
    pub fn cast_dupif(self) -> Result<Self, ErrorKind> {
        self.require_base(Base::V)?;
        if self.input != Input::Zero {
            return Err(ErrorKind::NonZeroDupIf);
        }
        Ok(Correctness { base: Base::B, input: Input::OneNonZero, dissatisfiable: true, unit: true })
    }

    /// `v:`
    pub fn cast_verify(self) -> Result<Self, ErrorKind> {
        self.require_base(Base::B)?;
        Ok(Correctness { base: Base::V, dissatisfiable: false, unit: false, ..self })
    }

    /// `j:`
    pub fn cast_nonzero(self) -> Result<Self, ErrorKind> {
        if !self.input.is_nonzero() {
            return Err(ErrorKind::NonZeroZero);
        }
        self.require_base(Base::B)?;
        Ok(Correctness { dissatisfiable: true, ..self })
    }

    /// `n:`
    pub fn cast_zeronotequal(self) -> Result<Self, ErrorKind> {
        self.require_base(Base::B)?;
        Ok(Correctness { unit: true, ..self })
    }

    /// `and_b`
    pub fn and_b(left: Self, right: Self) -> Result<Self, ErrorKind> {
        match (left.base, right.base) {
            (Base::B, Base::W) => Ok(Correctness {
                base: Base::B,
                input: Input::sequence(left.input, right.input),
                dissatisfiable: left.dissatisfiable && right.dissatisfiable,
                unit: true,
            }),
            found => Err(ErrorKind::ChildBase2 { expected: &[(Base::B, Base::W)], found }),
        }
    }

    /// `and_v`
    pub fn and_v(left: Self, right: Self) -> Result<Self, ErrorKind> {
        let base = match (left.base, right.base) {
            (Base::V, Base::B) => Base::B,
            (Base::V, Base::K) => Base::K,
            (Base::V, Base::V) => Base::V,
            found => {
                return Err(ErrorKind::ChildBase2 {
                    expected: &[(Base::V, Base::B), (Base::V, Base::K), (Base::V, Base::V)],
                    found,
                })
            }
        };
        Ok(Correctness {
            base,
            input: Input::sequence(left.input, right.input),
            dissatisfiable: false,
            unit: right.unit,
        })
    }

    /// `or_b`
    pub fn or_b(left: Self, right: Self) -> Result<Self, ErrorKind> {
        if !left.dissatisfiable {
            return Err(ErrorKind::LeftNotDissatisfiable);
        }
        if !right.dissatisfiable {
            return Err(ErrorKind::RightNotDissatisfiable);
        }
        match (left.base, right.base) {
            (Base::B, Base::W) => Ok(Correctness {
                base: Base::B,
                input: match (left.input, right.input) {
                    (Input::Zero, Input::Zero) => Input::Zero,
                    (Input::Zero, y) if y.is_one() => Input::One,
                    (x, Input::Zero) if x.is_one() => Input::One,
                    _ => Input::Any,
                },
                dissatisfiable: true,
                unit: true,
            }),
            found => Err(ErrorKind::ChildBase2 { expected: &[(Base::B, Base::W)], found }),
        }
    }

    fn check_left_branch(left: Self) -> Result<(), ErrorKind> {
        if !left.dissatisfiable {
            return Err(ErrorKind::LeftNotDissatisfiable);
        }
        if !left.unit {
            return Err(ErrorKind::LeftNotUnit);
        }
        Ok(())
    }

    fn or_input(left: Input, right: Input) -> Input {
        match (left, right) {
            (Input::Zero, Input::Zero) => Input::Zero,
            (x, Input::Zero) if x.is_one() => Input::One,
            _ => Input::Any,
        }
    }

    /// `or_d`
    pub fn or_d(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Self::check_left_branch(left)?;
        match (left.base, right.base) {
            (Base::B, Base::B) => Ok(Correctness {
                base: Base::B,
                input: Self::or_input(left.input, right.input),
                dissatisfiable: right.dissatisfiable,
                unit: right.unit,
            }),
            found => Err(ErrorKind::ChildBase2 { expected: &[(Base::B, Base::B)], found }),
        }
    }

    /// `or_c`
    pub fn or_c(left: Self, right: Self) -> Result<Self, ErrorKind> {
        Self::check_left_branch(left)?;
        match (left.base, right.base) {
            (Base::B, Base::V) => Ok(Correctness {
                base: Base::V,
                input: Self::or_input(left.input, right.input),
                dissatisfiable: false,
                unit: false,
            }),
            found => Err(ErrorKind::ChildBase2 { expected: &[(Base::B, Base::V)], found }),
        }
    }

    /// `or_i`
    pub fn or_i(left: Self, right: Self) -> Result<Self, ErrorKind> {
        let base = match (left.base, right.base) {
            (Base::B, Base::B) => Base::B,
            (Base::V, Base::V) => Base::V,
            (Base::K, Base::K) => Base::K,
            found => {
                return Err(ErrorKind::ChildBase2 {
                    expected: &[(Base::B, Base::B), (Base::V, Base::V), (Base::K, Base::K)],
                    found,
                })
            }
        };
        Ok(Correctness {
            base,
            input: match (left.input, right.input) {
                (Input::Zero, Input::Zero) => Input::One,
                _ => Input::Any,
            },
            dissatisfiable: left.dissatisfiable || right.dissatisfiable,
            unit: left.unit && right.unit,
        })
    }

    /// `andor`
    pub fn and_or(a: Self, b: Self, c: Self) -> Result<Self, ErrorKind> {
        Self::check_left_branch(a)?;
        let base = match (a.base, b.base, c.base) {
            (Base::B, Base::B, Base::B) => Base::B,
            (Base::B, Base::K, Base::K) => Base::K,
            (Base::B, Base::V, Base::V) => Base::V,
            found => {
                return Err(ErrorKind::ChildBase3 {
                    expected: &[
                        (Base::B, Base::B, Base::B),
                        (Base::B, Base::K, Base::K),
                        (Base::B, Base::V, Base::V),
                    ],
                    found,
                })
            }
        };
        Ok(Correctness {
            base,
            input: match (a.input, b.input, c.input) {
                (Input::Zero, Input::Zero, Input::Zero) => Input::Zero,
                (Input::Zero, y, z) if y.is_one() && z.is_one() => Input::One,
                (x, Input::Zero, Input::Zero) if x.is_one() => Input::One,
                _ => Input::Any,
            },
            dissatisfiable: c.dissatisfiable,
            unit: b.unit && c.unit,
        })
    }

    /// `thresh`
    pub fn threshold<'a, I>(_k: usize, subs: I) -> Result<Self, ErrorKind>
    where
        I: Iterator<Item = &'a Self>,
    {
        let mut num_args = 0;
        for (index, sub) in subs.enumerate() {
            let expected = if index == 0 { Base::B } else { Base::W };
            if sub.base != expected {
                return Err(ErrorKind::ThresholdBase { index, expected, found: sub.base });
            }
            if !sub.unit {
                return Err(ErrorKind::ThresholdNonUnit(index));
            }
            if !sub.dissatisfiable {
                return Err(ErrorKind::ThresholdDissat(index));
            }
            num_args += match sub.input {
                Input::Zero => 0,
                Input::One | Input::OneNonZero => 1,
                Input::Any | Input::AnyNonZero => 2,
            };
        }

        Ok(Correctness {
            base: Base::B,
            input: match num_args {
                0 => Input::Zero,
                1 => Input::One,
                _ => Input::Any,
            },
            dissatisfiable: true,
            unit: true,
        })
    }
}
