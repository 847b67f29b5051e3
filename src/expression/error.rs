// SPDX-License-Identifier: CC0-1.0

//! Expression-related errors

use core::fmt;

use crate::{AbsLockTimeError, RelLockTimeError, ScriptContextError, ThresholdError};

/// A structural error building an expression tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprError {
    /// Expression tree had depth exceeding our hard cap.
    MaxRecursionDepthExceeded {
        /// The height the tree would have had.
        actual: u32,
        /// The maximum height.
        maximum: u32,
    },
    /// `thresh`, `multi` or `multi_a` had an invalid `k` or `n`.
    Threshold(ThresholdError),
    /// Invalid argument to `after`.
    AbsLockTime(AbsLockTimeError),
    /// Invalid argument to `older`.
    RelLockTime(RelLockTimeError),
    /// A key or fragment is not allowed in the script context.
    Context(ScriptContextError),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExprError::MaxRecursionDepthExceeded { actual, maximum } => {
                write!(f, "maximum recursion depth exceeded (max {}, got {})", maximum, actual)
            }
            ExprError::Threshold(e) => e.fmt(f),
            ExprError::AbsLockTime(e) => e.fmt(f),
            ExprError::RelLockTime(e) => e.fmt(f),
            ExprError::Context(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExprError::MaxRecursionDepthExceeded { .. } => None,
            ExprError::Threshold(e) => Some(e),
            ExprError::AbsLockTime(e) => Some(e),
            ExprError::RelLockTime(e) => Some(e),
            ExprError::Context(e) => Some(e),
        }
    }
}

#[doc(hidden)]
impl From<ThresholdError> for ExprError {
    fn from(e: ThresholdError) -> Self { ExprError::Threshold(e) }
}

#[doc(hidden)]
impl From<AbsLockTimeError> for ExprError {
    fn from(e: AbsLockTimeError) -> Self { ExprError::AbsLockTime(e) }
}

#[doc(hidden)]
impl From<RelLockTimeError> for ExprError {
    fn from(e: RelLockTimeError) -> Self { ExprError::RelLockTime(e) }
}

#[doc(hidden)]
impl From<ScriptContextError> for ExprError {
    fn from(e: ScriptContextError) -> Self { ExprError::Context(e) }
}
