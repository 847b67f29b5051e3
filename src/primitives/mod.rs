// SPDX-License-Identifier: CC0-1.0

//! Primitive Types
//!
//! Values which appear inside Miniscript leaves and carry stronger
//! constraints than their Bitcoin counterparts: lock-times must be nonzero
//! and in range, and thresholds must satisfy `1 <= k <= n`.
//!
//! Everything defined here is re-exported at the crate root.

pub mod absolute_locktime;
pub mod relative_locktime;
pub mod threshold;
