// SPDX-License-Identifier: CC0-1.0

//! Miniscript Analysis
//!
//! Tools for determining whether the guarantees offered by the library
//! actually hold.

use core::fmt;
#[cfg(feature = "std")]
use std::error;

use std::collections::BTreeSet;

use crate::iter::TreeLike;
use crate::{Miniscript, MiniscriptKey, ScriptContext};

/// Which of the sanity rules [`Miniscript::ext_check`] should relax.
///
/// By default every rule is enforced, so a tree passes only if
/// 1. It is safe (every spend path requires a digital signature)
/// 2. It has no unspendable path because of either
///     a. Resource limitations
///     b. Timelock Mixing
/// 3. It is non-malleable, so the satisfaction weight guarantees hold.
/// 4. It has no repeated public keys
///
/// Each field set to `true` allows the corresponding violation.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash)]
pub struct ExtParams {
    /// Allow non-safe miniscripts
    pub top_unsafe: bool,
    /// Allow miniscripts with unspendable paths
    pub resource_limitations: bool,
    /// Allow miniscripts with timelock mixing
    pub timelock_mixing: bool,
    /// Allow malleable miniscripts
    pub malleability: bool,
    /// Allow miniscripts with repeated public keys
    pub repeated_pk: bool,
}

impl ExtParams {
    /// Create a new ExtParams that with all the sanity rules
    pub fn new() -> ExtParams {
        ExtParams {
            top_unsafe: false,
            resource_limitations: false,
            timelock_mixing: false,
            malleability: false,
            repeated_pk: false,
        }
    }

    /// Create a new ExtParams that enforces all the sanity rules
    pub fn sane() -> ExtParams { ExtParams::new() }

    /// Create a new ExtParams that relaxes every sanity rule.
    /// Refer to the [`ExtParams`] documentation for more details on "insane" miniscripts.
    pub fn allow_all() -> ExtParams {
        ExtParams {
            top_unsafe: true,
            resource_limitations: true,
            timelock_mixing: true,
            malleability: true,
            repeated_pk: true,
        }
    }

    /// Builder that allows non-safe miniscripts.
    pub fn top_unsafe(mut self) -> ExtParams {
        self.top_unsafe = true;
        self
    }

    /// Builder that allows miniscripts with exceed resource limitations.
    pub fn exceed_resource_limitations(mut self) -> ExtParams {
        self.resource_limitations = true;
        self
    }

    /// Builder that allows miniscripts with timelock mixing.
    pub fn timelock_mixing(mut self) -> ExtParams {
        self.timelock_mixing = true;
        self
    }

    /// Builder that allows malleable miniscripts.
    pub fn malleability(mut self) -> ExtParams {
        self.malleability = true;
        self
    }

    /// Builder that allows miniscripts with repeated public keys.
    pub fn repeated_pk(mut self) -> ExtParams {
        self.repeated_pk = true;
        self
    }
}

/// Possible reasons Miniscript guarantees can fail
/// We currently mark Miniscript as Non-Analyzable if
/// 1. It is unsafe(does not require a digital signature to spend it)
/// 2. It contains a unspendable path because of either
///     a. Resource limitations
///     b. Timelock Mixing
/// 3. The script is malleable and thereby some of satisfaction weight
///    guarantees are not satisfied.
/// 4. It has repeated publickeys
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    /// Top level is not safe.
    SiglessBranch,
    /// Repeated Pubkeys
    RepeatedPubkeys,
    /// Miniscript contains at least one path that exceeds resource limits
    BranchExceedResouceLimits,
    /// Contains a combination of heightlock and timelock
    HeightTimelockCombination,
    /// Malleable script
    Malleable,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AnalysisError::SiglessBranch => {
                f.write_str("All spend paths must require a signature")
            }
            AnalysisError::RepeatedPubkeys => {
                f.write_str("Miniscript contains repeated pubkeys or pubkeyhashes")
            }
            AnalysisError::BranchExceedResouceLimits => {
                f.write_str("At least one spend path exceeds the resource limits(stack depth/satisfaction size..)")
            }
            AnalysisError::HeightTimelockCombination => {
                f.write_str("Contains a combination of heightlock and timelock")
            }
            AnalysisError::Malleable => f.write_str("Miniscript is malleable"),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for AnalysisError {
    fn cause(&self) -> Option<&dyn error::Error> {
        use self::AnalysisError::*;

        match self {
            SiglessBranch
            | RepeatedPubkeys
            | BranchExceedResouceLimits
            | HeightTimelockCombination
            | Malleable => None,
        }
    }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> Miniscript<Pk, Ctx> {
    /// Whether all spend paths of miniscript require a signature
    pub fn requires_sig(&self) -> bool { self.ty.mall.safe }

    /// Whether the miniscript is non-malleable, including under the relay
    /// policy of its context
    pub fn is_non_malleable(&self) -> bool {
        self.ty.mall.non_malleable
            && self
                .pre_order_iter()
                .all(|ms| Ctx::check_terminal_non_malleable(ms.node()).is_ok())
    }

    /// Whether every worst-case metric fits the ceilings of the context.
    /// [`Miniscript::compile`] reports which one does not.
    pub fn within_resource_limits(&self) -> bool { self.metrics().check::<Ctx>().is_ok() }

    /// Whether some spending path needs both a height and a time lock of
    /// one opcode.
    pub fn has_mixed_timelocks(&self) -> bool { self.ext.timelock_info.contains_unspendable_path() }

    /// Whether a key appears more than once, in any key fragment.
    pub fn has_repeated_keys(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.iter_pk().any(|pk| !seen.insert(pk))
    }

    /// Check whether the underlying Miniscript is safe under the current context.
    /// For an insane tree the satisfier may not find a satisfaction even if
    /// one exists, and its size bounds may not hold.
    ///
    /// For most cases, users should be dealing with safe scripts.
    /// Use this function to check whether the guarantees of library hold.
    pub fn sanity_check(&self) -> Result<(), AnalysisError> { self.ext_check(&ExtParams::sane()) }

    /// Check whether the miniscript follows the given Extra policy [`ExtParams`]
    pub fn ext_check(&self, ext: &ExtParams) -> Result<(), AnalysisError> {
        let ret = if !ext.top_unsafe && !self.requires_sig() {
            Err(AnalysisError::SiglessBranch)
        } else if !ext.malleability && !self.is_non_malleable() {
            Err(AnalysisError::Malleable)
        } else if !ext.resource_limitations && !self.within_resource_limits() {
            Err(AnalysisError::BranchExceedResouceLimits)
        } else if !ext.repeated_pk && self.has_repeated_keys() {
            Err(AnalysisError::RepeatedPubkeys)
        } else if !ext.timelock_mixing && self.has_mixed_timelocks() {
            Err(AnalysisError::HeightTimelockCombination)
        } else {
            Ok(())
        };
        if let Err(ref e) = ret {
            log::debug!("analysis of {} failed: {}", self, e);
        }
        ret
    }
}
