// SPDX-License-Identifier: CC0-1.0

//! Script Compilation
//!
//! Lowers a typed Miniscript to Script and checks the result against the
//! resource ceilings of its [`ScriptContext`].

use core::fmt;
#[cfg(feature = "std")]
use std::error;

use bitcoin::ScriptBuf;

use crate::{Miniscript, MiniscriptKey, ScriptContext, ToPublicKey};

/// A resource bounded by a script context.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub enum Limit {
    /// Encoded script bytes.
    ScriptSize,
    /// Non-push opcodes, counting those executed by `CHECKMULTISIG`.
    OpCount,
    /// Initial witness stack elements.
    WitnessElements,
    /// Bytes of a scriptSig carrying the satisfaction.
    ScriptSigSize,
    /// Stack plus altstack elements during execution.
    ExecStack,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Limit::ScriptSize => "script size",
            Limit::OpCount => "opcode count",
            Limit::WitnessElements => "witness element count",
            Limit::ScriptSigSize => "scriptSig size",
            Limit::ExecStack => "execution stack size",
        })
    }
}

/// A compiled script exceeded a ceiling of its context.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SizeLimitError {
    /// Which resource was exceeded.
    pub limit: Limit,
    /// The worst case of the script.
    pub measured: usize,
    /// The most the context allows.
    pub ceiling: usize,
}

impl fmt::Display for SizeLimitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} of {} exceeds the limit of {}", self.limit, self.measured, self.ceiling)
    }
}

#[cfg(feature = "std")]
impl error::Error for SizeLimitError {
    fn cause(&self) -> Option<&dyn error::Error> { None }
}

/// Worst-case resource usage of a script, as checked by [`Miniscript::compile`].
///
/// The witness figures are `None` when the script cannot be satisfied.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(crate = "actual_serde"))]
pub struct ScriptMetrics {
    /// Encoded script bytes.
    pub script_size: usize,
    /// Non-push opcodes, plus the keys of every executed `CHECKMULTISIG`.
    pub op_count: usize,
    /// Witness elements of the largest satisfaction.
    pub max_witness_elements: Option<usize>,
    /// Witness bytes of the largest satisfaction, length prefixes included.
    pub max_witness_size: Option<usize>,
    /// scriptSig bytes of the largest satisfaction.
    pub max_script_sig_size: Option<usize>,
    /// Peak stack plus altstack elements, the initial witness included.
    pub max_exec_stack: Option<usize>,
}

impl ScriptMetrics {
    /// Compares every metric with the ceilings of `Ctx`, in the order of
    /// [`Limit`]'s variants. The first violation is returned.
    pub fn check<Ctx: ScriptContext>(&self) -> Result<(), SizeLimitError> {
        let checks = [
            (Limit::ScriptSize, Some(self.script_size), Some(Ctx::max_script_size())),
            (Limit::OpCount, Some(self.op_count), Ctx::max_ops()),
            (Limit::WitnessElements, self.max_witness_elements, Ctx::max_witness_elements()),
            (Limit::ScriptSigSize, self.max_script_sig_size, Ctx::max_script_sig_size()),
            (Limit::ExecStack, self.max_exec_stack, Some(Ctx::max_exec_stack())),
        ];
        for (limit, measured, ceiling) in checks {
            if let (Some(measured), Some(ceiling)) = (measured, ceiling) {
                if measured > ceiling {
                    return Err(SizeLimitError { limit, measured, ceiling });
                }
            }
        }
        Ok(())
    }
}

/// A script together with its resource usage.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Compiled {
    /// The encoded script.
    pub script: ScriptBuf,
    /// Its worst-case resource usage.
    pub metrics: ScriptMetrics,
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> Miniscript<Pk, Ctx> {
    /// Worst-case resource usage, computed from the cached properties
    /// without encoding.
    pub fn metrics(&self) -> ScriptMetrics {
        let sat = self.ext.sat_data;
        ScriptMetrics {
            script_size: self.ext.pk_cost,
            op_count: self.ext.static_ops + sat.map_or(0, |s| s.max_exec_op_count),
            max_witness_elements: sat.map(|s| s.max_witness_stack_count),
            max_witness_size: sat.map(|s| s.max_witness_stack_size),
            max_script_sig_size: sat.map(|s| s.max_script_sig_size),
            max_exec_stack: sat.map(|s| s.max_exec_stack_count + s.max_witness_stack_count),
        }
    }
}

impl<Pk: MiniscriptKey + ToPublicKey, Ctx: ScriptContext> Miniscript<Pk, Ctx> {
    /// Encodes the script and checks it against the limits of `Ctx`.
    ///
    /// The output depends only on the tree, so repeated calls return
    /// identical bytes.
    pub fn compile(&self) -> Result<Compiled, SizeLimitError> {
        let script = self.encode();
        let metrics = ScriptMetrics { script_size: script.len(), ..self.metrics() };
        if let Err(e) = metrics.check::<Ctx>() {
            log::warn!("{} does not fit under {}: {}", self, Ctx::name_str(), e);
            return Err(e);
        }
        log::debug!(
            "compiled {} under {}: {} bytes, {} ops",
            self.node().fragment_name(),
            Ctx::name_str(),
            metrics.script_size,
            metrics.op_count,
        );
        Ok(Compiled { script, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pubkeys, StrExpr};
    use crate::{BareCtx, Expr, Legacy, Segwitv0, Tap};

    #[test]
    fn metrics_of_pk() {
        let ms = Expr::<_, Segwitv0>::pk(pubkeys().0).unwrap().validate().unwrap();
        let compiled = ms.compile().unwrap();
        assert_eq!(
            compiled.metrics,
            ScriptMetrics {
                script_size: 35,
                op_count: 1,
                max_witness_elements: Some(1),
                max_witness_size: Some(73),
                max_script_sig_size: Some(73),
                max_exec_stack: Some(2),
            }
        );
        assert_eq!(compiled.metrics, ms.metrics());
    }

    #[test]
    fn deterministic() {
        let build = || {
            Expr::<_, Segwitv0>::or_d(
                Expr::pk(pubkeys().0).unwrap(),
                Expr::and_v(
                    Expr::verify(Expr::multi(1, vec![pubkeys().0]).unwrap()).unwrap(),
                    Expr::older(1000).unwrap(),
                )
                .unwrap(),
            )
            .unwrap()
            .validate()
            .unwrap()
        };
        let first = build().compile().unwrap();
        let again = build().compile().unwrap();
        assert_eq!(first, again);
        assert_eq!(first.script, build().encode());
    }

    #[test]
    fn multisig_ops() {
        let keys = vec![pubkeys().0; 20];
        let ms = Expr::<_, Segwitv0>::multi(1, keys).unwrap().validate().unwrap();
        assert_eq!(ms.metrics().op_count, 1 + 20);
        assert!(ms.compile().is_ok());
    }

    #[test]
    fn op_count_limit() {
        // 11 multisigs of 20 keys execute 231 opcodes, in a script small
        // enough for a bare output.
        let key = pubkeys().0;
        let multi = || Expr::<_, BareCtx>::multi(1, vec![key; 20]).unwrap();
        let mut expr = multi();
        for _ in 0..10 {
            expr = Expr::and_v(Expr::verify(multi()).unwrap(), expr).unwrap();
        }
        let ms = expr.validate().unwrap();
        assert_eq!(
            ms.compile(),
            Err(SizeLimitError { limit: Limit::OpCount, measured: 231, ceiling: 201 })
        );
    }

    #[test]
    fn witness_element_limit() {
        let mut expr = StrExpr::pk("K".to_owned()).unwrap();
        for _ in 0..100 {
            expr = StrExpr::and_v(StrExpr::verify(StrExpr::pk("K".to_owned()).unwrap()).unwrap(), expr)
                .unwrap();
        }
        let metrics = expr.validate().unwrap().metrics();
        assert_eq!(
            metrics.check::<Segwitv0>(),
            Err(SizeLimitError { limit: Limit::WitnessElements, measured: 101, ceiling: 100 })
        );
        // Tapscript has no element or opcode limit, but 101 keys cost less
        // than a block.
        assert_eq!(metrics.check::<Tap>(), Ok(()));
    }

    #[test]
    fn script_sig_limit() {
        // Legacy carries the satisfaction in the scriptSig.
        let mut expr = Expr::<String, Legacy>::older(1).unwrap();
        for _ in 0..51 {
            expr = Expr::and_v(Expr::verify(Expr::sha256("H".to_owned())).unwrap(), expr).unwrap();
        }
        let metrics = expr.validate().unwrap().metrics();
        assert_eq!(metrics.script_size, 51 * 39 + 2);
        // Oversized before the scriptSig is looked at.
        assert_eq!(metrics.check::<Legacy>().unwrap_err().limit, Limit::ScriptSize);
        assert_eq!(
            ScriptMetrics { script_size: 0, op_count: 0, ..metrics }.check::<Legacy>(),
            Err(SizeLimitError { limit: Limit::ScriptSigSize, measured: 51 * 33, ceiling: 1650 })
        );
    }

    #[test]
    fn limit_display() {
        let e = SizeLimitError { limit: Limit::ScriptSize, measured: 521, ceiling: 520 };
        assert_eq!(e.to_string(), "script size of 521 exceeds the limit of 520");
    }
}
