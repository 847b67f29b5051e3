// SPDX-License-Identifier: CC0-1.0

//! Script Contexts
//!
//! A Miniscript is always interpreted under one of four consensus
//! contexts. The context is a type parameter, so a tree built for one
//! context cannot be compiled or satisfied under another.

use core::{fmt, hash};

use crate::miniscript::limits::{
    MAX_BLOCK_WEIGHT, MAX_OPS_PER_SCRIPT, MAX_SCRIPTSIG_SIZE, MAX_SCRIPT_ELEMENT_SIZE,
    MAX_SCRIPT_SIZE, MAX_STACK_SIZE, MAX_STANDARD_P2WSH_SCRIPT_SIZE,
    MAX_STANDARD_P2WSH_STACK_ITEMS,
};
use crate::miniscript::terminal::Terminal;
use crate::MiniscriptKey;

/// Which signature scheme a context checks.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum SigType {
    /// DER-encoded ECDSA with a sighash byte.
    Ecdsa,
    /// BIP 340 Schnorr.
    Schnorr,
}

/// A key or fragment which the context does not accept.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ScriptContextError {
    /// `pk_h` cannot be priced before the key is revealed, since it may be
    /// uncompressed.
    MalleablePkH,
    /// Legacy `OP_IF` accepts any true value, so `or_i` is malleable.
    MalleableOrI,
    /// Legacy `OP_IF` accepts any true value, so `d:` is malleable.
    MalleableDupIf,
    /// Uncompressed key under a context which requires compressed keys.
    UncompressedKeysNotAllowed(String),
    /// X-only key outside of tapscript.
    XOnlyKeysNotAllowed(String, &'static str),
    /// `multi` used in tapscript, where `CHECKMULTISIG` is disabled.
    TaprootMultiDisabled,
    /// `multi_a` used outside of tapscript.
    MultiANotAllowed,
}

impl fmt::Display for ScriptContextError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ScriptContextError::MalleablePkH => f.write_str("PkH is malleable under Legacy rules"),
            ScriptContextError::MalleableOrI => f.write_str("OrI is malleable under Legacy rules"),
            ScriptContextError::MalleableDupIf => {
                f.write_str("DupIf is malleable under Legacy rules")
            }
            ScriptContextError::UncompressedKeysNotAllowed(ref pk) => {
                write!(f, "uncompressed key «{}» is not allowed in this context", pk)
            }
            ScriptContextError::XOnlyKeysNotAllowed(ref pk, ctx) => {
                write!(f, "x-only key «{}» is not allowed in {}", pk, ctx)
            }
            ScriptContextError::TaprootMultiDisabled => {
                f.write_str("«multi» is disabled in tapscript; use «multi_a»")
            }
            ScriptContextError::MultiANotAllowed => {
                f.write_str("«multi_a» is only available in tapscript")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScriptContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { None }
}

/// The consensus context a Miniscript is interpreted under.
///
/// Implemented only by the uninhabited markers [`Legacy`], [`Segwitv0`],
/// [`Tap`] and [`BareCtx`].
pub trait ScriptContext:
    fmt::Debug + Clone + Ord + PartialOrd + Eq + PartialEq + hash::Hash + private::Sealed
where
    Self: Sized,
{
    /// Whether a key may appear in this context at all.
    fn check_pk<Pk: MiniscriptKey>(pk: &Pk) -> Result<(), ScriptContextError>;

    /// Whether `frag` may appear in this context. Children are not checked.
    fn check_fragment<Pk: MiniscriptKey, Sub>(
        frag: &Terminal<Pk, Sub>,
    ) -> Result<(), ScriptContextError> {
        match *frag {
            Terminal::PkK(ref pk) | Terminal::PkH(ref pk) => Self::check_pk(pk),
            Terminal::Multi(ref thresh) => {
                if Self::sig_type() == SigType::Schnorr {
                    return Err(ScriptContextError::TaprootMultiDisabled);
                }
                thresh.iter().try_for_each(Self::check_pk)
            }
            Terminal::MultiA(ref thresh) => {
                if Self::sig_type() == SigType::Ecdsa {
                    return Err(ScriptContextError::MultiANotAllowed);
                }
                thresh.iter().try_for_each(Self::check_pk)
            }
            _ => Ok(()),
        }
    }

    /// Whether `frag` stays non-malleable under this context's relay
    /// policy. Children are not checked.
    fn check_terminal_non_malleable<Pk: MiniscriptKey, Sub>(
        frag: &Terminal<Pk, Sub>,
    ) -> Result<(), ScriptContextError>;

    /// Largest encoded script.
    fn max_script_size() -> usize;

    /// Most non-push opcodes executed, if the context counts them.
    fn max_ops() -> Option<usize>;

    /// Most initial witness elements, if bounded separately.
    fn max_witness_elements() -> Option<usize>;

    /// Largest scriptSig, if the witness goes there.
    fn max_script_sig_size() -> Option<usize>;

    /// Most stack plus altstack items during execution.
    fn max_exec_stack() -> usize { MAX_STACK_SIZE }

    /// Length of the push of `pk`, push opcode included.
    fn pk_len<Pk: MiniscriptKey>(pk: &Pk) -> usize;

    /// The signature scheme checked by `CHECKSIG`.
    fn sig_type() -> SigType;

    /// Human-readable name.
    fn name_str() -> &'static str;
}

/// Pre-segwit P2SH: the script is a redeem script pushed by the scriptSig.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Legacy {}

/// P2WSH witness script.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Segwitv0 {}

/// Tapscript leaf (BIP 342).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Tap {}

/// Bare scriptPubKey.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BareCtx {}

fn check_legacy_pk<Pk: MiniscriptKey>(pk: &Pk, ctx: &'static str) -> Result<(), ScriptContextError> {
    if pk.is_x_only_key() {
        Err(ScriptContextError::XOnlyKeysNotAllowed(pk.to_string(), ctx))
    } else {
        Ok(())
    }
}

fn check_legacy_non_malleable<Pk: MiniscriptKey, Sub>(
    frag: &Terminal<Pk, Sub>,
) -> Result<(), ScriptContextError> {
    match *frag {
        Terminal::PkH(..) => Err(ScriptContextError::MalleablePkH),
        Terminal::OrI(..) => Err(ScriptContextError::MalleableOrI),
        Terminal::DupIf(..) => Err(ScriptContextError::MalleableDupIf),
        _ => Ok(()),
    }
}

fn legacy_pk_len<Pk: MiniscriptKey>(pk: &Pk) -> usize {
    if pk.is_uncompressed() {
        66
    } else {
        34
    }
}

impl ScriptContext for Legacy {
    fn check_pk<Pk: MiniscriptKey>(pk: &Pk) -> Result<(), ScriptContextError> {
        check_legacy_pk(pk, Self::name_str())
    }

    fn check_terminal_non_malleable<Pk: MiniscriptKey, Sub>(
        frag: &Terminal<Pk, Sub>,
    ) -> Result<(), ScriptContextError> {
        check_legacy_non_malleable(frag)
    }

    fn max_script_size() -> usize { MAX_SCRIPT_ELEMENT_SIZE }

    fn max_ops() -> Option<usize> { Some(MAX_OPS_PER_SCRIPT) }

    fn max_witness_elements() -> Option<usize> { None }

    fn max_script_sig_size() -> Option<usize> { Some(MAX_SCRIPTSIG_SIZE) }

    fn pk_len<Pk: MiniscriptKey>(pk: &Pk) -> usize { legacy_pk_len(pk) }

    fn sig_type() -> SigType { SigType::Ecdsa }

    fn name_str() -> &'static str { "Legacy/p2sh" }
}

impl ScriptContext for Segwitv0 {
    fn check_pk<Pk: MiniscriptKey>(pk: &Pk) -> Result<(), ScriptContextError> {
        if pk.is_uncompressed() {
            Err(ScriptContextError::UncompressedKeysNotAllowed(pk.to_string()))
        } else {
            check_legacy_pk(pk, Self::name_str())
        }
    }

    fn check_terminal_non_malleable<Pk: MiniscriptKey, Sub>(
        _frag: &Terminal<Pk, Sub>,
    ) -> Result<(), ScriptContextError> {
        Ok(())
    }

    fn max_script_size() -> usize { MAX_STANDARD_P2WSH_SCRIPT_SIZE }

    fn max_ops() -> Option<usize> { Some(MAX_OPS_PER_SCRIPT) }

    fn max_witness_elements() -> Option<usize> { Some(MAX_STANDARD_P2WSH_STACK_ITEMS) }

    fn max_script_sig_size() -> Option<usize> { None }

    fn pk_len<Pk: MiniscriptKey>(_pk: &Pk) -> usize { 34 }

    fn sig_type() -> SigType { SigType::Ecdsa }

    fn name_str() -> &'static str { "Segwitv0" }
}

impl ScriptContext for Tap {
    fn check_pk<Pk: MiniscriptKey>(pk: &Pk) -> Result<(), ScriptContextError> {
        if pk.is_uncompressed() {
            Err(ScriptContextError::UncompressedKeysNotAllowed(pk.to_string()))
        } else {
            Ok(())
        }
    }

    fn check_terminal_non_malleable<Pk: MiniscriptKey, Sub>(
        _frag: &Terminal<Pk, Sub>,
    ) -> Result<(), ScriptContextError> {
        Ok(())
    }

    fn max_script_size() -> usize { MAX_BLOCK_WEIGHT }

    fn max_ops() -> Option<usize> { None }

    fn max_witness_elements() -> Option<usize> { None }

    fn max_script_sig_size() -> Option<usize> { None }

    fn pk_len<Pk: MiniscriptKey>(_pk: &Pk) -> usize { 33 }

    fn sig_type() -> SigType { SigType::Schnorr }

    fn name_str() -> &'static str { "TapscriptCtx" }
}

impl ScriptContext for BareCtx {
    fn check_pk<Pk: MiniscriptKey>(pk: &Pk) -> Result<(), ScriptContextError> {
        check_legacy_pk(pk, Self::name_str())
    }

    fn check_terminal_non_malleable<Pk: MiniscriptKey, Sub>(
        frag: &Terminal<Pk, Sub>,
    ) -> Result<(), ScriptContextError> {
        check_legacy_non_malleable(frag)
    }

    fn max_script_size() -> usize { MAX_SCRIPT_SIZE }

    fn max_ops() -> Option<usize> { Some(MAX_OPS_PER_SCRIPT) }

    fn max_witness_elements() -> Option<usize> { None }

    fn max_script_sig_size() -> Option<usize> { Some(MAX_SCRIPTSIG_SIZE) }

    fn pk_len<Pk: MiniscriptKey>(pk: &Pk) -> usize { legacy_pk_len(pk) }

    fn sig_type() -> SigType { SigType::Ecdsa }

    fn name_str() -> &'static str { "BareCtx" }
}

/// Keeps the set of contexts closed.
mod private {
    use super::{BareCtx, Legacy, Segwitv0, Tap};

    pub trait Sealed {}

    impl Sealed for BareCtx {}
    impl Sealed for Legacy {}
    impl Sealed for Segwitv0 {}
    impl Sealed for Tap {}
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use super::*;
    use crate::miniscript::Node;
    use crate::Threshold;

    type Frag = Node<bitcoin::PublicKey, Legacy>;

    fn keys() -> (bitcoin::PublicKey, bitcoin::PublicKey) {
        let compressed = bitcoin::PublicKey::from_str(
            "02c2122e30e73f7fe37986e3f81ded00158e94b7ad472369b83bbdd28a9a198a39",
        )
        .unwrap();
        let uncompressed = bitcoin::PublicKey { compressed: false, inner: compressed.inner };
        (compressed, uncompressed)
    }

    #[test]
    fn key_legality() {
        let (compressed, uncompressed) = keys();
        let xonly = bitcoin::key::XOnlyPublicKey::from(compressed.inner);

        assert!(Legacy::check_pk(&uncompressed).is_ok());
        assert!(BareCtx::check_pk(&uncompressed).is_ok());
        assert!(matches!(
            Segwitv0::check_pk(&uncompressed),
            Err(ScriptContextError::UncompressedKeysNotAllowed(..))
        ));
        assert!(matches!(
            Tap::check_pk(&uncompressed),
            Err(ScriptContextError::UncompressedKeysNotAllowed(..))
        ));

        assert!(matches!(
            Segwitv0::check_pk(&xonly),
            Err(ScriptContextError::XOnlyKeysNotAllowed(_, "Segwitv0"))
        ));
        assert!(Legacy::check_pk(&xonly).is_err());
        assert!(Tap::check_pk(&xonly).is_ok());
        assert!(Tap::check_pk(&compressed).is_ok());
    }

    #[test]
    fn multi_legality() {
        let (compressed, _) = keys();
        let multi: Frag = Terminal::Multi(Threshold::new(1, vec![compressed]).unwrap());
        let multi_a: Frag = Terminal::MultiA(Threshold::new(1, vec![compressed]).unwrap());

        assert!(Legacy::check_fragment(&multi).is_ok());
        assert!(Segwitv0::check_fragment(&multi).is_ok());
        assert_eq!(Tap::check_fragment(&multi), Err(ScriptContextError::TaprootMultiDisabled));
        assert_eq!(Legacy::check_fragment(&multi_a), Err(ScriptContextError::MultiANotAllowed));
        assert!(Tap::check_fragment(&multi_a).is_ok());
    }

    #[test]
    fn legacy_malleable_fragments() {
        let (compressed, _) = keys();
        let pkh: Frag = Terminal::PkH(compressed);
        let pk: Frag = Terminal::PkK(compressed);
        assert_eq!(Legacy::check_terminal_non_malleable(&pkh), Err(ScriptContextError::MalleablePkH));
        assert_eq!(BareCtx::check_terminal_non_malleable(&pkh), Err(ScriptContextError::MalleablePkH));
        assert!(Legacy::check_terminal_non_malleable(&pk).is_ok());
        assert!(Segwitv0::check_terminal_non_malleable(&pkh).is_ok());
    }

    #[test]
    fn limits() {
        assert_eq!(Legacy::max_script_size(), 520);
        assert_eq!(Segwitv0::max_script_size(), 3600);
        assert_eq!(Tap::max_script_size(), 4_000_000);
        assert_eq!(BareCtx::max_script_size(), 10_000);
        assert_eq!(Tap::max_ops(), None);
        assert_eq!(Segwitv0::max_witness_elements(), Some(100));
        assert_eq!(Legacy::max_script_sig_size(), Some(1650));
        assert_eq!(Tap::max_exec_stack(), 1000);
    }
}
