// SPDX-License-Identifier: CC0-1.0

//! Miniscript Core
//!
//! # Introduction
//!
//! Miniscript is an alternative to Bitcoin Script which can be efficiently
//! and simply encoded as Script, but whose structure admits analysis. A
//! Miniscript is a monotone function (tree of ANDs, ORs and thresholds) of
//! signature requirements, hash preimage requirements, and timelocks.
//!
//! This crate provides the typed core of Miniscript:
//!
//! 1. an untyped expression tree ([`Expr`]) with validating constructors,
//!    which is where externally produced trees enter the library;
//! 2. the type system, which infers correctness and malleability properties
//!    of every node and produces a typed [`Miniscript`];
//! 3. a compiler lowering a typed tree to Script under the resource limits
//!    of a [`ScriptContext`];
//! 4. a satisfier which, given signatures and hash preimages from a
//!    [`Satisfier`], produces a minimal witness.
//!
//! Parsing of textual notation and descriptor-level handling are left to
//! other crates.
//!
//! # Examples
//!
//! ```rust
//! use miniscript::{Expr, Miniscript, Segwitv0};
//! use std::str::FromStr;
//!
//! let key = bitcoin::PublicKey::from_str(
//!     "020e0338c96a8870479f2396c373cc7696ba124e8635d41b0ea581112b67817261",
//! ).unwrap();
//!
//! let expr = Expr::<_, Segwitv0>::pk(key).unwrap();
//! let ms = Miniscript::validate(&expr).unwrap();
//! assert_eq!(ms.ty().corr.base, miniscript::miniscript::types::Base::B);
//!
//! let compiled = ms.compile().unwrap();
//! assert_eq!(compiled.metrics.script_size, 35);
//! ```
//!
// Coding conventions
#![deny(unsafe_code)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(missing_docs)]

pub use bitcoin;

#[cfg(feature = "serde")]
extern crate actual_serde as serde;

#[cfg(test)]
mod test_utils;

pub mod expression;
pub mod iter;
pub mod miniscript;
mod primitives;
mod util;

use core::{fmt, hash};
#[cfg(feature = "std")]
use std::error;

use bitcoin::hashes::{hash160, ripemd160, sha256, sha256d, Hash};
use bitcoin::key::XOnlyPublicKey;

pub use crate::expression::{Expr, ExprError};
pub use crate::miniscript::analyzable::{AnalysisError, ExtParams};
pub use crate::miniscript::compile::{Compiled, Limit, ScriptMetrics, SizeLimitError};
pub use crate::miniscript::context::{
    BareCtx, Legacy, ScriptContext, ScriptContextError, Segwitv0, SigType, Tap,
};
pub use crate::miniscript::satisfy::{Preimage32, SatisfyError, Satisfier};
pub use crate::miniscript::terminal::Terminal;
pub use crate::miniscript::Miniscript;
pub use crate::primitives::absolute_locktime::{AbsLockTime, AbsLockTimeError};
pub use crate::primitives::relative_locktime::{RelLockTime, RelLockTimeError};
pub use crate::primitives::threshold::{Threshold, ThresholdError};

/// Public key trait which can be converted to Hash type
pub trait MiniscriptKey: Clone + Eq + Ord + fmt::Debug + fmt::Display + hash::Hash {
    /// Returns true if the pubkey is uncompressed. Defaults to `false`.
    fn is_uncompressed(&self) -> bool { false }

    /// Returns true if the pubkey is an x-only pubkey. Defaults to `false`.
    // This is required to know whether the key may appear in tapscript contexts.
    fn is_x_only_key(&self) -> bool { false }

    /// Number of distinct derivation paths this key stands for. A concrete
    /// key has none.
    fn num_der_paths(&self) -> usize { 0 }

    /// The type used in the sha256 fragment.
    type Sha256: Clone + Eq + Ord + fmt::Display + fmt::Debug + hash::Hash;

    /// The type used in the hash256 fragment.
    type Hash256: Clone + Eq + Ord + fmt::Display + fmt::Debug + hash::Hash;

    /// The type used in the ripemd160 fragment.
    type Ripemd160: Clone + Eq + Ord + fmt::Display + fmt::Debug + hash::Hash;

    /// The type used in the hash160 fragment.
    type Hash160: Clone + Eq + Ord + fmt::Display + fmt::Debug + hash::Hash;
}

impl MiniscriptKey for bitcoin::secp256k1::PublicKey {
    type Sha256 = sha256::Hash;
    type Hash256 = sha256d::Hash;
    type Ripemd160 = ripemd160::Hash;
    type Hash160 = hash160::Hash;
}

impl MiniscriptKey for bitcoin::PublicKey {
    /// Returns the compressed-ness of the underlying secp256k1 key.
    fn is_uncompressed(&self) -> bool { !self.compressed }

    type Sha256 = sha256::Hash;
    type Hash256 = sha256d::Hash;
    type Ripemd160 = ripemd160::Hash;
    type Hash160 = hash160::Hash;
}

impl MiniscriptKey for XOnlyPublicKey {
    type Sha256 = sha256::Hash;
    type Hash256 = sha256d::Hash;
    type Ripemd160 = ripemd160::Hash;
    type Hash160 = hash160::Hash;

    fn is_x_only_key(&self) -> bool { true }
}

impl MiniscriptKey for String {
    type Sha256 = String; // specify hashes as string
    type Hash256 = String;
    type Ripemd160 = String;
    type Hash160 = String;
}

/// Trait describing key types which can be converted to bitcoin public keys.
pub trait ToPublicKey: MiniscriptKey {
    /// Converts key to a public key.
    fn to_public_key(&self) -> bitcoin::PublicKey;

    /// Converts key to an x-only public key.
    fn to_x_only_pubkey(&self) -> XOnlyPublicKey {
        let pk = self.to_public_key();
        XOnlyPublicKey::from(pk.inner)
    }

    /// Obtains the pubkey hash for this key (as a `MiniscriptKey`).
    ///
    /// Must be consistent with the conversion function in [`ToPublicKey::to_public_key`],
    /// for the serialization used by the given signature type.
    fn to_pubkeyhash(&self, sig_type: SigType) -> hash160::Hash {
        match sig_type {
            SigType::Ecdsa => hash160::Hash::hash(&self.to_public_key().to_bytes()),
            SigType::Schnorr => hash160::Hash::hash(&self.to_x_only_pubkey().serialize()),
        }
    }

    /// Converts the generic associated [`MiniscriptKey::Sha256`] to [`sha256::Hash`]
    fn to_sha256(hash: &<Self as MiniscriptKey>::Sha256) -> sha256::Hash;

    /// Converts the generic associated [`MiniscriptKey::Hash256`] to [`sha256d::Hash`]
    fn to_hash256(hash: &<Self as MiniscriptKey>::Hash256) -> sha256d::Hash;

    /// Converts the generic associated [`MiniscriptKey::Ripemd160`] to [`ripemd160::Hash`]
    fn to_ripemd160(hash: &<Self as MiniscriptKey>::Ripemd160) -> ripemd160::Hash;

    /// Converts the generic associated [`MiniscriptKey::Hash160`] to [`hash160::Hash`]
    fn to_hash160(hash: &<Self as MiniscriptKey>::Hash160) -> hash160::Hash;
}

impl ToPublicKey for bitcoin::PublicKey {
    fn to_public_key(&self) -> bitcoin::PublicKey { *self }

    fn to_sha256(hash: &sha256::Hash) -> sha256::Hash { *hash }

    fn to_hash256(hash: &sha256d::Hash) -> sha256d::Hash { *hash }

    fn to_ripemd160(hash: &ripemd160::Hash) -> ripemd160::Hash { *hash }

    fn to_hash160(hash: &hash160::Hash) -> hash160::Hash { *hash }
}

impl ToPublicKey for bitcoin::secp256k1::PublicKey {
    fn to_public_key(&self) -> bitcoin::PublicKey { bitcoin::PublicKey::new(*self) }

    fn to_sha256(hash: &sha256::Hash) -> sha256::Hash { *hash }

    fn to_hash256(hash: &sha256d::Hash) -> sha256d::Hash { *hash }

    fn to_ripemd160(hash: &ripemd160::Hash) -> ripemd160::Hash { *hash }

    fn to_hash160(hash: &hash160::Hash) -> hash160::Hash { *hash }
}

impl ToPublicKey for XOnlyPublicKey {
    fn to_public_key(&self) -> bitcoin::PublicKey {
        // Only meaningful for completeness; tapscript encodes the x-only form.
        bitcoin::PublicKey::new(self.public_key(bitcoin::secp256k1::Parity::Even))
    }

    fn to_x_only_pubkey(&self) -> XOnlyPublicKey { *self }

    fn to_sha256(hash: &sha256::Hash) -> sha256::Hash { *hash }

    fn to_hash256(hash: &sha256d::Hash) -> sha256d::Hash { *hash }

    fn to_ripemd160(hash: &ripemd160::Hash) -> ripemd160::Hash { *hash }

    fn to_hash160(hash: &hash160::Hash) -> hash160::Hash { *hash }
}

/// Miniscript
#[derive(Debug, PartialEq)]
pub enum Error {
    /// Structural error while constructing an expression tree
    Expr(ExprError),
    /// Typechecking failed
    TypeCheck(miniscript::types::Error),
    /// A key or fragment was not allowed in the script context
    ContextError(ScriptContextError),
    /// Recursion depth exceeded when building a typed tree directly
    MaxRecursiveDepthExceeded,
    /// Compiled script exceeded a resource limit of its context
    SizeLimit(SizeLimitError),
    /// Satisfaction failed
    Satisfy(SatisfyError),
    /// Analysis error
    AnalysisError(AnalysisError),
}

// https://github.com/sipa/miniscript/pull/5 for discussion on this number
const MAX_RECURSION_DEPTH: u32 = 402;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Expr(ref e) => fmt::Display::fmt(e, f),
            Error::TypeCheck(ref e) => write!(f, "typecheck: {}", e),
            Error::ContextError(ref e) => fmt::Display::fmt(e, f),
            Error::MaxRecursiveDepthExceeded => {
                write!(f, "Recursive depth over {} not permitted", MAX_RECURSION_DEPTH)
            }
            Error::SizeLimit(ref e) => fmt::Display::fmt(e, f),
            Error::Satisfy(ref e) => fmt::Display::fmt(e, f),
            Error::AnalysisError(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        use self::Error::*;

        match self {
            MaxRecursiveDepthExceeded => None,
            Expr(e) => Some(e),
            TypeCheck(e) => Some(e),
            ContextError(e) => Some(e),
            SizeLimit(e) => Some(e),
            Satisfy(e) => Some(e),
            AnalysisError(e) => Some(e),
        }
    }
}

#[doc(hidden)]
impl From<ExprError> for Error {
    fn from(e: ExprError) -> Error { Error::Expr(e) }
}

#[doc(hidden)]
impl From<miniscript::types::Error> for Error {
    fn from(e: miniscript::types::Error) -> Error { Error::TypeCheck(e) }
}

#[doc(hidden)]
impl From<ScriptContextError> for Error {
    fn from(e: ScriptContextError) -> Error { Error::ContextError(e) }
}

#[doc(hidden)]
impl From<SizeLimitError> for Error {
    fn from(e: SizeLimitError) -> Error { Error::SizeLimit(e) }
}

#[doc(hidden)]
impl From<SatisfyError> for Error {
    fn from(e: SatisfyError) -> Error { Error::Satisfy(e) }
}

#[doc(hidden)]
impl From<AnalysisError> for Error {
    fn from(e: AnalysisError) -> Error { Error::AnalysisError(e) }
}

/// The size of an encoding of a number in Script
pub fn script_num_size(n: usize) -> usize {
    match n {
        n if n <= 0x10 => 1,      // OP_n
        n if n < 0x80 => 2,       // OP_PUSH1 <n>
        n if n < 0x8000 => 3,     // OP_PUSH2 <n>
        n if n < 0x800000 => 4,   // OP_PUSH3 <n>
        n if n < 0x80000000 => 5, // OP_PUSH4 <n>
        _ => 6,                   // OP_PUSH5 <n>
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use super::*;

    #[test]
    fn script_num_size_boundaries() {
        assert_eq!(script_num_size(0), 1);
        assert_eq!(script_num_size(16), 1);
        assert_eq!(script_num_size(17), 2);
        assert_eq!(script_num_size(0x7f), 2);
        assert_eq!(script_num_size(0x80), 3);
        assert_eq!(script_num_size(0x7fff), 3);
        assert_eq!(script_num_size(0x8000), 4);
        assert_eq!(script_num_size(0x8000_0000), 6);
    }

    #[test]
    fn key_encoding_flags() {
        let compressed = bitcoin::PublicKey::from_str(
            "02c2122e30e73f7fe37986e3f81ded00158e94b7ad472369b83bbdd28a9a198a39",
        )
        .unwrap();
        assert!(!compressed.is_uncompressed());
        assert!(!compressed.is_x_only_key());
        assert_eq!(compressed.num_der_paths(), 0);

        let uncompressed = bitcoin::PublicKey {
            compressed: false,
            inner: compressed.inner,
        };
        assert!(uncompressed.is_uncompressed());

        let xonly = compressed.to_x_only_pubkey();
        assert!(xonly.is_x_only_key());
        assert_eq!(xonly.to_x_only_pubkey(), xonly);
    }

    #[test]
    fn pubkeyhash_depends_on_sig_type() {
        let pk = bitcoin::PublicKey::from_str(
            "02c2122e30e73f7fe37986e3f81ded00158e94b7ad472369b83bbdd28a9a198a39",
        )
        .unwrap();
        assert_eq!(pk.to_pubkeyhash(SigType::Ecdsa), hash160::Hash::hash(&pk.to_bytes()));
        assert_ne!(pk.to_pubkeyhash(SigType::Ecdsa), pk.to_pubkeyhash(SigType::Schnorr));
    }
}
