// SPDX-License-Identifier: CC0-1.0

//! Generally useful utilities for unit tests

use core::str::FromStr;

use bitcoin::key::XOnlyPublicKey;

use crate::{Expr, Segwitv0};

/// An expression over named keys, for tests which never encode.
pub type StrExpr = Expr<String, Segwitv0>;

/// The same point as a compressed key, an uncompressed key and an x-only
/// key.
pub fn pubkeys() -> (bitcoin::PublicKey, bitcoin::PublicKey, XOnlyPublicKey) {
    let compressed = bitcoin::PublicKey::from_str(
        "02c2122e30e73f7fe37986e3f81ded00158e94b7ad472369b83bbdd28a9a198a39",
    )
    .unwrap();
    let uncompressed = bitcoin::PublicKey { compressed: false, inner: compressed.inner };
    let xonly = XOnlyPublicKey::from(compressed.inner);
    (compressed, uncompressed, xonly)
}
