// SPDX-License-Identifier: CC0-1.0

//! Consensus and Standardness Limits
//!
//! Numeric ceilings from Bitcoin Core's `script.h` and `policy.h` which the
//! script contexts enforce.

/// Non-push opcodes allowed per script (all pre-taproot contexts).
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Initial witness stack items allowed for a standard P2WSH spend.
pub const MAX_STANDARD_P2WSH_STACK_ITEMS: usize = 100;
/// Consensus script size limit; applies to bare scripts.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Standard P2WSH witness script size.
pub const MAX_STANDARD_P2WSH_SCRIPT_SIZE: usize = 3600;
/// Largest element that may be pushed. A P2SH redeem script is pushed, so
/// this also caps legacy scripts.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Standard scriptSig size.
pub const MAX_SCRIPTSIG_SIZE: usize = 1650;
/// Stack plus altstack items during execution, initial stack included.
pub const MAX_STACK_SIZE: usize = 1000;
/// Block weight limit (BIP 141); the only size bound on a tapscript.
pub const MAX_BLOCK_WEIGHT: usize = 4_000_000;
/// Keys accepted by `CHECKMULTISIG`.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;
/// Keys which fit in a `CHECKSIGADD` chain inside one block.
pub const MAX_PUBKEYS_IN_CHECKSIGADD: usize = MAX_BLOCK_WEIGHT / 32;
