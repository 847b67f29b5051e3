// SPDX-License-Identifier: CC0-1.0

use bitcoin::hashes::Hash;
use bitcoin::script;
use bitcoin::PubkeyHash;

use crate::miniscript::context::SigType;
use crate::{ScriptContext, ToPublicKey};

pub(crate) fn varint_len(n: usize) -> usize { bitcoin::VarInt(n as u64).size() }

/// Serialized size of one witness element, length prefix included.
pub(crate) fn element_size(elem: &[u8]) -> usize { elem.len() + varint_len(elem.len()) }

/// Serialized size of a run of witness elements.
///
/// The count prefix of the whole stack is left out, so the size of a
/// concatenation is the sum of the sizes of its parts.
pub(crate) fn witness_size(wit: &[Vec<u8>]) -> usize {
    wit.iter().map(|elem| element_size(elem)).sum()
}

// trait for pushing key that depend on context
pub(crate) trait MsKeyBuilder {
    /// Serialize the key as bytes based on script context. Used when encoding miniscript into bitcoin script
    fn push_ms_key<Pk, Ctx>(self, key: &Pk) -> Self
    where
        Pk: ToPublicKey,
        Ctx: ScriptContext;

    /// Serialize the key hash as bytes based on script context. Used when encoding miniscript into bitcoin script
    fn push_ms_key_hash<Pk, Ctx>(self, key: &Pk) -> Self
    where
        Pk: ToPublicKey,
        Ctx: ScriptContext;
}

impl MsKeyBuilder for script::Builder {
    fn push_ms_key<Pk, Ctx>(self, key: &Pk) -> Self
    where
        Pk: ToPublicKey,
        Ctx: ScriptContext,
    {
        match Ctx::sig_type() {
            SigType::Ecdsa => self.push_key(&key.to_public_key()),
            SigType::Schnorr => self.push_slice(key.to_x_only_pubkey().serialize()),
        }
    }

    fn push_ms_key_hash<Pk, Ctx>(self, key: &Pk) -> Self
    where
        Pk: ToPublicKey,
        Ctx: ScriptContext,
    {
        match Ctx::sig_type() {
            SigType::Ecdsa => self.push_slice(key.to_public_key().pubkey_hash()),
            SigType::Schnorr => {
                self.push_slice(PubkeyHash::hash(&key.to_x_only_pubkey().serialize()))
            }
        }
    }
}

/// The bytes a satisfier pushes to reveal `key` to a `pk_h` check.
pub(crate) fn key_bytes<Pk: ToPublicKey, Ctx: ScriptContext>(key: &Pk) -> Vec<u8> {
    match Ctx::sig_type() {
        SigType::Ecdsa => key.to_public_key().to_bytes(),
        SigType::Schnorr => key.to_x_only_pubkey().serialize().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_additive() {
        let a = vec![vec![0u8; 72], vec![]];
        let b = vec![vec![1u8; 300]];
        let mut both = a.clone();
        both.extend(b.iter().cloned());
        assert_eq!(witness_size(&a), 73 + 1);
        assert_eq!(witness_size(&b), 303);
        assert_eq!(witness_size(&both), witness_size(&a) + witness_size(&b));
    }
}
