// SPDX-License-Identifier: CC0-1.0

//! Shared fixtures for the integration tests: deterministic keys, signatures
//! over a fixed message, hash preimages and a logger.

#![allow(dead_code)]

pub mod script_eval;

use std::collections::HashMap;
use std::sync::Once;

use bitcoin::hashes::{hash160, ripemd160, sha256, sha256d, Hash};
use bitcoin::key::XOnlyPublicKey;
use secp256k1::{Keypair, Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, TapSighashType};
use bitcoin::{ecdsa, taproot, TapLeafHash};
use miniscript::Preimage32;

/// The digest every test signature commits to.
pub const SIGHASH: [u8; 32] = [0x5a; 32];

struct StdLogger;

impl log::Log for StdLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool { metadata.target().starts_with("miniscript") }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            println!("[{}][{}]: {}", record.level(), record.metadata().target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StdLogger = StdLogger;
static INIT: Once = Once::new();

/// Routes the crate's log output to stdout, once per test binary.
pub fn setup_logger() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
}

pub fn message() -> Message { Message::from_digest(SIGHASH) }

/// Keys derived from fixed secrets, plus their x-only forms.
pub struct TestData {
    pub secp: Secp256k1<secp256k1::All>,
    pub sks: Vec<SecretKey>,
    pub pks: Vec<bitcoin::PublicKey>,
    pub x_only_pks: Vec<XOnlyPublicKey>,
    pub keypairs: Vec<Keypair>,
}

impl TestData {
    /// `n` key pairs with secrets `[1; 32]`, `[2; 32]` and so on.
    pub fn new_fixed_data(n: usize) -> Self {
        assert!(n < 0x7f);
        let secp = Secp256k1::new();
        let sks = (1..=n as u8)
            .map(|i| SecretKey::from_slice(&[i; 32]).expect("secret below curve order"))
            .collect::<Vec<_>>();
        let pks = sks
            .iter()
            .map(|sk| bitcoin::PublicKey::new(secp256k1::PublicKey::from_secret_key(&secp, sk)))
            .collect();
        let keypairs = sks
            .iter()
            .map(|sk| Keypair::from_secret_key(&secp, sk))
            .collect::<Vec<_>>();
        let x_only_pks = keypairs.iter().map(|kp| kp.x_only_public_key().0).collect();
        TestData { secp, sks, pks, x_only_pks, keypairs }
    }

    /// An ECDSA signature by key `i` over [`SIGHASH`].
    pub fn ecdsa_sig(&self, i: usize) -> ecdsa::Signature {
        ecdsa::Signature {
            signature: self.secp.sign_ecdsa(&message(), &self.sks[i]),
            sighash_type: EcdsaSighashType::All,
        }
    }

    /// A Schnorr signature by key `i` over [`SIGHASH`].
    pub fn schnorr_sig(&self, i: usize) -> taproot::Signature {
        taproot::Signature {
            signature: self.secp.sign_schnorr_no_aux_rand(&message(), &self.keypairs[i]),
            sighash_type: TapSighashType::Default,
        }
    }

    /// ECDSA signatures by the keys at `signers`.
    pub fn ecdsa_sigs(&self, signers: &[usize]) -> HashMap<bitcoin::PublicKey, ecdsa::Signature> {
        signers.iter().map(|&i| (self.pks[i], self.ecdsa_sig(i))).collect()
    }

    /// Schnorr signatures by the x-only keys at `signers` for one leaf.
    pub fn schnorr_sigs(
        &self,
        signers: &[usize],
        leaf_hash: TapLeafHash,
    ) -> HashMap<(XOnlyPublicKey, TapLeafHash), taproot::Signature> {
        signers
            .iter()
            .map(|&i| ((self.x_only_pks[i], leaf_hash), self.schnorr_sig(i)))
            .collect()
    }
}

/// A fixed preimage, distinct per `i`.
pub fn preimage(i: u8) -> Preimage32 { [0xa0 | i; 32] }

pub fn sha256_of(pre: &Preimage32) -> sha256::Hash { sha256::Hash::hash(pre) }

pub fn hash256_of(pre: &Preimage32) -> sha256d::Hash { sha256d::Hash::hash(pre) }

pub fn ripemd160_of(pre: &Preimage32) -> ripemd160::Hash { ripemd160::Hash::hash(pre) }

pub fn hash160_of(pre: &Preimage32) -> hash160::Hash { hash160::Hash::hash(pre) }
