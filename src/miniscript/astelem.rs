// SPDX-License-Identifier: CC0-1.0

//! AST Elements
//!
//! Lowering of Miniscript fragments to Bitcoin Script. Each fragment has a
//! unique encoding, given by a template around the encodings of its
//! children.

use core::mem;

use bitcoin::blockdata::{opcodes, script};
use bitcoin::hashes::Hash;
use bitcoin::ScriptBuf;

use crate::iter::TreeLike;
use crate::util::MsKeyBuilder;
use crate::{Miniscript, MiniscriptKey, ScriptContext, Terminal, ToPublicKey};

/// Helper trait to add a `push_astelem` method to `script::Builder`
trait PushAstElem {
    /// Appends an already encoded fragment.
    fn push_astelem(self, encoded: &[u8]) -> Self;
}

impl PushAstElem for script::Builder {
    fn push_astelem(self, encoded: &[u8]) -> Self {
        let mut bytes = self.into_script().into_bytes();
        bytes.extend_from_slice(encoded);
        // Rebuilding keeps track of the last opcode, which `push_verify` needs.
        script::Builder::from(bytes)
    }
}

impl<Pk: MiniscriptKey + ToPublicKey, Ctx: ScriptContext> Miniscript<Pk, Ctx> {
    /// Encode as a Bitcoin script
    ///
    /// Fragments are encoded children first; each child's bytes are moved
    /// into its parent's template.
    pub fn encode(&self) -> ScriptBuf {
        let mut encoded: Vec<Vec<u8>> = vec![];
        for item in self.post_order_iter() {
            let mut child = |n: usize| mem::take(&mut encoded[item.child_indices[n]]);
            let builder = script::Builder::new();
            let builder = match *item.node.node() {
                Terminal::PkK(ref pk) => builder.push_ms_key::<_, Ctx>(pk),
                Terminal::PkH(ref pk) => builder
                    .push_opcode(opcodes::all::OP_DUP)
                    .push_opcode(opcodes::all::OP_HASH160)
                    .push_ms_key_hash::<_, Ctx>(pk)
                    .push_opcode(opcodes::all::OP_EQUALVERIFY),
                Terminal::After(t) => builder
                    .push_int(i64::from(t.to_consensus_u32()))
                    .push_opcode(opcodes::all::OP_CLTV),
                Terminal::Older(t) => builder
                    .push_int(i64::from(t.to_consensus_u32()))
                    .push_opcode(opcodes::all::OP_CSV),
                Terminal::Sha256(ref h) => builder
                    .push_opcode(opcodes::all::OP_SIZE)
                    .push_int(32)
                    .push_opcode(opcodes::all::OP_EQUALVERIFY)
                    .push_opcode(opcodes::all::OP_SHA256)
                    .push_slice(Pk::to_sha256(h).to_byte_array())
                    .push_opcode(opcodes::all::OP_EQUAL),
                Terminal::Hash256(ref h) => builder
                    .push_opcode(opcodes::all::OP_SIZE)
                    .push_int(32)
                    .push_opcode(opcodes::all::OP_EQUALVERIFY)
                    .push_opcode(opcodes::all::OP_HASH256)
                    .push_slice(Pk::to_hash256(h).to_byte_array())
                    .push_opcode(opcodes::all::OP_EQUAL),
                Terminal::Ripemd160(ref h) => builder
                    .push_opcode(opcodes::all::OP_SIZE)
                    .push_int(32)
                    .push_opcode(opcodes::all::OP_EQUALVERIFY)
                    .push_opcode(opcodes::all::OP_RIPEMD160)
                    .push_slice(Pk::to_ripemd160(h).to_byte_array())
                    .push_opcode(opcodes::all::OP_EQUAL),
                Terminal::Hash160(ref h) => builder
                    .push_opcode(opcodes::all::OP_SIZE)
                    .push_int(32)
                    .push_opcode(opcodes::all::OP_EQUALVERIFY)
                    .push_opcode(opcodes::all::OP_HASH160)
                    .push_slice(Pk::to_hash160(h).to_byte_array())
                    .push_opcode(opcodes::all::OP_EQUAL),
                Terminal::True => builder.push_opcode(opcodes::OP_TRUE),
                Terminal::False => builder.push_opcode(opcodes::OP_FALSE),
                Terminal::Alt(..) => builder
                    .push_opcode(opcodes::all::OP_TOALTSTACK)
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_FROMALTSTACK),
                Terminal::Swap(..) => builder.push_opcode(opcodes::all::OP_SWAP).push_astelem(&child(0)),
                Terminal::Check(..) => builder
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_CHECKSIG),
                Terminal::DupIf(..) => builder
                    .push_opcode(opcodes::all::OP_DUP)
                    .push_opcode(opcodes::all::OP_IF)
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_ENDIF),
                // `push_verify` folds a trailing EQUAL, CHECKSIG, CHECKMULTISIG
                // or NUMEQUAL into its VERIFY form.
                Terminal::Verify(..) => builder.push_astelem(&child(0)).push_verify(),
                Terminal::NonZero(..) => builder
                    .push_opcode(opcodes::all::OP_SIZE)
                    .push_opcode(opcodes::all::OP_0NOTEQUAL)
                    .push_opcode(opcodes::all::OP_IF)
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_ENDIF),
                Terminal::ZeroNotEqual(..) => builder
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_0NOTEQUAL),
                Terminal::AndV(..) => builder.push_astelem(&child(0)).push_astelem(&child(1)),
                Terminal::AndB(..) => builder
                    .push_astelem(&child(0))
                    .push_astelem(&child(1))
                    .push_opcode(opcodes::all::OP_BOOLAND),
                Terminal::AndOr(..) => builder
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_NOTIF)
                    .push_astelem(&child(2))
                    .push_opcode(opcodes::all::OP_ELSE)
                    .push_astelem(&child(1))
                    .push_opcode(opcodes::all::OP_ENDIF),
                Terminal::OrB(..) => builder
                    .push_astelem(&child(0))
                    .push_astelem(&child(1))
                    .push_opcode(opcodes::all::OP_BOOLOR),
                Terminal::OrD(..) => builder
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_IFDUP)
                    .push_opcode(opcodes::all::OP_NOTIF)
                    .push_astelem(&child(1))
                    .push_opcode(opcodes::all::OP_ENDIF),
                Terminal::OrC(..) => builder
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_NOTIF)
                    .push_astelem(&child(1))
                    .push_opcode(opcodes::all::OP_ENDIF),
                Terminal::OrI(..) => builder
                    .push_opcode(opcodes::all::OP_IF)
                    .push_astelem(&child(0))
                    .push_opcode(opcodes::all::OP_ELSE)
                    .push_astelem(&child(1))
                    .push_opcode(opcodes::all::OP_ENDIF),
                Terminal::Thresh(ref thresh) => {
                    let mut builder = builder.push_astelem(&child(0));
                    for n in 1..thresh.n() {
                        builder = builder.push_astelem(&child(n)).push_opcode(opcodes::all::OP_ADD);
                    }
                    builder
                        .push_int(thresh.k() as i64)
                        .push_opcode(opcodes::all::OP_EQUAL)
                }
                Terminal::Multi(ref thresh) => {
                    let mut builder = builder.push_int(thresh.k() as i64);
                    for pk in thresh.iter() {
                        builder = builder.push_ms_key::<_, Ctx>(pk);
                    }
                    builder
                        .push_int(thresh.n() as i64)
                        .push_opcode(opcodes::all::OP_CHECKMULTISIG)
                }
                Terminal::MultiA(ref thresh) => {
                    let mut builder = builder;
                    for (n, pk) in thresh.iter().enumerate() {
                        builder = builder.push_ms_key::<_, Ctx>(pk).push_opcode(if n == 0 {
                            opcodes::all::OP_CHECKSIG
                        } else {
                            opcodes::all::OP_CHECKSIGADD
                        });
                    }
                    builder
                        .push_int(thresh.k() as i64)
                        .push_opcode(opcodes::all::OP_NUMEQUAL)
                }
            };
            encoded.push(builder.into_script().into_bytes());
        }
        ScriptBuf::from_bytes(encoded.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use bitcoin::hashes::{sha256, Hash};
    use hex::FromHex;

    use crate::test_utils::pubkeys;
    use crate::{Expr, Segwitv0, Tap};

    type SegwitExpr = Expr<bitcoin::PublicKey, Segwitv0>;

    const KEY: &str = "02c2122e30e73f7fe37986e3f81ded00158e94b7ad472369b83bbdd28a9a198a39";

    fn asm(expr: SegwitExpr) -> String {
        let ms = expr.validate().unwrap();
        let script = ms.encode();
        assert_eq!(script.len(), ms.script_size(), "size estimate of {}", ms);
        script.to_asm_string()
    }

    fn pk() -> SegwitExpr { SegwitExpr::pk(pubkeys().0).unwrap() }

    #[test]
    fn leaves() {
        assert_eq!(asm(pk()), format!("OP_PUSHBYTES_33 {} OP_CHECKSIG", KEY));
        assert_eq!(asm(SegwitExpr::TRUE), "OP_PUSHNUM_1");
        assert_eq!(asm(SegwitExpr::FALSE), "OP_0");
        assert_eq!(
            asm(SegwitExpr::older(144).unwrap()),
            "OP_PUSHBYTES_2 9000 OP_CSV"
        );
        assert_eq!(asm(SegwitExpr::after(100).unwrap()), "OP_PUSHBYTES_1 64 OP_CLTV");

        let h = sha256::Hash::hash(&[]);
        assert_eq!(
            asm(SegwitExpr::sha256(h)),
            format!("OP_SIZE OP_PUSHBYTES_1 20 OP_EQUALVERIFY OP_SHA256 OP_PUSHBYTES_32 {} OP_EQUAL", h)
        );

        let pkh = asm(SegwitExpr::pkh(pubkeys().0).unwrap());
        assert!(pkh.starts_with("OP_DUP OP_HASH160 OP_PUSHBYTES_20 "));
        assert!(pkh.ends_with(" OP_EQUALVERIFY OP_CHECKSIG"));
    }

    #[test]
    fn verify_folds_into_last_opcode() {
        let h = sha256::Hash::hash(&[]);
        let v_hash = asm(SegwitExpr::t(SegwitExpr::verify(SegwitExpr::sha256(h)).unwrap()).unwrap());
        assert!(v_hash.ends_with(" OP_EQUALVERIFY OP_PUSHNUM_1"));

        let v_pk = asm(SegwitExpr::t(SegwitExpr::verify(pk()).unwrap()).unwrap());
        assert_eq!(v_pk, format!("OP_PUSHBYTES_33 {} OP_CHECKSIGVERIFY OP_PUSHNUM_1", KEY));

        // No foldable opcode at the end, so a plain VERIFY is added.
        let v_older = asm(SegwitExpr::t(SegwitExpr::verify(SegwitExpr::older(1).unwrap()).unwrap()).unwrap());
        assert_eq!(v_older, "OP_PUSHNUM_1 OP_CSV OP_VERIFY OP_PUSHNUM_1");
    }

    #[test]
    fn combinators() {
        let older = || SegwitExpr::older(1).unwrap();
        let after = || SegwitExpr::after(1).unwrap();
        let zero = || SegwitExpr::FALSE;

        assert_eq!(
            asm(SegwitExpr::and_or(zero(), older(), after()).unwrap()),
            "OP_0 OP_NOTIF OP_PUSHNUM_1 OP_CLTV OP_ELSE OP_PUSHNUM_1 OP_CSV OP_ENDIF"
        );
        assert_eq!(
            asm(SegwitExpr::or_i(older(), after()).unwrap()),
            "OP_IF OP_PUSHNUM_1 OP_CSV OP_ELSE OP_PUSHNUM_1 OP_CLTV OP_ENDIF"
        );
        assert_eq!(
            asm(SegwitExpr::or_d(zero(), older()).unwrap()),
            "OP_0 OP_IFDUP OP_NOTIF OP_PUSHNUM_1 OP_CSV OP_ENDIF"
        );
        assert_eq!(
            asm(SegwitExpr::and_b(zero(), SegwitExpr::alt(older()).unwrap()).unwrap()),
            "OP_0 OP_TOALTSTACK OP_PUSHNUM_1 OP_CSV OP_FROMALTSTACK OP_BOOLAND"
        );
        assert_eq!(
            asm(SegwitExpr::or_b(zero(), SegwitExpr::alt(zero()).unwrap()).unwrap()),
            "OP_0 OP_TOALTSTACK OP_0 OP_FROMALTSTACK OP_BOOLOR"
        );
        assert_eq!(
            asm(SegwitExpr::or_b(pk(), SegwitExpr::swap(pk()).unwrap()).unwrap()),
            format!("OP_PUSHBYTES_33 {0} OP_CHECKSIG OP_SWAP OP_PUSHBYTES_33 {0} OP_CHECKSIG OP_BOOLOR", KEY)
        );
        assert_eq!(
            asm(SegwitExpr::thresh(
                2,
                vec![zero(), SegwitExpr::alt(zero()).unwrap(), SegwitExpr::alt(zero()).unwrap()]
            )
            .unwrap()),
            "OP_0 OP_TOALTSTACK OP_0 OP_FROMALTSTACK OP_ADD \
             OP_TOALTSTACK OP_0 OP_FROMALTSTACK OP_ADD OP_PUSHNUM_2 OP_EQUAL"
        );
        assert_eq!(
            asm(SegwitExpr::dupif(SegwitExpr::verify(older()).unwrap()).unwrap()),
            "OP_DUP OP_IF OP_PUSHNUM_1 OP_CSV OP_VERIFY OP_ENDIF"
        );
        assert_eq!(
            asm(SegwitExpr::nonzero(pk()).unwrap()),
            format!("OP_SIZE OP_0NOTEQUAL OP_IF OP_PUSHBYTES_33 {} OP_CHECKSIG OP_ENDIF", KEY)
        );
        assert_eq!(
            asm(SegwitExpr::zero_not_equal(older()).unwrap()),
            "OP_PUSHNUM_1 OP_CSV OP_0NOTEQUAL"
        );
    }

    #[test]
    fn raw_bytes() {
        let ms = SegwitExpr::pk(pubkeys().0).unwrap().validate().unwrap();
        let expected = Vec::<u8>::from_hex(&format!("21{}ac", KEY)).unwrap();
        assert_eq!(ms.encode().into_bytes(), expected);
    }

    #[test]
    fn multisig() {
        let key = bitcoin::PublicKey::from_str(KEY).unwrap();
        let multi = asm(SegwitExpr::multi(1, vec![key, key]).unwrap());
        assert_eq!(
            multi,
            format!("OP_PUSHNUM_1 OP_PUSHBYTES_33 {0} OP_PUSHBYTES_33 {0} OP_PUSHNUM_2 OP_CHECKMULTISIG", KEY)
        );

        let xonly = pubkeys().2;
        let ms = Expr::<_, Tap>::multi_a(2, vec![xonly, xonly, xonly]).unwrap().validate().unwrap();
        let script = ms.encode();
        assert_eq!(script.len(), ms.script_size());
        assert_eq!(
            script.to_asm_string(),
            format!(
                "OP_PUSHBYTES_32 {0} OP_CHECKSIG OP_PUSHBYTES_32 {0} OP_CHECKSIGADD \
                 OP_PUSHBYTES_32 {0} OP_CHECKSIGADD OP_PUSHNUM_2 OP_NUMEQUAL",
                xonly
            )
        );
    }
}
