// SPDX-License-Identifier: CC0-1.0

//! A small Script interpreter covering the opcodes Miniscript emits.
//!
//! Signatures are checked against [`super::SIGHASH`] rather than a real
//! transaction digest, and timelocks against the fields of [`Evaluator`].
//! Conditions must be minimal, as under the segwit and tapscript relay
//! rules.

use bitcoin::hashes::{hash160, ripemd160, sha256, sha256d, Hash};
use bitcoin::key::XOnlyPublicKey;
use bitcoin::opcodes::all::*;
use bitcoin::script::Instruction;
use bitcoin::secp256k1::{Secp256k1, VerifyOnly};
use bitcoin::{ecdsa, taproot, Script};

use super::message;

/// Why a replay failed.
#[derive(Debug, PartialEq, Eq)]
pub enum EvalError {
    Parse,
    StackUnderflow,
    Verify(&'static str),
    NonMinimalIf,
    UnbalancedConditional,
    BadNumber,
    Timelock,
    UnknownOpcode(u8),
    /// The script ended with something other than a single true element.
    FinalStack(usize),
}

/// Executes a script over an initial stack.
pub struct Evaluator {
    secp: Secp256k1<VerifyOnly>,
    /// Tapscript semantics: x-only keys, Schnorr signatures, no `CHECKMULTISIG`.
    pub tapscript: bool,
    /// The transaction's nLockTime.
    pub lock_time: u32,
    /// The input's nSequence.
    pub sequence: u32,
}

fn as_bool(elem: &[u8]) -> bool {
    match elem.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last != 0 && last != 0x80),
    }
}

fn read_num(elem: &[u8]) -> Result<i64, EvalError> {
    if elem.len() > 5 {
        return Err(EvalError::BadNumber);
    }
    let last = match elem.last() {
        Some(&last) => last,
        None => return Ok(0),
    };
    let mut ret = 0i64;
    for (i, &b) in elem.iter().enumerate() {
        ret |= i64::from(b) << (8 * i);
    }
    if last & 0x80 != 0 {
        ret &= !(0x80i64 << (8 * (elem.len() - 1)));
        ret = -ret;
    }
    Ok(ret)
}

fn write_num(n: i64) -> Vec<u8> {
    let mut ret = vec![];
    let mut abs = n.unsigned_abs();
    while abs > 0 {
        ret.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    match ret.last() {
        Some(&last) if last & 0x80 != 0 => ret.push(if n < 0 { 0x80 } else { 0 }),
        Some(_) if n < 0 => {
            let len = ret.len();
            ret[len - 1] |= 0x80;
        }
        _ => {}
    }
    ret
}

fn write_bool(b: bool) -> Vec<u8> { if b { vec![1] } else { vec![] } }

struct Machine {
    stack: Vec<Vec<u8>>,
    alt: Vec<Vec<u8>>,
}

impl Machine {
    fn pop(&mut self) -> Result<Vec<u8>, EvalError> { self.stack.pop().ok_or(EvalError::StackUnderflow) }

    fn pop_num(&mut self) -> Result<i64, EvalError> { read_num(&self.pop()?) }

    fn top(&self) -> Result<&Vec<u8>, EvalError> { self.stack.last().ok_or(EvalError::StackUnderflow) }

    fn push(&mut self, elem: Vec<u8>) { self.stack.push(elem) }
}

impl Evaluator {
    /// Pre-taproot rules, with no timelock met.
    pub fn ecdsa() -> Self {
        Evaluator {
            secp: Secp256k1::verification_only(),
            tapscript: false,
            lock_time: 0,
            sequence: 0,
        }
    }

    pub fn tapscript() -> Self { Evaluator { tapscript: true, ..Self::ecdsa() } }

    /// Sets the input's nSequence.
    pub fn with_sequence(self, sequence: u32) -> Self { Evaluator { sequence, ..self } }

    fn check_sig(&self, sig: &[u8], key: &[u8]) -> bool {
        if sig.is_empty() {
            return false;
        }
        if self.tapscript {
            match (taproot::Signature::from_slice(sig), XOnlyPublicKey::from_slice(key)) {
                (Ok(sig), Ok(key)) => {
                    self.secp.verify_schnorr(&sig.signature, &message(), &key).is_ok()
                }
                _ => false,
            }
        } else {
            match (ecdsa::Signature::from_slice(sig), bitcoin::PublicKey::from_slice(key)) {
                (Ok(sig), Ok(key)) => {
                    self.secp.verify_ecdsa(&message(), &sig.signature, &key.inner).is_ok()
                }
                _ => false,
            }
        }
    }

    /// Runs `script` with `witness` as the initial stack, last element on
    /// top, and requires a single true element at the end.
    pub fn eval(&self, script: &Script, witness: &[Vec<u8>]) -> Result<(), EvalError> {
        let mut m = Machine { stack: witness.to_vec(), alt: vec![] };
        // One entry per open conditional: whether its current branch runs.
        let mut exec: Vec<bool> = vec![];

        for ins in script.instructions() {
            let ins = ins.map_err(|_| EvalError::Parse)?;
            let executing = exec.iter().all(|&b| b);
            let op = match ins {
                Instruction::PushBytes(bytes) => {
                    if executing {
                        m.push(bytes.as_bytes().to_vec());
                    }
                    continue;
                }
                Instruction::Op(op) => op,
            };

            match op {
                OP_IF | OP_NOTIF => {
                    let mut branch = false;
                    if executing {
                        let cond = m.pop()?;
                        if !cond.is_empty() && cond != [1] {
                            return Err(EvalError::NonMinimalIf);
                        }
                        branch = as_bool(&cond) == (op == OP_IF);
                    }
                    exec.push(branch);
                    continue;
                }
                OP_ELSE => {
                    let last = exec.last_mut().ok_or(EvalError::UnbalancedConditional)?;
                    *last = !*last;
                    continue;
                }
                OP_ENDIF => {
                    exec.pop().ok_or(EvalError::UnbalancedConditional)?;
                    continue;
                }
                _ if !executing => continue,
                _ => {}
            }

            let code = op.to_u8();
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code) {
                m.push(write_num(i64::from(code - OP_PUSHNUM_1.to_u8() + 1)));
                continue;
            }

            match op {
                OP_DUP => {
                    let top = m.top()?.clone();
                    m.push(top);
                }
                OP_IFDUP => {
                    let top = m.top()?.clone();
                    if as_bool(&top) {
                        m.push(top);
                    }
                }
                OP_SWAP => {
                    let a = m.pop()?;
                    let b = m.pop()?;
                    m.push(a);
                    m.push(b);
                }
                OP_TOALTSTACK => {
                    let top = m.pop()?;
                    m.alt.push(top);
                }
                OP_FROMALTSTACK => {
                    let top = m.alt.pop().ok_or(EvalError::StackUnderflow)?;
                    m.push(top);
                }
                OP_SIZE => {
                    let len = m.top()?.len();
                    m.push(write_num(len as i64));
                }
                OP_VERIFY => {
                    if !as_bool(&m.pop()?) {
                        return Err(EvalError::Verify("VERIFY"));
                    }
                }
                OP_EQUAL | OP_EQUALVERIFY => {
                    let a = m.pop()?;
                    let b = m.pop()?;
                    if op == OP_EQUALVERIFY {
                        if a != b {
                            return Err(EvalError::Verify("EQUALVERIFY"));
                        }
                    } else {
                        m.push(write_bool(a == b));
                    }
                }
                OP_NUMEQUAL | OP_NUMEQUALVERIFY => {
                    let a = m.pop_num()?;
                    let b = m.pop_num()?;
                    if op == OP_NUMEQUALVERIFY {
                        if a != b {
                            return Err(EvalError::Verify("NUMEQUALVERIFY"));
                        }
                    } else {
                        m.push(write_bool(a == b));
                    }
                }
                OP_0NOTEQUAL => {
                    let n = m.pop_num()?;
                    m.push(write_bool(n != 0));
                }
                OP_ADD => {
                    let a = m.pop_num()?;
                    let b = m.pop_num()?;
                    m.push(write_num(a + b));
                }
                OP_BOOLAND | OP_BOOLOR => {
                    let a = m.pop_num()? != 0;
                    let b = m.pop_num()? != 0;
                    m.push(write_bool(if op == OP_BOOLAND { a && b } else { a || b }));
                }
                OP_SHA256 => {
                    let e = m.pop()?;
                    m.push(sha256::Hash::hash(&e).to_byte_array().to_vec());
                }
                OP_HASH256 => {
                    let e = m.pop()?;
                    m.push(sha256d::Hash::hash(&e).to_byte_array().to_vec());
                }
                OP_RIPEMD160 => {
                    let e = m.pop()?;
                    m.push(ripemd160::Hash::hash(&e).to_byte_array().to_vec());
                }
                OP_HASH160 => {
                    let e = m.pop()?;
                    m.push(hash160::Hash::hash(&e).to_byte_array().to_vec());
                }
                OP_CLTV => {
                    let n = read_num(m.top()?)?;
                    if n < 0 || n > i64::from(self.lock_time) {
                        return Err(EvalError::Timelock);
                    }
                }
                OP_CSV => {
                    let n = read_num(m.top()?)?;
                    if n < 0 || n > i64::from(self.sequence & 0xffff) {
                        return Err(EvalError::Timelock);
                    }
                }
                OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                    let key = m.pop()?;
                    let sig = m.pop()?;
                    let ok = self.check_sig(&sig, &key);
                    if op == OP_CHECKSIGVERIFY {
                        if !ok {
                            return Err(EvalError::Verify("CHECKSIGVERIFY"));
                        }
                    } else {
                        m.push(write_bool(ok));
                    }
                }
                OP_CHECKSIGADD if self.tapscript => {
                    let key = m.pop()?;
                    let n = m.pop_num()?;
                    let sig = m.pop()?;
                    let ok = self.check_sig(&sig, &key);
                    m.push(write_num(n + i64::from(ok)));
                }
                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY if !self.tapscript => {
                    let n = m.pop_num()? as usize;
                    let mut keys = (0..n).map(|_| m.pop()).collect::<Result<Vec<_>, _>>()?;
                    keys.reverse();
                    let k = m.pop_num()? as usize;
                    let mut sigs = (0..k).map(|_| m.pop()).collect::<Result<Vec<_>, _>>()?;
                    sigs.reverse();
                    // The extra element consumed by CHECKMULTISIG must be empty.
                    if !m.pop()?.is_empty() {
                        return Err(EvalError::Verify("CHECKMULTISIG dummy"));
                    }
                    // Signatures match keys in order.
                    let mut keys = keys.iter();
                    let ok = sigs
                        .iter()
                        .all(|sig| keys.by_ref().any(|key| self.check_sig(sig, key)));
                    if op == OP_CHECKMULTISIGVERIFY {
                        if !ok {
                            return Err(EvalError::Verify("CHECKMULTISIGVERIFY"));
                        }
                    } else {
                        m.push(write_bool(ok));
                    }
                }
                other => return Err(EvalError::UnknownOpcode(other.to_u8())),
            }
        }

        if !exec.is_empty() {
            return Err(EvalError::UnbalancedConditional);
        }
        match m.stack.as_slice() {
            [top] if as_bool(top) => Ok(()),
            stack => Err(EvalError::FinalStack(stack.len())),
        }
    }
}

#[test]
fn script_numbers() {
    for n in [0i64, 1, 16, 127, 128, 255, 256, -1, -128, 500_000] {
        assert_eq!(read_num(&write_num(n)), Ok(n));
    }
    assert!(!as_bool(&[0, 0x80]));
    assert!(as_bool(&[0, 1]));
}
