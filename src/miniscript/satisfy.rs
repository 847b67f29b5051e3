// SPDX-License-Identifier: CC0-1.0

//! # Satisfaction and Dissatisfaction
//!
//! Traits and implementations to support producing witnesses for Miniscript
//! scriptpubkeys.
//!

use core::{cmp, fmt, mem};
use std::collections::HashMap;

use bitcoin::hashes::{hash160, ripemd160, sha256, sha256d};
use bitcoin::{absolute, ecdsa, taproot, Sequence, TapLeafHash};

use crate::iter::TreeLike;
use crate::miniscript::context::SigType;
use crate::util::witness_size;
use crate::{
    AbsLockTime, Miniscript, MiniscriptKey, RelLockTime, ScriptContext, Terminal, ToPublicKey,
};

mod sat_dissat;

/// A hashlock preimage; every hashlock takes exactly 32 bytes.
pub type Preimage32 = [u8; 32];

/// The material a witness can be built from.
///
/// Each lookup answers `None` and each timelock check `false` unless
/// overridden, so an implementation only provides what it holds.
pub trait Satisfier<Pk: MiniscriptKey + ToPublicKey> {
    /// An ECDSA signature by `pk`.
    fn lookup_ecdsa_sig(&self, _: &Pk) -> Option<ecdsa::Signature> { None }

    /// A Schnorr signature by `pk` committing to the given leaf.
    fn lookup_tap_leaf_script_sig(&self, _: &Pk, _: &TapLeafHash) -> Option<taproot::Signature> {
        None
    }

    /// The preimage of a `sha256` lock.
    fn lookup_sha256(&self, _: &Pk::Sha256) -> Option<Preimage32> { None }

    /// The preimage of a `hash256` lock.
    fn lookup_hash256(&self, _: &Pk::Hash256) -> Option<Preimage32> { None }

    /// The preimage of a `ripemd160` lock.
    fn lookup_ripemd160(&self, _: &Pk::Ripemd160) -> Option<Preimage32> { None }

    /// The preimage of a `hash160` lock.
    fn lookup_hash160(&self, _: &Pk::Hash160) -> Option<Preimage32> { None }

    /// Whether the spending input's sequence meets `older(t)`.
    fn check_older(&self, _: RelLockTime) -> bool { false }

    /// Whether the spending transaction's lock time meets `after(t)`.
    fn check_after(&self, _: AbsLockTime) -> bool { false }
}

// Holds nothing.
impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for () {}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for Sequence {
    fn check_older(&self, n: RelLockTime) -> bool {
        match (self.to_relative_lock_time(), n.to_relative_lock_time()) {
            (Some(have), Some(need)) => need.is_implied_by(have),
            _ => false,
        }
    }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for absolute::LockTime {
    fn check_after(&self, n: AbsLockTime) -> bool {
        absolute::LockTime::from(n).is_implied_by(*self)
    }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for HashMap<Pk, ecdsa::Signature> {
    fn lookup_ecdsa_sig(&self, key: &Pk) -> Option<ecdsa::Signature> { self.get(key).cloned() }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk>
    for HashMap<(Pk, TapLeafHash), taproot::Signature>
{
    fn lookup_tap_leaf_script_sig(&self, key: &Pk, h: &TapLeafHash) -> Option<taproot::Signature> {
        // Unlike ECDSA sigs, taproot signatures are keyed by the leaf as well
        self.get(&(key.clone(), *h)).cloned()
    }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for HashMap<sha256::Hash, Preimage32> {
    fn lookup_sha256(&self, h: &Pk::Sha256) -> Option<Preimage32> {
        self.get(&Pk::to_sha256(h)).copied()
    }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for HashMap<sha256d::Hash, Preimage32> {
    fn lookup_hash256(&self, h: &Pk::Hash256) -> Option<Preimage32> {
        self.get(&Pk::to_hash256(h)).copied()
    }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for HashMap<ripemd160::Hash, Preimage32> {
    fn lookup_ripemd160(&self, h: &Pk::Ripemd160) -> Option<Preimage32> {
        self.get(&Pk::to_ripemd160(h)).copied()
    }
}

impl<Pk: MiniscriptKey + ToPublicKey> Satisfier<Pk> for HashMap<hash160::Hash, Preimage32> {
    fn lookup_hash160(&self, h: &Pk::Hash160) -> Option<Preimage32> {
        self.get(&Pk::to_hash160(h)).copied()
    }
}

impl<'a, Pk: MiniscriptKey + ToPublicKey, S: Satisfier<Pk>> Satisfier<Pk> for &'a S {
    fn lookup_ecdsa_sig(&self, p: &Pk) -> Option<ecdsa::Signature> {
        (**self).lookup_ecdsa_sig(p)
    }

    fn lookup_tap_leaf_script_sig(&self, p: &Pk, h: &TapLeafHash) -> Option<taproot::Signature> {
        (**self).lookup_tap_leaf_script_sig(p, h)
    }

    fn lookup_sha256(&self, h: &Pk::Sha256) -> Option<Preimage32> { (**self).lookup_sha256(h) }

    fn lookup_hash256(&self, h: &Pk::Hash256) -> Option<Preimage32> {
        (**self).lookup_hash256(h)
    }

    fn lookup_ripemd160(&self, h: &Pk::Ripemd160) -> Option<Preimage32> {
        (**self).lookup_ripemd160(h)
    }

    fn lookup_hash160(&self, h: &Pk::Hash160) -> Option<Preimage32> {
        (**self).lookup_hash160(h)
    }

    fn check_older(&self, t: RelLockTime) -> bool { (**self).check_older(t) }

    fn check_after(&self, t: AbsLockTime) -> bool { (**self).check_after(t) }
}

macro_rules! impl_tuple_satisfier {
    ($($ty:ident),*) => {
        #[allow(non_snake_case)]
        impl<$($ty,)* Pk> Satisfier<Pk> for ($($ty,)*)
        where
            Pk: MiniscriptKey + ToPublicKey,
            $($ty: Satisfier< Pk>,)*
        {
            fn lookup_ecdsa_sig(&self, key: &Pk) -> Option<ecdsa::Signature> {
                let &($(ref $ty,)*) = self;
                $(
                    if let Some(result) = $ty.lookup_ecdsa_sig(key) {
                        return Some(result);
                    }
                )*
                None
            }

            fn lookup_tap_leaf_script_sig(
                &self,
                key: &Pk,
                h: &TapLeafHash,
            ) -> Option<taproot::Signature> {
                let &($(ref $ty,)*) = self;
                $(
                    if let Some(result) = $ty.lookup_tap_leaf_script_sig(key, h) {
                        return Some(result);
                    }
                )*
                None
            }

            fn lookup_sha256(&self, h: &Pk::Sha256) -> Option<Preimage32> {
                let &($(ref $ty,)*) = self;
                $(
                    if let Some(result) = $ty.lookup_sha256(h) {
                        return Some(result);
                    }
                )*
                None
            }

            fn lookup_hash256(&self, h: &Pk::Hash256) -> Option<Preimage32> {
                let &($(ref $ty,)*) = self;
                $(
                    if let Some(result) = $ty.lookup_hash256(h) {
                        return Some(result);
                    }
                )*
                None
            }

            fn lookup_ripemd160(&self, h: &Pk::Ripemd160) -> Option<Preimage32> {
                let &($(ref $ty,)*) = self;
                $(
                    if let Some(result) = $ty.lookup_ripemd160(h) {
                        return Some(result);
                    }
                )*
                None
            }

            fn lookup_hash160(&self, h: &Pk::Hash160) -> Option<Preimage32> {
                let &($(ref $ty,)*) = self;
                $(
                    if let Some(result) = $ty.lookup_hash160(h) {
                        return Some(result);
                    }
                )*
                None
            }

            fn check_older(&self, n: RelLockTime) -> bool {
                let &($(ref $ty,)*) = self;
                $(
                    if $ty.check_older(n) {
                        return true;
                    }
                )*
                false
            }

            fn check_after(&self, n: AbsLockTime) -> bool {
                let &($(ref $ty,)*) = self;
                $(
                    if $ty.check_after(n) {
                        return true;
                    }
                )*
                false
            }
        }
    }
}

impl_tuple_satisfier!(A);
impl_tuple_satisfier!(A, B);
impl_tuple_satisfier!(A, B, C);
impl_tuple_satisfier!(A, B, C, D);
impl_tuple_satisfier!(A, B, C, D, E);
impl_tuple_satisfier!(A, B, C, D, E, F);

/// Failure to produce a witness.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SatisfyError {
    /// A satisfaction exists but the satisfier lacks the signatures,
    /// preimages or timelocks needed for it.
    CouldNotSatisfy,
    /// The script has no satisfaction at all.
    ImpossibleSatisfaction,
}

impl SatisfyError {
    /// Whether supplying more material to the satisfier could help.
    pub fn is_retryable(&self) -> bool { matches!(self, SatisfyError::CouldNotSatisfy) }
}

impl fmt::Display for SatisfyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SatisfyError::CouldNotSatisfy => f.write_str("could not satisfy"),
            SatisfyError::ImpossibleSatisfaction => f.write_str("impossible to satisfy"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SatisfyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { None }
}

/// The outcome of building a witness for one fragment.
///
/// Ordered by cost: stacks by serialized size, then `Impossible`, then
/// `Unavailable`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Witness {
    /// The elements to push, bottom of the stack first.
    Stack(Vec<Vec<u8>>),
    /// Missing here, though others may hold the material, e.g. a preimage
    /// or a timelock which has not matured yet.
    Unavailable,
    /// Needs a signature we lack, which nobody else can supply on our behalf.
    Impossible,
}

impl PartialOrd for Witness {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { Some(self.cmp(other)) }
}

impl Ord for Witness {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match (self, other) {
            (Witness::Stack(v1), Witness::Stack(v2)) => witness_size(v1).cmp(&witness_size(v2)),
            (Witness::Stack(_), _) => cmp::Ordering::Less,
            (_, Witness::Stack(_)) => cmp::Ordering::Greater,
            (Witness::Impossible, Witness::Unavailable) => cmp::Ordering::Less,
            (Witness::Unavailable, Witness::Impossible) => cmp::Ordering::Greater,
            (Witness::Impossible, Witness::Impossible) => cmp::Ordering::Equal,
            (Witness::Unavailable, Witness::Unavailable) => cmp::Ordering::Equal,
        }
    }
}

impl Witness {
    /// A single signature push, looked up by the context's signature type.
    fn signature<Pk: ToPublicKey, S: Satisfier<Pk>, Ctx: ScriptContext>(
        sat: &S,
        pk: &Pk,
        leaf_hash: &TapLeafHash,
    ) -> Self {
        let sig = match Ctx::sig_type() {
            SigType::Ecdsa => sat.lookup_ecdsa_sig(pk).map(|sig| sig.to_vec()),
            SigType::Schnorr => sat.lookup_tap_leaf_script_sig(pk, leaf_hash).map(|sig| sig.to_vec()),
        };
        match sig {
            Some(sig) => Witness::Stack(vec![sig]),
            None => Witness::Impossible,
        }
    }

    /// A single preimage push.
    fn preimage(preimage: Option<Preimage32>) -> Self {
        match preimage {
            Some(pre) => Witness::Stack(vec![pre.to_vec()]),
            // Anyone who learns the preimage can use it.
            None => Witness::Unavailable,
        }
    }

    /// 32 zero bytes: the right size for a hashlock, but never a preimage.
    fn hash_dissatisfaction() -> Self { Witness::Stack(vec![vec![0; 32]]) }

    /// Nothing to push.
    fn empty() -> Self { Witness::Stack(vec![]) }

    /// Pushes `1`.
    fn push_1() -> Self { Witness::Stack(vec![vec![1]]) }

    /// Pushes the empty element.
    fn push_0() -> Self { Witness::Stack(vec![vec![]]) }

    /// Both witnesses, `one` deeper in the stack than `two`. A missing part
    /// makes the whole missing, with `Impossible` taking precedence.
    fn combine(one: Self, two: Self) -> Self {
        match (one, two) {
            (Witness::Impossible, _) | (_, Witness::Impossible) => Witness::Impossible,
            (Witness::Unavailable, _) | (_, Witness::Unavailable) => Witness::Unavailable,
            (Witness::Stack(mut a), Witness::Stack(b)) => {
                a.extend(b);
                Witness::Stack(a)
            }
        }
    }

    /// The serialized size of this witness, if it is available.
    pub fn size(&self) -> Option<usize> {
        match self {
            Witness::Stack(stack) => Some(witness_size(stack)),
            Witness::Unavailable | Witness::Impossible => None,
        }
    }
}

/// A satisfaction or dissatisfaction of a fragment.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Satisfaction {
    /// The witness.
    pub stack: Witness,
    /// Whether the witness holds a signature, which third parties cannot
    /// add or alter.
    pub has_sig: bool,
}

/// How a satisfaction picks between alternatives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Choice {
    NonMalleable,
    Malleable,
}

impl Satisfaction {
    const IMPOSSIBLE: Self = Satisfaction { stack: Witness::Impossible, has_sig: false };

    /// Weight added by satisfying instead of dissatisfying, for sorting.
    fn delta(sat: &Self, dissat: &Self) -> i64 {
        match (&sat.stack, &dissat.stack) {
            (Witness::Unavailable, _) | (Witness::Impossible, _) => i64::MAX,
            (_, Witness::Unavailable) | (_, Witness::Impossible) => i64::MIN,
            (Witness::Stack(s), Witness::Stack(d)) => {
                witness_size(s) as i64 - witness_size(d) as i64
            }
        }
    }

    /// Satisfies the `k` children in `sat_indices[..k]` and dissatisfies
    /// the rest, concatenating with the first child on top.
    fn flatten_thresh(
        k: usize,
        sat_indices: &[usize],
        mut pairs: Vec<(Satisfaction, Satisfaction)>,
    ) -> Self {
        for &i in sat_indices.iter().take(k) {
            let (ref mut dissat, ref mut sat) = pairs[i];
            mem::swap(dissat, sat);
        }
        Satisfaction {
            has_sig: pairs.iter().any(|(chosen, _)| chosen.has_sig),
            stack: pairs
                .into_iter()
                .fold(Witness::empty(), |acc, (chosen, _)| Witness::combine(chosen.stack, acc)),
        }
    }

    /// The non-malleable satisfaction of a `thresh` fragment, from the
    /// (dissatisfaction, satisfaction) pairs of its children.
    pub fn thresh(k: usize, pairs: Vec<(Satisfaction, Satisfaction)>) -> Self {
        // Candidate order: satisfiable before impossible, then signature-free
        // before signed, then by added weight. Signature-free satisfactions
        // must all be taken, or a third party could substitute them.
        let mut sat_indices = (0..pairs.len()).collect::<Vec<_>>();
        sat_indices.sort_by_key(|&i| {
            let (ref dissat, ref sat) = pairs[i];
            (sat.stack == Witness::Impossible, sat.has_sig, Self::delta(sat, dissat))
        });
        log::trace!("thresh({}) non-malleable selection order {:?}", k, sat_indices);

        if k == 0 || k > sat_indices.len() {
            return Self::IMPOSSIBLE;
        }

        // Fewer than k satisfiable children, as in thresh(2, sha256, 0, 0).
        if pairs[sat_indices[k - 1]].1.stack == Witness::Impossible {
            return Self::IMPOSSIBLE;
        }
        // An unchosen signature-free satisfaction could be swapped in. With
        // thresh(2, sha256, sha256, 0) there is none, since `0` cannot be
        // satisfied.
        if let Some(&next) = sat_indices.get(k) {
            let (_, ref sat) = pairs[next];
            if !sat.has_sig && sat.stack != Witness::Impossible {
                return Satisfaction { stack: Witness::Unavailable, has_sig: false };
            }
        }
        Self::flatten_thresh(k, &sat_indices, pairs)
    }

    /// The cheapest satisfaction of a `thresh` fragment, malleable or not.
    ///
    /// Witness size is additive over the children, so taking the `k`
    /// smallest deltas yields the cheapest overall witness.
    pub fn thresh_mall(k: usize, pairs: Vec<(Satisfaction, Satisfaction)>) -> Self {
        let mut sat_indices = (0..pairs.len()).collect::<Vec<_>>();
        sat_indices.sort_by_key(|&i| Self::delta(&pairs[i].1, &pairs[i].0));
        log::trace!("thresh({}) selection order {:?}", k, sat_indices);

        if k == 0 || k > sat_indices.len() {
            return Self::IMPOSSIBLE;
        }
        Self::flatten_thresh(k, &sat_indices, pairs)
    }

    /// The cheaper of two non-malleable satisfactions.
    pub fn minimum(sat1: Self, sat2: Self) -> Self {
        // An impossible side is never chosen, whatever its signatures.
        match (&sat1.stack, &sat2.stack) {
            (Witness::Impossible, _) => return sat2,
            (_, Witness::Impossible) => return sat1,
            _ => {}
        }
        match (sat1.has_sig, sat2.has_sig) {
            // Anyone could exchange one unsigned witness for the other.
            (false, false) => Satisfaction { stack: Witness::Unavailable, has_sig: false },
            // A signature can be stripped but not forged, so the unsigned
            // side is the only one a third party cannot replace.
            (false, true) => Satisfaction { stack: sat1.stack, has_sig: false },
            (true, false) => Satisfaction { stack: sat2.stack, has_sig: false },
            (true, true) => Satisfaction { stack: cmp::min(sat1.stack, sat2.stack), has_sig: true },
        }
    }

    /// The cheaper of two satisfactions, allowing witness malleability.
    pub fn minimum_mall(sat1: Self, sat2: Self) -> Self {
        match (&sat1.stack, &sat2.stack) {
            (Witness::Impossible, _) | (Witness::Unavailable, _) => return sat2,
            (_, Witness::Impossible) | (_, Witness::Unavailable) => return sat1,
            _ => {}
        }
        Satisfaction {
            stack: cmp::min(sat1.stack, sat2.stack),
            has_sig: sat1.has_sig && sat2.has_sig,
        }
    }

    fn choose(choice: Choice, sat1: Self, sat2: Self) -> Self {
        match choice {
            Choice::NonMalleable => Self::minimum(sat1, sat2),
            Choice::Malleable => Self::minimum_mall(sat1, sat2),
        }
    }

    /// Computes the (dissatisfaction, satisfaction) pair of every node of
    /// `ms`, children first, and returns the satisfaction of the root.
    fn satisfy_tree<Pk, Ctx, Sat>(
        ms: &Miniscript<Pk, Ctx>,
        stfr: &Sat,
        leaf_hash: &TapLeafHash,
        choice: Choice,
    ) -> Self
    where
        Pk: MiniscriptKey + ToPublicKey,
        Ctx: ScriptContext,
        Sat: Satisfier<Pk>,
    {
        // A signature at the root commits to the transaction's locktime
        // and sequence fields, so an unmet timelock cannot be worked around.
        let root_has_sig = ms.ty().mall.safe;

        let mut pairs: Vec<(Satisfaction, Satisfaction)> = vec![];
        for item in ms.post_order_iter() {
            let child = |n: usize| pairs[item.child_indices[n]].clone();
            let pair = match *item.node.node() {
                Terminal::True => (Self::IMPOSSIBLE, Self::TRIVIAL),
                Terminal::False => (Self::TRIVIAL, Self::IMPOSSIBLE),
                Terminal::PkK(ref pk) => Self::pk_k::<_, _, Ctx>(stfr, pk, leaf_hash),
                Terminal::PkH(ref pk) => Self::pk_h::<_, _, Ctx>(stfr, pk, leaf_hash),
                Terminal::After(t) => Self::after::<Pk, _>(stfr, t, root_has_sig),
                Terminal::Older(t) => Self::older::<Pk, _>(stfr, t, root_has_sig),
                Terminal::Sha256(ref h) => Self::hash(stfr.lookup_sha256(h)),
                Terminal::Hash256(ref h) => Self::hash(stfr.lookup_hash256(h)),
                Terminal::Ripemd160(ref h) => Self::hash(stfr.lookup_ripemd160(h)),
                Terminal::Hash160(ref h) => Self::hash(stfr.lookup_hash160(h)),
                Terminal::Alt(..)
                | Terminal::Swap(..)
                | Terminal::Check(..)
                | Terminal::ZeroNotEqual(..) => child(0),
                Terminal::DupIf(..) => Self::dupif(child(0)),
                Terminal::Verify(..) => Self::verify(child(0)),
                Terminal::NonZero(..) => Self::nonzero(child(0)),
                Terminal::AndV(..) => Self::and_v(child(0), child(1)),
                Terminal::AndB(..) => Self::and_b(child(0), child(1)),
                Terminal::AndOr(..) => Self::and_or(choice, child(0), child(1), child(2)),
                Terminal::OrB(..) => Self::or_b(choice, child(0), child(1)),
                Terminal::OrD(..) => Self::or_d(choice, child(0), child(1)),
                Terminal::OrC(..) => Self::or_c(choice, child(0), child(1)),
                Terminal::OrI(..) => Self::or_i(choice, child(0), child(1)),
                Terminal::Thresh(ref thresh) => {
                    let subs = (0..thresh.n()).map(child).collect::<Vec<_>>();
                    Self::thresh_pair(choice, thresh.k(), subs)
                }
                Terminal::Multi(ref thresh) => Self::multi::<_, _, Ctx>(stfr, thresh, leaf_hash),
                Terminal::MultiA(ref thresh) => Self::multi_a::<_, _, Ctx>(stfr, thresh, leaf_hash),
            };
            pairs.push(pair);
        }
        // The root comes last in post-order.
        pairs.pop().map(|(_, sat)| sat).unwrap_or(Self::IMPOSSIBLE)
    }

    /// The cheapest witness no third party can alter.
    pub(super) fn satisfy<Pk, Ctx, Sat>(
        ms: &Miniscript<Pk, Ctx>,
        stfr: &Sat,
        leaf_hash: &TapLeafHash,
    ) -> Self
    where
        Pk: MiniscriptKey + ToPublicKey,
        Ctx: ScriptContext,
        Sat: Satisfier<Pk>,
    {
        Self::satisfy_tree(ms, stfr, leaf_hash, Choice::NonMalleable)
    }

    /// The cheapest witness, even if third parties could alter it.
    pub(super) fn satisfy_mall<Pk, Ctx, Sat>(
        ms: &Miniscript<Pk, Ctx>,
        stfr: &Sat,
        leaf_hash: &TapLeafHash,
    ) -> Self
    where
        Pk: MiniscriptKey + ToPublicKey,
        Ctx: ScriptContext,
        Sat: Satisfier<Pk>,
    {
        Self::satisfy_tree(ms, stfr, leaf_hash, Choice::Malleable)
    }
}
