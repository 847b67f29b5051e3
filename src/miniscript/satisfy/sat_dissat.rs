// SPDX-License-Identifier: CC0-1.0

//! Satisfactions and dissatisfactions for individual Miniscript fragments.
//!
//! Every function here returns a (dissatisfaction, satisfaction) pair,
//! built from the pairs of the fragment's children.

use bitcoin::TapLeafHash;

use super::{Choice, Preimage32, Satisfaction, Satisfier, Witness};
use crate::miniscript::limits::{MAX_PUBKEYS_IN_CHECKSIGADD, MAX_PUBKEYS_PER_MULTISIG};
use crate::util::key_bytes;
use crate::{AbsLockTime, RelLockTime, ScriptContext, Threshold, ToPublicKey};

type Pair = (Satisfaction, Satisfaction);

impl Satisfaction {
    pub(super) const TRIVIAL: Self = Satisfaction { stack: Witness::Stack(Vec::new()), has_sig: false };

    fn push_0() -> Self { Satisfaction { stack: Witness::push_0(), has_sig: false } }

    /// Places `top` above `deeper` on the stack.
    fn concat(deeper: Self, top: Self) -> Self {
        Satisfaction {
            has_sig: deeper.has_sig || top.has_sig,
            stack: Witness::combine(deeper.stack, top.stack),
        }
    }

    /// Pushes an `IF` selector above `self`.
    fn select(self, selector: Witness) -> Self {
        Satisfaction { stack: Witness::combine(self.stack, selector), has_sig: self.has_sig }
    }

    /// The (dissatisfaction, satisfaction) pair for a `pk_k` fragment.
    pub(super) fn pk_k<Pk, S, Ctx>(stfr: &S, pk: &Pk, leaf_hash: &TapLeafHash) -> Pair
    where
        Pk: ToPublicKey,
        S: Satisfier<Pk>,
        Ctx: ScriptContext,
    {
        (
            Self::push_0(),
            Satisfaction { stack: Witness::signature::<_, _, Ctx>(stfr, pk, leaf_hash), has_sig: true },
        )
    }

    /// The (dissatisfaction, satisfaction) pair for a `pk_h` fragment.
    pub(super) fn pk_h<Pk, S, Ctx>(stfr: &S, pk: &Pk, leaf_hash: &TapLeafHash) -> Pair
    where
        Pk: ToPublicKey,
        S: Satisfier<Pk>,
        Ctx: ScriptContext,
    {
        let key = || Witness::Stack(vec![key_bytes::<Pk, Ctx>(pk)]);
        (
            Satisfaction { stack: Witness::combine(Witness::push_0(), key()), has_sig: false },
            Satisfaction {
                stack: Witness::combine(Witness::signature::<_, _, Ctx>(stfr, pk, leaf_hash), key()),
                has_sig: true,
            },
        )
    }

    fn timelock(met: bool, root_has_sig: bool) -> Pair {
        let stack = if met {
            Witness::empty()
        } else if root_has_sig {
            // The root's signature fixes nLockTime and nSequence, so nobody
            // can change them to meet the lock later.
            Witness::Impossible
        } else {
            Witness::Unavailable
        };
        (Self::IMPOSSIBLE, Satisfaction { stack, has_sig: false })
    }

    /// The (dissatisfaction, satisfaction) pair for an `after` fragment.
    pub(super) fn after<Pk, S>(stfr: &S, t: AbsLockTime, root_has_sig: bool) -> Pair
    where
        Pk: ToPublicKey,
        S: Satisfier<Pk>,
    {
        Self::timelock(stfr.check_after(t), root_has_sig)
    }

    /// The (dissatisfaction, satisfaction) pair for an `older` fragment.
    pub(super) fn older<Pk, S>(stfr: &S, t: RelLockTime, root_has_sig: bool) -> Pair
    where
        Pk: ToPublicKey,
        S: Satisfier<Pk>,
    {
        Self::timelock(stfr.check_older(t), root_has_sig)
    }

    /// The (dissatisfaction, satisfaction) pair for any hashlock.
    pub(super) fn hash(preimage: Option<Preimage32>) -> Pair {
        (
            Satisfaction { stack: Witness::hash_dissatisfaction(), has_sig: false },
            Satisfaction { stack: Witness::preimage(preimage), has_sig: false },
        )
    }

    pub(super) fn dupif((_, sat): Pair) -> Pair { (Self::push_0(), sat.select(Witness::push_1())) }

    pub(super) fn verify((_, sat): Pair) -> Pair { (Self::IMPOSSIBLE, sat) }

    pub(super) fn nonzero((_, sat): Pair) -> Pair { (Self::push_0(), sat) }

    pub(super) fn and_v((_, l_sat): Pair, (r_dissat, r_sat): Pair) -> Pair {
        (Self::concat(r_dissat, l_sat.clone()), Self::concat(r_sat, l_sat))
    }

    pub(super) fn and_b((l_dissat, l_sat): Pair, (r_dissat, r_sat): Pair) -> Pair {
        (Self::concat(r_dissat, l_dissat), Self::concat(r_sat, l_sat))
    }

    pub(super) fn and_or(
        choice: Choice,
        (a_dissat, a_sat): Pair,
        (_, b_sat): Pair,
        (c_dissat, c_sat): Pair,
    ) -> Pair {
        (
            Self::concat(c_dissat, a_dissat.clone()),
            Self::choose(
                choice,
                Self::concat(b_sat, a_sat),
                Self::concat(c_sat, a_dissat),
            ),
        )
    }

    pub(super) fn or_b(choice: Choice, (l_dissat, l_sat): Pair, (r_dissat, r_sat): Pair) -> Pair {
        (
            Self::concat(r_dissat.clone(), l_dissat.clone()),
            Self::choose(
                choice,
                Self::concat(r_sat, l_dissat),
                Self::concat(r_dissat, l_sat),
            ),
        )
    }

    pub(super) fn or_d(choice: Choice, (l_dissat, l_sat): Pair, (r_dissat, r_sat): Pair) -> Pair {
        (
            Self::concat(r_dissat, l_dissat.clone()),
            Self::choose(choice, l_sat, Self::concat(r_sat, l_dissat)),
        )
    }

    pub(super) fn or_c(choice: Choice, (l_dissat, l_sat): Pair, (_, r_sat): Pair) -> Pair {
        (Self::IMPOSSIBLE, Self::choose(choice, l_sat, Self::concat(r_sat, l_dissat)))
    }

    pub(super) fn or_i(choice: Choice, (l_dissat, l_sat): Pair, (r_dissat, r_sat): Pair) -> Pair {
        (
            // Malleating a dissatisfaction cannot turn it into a spend.
            Self::minimum_mall(
                l_dissat.select(Witness::push_1()),
                r_dissat.select(Witness::push_0()),
            ),
            Self::choose(
                choice,
                l_sat.select(Witness::push_1()),
                r_sat.select(Witness::push_0()),
            ),
        )
    }

    pub(super) fn thresh_pair(choice: Choice, k: usize, subs: Vec<Pair>) -> Pair {
        let dissat = subs
            .iter()
            .fold(Self::TRIVIAL, |acc, (dissat, _)| Self::concat(dissat.clone(), acc));
        let sat = match choice {
            Choice::NonMalleable => Self::thresh(k, subs),
            Choice::Malleable => Self::thresh_mall(k, subs),
        };
        (dissat, sat)
    }

    /// The (dissatisfaction, satisfaction) pair for a `multi` fragment.
    pub(super) fn multi<Pk, S, Ctx>(
        stfr: &S,
        thresh: &Threshold<Pk, MAX_PUBKEYS_PER_MULTISIG>,
        leaf_hash: &TapLeafHash,
    ) -> Pair
    where
        Pk: ToPublicKey,
        S: Satisfier<Pk>,
        Ctx: ScriptContext,
    {
        let k = thresh.k();
        let dissat = Satisfaction { stack: Witness::Stack(vec![vec![]; k + 1]), has_sig: false };

        // Signatures we hold, in key order.
        let mut sigs = thresh
            .iter()
            .filter_map(|pk| match Witness::signature::<_, _, Ctx>(stfr, pk, leaf_hash) {
                Witness::Stack(mut sig) => sig.pop(),
                Witness::Impossible | Witness::Unavailable => None,
            })
            .collect::<Vec<_>>();
        if sigs.len() < k {
            return (dissat, Self::IMPOSSIBLE);
        }
        // Keep the k smallest.
        while sigs.len() > k {
            let longest = sigs.iter().enumerate().max_by_key(|(_, sig)| sig.len()).map(|(i, _)| i);
            if let Some(idx) = longest {
                sigs.remove(idx);
            }
        }

        // Dummy element consumed by CHECKMULTISIG.
        let mut stack = vec![vec![]];
        stack.extend(sigs);
        (dissat, Satisfaction { stack: Witness::Stack(stack), has_sig: true })
    }

    /// The (dissatisfaction, satisfaction) pair for a `multi_a` fragment.
    pub(super) fn multi_a<Pk, S, Ctx>(
        stfr: &S,
        thresh: &Threshold<Pk, MAX_PUBKEYS_IN_CHECKSIGADD>,
        leaf_hash: &TapLeafHash,
    ) -> Pair
    where
        Pk: ToPublicKey,
        S: Satisfier<Pk>,
        Ctx: ScriptContext,
    {
        let (k, n) = (thresh.k(), thresh.n());
        let dissat = Satisfaction { stack: Witness::Stack(vec![vec![]; n]), has_sig: false };

        // The first key is checked first, so its signature goes on top
        let mut stack = vec![vec![]; n];
        let mut sig_count = 0;
        for (i, pk) in thresh.iter().rev().enumerate() {
            if let Witness::Stack(mut sig) = Witness::signature::<_, _, Ctx>(stfr, pk, leaf_hash) {
                if let Some(sig) = sig.pop() {
                    stack[i] = sig;
                    sig_count += 1;
                }
                // Stop at k signatures; the remaining keys get an empty push.
                if sig_count == k {
                    break;
                }
            }
        }

        if sig_count < k {
            (dissat, Self::IMPOSSIBLE)
        } else {
            (dissat, Satisfaction { stack: Witness::Stack(stack), has_sig: true })
        }
    }
}
