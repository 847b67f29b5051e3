// SPDX-License-Identifier: CC0-1.0

//! Other miscellaneous type properties which are not related to
//! correctness or malleability.

use core::cmp;

use crate::miniscript::context::SigType;
use crate::miniscript::terminal::Terminal;
use crate::miniscript::Node;
use crate::{script_num_size, MiniscriptKey, ScriptContext};

/// Which kinds of timelock a fragment uses, and whether some satisfaction
/// would need two that cannot coexist in one transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct TimelockInfo {
    /// `older` with a block count.
    pub csv_with_height: bool,
    /// `older` with a time interval.
    pub csv_with_time: bool,
    /// `after` with a block height.
    pub cltv_with_height: bool,
    /// `after` with a timestamp.
    pub cltv_with_time: bool,
    /// Some satisfaction needs both a height and a time lock of one kind.
    pub contains_combination: bool,
}

impl TimelockInfo {
    /// Whether any spending path mixes height and time locks.
    pub fn contains_unspendable_path(self) -> bool { self.contains_combination }

    /// Both sides must be satisfied together.
    pub(crate) fn combine_and(a: Self, b: Self) -> Self { Self::combine_threshold(2, [a, b]) }

    /// Only one side is satisfied.
    pub(crate) fn combine_or(a: Self, b: Self) -> Self { Self::combine_threshold(1, [a, b]) }

    /// Combines the children of a k-of-n.
    ///
    /// For `k == 1` only one child is satisfied, so their flags merely
    /// accumulate. Otherwise any two children may be satisfied together and
    /// conflicting pairs are recorded.
    pub(crate) fn combine_threshold<I>(k: usize, timelocks: I) -> TimelockInfo
    where
        I: IntoIterator<Item = TimelockInfo>,
    {
        timelocks.into_iter().fold(TimelockInfo::default(), |mut acc, t| {
            if k > 1 {
                acc.contains_combination |= (acc.csv_with_height && t.csv_with_time)
                    || (acc.csv_with_time && t.csv_with_height)
                    || (acc.cltv_with_time && t.cltv_with_height)
                    || (acc.cltv_with_height && t.cltv_with_time);
            }
            acc.csv_with_height |= t.csv_with_height;
            acc.csv_with_time |= t.csv_with_time;
            acc.cltv_with_height |= t.cltv_with_height;
            acc.cltv_with_time |= t.cltv_with_time;
            acc.contains_combination |= t.contains_combination;
            acc
        })
    }
}

// Timelock kinds a single witness needs, as bits of a mask.
const CSV_HEIGHT: u8 = 1 << 0;
const CSV_TIME: u8 = 1 << 1;
const CLTV_HEIGHT: u8 = 1 << 2;
const CLTV_TIME: u8 = 1 << 3;

/// Which combinations of timelock kinds a fragment can be satisfied and
/// dissatisfied with.
///
/// Each field is a set of masks over the four kinds of [`TimelockInfo`]:
/// bit `m` is set when some witness needs exactly the kinds in `m`. Masks
/// needing both a height and a time lock of one opcode are never stored,
/// so an empty set means no witness can exist in a valid transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct LockPaths {
    /// Masks of the satisfactions.
    pub sat: u16,
    /// Masks of the dissatisfactions.
    pub dissat: u16,
}

impl LockPaths {
    /// No witness at all.
    const NONE: u16 = 0;
    /// A witness needing no timelock.
    const FREE: u16 = 1;

    fn single(mask: u8) -> u16 { 1 << mask }

    fn is_mixed(mask: u8) -> bool {
        mask & (CSV_HEIGHT | CSV_TIME) == CSV_HEIGHT | CSV_TIME
            || mask & (CLTV_HEIGHT | CLTV_TIME) == CLTV_HEIGHT | CLTV_TIME
    }

    /// Every way of combining one witness from `a` with one from `b`.
    fn join(a: u16, b: u16) -> u16 {
        let mut out = 0;
        for ma in (0..16u8).filter(|m| a & (1 << m) != 0) {
            for mb in (0..16u8).filter(|m| b & (1 << m) != 0) {
                if !Self::is_mixed(ma | mb) {
                    out |= 1 << (ma | mb);
                }
            }
        }
        out
    }

    /// A leaf which needs no timelock.
    fn leaf(dissatisfiable: bool) -> Self {
        LockPaths { sat: Self::FREE, dissat: if dissatisfiable { Self::FREE } else { Self::NONE } }
    }

    /// Whether some satisfaction avoids mixing timelocks.
    pub fn can_satisfy(self) -> bool { self.sat != Self::NONE }

    /// Whether some dissatisfaction avoids mixing timelocks.
    pub fn can_dissatisfy(self) -> bool { self.dissat != Self::NONE }

    /// Lock paths of `thresh(k, subs)`: exactly `k` children satisfied and
    /// the others dissatisfied.
    fn threshold<I: IntoIterator<Item = LockPaths>>(k: usize, subs: I) -> Self {
        // by_count[j]: masks reachable with j children satisfied so far.
        let mut by_count = vec![Self::FREE];
        for sub in subs {
            let mut next = vec![Self::NONE; by_count.len() + 1];
            for (j, &masks) in by_count.iter().enumerate() {
                next[j] |= Self::join(masks, sub.dissat);
                next[j + 1] |= Self::join(masks, sub.sat);
            }
            by_count = next;
        }
        LockPaths {
            sat: by_count.get(k).copied().unwrap_or(Self::NONE),
            dissat: by_count[0],
        }
    }
}

/// Worst-case resource usage of a satisfaction or dissatisfaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct SatData {
    /// Witness bytes, each element counted with its length prefix.
    pub max_witness_stack_size: usize,
    /// Witness elements.
    pub max_witness_stack_count: usize,
    /// Bytes when the witness is pushed by a scriptSig instead.
    pub max_script_sig_size: usize,
    /// Stack elements created while executing, on top of the witness.
    pub max_exec_stack_count: usize,
    /// Opcodes executed beyond the static count; only `CHECKMULTISIG`
    /// adds any.
    pub max_exec_op_count: usize,
}

impl SatData {
    const fn pushes(witness_size: usize, count: usize, script_sig: usize, exec: usize) -> Self {
        SatData {
            max_witness_stack_size: witness_size,
            max_witness_stack_count: count,
            max_script_sig_size: script_sig,
            max_exec_stack_count: exec,
            max_exec_op_count: 0,
        }
    }

    /// The empty push: one length byte in a witness, `OP_0` in a scriptSig.
    const EMPTY: Self = SatData::pushes(1, 1, 1, 1);

    /// Runs `self` then `next`, with `shift` items left on the stack by
    /// `self` while `next` executes.
    fn then(self, next: Self, shift: usize) -> Self {
        SatData {
            max_witness_stack_size: self.max_witness_stack_size + next.max_witness_stack_size,
            max_witness_stack_count: self.max_witness_stack_count + next.max_witness_stack_count,
            max_script_sig_size: self.max_script_sig_size + next.max_script_sig_size,
            max_exec_stack_count: cmp::max(
                self.max_exec_stack_count,
                next.max_exec_stack_count + shift,
            ),
            max_exec_op_count: self.max_exec_op_count + next.max_exec_op_count,
        }
    }

    /// Adds a branch-selector push in front of the witness.
    fn with_selector(self, witness_size: usize) -> Self {
        SatData {
            max_witness_stack_size: self.max_witness_stack_size + witness_size,
            max_witness_stack_count: self.max_witness_stack_count + 1,
            max_script_sig_size: self.max_script_sig_size + 1,
            ..self
        }
    }

    /// Field-wise maximum: the worst case over two alternatives.
    fn worst(self, other: Self) -> Self {
        SatData {
            max_witness_stack_size: cmp::max(
                self.max_witness_stack_size,
                other.max_witness_stack_size,
            ),
            max_witness_stack_count: cmp::max(
                self.max_witness_stack_count,
                other.max_witness_stack_count,
            ),
            max_script_sig_size: cmp::max(self.max_script_sig_size, other.max_script_sig_size),
            max_exec_stack_count: cmp::max(self.max_exec_stack_count, other.max_exec_stack_count),
            max_exec_op_count: cmp::max(self.max_exec_op_count, other.max_exec_op_count),
        }
    }
}

fn then(a: Option<SatData>, b: Option<SatData>, shift: usize) -> Option<SatData> {
    Some(a?.then(b?, shift))
}

fn worst(a: Option<SatData>, b: Option<SatData>) -> Option<SatData> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.worst(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Structure representing the extra type properties of a fragment.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ExtData {
    /// Encoded script size in bytes.
    pub pk_cost: usize,
    /// Whether the fragment ends in `EQUAL`, `CHECKSIG`, `CHECKMULTISIG`
    /// or `NUMEQUAL`, so that `v:` folds into the `*VERIFY` form.
    pub has_free_verify: bool,
    /// Non-push opcodes in the script, executed or not.
    pub static_ops: usize,
    /// Worst-case satisfaction, `None` if there is none.
    pub sat_data: Option<SatData>,
    /// Worst-case dissatisfaction, `None` if there is none.
    pub dissat_data: Option<SatData>,
    /// Timelock usage.
    pub timelock_info: TimelockInfo,
    /// Timelock combinations of the satisfactions and dissatisfactions.
    pub lock_paths: LockPaths,
    /// Height of the tree; leaves are 0.
    pub tree_height: usize,
}

impl ExtData {
    /// `1`
    pub const TRUE: Self = ExtData {
        pk_cost: 1,
        has_free_verify: false,
        static_ops: 0,
        sat_data: Some(SatData::pushes(0, 0, 0, 1)),
        dissat_data: None,
        timelock_info: TimelockInfo {
            csv_with_height: false,
            csv_with_time: false,
            cltv_with_height: false,
            cltv_with_time: false,
            contains_combination: false,
        },
        lock_paths: LockPaths { sat: LockPaths::FREE, dissat: LockPaths::NONE },
        tree_height: 0,
    };

    /// `0`
    pub const FALSE: Self = ExtData {
        sat_data: None,
        dissat_data: Some(SatData::pushes(0, 0, 0, 1)),
        lock_paths: LockPaths { sat: LockPaths::NONE, dissat: LockPaths::FREE },
        ..Self::TRUE
    };

    fn sig_len<Ctx: ScriptContext>() -> usize {
        match Ctx::sig_type() {
            SigType::Ecdsa => 73,
            SigType::Schnorr => 66,
        }
    }

    fn leaf(pk_cost: usize, static_ops: usize, sat: SatData, dissat: Option<SatData>) -> Self {
        ExtData {
            pk_cost,
            static_ops,
            sat_data: Some(sat),
            dissat_data: dissat,
            lock_paths: LockPaths::leaf(dissat.is_some()),
            ..Self::TRUE
        }
    }

    /// `pk_k`
    pub fn pk_k<Pk: MiniscriptKey, Ctx: ScriptContext>(pk: &Pk) -> Self {
        let sig = Self::sig_len::<Ctx>();
        Self::leaf(Ctx::pk_len(pk), 0, SatData::pushes(sig, 1, sig, 1), Some(SatData::EMPTY))
    }

    /// `pk_h`
    pub fn pk_h<Pk: MiniscriptKey, Ctx: ScriptContext>(pk: &Pk) -> Self {
        let sig = Self::sig_len::<Ctx>();
        let key = Ctx::pk_len(pk);
        Self::leaf(
            24,
            3,
            SatData::pushes(sig + key, 2, sig + key, 2),
            Some(SatData::pushes(1 + key, 2, 1 + key, 2)),
        )
    }

    /// `multi`
    pub fn multi<Pk: MiniscriptKey, Ctx: ScriptContext>(k: usize, pks: &[Pk]) -> Self {
        let n = pks.len();
        let sat = SatData { max_exec_op_count: n, ..SatData::pushes(1 + 73 * k, k + 1, 1 + 73 * k, n) };
        let dissat = SatData { max_exec_op_count: n, ..SatData::pushes(k + 1, k + 1, k + 1, n) };
        Self::leaf(
            script_num_size(k) + script_num_size(n) + 1 + pks.iter().map(Ctx::pk_len).sum::<usize>(),
            1,
            sat,
            Some(dissat),
        )
        .free_verify()
    }

    /// `multi_a`
    pub fn multi_a<Pk: MiniscriptKey, Ctx: ScriptContext>(k: usize, pks: &[Pk]) -> Self {
        let n = pks.len();
        let sig = Self::sig_len::<Ctx>();
        let sat_size = (n - k) + sig * k;
        Self::leaf(
            pks.iter().map(|pk| Ctx::pk_len(pk) + 1).sum::<usize>() + script_num_size(k) + 1,
            n + 1,
            SatData::pushes(sat_size, n, sat_size, 2),
            Some(SatData::pushes(n, n, n, 2)),
        )
        .free_verify()
    }

    /// A hash fragment whose digest is `digest_len` bytes.
    pub fn hash(digest_len: usize) -> Self {
        let preimage = SatData::pushes(33, 1, 33, 2);
        Self::leaf(6 + 1 + digest_len, 4, preimage, Some(preimage)).free_verify()
    }

    /// `after`
    pub fn after(t: crate::AbsLockTime) -> Self {
        ExtData {
            timelock_info: TimelockInfo {
                cltv_with_height: t.is_block_height(),
                cltv_with_time: t.is_block_time(),
                ..TimelockInfo::default()
            },
            lock_paths: LockPaths {
                sat: LockPaths::single(if t.is_block_height() { CLTV_HEIGHT } else { CLTV_TIME }),
                dissat: LockPaths::NONE,
            },
            ..Self::leaf(
                script_num_size(t.to_consensus_u32() as usize) + 1,
                1,
                SatData::pushes(0, 0, 0, 1),
                None,
            )
        }
    }

    /// `older`
    pub fn older(t: crate::RelLockTime) -> Self {
        ExtData {
            timelock_info: TimelockInfo {
                csv_with_height: t.is_height_locked(),
                csv_with_time: t.is_time_locked(),
                ..TimelockInfo::default()
            },
            lock_paths: LockPaths {
                sat: LockPaths::single(if t.is_height_locked() { CSV_HEIGHT } else { CSV_TIME }),
                dissat: LockPaths::NONE,
            },
            ..Self::leaf(
                script_num_size(t.to_consensus_u32() as usize) + 1,
                1,
                SatData::pushes(0, 0, 0, 1),
                None,
            )
        }
    }

    fn free_verify(self) -> Self { ExtData { has_free_verify: true, ..self } }

    /// A wrapper adding `cost` bytes which are all opcodes.
    fn wrap(self, cost: usize) -> Self {
        ExtData {
            pk_cost: self.pk_cost + cost,
            static_ops: self.static_ops + cost,
            has_free_verify: false,
            tree_height: self.tree_height + 1,
            ..self
        }
    }

    /// `a:`
    pub fn cast_alt(self) -> Self { self.wrap(2) }

    /// `s:`
    pub fn cast_swap(self) -> Self {
        ExtData { has_free_verify: self.has_free_verify, ..self.wrap(1) }
    }

    /// `c:`
    pub fn cast_check(self) -> Self { self.wrap(1).free_verify() }

    /// `d:`
    pub fn cast_dupif(self) -> Self {
        ExtData {
            sat_data: self.sat_data.map(|sat| sat.with_selector(2)),
            dissat_data: Some(SatData::EMPTY),
            lock_paths: LockPaths { dissat: LockPaths::FREE, ..self.lock_paths },
            ..self.wrap(3)
        }
    }

    /// `v:`
    pub fn cast_verify(self) -> Self {
        let cost = if self.has_free_verify { 0 } else { 1 };
        ExtData {
            dissat_data: None,
            lock_paths: LockPaths { dissat: LockPaths::NONE, ..self.lock_paths },
            ..self.wrap(cost)
        }
    }

    /// `j:`
    pub fn cast_nonzero(self) -> Self {
        ExtData {
            dissat_data: Some(SatData::EMPTY),
            lock_paths: LockPaths { dissat: LockPaths::FREE, ..self.lock_paths },
            ..self.wrap(4)
        }
    }

    /// `n:`
    pub fn cast_zeronotequal(self) -> Self { self.wrap(1) }

    fn combine(subs: &[Self], opcodes: usize) -> Self {
        ExtData {
            pk_cost: subs.iter().map(|s| s.pk_cost).sum::<usize>() + opcodes,
            has_free_verify: false,
            static_ops: subs.iter().map(|s| s.static_ops).sum::<usize>() + opcodes,
            sat_data: None,
            dissat_data: None,
            timelock_info: TimelockInfo::default(),
            lock_paths: LockPaths { sat: LockPaths::NONE, dissat: LockPaths::NONE },
            tree_height: 1 + subs.iter().map(|s| s.tree_height).max().unwrap_or(0),
        }
    }

    /// `and_v`
    pub fn and_v(l: Self, r: Self) -> Self {
        ExtData {
            has_free_verify: r.has_free_verify,
            sat_data: then(l.sat_data, r.sat_data, 0),
            timelock_info: TimelockInfo::combine_and(l.timelock_info, r.timelock_info),
            lock_paths: LockPaths {
                sat: LockPaths::join(l.lock_paths.sat, r.lock_paths.sat),
                dissat: LockPaths::NONE,
            },
            ..Self::combine(&[l, r], 0)
        }
    }

    /// `and_b`
    pub fn and_b(l: Self, r: Self) -> Self {
        ExtData {
            sat_data: then(l.sat_data, r.sat_data, 1),
            dissat_data: then(l.dissat_data, r.dissat_data, 1),
            timelock_info: TimelockInfo::combine_and(l.timelock_info, r.timelock_info),
            lock_paths: LockPaths {
                sat: LockPaths::join(l.lock_paths.sat, r.lock_paths.sat),
                dissat: LockPaths::join(l.lock_paths.dissat, r.lock_paths.dissat),
            },
            ..Self::combine(&[l, r], 1)
        }
    }

    /// `or_b`
    pub fn or_b(l: Self, r: Self) -> Self {
        ExtData {
            sat_data: worst(then(l.sat_data, r.dissat_data, 1), then(l.dissat_data, r.sat_data, 1)),
            dissat_data: then(l.dissat_data, r.dissat_data, 1),
            timelock_info: TimelockInfo::combine_or(l.timelock_info, r.timelock_info),
            lock_paths: LockPaths {
                sat: LockPaths::join(l.lock_paths.sat, r.lock_paths.dissat)
                    | LockPaths::join(l.lock_paths.dissat, r.lock_paths.sat),
                dissat: LockPaths::join(l.lock_paths.dissat, r.lock_paths.dissat),
            },
            ..Self::combine(&[l, r], 1)
        }
    }

    /// `or_d`
    pub fn or_d(l: Self, r: Self) -> Self {
        ExtData {
            sat_data: worst(l.sat_data, then(l.dissat_data, r.sat_data, 0)),
            dissat_data: then(l.dissat_data, r.dissat_data, 1),
            timelock_info: TimelockInfo::combine_or(l.timelock_info, r.timelock_info),
            lock_paths: LockPaths {
                sat: l.lock_paths.sat | LockPaths::join(l.lock_paths.dissat, r.lock_paths.sat),
                dissat: LockPaths::join(l.lock_paths.dissat, r.lock_paths.dissat),
            },
            ..Self::combine(&[l, r], 3)
        }
    }

    /// `or_c`
    pub fn or_c(l: Self, r: Self) -> Self {
        ExtData {
            sat_data: worst(l.sat_data, then(l.dissat_data, r.sat_data, 0)),
            timelock_info: TimelockInfo::combine_or(l.timelock_info, r.timelock_info),
            lock_paths: LockPaths {
                sat: l.lock_paths.sat | LockPaths::join(l.lock_paths.dissat, r.lock_paths.sat),
                dissat: LockPaths::NONE,
            },
            ..Self::combine(&[l, r], 2)
        }
    }

    /// `or_i`
    pub fn or_i(l: Self, r: Self) -> Self {
        let left = |data: Option<SatData>| data.map(|d| d.with_selector(2));
        let right = |data: Option<SatData>| data.map(|d| d.with_selector(1));
        ExtData {
            sat_data: worst(left(l.sat_data), right(r.sat_data)),
            dissat_data: worst(left(l.dissat_data), right(r.dissat_data)),
            timelock_info: TimelockInfo::combine_or(l.timelock_info, r.timelock_info),
            lock_paths: LockPaths {
                sat: l.lock_paths.sat | r.lock_paths.sat,
                dissat: l.lock_paths.dissat | r.lock_paths.dissat,
            },
            ..Self::combine(&[l, r], 3)
        }
    }

    /// `andor`
    pub fn and_or(a: Self, b: Self, c: Self) -> Self {
        ExtData {
            sat_data: worst(then(a.sat_data, b.sat_data, 0), then(a.dissat_data, c.sat_data, 0)),
            dissat_data: then(a.dissat_data, c.dissat_data, 0),
            timelock_info: TimelockInfo::combine_or(
                TimelockInfo::combine_and(a.timelock_info, b.timelock_info),
                c.timelock_info,
            ),
            lock_paths: LockPaths {
                sat: LockPaths::join(a.lock_paths.sat, b.lock_paths.sat)
                    | LockPaths::join(a.lock_paths.dissat, c.lock_paths.sat),
                dissat: LockPaths::join(a.lock_paths.dissat, c.lock_paths.dissat),
            },
            ..Self::combine(&[a, b, c], 3)
        }
    }

    /// `thresh`
    ///
    /// Each satisfaction metric is bounded separately: all children
    /// dissatisfied, plus the `k` largest increases from satisfying instead.
    pub fn threshold(k: usize, subs: &[Self]) -> Self {
        let n = subs.len();
        let metric = |f: fn(&SatData) -> usize| -> Option<usize> {
            let mut base = 0;
            let mut forced = 0;
            let mut deltas = Vec::with_capacity(n);
            for sub in subs {
                match (sub.sat_data, sub.dissat_data) {
                    (Some(sat), Some(dis)) => {
                        base += f(&dis);
                        deltas.push(f(&sat).saturating_sub(f(&dis)));
                    }
                    (Some(sat), None) => {
                        base += f(&sat);
                        forced += 1;
                    }
                    (None, Some(dis)) => base += f(&dis),
                    (None, None) => return None,
                }
            }
            if forced > k || deltas.len() < k - forced {
                return None;
            }
            deltas.sort_unstable_by(|a, b| b.cmp(a));
            Some(base + deltas.iter().take(k - forced).sum::<usize>())
        };

        let exec = subs
            .iter()
            .flat_map(|s| s.sat_data.into_iter().chain(s.dissat_data))
            .map(|d| d.max_exec_stack_count)
            .max()
            .unwrap_or(0)
            + 1;
        let sat_data = (|| {
            Some(SatData {
                max_witness_stack_size: metric(|d| d.max_witness_stack_size)?,
                max_witness_stack_count: metric(|d| d.max_witness_stack_count)?,
                max_script_sig_size: metric(|d| d.max_script_sig_size)?,
                max_exec_stack_count: exec,
                max_exec_op_count: metric(|d| d.max_exec_op_count)?,
            })
        })();
        let dissat_data = subs.iter().try_fold(SatData::pushes(0, 0, 0, exec), |acc, sub| {
            sub.dissat_data.map(|dis| SatData { max_exec_stack_count: exec, ..acc.then(dis, 0) })
        });

        ExtData {
            has_free_verify: true,
            sat_data,
            dissat_data,
            timelock_info: TimelockInfo::combine_threshold(k, subs.iter().map(|s| s.timelock_info)),
            lock_paths: LockPaths::threshold(k, subs.iter().map(|s| s.lock_paths)),
            ..Self::combine(subs, n - 1 + 1)
        }
        .with_threshold_k(k)
    }

    fn with_threshold_k(self, k: usize) -> Self {
        // `<k>` is a push, not an opcode.
        ExtData { pk_cost: self.pk_cost + script_num_size(k), ..self }
    }

    /// Computes the extra properties of `fragment` from those of its children.
    pub fn type_check<Pk, Ctx>(fragment: &Node<Pk, Ctx>) -> Self
    where
        Pk: MiniscriptKey,
        Ctx: ScriptContext,
    {
        let ext = match *fragment {
            Terminal::True => Self::TRUE,
            Terminal::False => Self::FALSE,
            Terminal::PkK(ref pk) => Self::pk_k::<Pk, Ctx>(pk),
            Terminal::PkH(ref pk) => Self::pk_h::<Pk, Ctx>(pk),
            Terminal::Multi(ref thresh) => Self::multi::<Pk, Ctx>(thresh.k(), thresh.data()),
            Terminal::MultiA(ref thresh) => Self::multi_a::<Pk, Ctx>(thresh.k(), thresh.data()),
            Terminal::After(t) => Self::after(t),
            Terminal::Older(t) => Self::older(t),
            Terminal::Sha256(..) | Terminal::Hash256(..) => Self::hash(32),
            Terminal::Ripemd160(..) | Terminal::Hash160(..) => Self::hash(20),
            Terminal::Alt(ref sub) => sub.ext.cast_alt(),
            Terminal::Swap(ref sub) => sub.ext.cast_swap(),
            Terminal::Check(ref sub) => sub.ext.cast_check(),
            Terminal::DupIf(ref sub) => sub.ext.cast_dupif(),
            Terminal::Verify(ref sub) => sub.ext.cast_verify(),
            Terminal::NonZero(ref sub) => sub.ext.cast_nonzero(),
            Terminal::ZeroNotEqual(ref sub) => sub.ext.cast_zeronotequal(),
            Terminal::AndV(ref l, ref r) => Self::and_v(l.ext, r.ext),
            Terminal::AndB(ref l, ref r) => Self::and_b(l.ext, r.ext),
            Terminal::AndOr(ref a, ref b, ref c) => Self::and_or(a.ext, b.ext, c.ext),
            Terminal::OrB(ref l, ref r) => Self::or_b(l.ext, r.ext),
            Terminal::OrD(ref l, ref r) => Self::or_d(l.ext, r.ext),
            Terminal::OrC(ref l, ref r) => Self::or_c(l.ext, r.ext),
            Terminal::OrI(ref l, ref r) => Self::or_i(l.ext, r.ext),
            Terminal::Thresh(ref thresh) => {
                let subs: Vec<_> = thresh.iter().map(|s| s.ext).collect();
                Self::threshold(thresh.k(), &subs)
            }
        };
        ext.without_mixed_paths()
    }

    /// Drops the satisfaction or dissatisfaction bounds when every such
    /// witness would need both a height and a time lock of one opcode.
    fn without_mixed_paths(self) -> Self {
        ExtData {
            sat_data: self.sat_data.filter(|_| self.lock_paths.can_satisfy()),
            dissat_data: self.dissat_data.filter(|_| self.lock_paths.can_dissatisfy()),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbsLockTime, RelLockTime};

    #[test]
    fn timelock_mixing() {
        let height = ExtData::after(AbsLockTime::from_consensus(100).unwrap()).timelock_info;
        let time = ExtData::after(AbsLockTime::from_consensus(500_000_001).unwrap()).timelock_info;
        let csv = ExtData::older(RelLockTime::from_consensus(10).unwrap()).timelock_info;

        assert!(!TimelockInfo::combine_or(height, time).contains_unspendable_path());
        assert!(TimelockInfo::combine_and(height, time).contains_unspendable_path());
        assert!(!TimelockInfo::combine_and(height, csv).contains_unspendable_path());
        assert!(TimelockInfo::combine_threshold(2, [csv, height, time]).contains_combination);
        assert!(!TimelockInfo::combine_threshold(1, [csv, height, time]).contains_combination);
    }

    #[test]
    fn mixed_paths_have_no_satisfaction() {
        let height = ExtData::after(AbsLockTime::from_consensus(100).unwrap());
        let time = ExtData::after(AbsLockTime::from_consensus(500_000_001).unwrap());
        let csv = ExtData::older(RelLockTime::from_consensus(10).unwrap());
        let hash = ExtData::hash(20);

        let both = ExtData::and_v(height.cast_verify(), time);
        assert!(!both.lock_paths.can_satisfy());
        assert!(ExtData::and_v(height.cast_verify(), csv).lock_paths.can_satisfy());

        // One unmixed branch is enough.
        assert!(ExtData::or_d(hash, both).lock_paths.can_satisfy());
        assert!(!ExtData::or_i(both, both).lock_paths.can_satisfy());

        // thresh(2, after(height), a:after(time), a:sha256) only spends via
        // the hash and one of the locks.
        let subs = [height.cast_dupif(), time.cast_dupif().cast_alt(), hash.cast_alt()];
        let thresh = ExtData::threshold(2, &subs);
        assert!(thresh.lock_paths.can_satisfy());
        assert!(!ExtData::threshold(3, &subs).lock_paths.can_satisfy());
        assert!(thresh.lock_paths.can_dissatisfy());
    }

    #[test]
    fn threshold_costs() {
        // thresh(2, sha256, a:sha256, a:sha256): every child is 33 bytes
        // either way, so the bound is three preimage-sized pushes.
        let h = ExtData::hash(32);
        let subs = [h, h.cast_alt(), h.cast_alt()];
        let ext = ExtData::threshold(2, &subs);
        assert_eq!(ext.pk_cost, 39 + 41 + 41 + 2 + 1 + 1);
        assert_eq!(ext.static_ops, 4 + 6 + 6 + 3);
        let sat = ext.sat_data.unwrap();
        assert_eq!(sat.max_witness_stack_size, 99);
        assert_eq!(sat.max_witness_stack_count, 3);
        assert_eq!(ext.dissat_data.unwrap().max_witness_stack_count, 3);
        assert_eq!(ext.tree_height, 2);
    }

    #[test]
    fn threshold_forced_child() {
        // A child without dissatisfaction must always be satisfied.
        let t = ExtData::TRUE;
        let h = ExtData::hash(20);
        assert!(ExtData::threshold(1, &[t, t]).sat_data.is_none());
        let ext = ExtData::threshold(2, &[t, h]);
        assert_eq!(ext.sat_data.unwrap().max_witness_stack_size, 33);
        assert!(ext.dissat_data.is_none());
    }
}
