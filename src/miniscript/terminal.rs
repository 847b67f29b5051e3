// SPDX-License-Identifier: CC0-1.0

//! Miniscript Fragments
//!
//! The node kinds of a Miniscript tree. [`Terminal`] is generic over the
//! type holding its children, which lets the untyped [`crate::Expr`] and the
//! typed [`crate::Miniscript`] share one definition.

use crate::iter::{Tree, TreeLike};
use crate::miniscript::limits::{MAX_PUBKEYS_IN_CHECKSIGADD, MAX_PUBKEYS_PER_MULTISIG};
use crate::miniscript::types::Type;
use crate::{AbsLockTime, MiniscriptKey, RelLockTime, Threshold};

/// All AST elements.
///
/// `Sub` is the owner of a child node: `Box<Expr>` before typechecking and
/// `Arc<Miniscript>` after.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Terminal<Pk: MiniscriptKey, Sub> {
    /// `1`
    True,
    /// `0`
    False,
    // pubkey checks
    /// `<key>`
    PkK(Pk),
    /// `DUP HASH160 <keyhash> EQUALVERIFY`
    PkH(Pk),
    // timelocks
    /// `n CHECKLOCKTIMEVERIFY`
    After(AbsLockTime),
    /// `n CHECKSEQUENCEVERIFY`
    Older(RelLockTime),
    // hashlocks
    /// `SIZE 32 EQUALVERIFY SHA256 <hash> EQUAL`
    Sha256(Pk::Sha256),
    /// `SIZE 32 EQUALVERIFY HASH256 <hash> EQUAL`
    Hash256(Pk::Hash256),
    /// `SIZE 32 EQUALVERIFY RIPEMD160 <hash> EQUAL`
    Ripemd160(Pk::Ripemd160),
    /// `SIZE 32 EQUALVERIFY HASH160 <hash> EQUAL`
    Hash160(Pk::Hash160),
    // Wrappers
    /// `TOALTSTACK [E] FROMALTSTACK`
    Alt(Sub),
    /// `SWAP [E1]`
    Swap(Sub),
    /// `[Kt]/[Ke] CHECKSIG`
    Check(Sub),
    /// `DUP IF [V] ENDIF`
    DupIf(Sub),
    /// `[T] VERIFY`
    Verify(Sub),
    /// `SIZE 0NOTEQUAL IF [Fn] ENDIF`
    NonZero(Sub),
    /// `[X] 0NOTEQUAL`
    ZeroNotEqual(Sub),
    // Conjunctions
    /// `[V] [T]/[V]/[F]/[Kt]`
    AndV(Sub, Sub),
    /// `[E] [W] BOOLAND`
    AndB(Sub, Sub),
    /// `[various] NOTIF [various] ELSE [various] ENDIF`
    AndOr(Sub, Sub, Sub),
    // Disjunctions
    /// `[E] [W] BOOLOR`
    OrB(Sub, Sub),
    /// `[E] IFDUP NOTIF [T]/[E] ENDIF`
    OrD(Sub, Sub),
    /// `[E] NOTIF [V] ENDIF`
    OrC(Sub, Sub),
    /// `IF [various] ELSE [various] ENDIF`
    OrI(Sub, Sub),
    // Thresholds
    /// `[E] ([W] ADD)* k EQUAL`
    Thresh(Threshold<Sub, 0>),
    /// `k (<key>)* n CHECKMULTISIG`
    Multi(Threshold<Pk, MAX_PUBKEYS_PER_MULTISIG>),
    /// `<key> CHECKSIG (<key> CHECKSIGADD)*(n-1) k NUMEQUAL`
    MultiA(Threshold<Pk, MAX_PUBKEYS_IN_CHECKSIGADD>),
}

/// Something which owns a child of a [`Terminal`].
pub trait SubNode<Pk: MiniscriptKey>: Sized {
    /// The fragment held by this child.
    fn terminal(&self) -> &Terminal<Pk, Self>;

    /// The inferred type of this child, if it has been typechecked.
    fn ty(&self) -> Option<Type> { None }
}

impl<Pk: MiniscriptKey, Sub: SubNode<Pk>> Terminal<Pk, Sub> {
    /// The children of this fragment, left to right.
    pub fn children(&self) -> Tree<&Sub> {
        match *self {
            Terminal::True
            | Terminal::False
            | Terminal::PkK(..)
            | Terminal::PkH(..)
            | Terminal::After(..)
            | Terminal::Older(..)
            | Terminal::Sha256(..)
            | Terminal::Hash256(..)
            | Terminal::Ripemd160(..)
            | Terminal::Hash160(..)
            | Terminal::Multi(..)
            | Terminal::MultiA(..) => Tree::Nullary,
            Terminal::Alt(ref sub)
            | Terminal::Swap(ref sub)
            | Terminal::Check(ref sub)
            | Terminal::DupIf(ref sub)
            | Terminal::Verify(ref sub)
            | Terminal::NonZero(ref sub)
            | Terminal::ZeroNotEqual(ref sub) => Tree::Unary(sub),
            Terminal::AndV(ref l, ref r)
            | Terminal::AndB(ref l, ref r)
            | Terminal::OrB(ref l, ref r)
            | Terminal::OrD(ref l, ref r)
            | Terminal::OrC(ref l, ref r)
            | Terminal::OrI(ref l, ref r) => Tree::Binary(l, r),
            Terminal::AndOr(ref a, ref b, ref c) => Tree::Ternary(a, b, c),
            Terminal::Thresh(ref thresh) => Tree::Nary(thresh.iter().collect()),
        }
    }

    /// Rebuilds this fragment over already-processed children.
    ///
    /// `child_indices` are the positions of this node's children in
    /// `processed`, as reported by a post-order iterator.
    pub fn map_children<T: Clone>(&self, child_indices: &[usize], processed: &[T]) -> Terminal<Pk, T> {
        let child = |n: usize| processed[child_indices[n]].clone();
        match *self {
            Terminal::True => Terminal::True,
            Terminal::False => Terminal::False,
            Terminal::PkK(ref pk) => Terminal::PkK(pk.clone()),
            Terminal::PkH(ref pk) => Terminal::PkH(pk.clone()),
            Terminal::After(t) => Terminal::After(t),
            Terminal::Older(t) => Terminal::Older(t),
            Terminal::Sha256(ref h) => Terminal::Sha256(h.clone()),
            Terminal::Hash256(ref h) => Terminal::Hash256(h.clone()),
            Terminal::Ripemd160(ref h) => Terminal::Ripemd160(h.clone()),
            Terminal::Hash160(ref h) => Terminal::Hash160(h.clone()),
            Terminal::Alt(..) => Terminal::Alt(child(0)),
            Terminal::Swap(..) => Terminal::Swap(child(0)),
            Terminal::Check(..) => Terminal::Check(child(0)),
            Terminal::DupIf(..) => Terminal::DupIf(child(0)),
            Terminal::Verify(..) => Terminal::Verify(child(0)),
            Terminal::NonZero(..) => Terminal::NonZero(child(0)),
            Terminal::ZeroNotEqual(..) => Terminal::ZeroNotEqual(child(0)),
            Terminal::AndV(..) => Terminal::AndV(child(0), child(1)),
            Terminal::AndB(..) => Terminal::AndB(child(0), child(1)),
            Terminal::AndOr(..) => Terminal::AndOr(child(0), child(1), child(2)),
            Terminal::OrB(..) => Terminal::OrB(child(0), child(1)),
            Terminal::OrD(..) => Terminal::OrD(child(0), child(1)),
            Terminal::OrC(..) => Terminal::OrC(child(0), child(1)),
            Terminal::OrI(..) => Terminal::OrI(child(0), child(1)),
            Terminal::Thresh(ref thresh) => {
                Terminal::Thresh(thresh.map_from_post_order_iter(child_indices, processed))
            }
            Terminal::Multi(ref thresh) => Terminal::Multi(thresh.clone()),
            Terminal::MultiA(ref thresh) => Terminal::MultiA(thresh.clone()),
        }
    }

    /// The name of this fragment in Miniscript notation.
    ///
    /// Sugar forms are recognised: `c:pk_k` is `pk`, `and_v(X,1)` is `t`,
    /// and so on. The name covers this node only, never its children.
    pub fn fragment_name(&self) -> &'static str {
        match *self {
            Terminal::True => "1",
            Terminal::False => "0",
            Terminal::PkK(..) => "pk_k",
            Terminal::PkH(..) => "pk_h",
            Terminal::After(..) => "after",
            Terminal::Older(..) => "older",
            Terminal::Sha256(..) => "sha256",
            Terminal::Hash256(..) => "hash256",
            Terminal::Ripemd160(..) => "ripemd160",
            Terminal::Hash160(..) => "hash160",
            Terminal::Alt(..) => "a",
            Terminal::Swap(..) => "s",
            Terminal::Check(ref sub) if matches!(sub.terminal(), Terminal::PkK(..)) => "pk",
            Terminal::Check(ref sub) if matches!(sub.terminal(), Terminal::PkH(..)) => "pkh",
            Terminal::Check(..) => "c",
            Terminal::DupIf(..) => "d",
            Terminal::Verify(..) => "v",
            Terminal::NonZero(..) => "j",
            Terminal::ZeroNotEqual(..) => "n",
            Terminal::AndV(_, ref r) if matches!(r.terminal(), Terminal::True) => "t",
            Terminal::AndV(..) => "and_v",
            Terminal::AndB(..) => "and_b",
            Terminal::AndOr(_, _, ref c) if matches!(c.terminal(), Terminal::False) => "and_n",
            Terminal::AndOr(..) => "andor",
            Terminal::OrB(..) => "or_b",
            Terminal::OrD(..) => "or_d",
            Terminal::OrC(..) => "or_c",
            Terminal::OrI(_, ref r) if matches!(r.terminal(), Terminal::False) => "u",
            Terminal::OrI(ref l, _) if matches!(l.terminal(), Terminal::False) => "l",
            Terminal::OrI(..) => "or_i",
            Terminal::Thresh(..) => "thresh",
            Terminal::Multi(..) => "multi",
            Terminal::MultiA(..) => "multi_a",
        }
    }

    /// Whether this fragment is written as a one-letter prefix such as `s:`.
    pub fn is_wrapper(&self) -> bool {
        !matches!(self, Terminal::True | Terminal::False) && self.fragment_name().len() == 1
    }
}

impl<'a, Pk: MiniscriptKey, Sub: SubNode<Pk>> TreeLike for &'a Terminal<Pk, Sub> {
    fn as_node(&self) -> Tree<Self> { (*self).children().map(<Sub as SubNode<Pk>>::terminal) }
}
