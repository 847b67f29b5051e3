// SPDX-License-Identifier: CC0-1.0

//! # Expression Trees
//!
//! [`Expr`] is the untyped form of a Miniscript: a tree of fragments whose
//! shape has been checked but whose types have not. Every constructor
//! validates its own arguments, so an `Expr` can only describe trees which
//! fit the structural limits of Miniscript and the key rules of its script
//! context. Typechecking happens in [`Expr::validate`].
//!

mod error;

use core::marker::PhantomData;

pub use self::error::ExprError;
use crate::miniscript::limits::{MAX_PUBKEYS_IN_CHECKSIGADD, MAX_PUBKEYS_PER_MULTISIG};
use crate::miniscript::terminal::SubNode;
use crate::{
    AbsLockTime, Error, Miniscript, MiniscriptKey, RelLockTime, ScriptContext, Terminal, Threshold,
    MAX_RECURSION_DEPTH,
};

/// An untyped Miniscript expression.
///
/// Compound fragments own their children. The height of the tree is
/// recorded on construction and never exceeds the crate's recursion limit.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expr<Pk: MiniscriptKey, Ctx: ScriptContext> {
    node: Terminal<Pk, Box<Expr<Pk, Ctx>>>,
    height: u32,
    phantom: PhantomData<Ctx>,
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> SubNode<Pk> for Box<Expr<Pk, Ctx>> {
    fn terminal(&self) -> &Terminal<Pk, Self> { &self.node }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> Expr<Pk, Ctx> {
    /// The expression `1`.
    pub const TRUE: Self = Expr { node: Terminal::True, height: 0, phantom: PhantomData };

    /// The expression `0`.
    pub const FALSE: Self = Expr { node: Terminal::False, height: 0, phantom: PhantomData };

    fn leaf(node: Terminal<Pk, Box<Self>>) -> Result<Self, ExprError> {
        Ctx::check_fragment(&node)?;
        Ok(Expr { node, height: 0, phantom: PhantomData })
    }

    fn compound(node: Terminal<Pk, Box<Self>>) -> Result<Self, ExprError> {
        let height = node
            .children()
            .into_vec()
            .into_iter()
            .map(|sub| sub.height)
            .max()
            .unwrap_or(0)
            + 1;
        if height >= MAX_RECURSION_DEPTH {
            return Err(ExprError::MaxRecursionDepthExceeded {
                actual: height,
                maximum: MAX_RECURSION_DEPTH,
            });
        }
        Ok(Expr { node, height, phantom: PhantomData })
    }

    /// The fragment at the root of this expression.
    pub fn node(&self) -> &Terminal<Pk, Box<Self>> { &self.node }

    /// The height of the tree; leaves have height 0.
    pub fn height(&self) -> u32 { self.height }

    /// `pk_k(key)`
    pub fn pk_k(pk: Pk) -> Result<Self, ExprError> { Self::leaf(Terminal::PkK(pk)) }

    /// `pk_h(key)`
    pub fn pk_h(pk: Pk) -> Result<Self, ExprError> { Self::leaf(Terminal::PkH(pk)) }

    /// `pk(key)`, short for `c:pk_k(key)`.
    pub fn pk(pk: Pk) -> Result<Self, ExprError> { Self::check(Self::pk_k(pk)?) }

    /// `pkh(key)`, short for `c:pk_h(key)`.
    pub fn pkh(pk: Pk) -> Result<Self, ExprError> { Self::check(Self::pk_h(pk)?) }

    /// `after(n)`, an absolute timelock given in consensus encoding.
    pub fn after(n: u32) -> Result<Self, ExprError> {
        Self::leaf(Terminal::After(AbsLockTime::from_consensus(n)?))
    }

    /// `older(n)`, a relative timelock given in consensus encoding.
    pub fn older(n: u32) -> Result<Self, ExprError> {
        Self::leaf(Terminal::Older(RelLockTime::from_consensus(n)?))
    }

    /// `sha256(h)`
    pub fn sha256(hash: Pk::Sha256) -> Self {
        Expr { node: Terminal::Sha256(hash), height: 0, phantom: PhantomData }
    }

    /// `hash256(h)`
    pub fn hash256(hash: Pk::Hash256) -> Self {
        Expr { node: Terminal::Hash256(hash), height: 0, phantom: PhantomData }
    }

    /// `ripemd160(h)`
    pub fn ripemd160(hash: Pk::Ripemd160) -> Self {
        Expr { node: Terminal::Ripemd160(hash), height: 0, phantom: PhantomData }
    }

    /// `hash160(h)`
    pub fn hash160(hash: Pk::Hash160) -> Self {
        Expr { node: Terminal::Hash160(hash), height: 0, phantom: PhantomData }
    }

    /// `a:X`
    pub fn alt(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::Alt(Box::new(sub)))
    }

    /// `s:X`
    pub fn swap(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::Swap(Box::new(sub)))
    }

    /// `c:X`
    pub fn check(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::Check(Box::new(sub)))
    }

    /// `d:X`
    pub fn dupif(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::DupIf(Box::new(sub)))
    }

    /// `v:X`
    pub fn verify(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::Verify(Box::new(sub)))
    }

    /// `j:X`
    pub fn nonzero(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::NonZero(Box::new(sub)))
    }

    /// `n:X`
    pub fn zero_not_equal(sub: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::ZeroNotEqual(Box::new(sub)))
    }

    /// `t:X`, short for `and_v(X,1)`.
    pub fn t(sub: Self) -> Result<Self, ExprError> { Self::and_v(sub, Self::TRUE) }

    /// `l:X`, short for `or_i(0,X)`.
    pub fn l(sub: Self) -> Result<Self, ExprError> { Self::or_i(Self::FALSE, sub) }

    /// `u:X`, short for `or_i(X,0)`.
    pub fn u(sub: Self) -> Result<Self, ExprError> { Self::or_i(sub, Self::FALSE) }

    /// `and_v(X,Y)`
    pub fn and_v(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::AndV(Box::new(left), Box::new(right)))
    }

    /// `and_b(X,Y)`
    pub fn and_b(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::AndB(Box::new(left), Box::new(right)))
    }

    /// `andor(X,Y,Z)`: if `X` then `Y` else `Z`.
    pub fn and_or(a: Self, b: Self, c: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::AndOr(Box::new(a), Box::new(b), Box::new(c)))
    }

    /// `and_n(X,Y)`, short for `andor(X,Y,0)`.
    pub fn and_n(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::and_or(left, right, Self::FALSE)
    }

    /// `or_b(X,Z)`
    pub fn or_b(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::OrB(Box::new(left), Box::new(right)))
    }

    /// `or_d(X,Z)`
    pub fn or_d(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::OrD(Box::new(left), Box::new(right)))
    }

    /// `or_c(X,Z)`
    pub fn or_c(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::OrC(Box::new(left), Box::new(right)))
    }

    /// `or_i(X,Z)`
    pub fn or_i(left: Self, right: Self) -> Result<Self, ExprError> {
        Self::compound(Terminal::OrI(Box::new(left), Box::new(right)))
    }

    /// `thresh(k,X1,...,Xn)`
    pub fn thresh(k: usize, subs: Vec<Self>) -> Result<Self, ExprError> {
        let thresh = Threshold::from_iter(k, subs.into_iter().map(Box::new))?;
        Self::compound(Terminal::Thresh(thresh))
    }

    /// `multi(k,key1,...,keyn)`; at most 20 keys, ECDSA contexts only.
    pub fn multi(k: usize, pks: Vec<Pk>) -> Result<Self, ExprError> {
        let thresh = Threshold::<Pk, MAX_PUBKEYS_PER_MULTISIG>::new(k, pks)?;
        Self::leaf(Terminal::Multi(thresh))
    }

    /// `multi_a(k,key1,...,keyn)`; tapscript only.
    pub fn multi_a(k: usize, pks: Vec<Pk>) -> Result<Self, ExprError> {
        let thresh = Threshold::<Pk, MAX_PUBKEYS_IN_CHECKSIGADD>::new(k, pks)?;
        Self::leaf(Terminal::MultiA(thresh))
    }

    /// Typechecks this expression. See [`Miniscript::validate`].
    pub fn validate(&self) -> Result<Miniscript<Pk, Ctx>, Error> { Miniscript::validate(self) }
}
