// SPDX-License-Identifier: CC0-1.0

//! # Abstract Syntax Tree
//!
//! Defines a variety of data structures for describing Miniscript, a subset of
//! Bitcoin Script which can be efficiently parsed and serialized from Script,
//! and from which it is easy to extract data needed to construct witnesses.
//!
//! Users of the library in general will only need to use the structures exposed
//! from the top level of this module; however for people wanting to do advanced
//! things, the submodules are public as well which provide visibility into the
//! components of the AST.
//!

use core::marker::PhantomData;
use core::{cmp, hash};
use std::sync::Arc;

use bitcoin::hashes::Hash;
use bitcoin::taproot::{LeafVersion, TapLeafHash};
use hex::DisplayHex;

pub mod analyzable;
pub mod astelem;
pub mod compile;
pub mod context;
pub mod display;
pub mod limits;
pub mod satisfy;
pub mod terminal;
pub mod types;

use self::context::SigType;
use self::satisfy::{Satisfaction, Witness};
use self::terminal::SubNode;
use self::types::extra_props::ExtData;
use self::types::Type;
use crate::iter::TreeLike;
use crate::{
    Error, Expr, MiniscriptKey, SatisfyError, Satisfier, ScriptContext, Terminal, ToPublicKey,
    MAX_RECURSION_DEPTH,
};

/// A fragment whose children are typed Miniscripts.
pub type Node<Pk, Ctx> = Terminal<Pk, Arc<Miniscript<Pk, Ctx>>>;

/// The top-level miniscript abstract syntax tree (AST).
///
/// Every node caches its [`Type`] and [`ExtData`], computed once when the
/// node is built.
#[derive(Clone)]
pub struct Miniscript<Pk: MiniscriptKey, Ctx: ScriptContext> {
    /// A node in the AST.
    node: Node<Pk, Ctx>,
    /// The correctness and malleability type information for the AST node.
    pub(crate) ty: Type,
    /// Additional information helpful for extra analysis.
    pub(crate) ext: ExtData,
    /// Context PhantomData. Only accessible inside this crate
    phantom: PhantomData<Ctx>,
}

/// `PartialOrd` of `Miniscript` must depend only on node and not the type information.
///
/// The type information and extra properties are implied by the AST.
impl<Pk: MiniscriptKey, Ctx: ScriptContext> PartialOrd for Miniscript<Pk, Ctx> {
    fn partial_cmp(&self, other: &Miniscript<Pk, Ctx>) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// `Ord` of `Miniscript` must depend only on node and not the type information.
///
/// The type information and extra properties are implied by the AST.
impl<Pk: MiniscriptKey, Ctx: ScriptContext> Ord for Miniscript<Pk, Ctx> {
    fn cmp(&self, other: &Miniscript<Pk, Ctx>) -> cmp::Ordering { self.node.cmp(&other.node) }
}

/// `PartialEq` of `Miniscript` must depend only on node and not the type information.
///
/// The type information and extra properties are implied by the AST.
impl<Pk: MiniscriptKey, Ctx: ScriptContext> PartialEq for Miniscript<Pk, Ctx> {
    fn eq(&self, other: &Miniscript<Pk, Ctx>) -> bool { self.node == other.node }
}

/// `Eq` of `Miniscript` must depend only on node and not the type information.
///
/// The type information and extra properties are implied by the AST.
impl<Pk: MiniscriptKey, Ctx: ScriptContext> Eq for Miniscript<Pk, Ctx> {}

/// `Hash` of `Miniscript` must depend only on node and not the type information.
///
/// The type information and extra properties are implied by the AST.
impl<Pk: MiniscriptKey, Ctx: ScriptContext> hash::Hash for Miniscript<Pk, Ctx> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) { self.node.hash(state); }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> SubNode<Pk> for Arc<Miniscript<Pk, Ctx>> {
    fn terminal(&self) -> &Node<Pk, Ctx> { &self.node }

    fn ty(&self) -> Option<Type> { Some(self.ty) }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> Miniscript<Pk, Ctx> {
    /// Add type information (`Type` and `ExtData`) to a fragment whose
    /// children are already typed. Only this node is checked.
    pub fn from_ast(node: Node<Pk, Ctx>) -> Result<Miniscript<Pk, Ctx>, Error> {
        Ctx::check_fragment(&node)?;
        let ty = Type::type_check(&node)?;
        let ext = ExtData::type_check(&node);
        if ext.tree_height >= MAX_RECURSION_DEPTH as usize {
            return Err(Error::MaxRecursiveDepthExceeded);
        }
        Ok(Miniscript { node, ty, ext, phantom: PhantomData })
    }

    /// Typechecks an expression tree, children first.
    ///
    /// The first node which fails is reported; no partially typed tree is
    /// returned.
    pub fn validate(expr: &Expr<Pk, Ctx>) -> Result<Miniscript<Pk, Ctx>, Error> {
        // Subtrees of the root are typed in post-order, one after the other;
        // the root itself is typed last from their positions in `processed`.
        let mut processed: Vec<Arc<Miniscript<Pk, Ctx>>> = vec![];
        let mut root_children = vec![];
        for child in expr.node().children().into_vec() {
            let offset = processed.len();
            for item in child.as_ref().post_order_iter() {
                let indices: Vec<usize> = item.child_indices.iter().map(|i| i + offset).collect();
                let node = item.node.node().map_children(&indices, &processed);
                processed.push(Arc::new(Miniscript::from_ast(node)?));
            }
            root_children.push(processed.len() - 1);
        }
        let ms = Miniscript::from_ast(expr.node().map_children(&root_children, &processed))?;
        log::debug!(
            "validated {} node(s) under {}: {} has type {}",
            processed.len() + 1,
            Ctx::name_str(),
            ms.node.fragment_name(),
            ms.ty,
        );
        Ok(ms)
    }

    /// The fragment at the root of this tree.
    pub fn node(&self) -> &Node<Pk, Ctx> { &self.node }

    /// The correctness and malleability type of this tree.
    pub fn ty(&self) -> &Type { &self.ty }

    /// Resource and timelock properties of this tree.
    pub fn ext(&self) -> &ExtData { &self.ext }

    /// Size, in bytes of the encoded script. If this Miniscript is used outside
    /// of segwit (e.g. bare or P2SH), this quantity should be multiplied by 4
    /// to compute the weight.
    pub fn script_size(&self) -> usize { self.ext.pk_cost }

    /// Maximum number of witness elements used to satisfy the Miniscript
    /// fragment, including the witness script itself. Used to estimate
    /// the weight of the `VarInt` that specifies this number in a serialized
    /// transaction.
    ///
    /// `None` when the fragment has no satisfaction at all.
    pub fn max_satisfaction_witness_elements(&self) -> Option<usize> {
        self.ext.sat_data.map(|data| data.max_witness_stack_count + 1)
    }

    /// Maximum size, in bytes, of a satisfying witness.
    ///
    /// Contexts which carry the witness in a scriptSig report the scriptSig
    /// bound, the others the witness bound. `None` when the fragment has no
    /// satisfaction at all.
    pub fn max_satisfaction_size(&self) -> Option<usize> {
        self.ext.sat_data.map(|data| {
            if Ctx::max_script_sig_size().is_some() {
                data.max_script_sig_size
            } else {
                data.max_witness_stack_size
            }
        })
    }

    /// Iterates over every key in the tree, in script order. Repeated keys
    /// are yielded once per occurrence.
    pub fn iter_pk(&self) -> impl Iterator<Item = Pk> + '_ {
        self.pre_order_iter().flat_map(|ms| match ms.node {
            Terminal::PkK(ref pk) | Terminal::PkH(ref pk) => vec![pk.clone()],
            Terminal::Multi(ref thresh) => thresh.data().to_vec(),
            Terminal::MultiA(ref thresh) => thresh.data().to_vec(),
            _ => vec![],
        })
    }
}

impl<Pk: MiniscriptKey + ToPublicKey, Ctx: ScriptContext> Miniscript<Pk, Ctx> {
    /// The leaf hash tapscript signatures commit to. Outside of tapscript
    /// signatures are looked up by key alone and this is all zeros.
    fn leaf_hash(&self) -> TapLeafHash {
        match Ctx::sig_type() {
            SigType::Schnorr => TapLeafHash::from_script(&self.encode(), LeafVersion::TapScript),
            SigType::Ecdsa => TapLeafHash::all_zeros(),
        }
    }

    /// Attempt to produce non-malleable satisfying witness for the
    /// witness script represented by the parse tree
    pub fn satisfy<S: Satisfier<Pk>>(&self, satisfier: S) -> Result<Vec<Vec<u8>>, SatisfyError> {
        let leaf_hash = self.leaf_hash();
        let satisfaction = Satisfaction::satisfy(self, &satisfier, &leaf_hash);
        self.finish_satisfaction(satisfaction.stack)
    }

    /// Attempt to produce a malleable satisfying witness for the
    /// witness script represented by the parse tree
    pub fn satisfy_malleable<S: Satisfier<Pk>>(
        &self,
        satisfier: S,
    ) -> Result<Vec<Vec<u8>>, SatisfyError> {
        let leaf_hash = self.leaf_hash();
        let satisfaction = Satisfaction::satisfy_mall(self, &satisfier, &leaf_hash);
        self.finish_satisfaction(satisfaction.stack)
    }

    fn finish_satisfaction(&self, witness: Witness) -> Result<Vec<Vec<u8>>, SatisfyError> {
        match witness {
            Witness::Stack(stack) => {
                log::debug!("satisfied {} with {} witness element(s)", self, stack.len());
                if log::log_enabled!(log::Level::Trace) {
                    for elem in &stack {
                        log::trace!("  <{}>", elem.as_hex());
                    }
                }
                Ok(stack)
            }
            Witness::Unavailable | Witness::Impossible => {
                if self.ext.sat_data.is_none() {
                    Err(SatisfyError::ImpossibleSatisfaction)
                } else {
                    Err(SatisfyError::CouldNotSatisfy)
                }
            }
        }
    }
}
