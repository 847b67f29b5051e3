// SPDX-License-Identifier: CC0-1.0

//! Miniscript Node Display
//!
//! Writes trees in Miniscript notation, collapsing wrapper chains into
//! prefixes such as `sv:` and recognising the sugar fragments.

use core::fmt;

use crate::iter::{Tree, TreeLike};
use crate::miniscript::terminal::SubNode;
use crate::miniscript::types::Type;
use crate::{AbsLockTime, Expr, Miniscript, MiniscriptKey, RelLockTime, ScriptContext, Terminal};

#[derive(Clone)]
enum DisplayNode<'a, Pk: MiniscriptKey, Sub> {
    Node(Option<Type>, &'a Terminal<Pk, Sub>),
    ThresholdK(usize),
    Key(&'a Pk),
    After(&'a AbsLockTime),
    Older(&'a RelLockTime),
    Sha256(&'a Pk::Sha256),
    Hash256(&'a Pk::Hash256),
    Ripemd160(&'a Pk::Ripemd160),
    Hash160(&'a Pk::Hash160),
}

impl<'a, Pk: MiniscriptKey, Sub: SubNode<Pk>> DisplayNode<'a, Pk, Sub> {
    fn sub(sub: &'a Sub) -> Self { DisplayNode::Node(sub.ty(), sub.terminal()) }
}

impl<'a, Pk: MiniscriptKey, Sub: SubNode<Pk> + Clone> TreeLike for DisplayNode<'a, Pk, Sub> {
    fn as_node(&self) -> Tree<Self> {
        let node = match *self {
            DisplayNode::Node(_, node) => node,
            // Only nodes have children; the rest are terminals.
            _ => return Tree::Nullary,
        };
        match *node {
            Terminal::True | Terminal::False => Tree::Nullary,
            Terminal::PkK(ref pk) | Terminal::PkH(ref pk) => Tree::Unary(DisplayNode::Key(pk)),
            Terminal::After(ref t) => Tree::Unary(DisplayNode::After(t)),
            Terminal::Older(ref t) => Tree::Unary(DisplayNode::Older(t)),
            Terminal::Sha256(ref h) => Tree::Unary(DisplayNode::Sha256(h)),
            Terminal::Hash256(ref h) => Tree::Unary(DisplayNode::Hash256(h)),
            Terminal::Ripemd160(ref h) => Tree::Unary(DisplayNode::Ripemd160(h)),
            Terminal::Hash160(ref h) => Tree::Unary(DisplayNode::Hash160(h)),
            // `pk` and `pkh` swallow their `c:`
            Terminal::Check(ref sub) => match *sub.terminal() {
                Terminal::PkK(ref pk) | Terminal::PkH(ref pk) => Tree::Unary(DisplayNode::Key(pk)),
                _ => Tree::Unary(DisplayNode::sub(sub)),
            },
            Terminal::Alt(ref sub)
            | Terminal::Swap(ref sub)
            | Terminal::DupIf(ref sub)
            | Terminal::Verify(ref sub)
            | Terminal::NonZero(ref sub)
            | Terminal::ZeroNotEqual(ref sub) => Tree::Unary(DisplayNode::sub(sub)),
            Terminal::AndV(ref left, ref right) if matches!(right.terminal(), Terminal::True) => {
                Tree::Unary(DisplayNode::sub(left))
            }
            Terminal::OrI(ref left, ref right) if matches!(left.terminal(), Terminal::False) => {
                Tree::Unary(DisplayNode::sub(right))
            }
            Terminal::OrI(ref left, ref right) if matches!(right.terminal(), Terminal::False) => {
                Tree::Unary(DisplayNode::sub(left))
            }
            Terminal::AndV(ref left, ref right)
            | Terminal::AndB(ref left, ref right)
            | Terminal::OrB(ref left, ref right)
            | Terminal::OrD(ref left, ref right)
            | Terminal::OrC(ref left, ref right)
            | Terminal::OrI(ref left, ref right) => {
                Tree::Binary(DisplayNode::sub(left), DisplayNode::sub(right))
            }
            Terminal::AndOr(ref a, ref b, ref c) if matches!(c.terminal(), Terminal::False) => {
                Tree::Binary(DisplayNode::sub(a), DisplayNode::sub(b))
            }
            Terminal::AndOr(ref a, ref b, ref c) => {
                Tree::Ternary(DisplayNode::sub(a), DisplayNode::sub(b), DisplayNode::sub(c))
            }
            Terminal::Thresh(ref thresh) => Tree::Nary(
                core::iter::once(DisplayNode::ThresholdK(thresh.k()))
                    .chain(thresh.iter().map(DisplayNode::sub))
                    .collect(),
            ),
            Terminal::Multi(ref thresh) => Tree::Nary(
                core::iter::once(DisplayNode::ThresholdK(thresh.k()))
                    .chain(thresh.iter().map(DisplayNode::Key))
                    .collect(),
            ),
            Terminal::MultiA(ref thresh) => Tree::Nary(
                core::iter::once(DisplayNode::ThresholdK(thresh.k()))
                    .chain(thresh.iter().map(DisplayNode::Key))
                    .collect(),
            ),
        }
    }
}

impl<Pk: MiniscriptKey, Sub: SubNode<Pk> + Clone> Terminal<Pk, Sub> {
    fn conditional_fmt(
        &self,
        f: &mut fmt::Formatter,
        root_ty: Option<Type>,
        show_types: bool,
    ) -> fmt::Result {
        let write_ty = |f: &mut fmt::Formatter, ty: Option<Type>| match ty {
            Some(ty) if show_types => write!(f, "[{}]", ty),
            _ => Ok(()),
        };

        for item in DisplayNode::Node(root_ty, self).verbose_pre_order_iter() {
            match item.node {
                DisplayNode::Node(ty, node) => {
                    if node.is_wrapper() {
                        // Wrappers are very easy: just write the one-character name and maybe the
                        // type and we are done. No parens, no :s, no commas, etc.
                        if item.n_children_yielded == 0 {
                            write_ty(f, ty)?;
                            f.write_str(node.fragment_name())?;
                        }
                    } else if item.n_children_yielded == 0 {
                        if let Some(DisplayNode::Node(_, parent)) = item.parent {
                            if parent.is_wrapper() {
                                f.write_str(":")?;
                            }
                        }
                        write_ty(f, ty)?;
                        f.write_str(node.fragment_name())?;
                        if !item.is_complete {
                            f.write_str("(")?;
                        }
                    } else if item.is_complete {
                        f.write_str(")")?;
                    } else {
                        f.write_str(",")?;
                    }
                }
                DisplayNode::ThresholdK(k) => fmt::Display::fmt(&k, f)?,
                DisplayNode::Key(pk) => fmt::Display::fmt(pk, f)?,
                DisplayNode::After(t) => fmt::Display::fmt(t, f)?,
                DisplayNode::Older(t) => fmt::Display::fmt(t, f)?,
                DisplayNode::Sha256(h) => fmt::Display::fmt(h, f)?,
                DisplayNode::Hash256(h) => fmt::Display::fmt(h, f)?,
                DisplayNode::Ripemd160(h) => fmt::Display::fmt(h, f)?,
                DisplayNode::Hash160(h) => fmt::Display::fmt(h, f)?,
            }
        }
        Ok(())
    }
}

impl<Pk: MiniscriptKey, Sub: SubNode<Pk> + Clone> fmt::Display for Terminal<Pk, Sub> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { self.conditional_fmt(f, None, false) }
}

/// Shows the types of the children, where they are known.
impl<Pk: MiniscriptKey, Sub: SubNode<Pk> + Clone> fmt::Debug for Terminal<Pk, Sub> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { self.conditional_fmt(f, None, true) }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> fmt::Display for Miniscript<Pk, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.node().conditional_fmt(f, None, false)
    }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> fmt::Debug for Miniscript<Pk, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.node().conditional_fmt(f, Some(*self.ty()), true)
    }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> fmt::Display for Expr<Pk, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.node().conditional_fmt(f, None, false)
    }
}

impl<Pk: MiniscriptKey, Ctx: ScriptContext> fmt::Debug for Expr<Pk, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Display::fmt(self, f) }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::StrExpr;

    fn pk(name: &str) -> StrExpr { StrExpr::pk(name.to_owned()).unwrap() }

    #[test]
    fn sugar() {
        assert_eq!(pk("A").to_string(), "pk(A)");
        assert_eq!(StrExpr::pkh("A".to_owned()).unwrap().to_string(), "pkh(A)");
        assert_eq!(StrExpr::t(StrExpr::verify(pk("A")).unwrap()).unwrap().to_string(), "tv:pk(A)");
        assert_eq!(StrExpr::l(pk("A")).unwrap().to_string(), "l:pk(A)");
        assert_eq!(StrExpr::u(pk("A")).unwrap().to_string(), "u:pk(A)");
        assert_eq!(StrExpr::and_n(pk("A"), pk("B")).unwrap().to_string(), "and_n(pk(A),pk(B))");
    }

    #[test]
    fn wrappers_and_combinators() {
        let and_v = StrExpr::and_v(StrExpr::verify(pk("A")).unwrap(), StrExpr::pk_k("B".to_owned()).unwrap())
            .unwrap();
        assert_eq!(StrExpr::check(and_v).unwrap().to_string(), "c:and_v(v:pk(A),pk_k(B))");

        let andor = StrExpr::and_or(pk("A"), pk("B"), pk("C")).unwrap();
        assert_eq!(andor.to_string(), "andor(pk(A),pk(B),pk(C))");

        let thresh = StrExpr::thresh(
            2,
            vec![
                pk("A"),
                StrExpr::swap(pk("B")).unwrap(),
                StrExpr::alt(StrExpr::sha256("H".to_owned())).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(thresh.to_string(), "thresh(2,pk(A),s:pk(B),a:sha256(H))");

        let multi = StrExpr::multi(2, vec!["A".to_owned(), "B".to_owned(), "C".to_owned()]).unwrap();
        assert_eq!(multi.to_string(), "multi(2,A,B,C)");

        let timelocks = StrExpr::and_v(
            StrExpr::verify(StrExpr::after(100).unwrap()).unwrap(),
            StrExpr::older(144).unwrap(),
        )
        .unwrap();
        assert_eq!(timelocks.to_string(), "and_v(v:after(100),older(144))");
    }

    #[test]
    fn debug_shows_types() {
        let ms = pk("A").validate().unwrap();
        assert_eq!(format!("{:?}", ms), "[B/onduesm]pk(A)");
        assert_eq!(ms.to_string(), "pk(A)");

        let ms = StrExpr::verify(pk("A")).unwrap().validate().unwrap();
        assert_eq!(format!("{:?}", ms), "[V/onfsm]v:[B/onduesm]pk(A)");
    }

    #[test]
    fn deep_display() {
        let mut expr = StrExpr::TRUE;
        for _ in 0..400 {
            expr = StrExpr::zero_not_equal(expr).unwrap();
        }
        let s = expr.to_string();
        assert_eq!(s.len(), 400 + 2);
        assert!(s.ends_with(":1"));
    }
}
