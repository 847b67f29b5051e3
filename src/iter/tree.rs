// SPDX-License-Identifier: CC0-1.0

//! Abstract Trees
//!
//! The [`TreeLike`] trait describes the shape of a node, and the iterators
//! here walk any such shape with an explicit stack.
//!

/// The children of a node, by arity.
pub enum Tree<T> {
    /// No children.
    Nullary,
    /// One child.
    Unary(T),
    /// Two children.
    Binary(T, T),
    /// Three children (`andor`).
    Ternary(T, T, T),
    /// Any number of children (`thresh`).
    Nary(Vec<T>),
}

impl<T> Tree<T> {
    /// Applies `f` to every child, keeping the arity.
    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> Tree<U> {
        match self {
            Tree::Nullary => Tree::Nullary,
            Tree::Unary(a) => Tree::Unary(f(a)),
            Tree::Binary(a, b) => Tree::Binary(f(a), f(b)),
            Tree::Ternary(a, b, c) => Tree::Ternary(f(a), f(b), f(c)),
            Tree::Nary(subs) => Tree::Nary(subs.into_iter().map(f).collect()),
        }
    }

    /// The children as a vector, left to right.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Tree::Nullary => vec![],
            Tree::Unary(a) => vec![a],
            Tree::Binary(a, b) => vec![a, b],
            Tree::Ternary(a, b, c) => vec![a, b, c],
            Tree::Nary(subs) => subs,
        }
    }
}

/// A node of something shaped like a Miniscript tree.
///
/// Implement this on references; the iterators clone nodes freely.
pub trait TreeLike: Clone + Sized {
    /// The children of this node.
    fn as_node(&self) -> Tree<Self>;

    /// Number of children.
    fn n_children(&self) -> usize {
        match self.as_node() {
            Tree::Nullary => 0,
            Tree::Unary(..) => 1,
            Tree::Binary(..) => 2,
            Tree::Ternary(..) => 3,
            Tree::Nary(subs) => subs.len(),
        }
    }

    /// Iterates over all nodes, parents before children.
    fn pre_order_iter(self) -> PreOrderIter<Self> { PreOrderIter { stack: vec![self] } }

    /// Iterates over all nodes, yielding each one once before its children
    /// and once more after each child.
    fn verbose_pre_order_iter(self) -> VerbosePreOrderIter<Self> {
        VerbosePreOrderIter { stack: vec![(self, None)], index: 0 }
    }

    /// Iterates over all nodes, children before parents.
    fn post_order_iter(self) -> PostOrderIter<Self> {
        PostOrderIter { index: 0, stack: vec![PendingNode { node: self, children: None, parent: None }] }
    }
}

struct PendingNode<T> {
    node: T,
    /// Indices of already-yielded children; `None` until the children were pushed.
    children: Option<Vec<usize>>,
    parent: Option<usize>,
}

/// Post-order iterator; see [`TreeLike::post_order_iter`].
pub struct PostOrderIter<T> {
    index: usize,
    stack: Vec<PendingNode<T>>,
}

/// An item yielded by [`PostOrderIter`].
pub struct PostOrderIterItem<T> {
    /// The node.
    pub node: T,
    /// Position of the node in the iteration.
    pub index: usize,
    /// Positions of the node's children, left to right.
    pub child_indices: Vec<usize>,
}

impl<T: TreeLike> Iterator for PostOrderIter<T> {
    type Item = PostOrderIterItem<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut top = self.stack.pop()?;
            match top.children {
                None => {
                    let children = top.node.as_node().into_vec();
                    top.children = Some(Vec::with_capacity(children.len()));
                    let parent = Some(self.stack.len());
                    self.stack.push(top);
                    for node in children.into_iter().rev() {
                        self.stack.push(PendingNode { node, children: None, parent });
                    }
                }
                Some(child_indices) => {
                    let index = self.index;
                    self.index += 1;
                    if let Some(parent) = top.parent {
                        if let Some(ref mut siblings) = self.stack[parent].children {
                            siblings.push(index);
                        }
                    }
                    return Some(PostOrderIterItem { node: top.node, index, child_indices });
                }
            }
        }
    }
}

/// Pre-order iterator; see [`TreeLike::pre_order_iter`].
pub struct PreOrderIter<T> {
    stack: Vec<T>,
}

impl<T: TreeLike> Iterator for PreOrderIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let top = self.stack.pop()?;
        self.stack.extend(top.as_node().into_vec().into_iter().rev());
        Some(top)
    }
}

/// Verbose pre-order iterator; see [`TreeLike::verbose_pre_order_iter`].
pub struct VerbosePreOrderIter<T> {
    /// Nodes with their first-yield index and the number of children
    /// yielded so far; `None` if the node itself was not yet yielded.
    stack: Vec<(T, Option<(usize, usize)>)>,
    index: usize,
}

/// An item yielded by [`VerbosePreOrderIter`].
pub struct PreOrderIterItem<T> {
    /// The node.
    pub node: T,
    /// Position of the node's first yield, counting distinct nodes.
    pub index: usize,
    /// How many children were yielded before this visit.
    pub n_children_yielded: usize,
    /// Whether this is the last time the node is yielded.
    pub is_complete: bool,
    /// The node's parent, if it is not the root.
    pub parent: Option<T>,
}

impl<T: TreeLike> Iterator for VerbosePreOrderIter<T> {
    type Item = PreOrderIterItem<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, seen) = self.stack.pop()?;
        let (index, n_children_yielded) = match seen {
            Some(seen) => seen,
            None => {
                self.index += 1;
                (self.index - 1, 0)
            }
        };
        let parent = self.stack.last().map(|(parent, _)| parent.clone());
        let children = node.as_node().into_vec();
        let is_complete = n_children_yielded == children.len();
        if let Some(child) = children.into_iter().nth(n_children_yielded) {
            self.stack.push((node.clone(), Some((index, n_children_yielded + 1))));
            self.stack.push((child, None));
        }
        Some(PreOrderIterItem { node, index, n_children_yielded, is_complete, parent })
    }
}
