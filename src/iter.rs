use thiserror::Error;

use crate::{Link, Node, NodeRef, SeqTree};

/// The tree was structurally modified while a [`Walk`] was in progress.
///
/// Walks are fail-fast: any mutation through the tree's API between two
/// [`Walk::next`] calls is detected, and the walk refuses to continue.
/// Callers recover by starting a new walk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("tree was structurally modified while a walk was in progress")]
pub struct TreeChanged;

/// A detached, forward-only walk over the elements of a [`SeqTree`].
///
/// A walk does not borrow its tree. Instead it captures the tree's version
/// stamp at creation and revalidates it on every step, so the tree can be
/// freely mutated between walks without lifetime gymnastics — at the cost of
/// the walk dying with [`TreeChanged`] once that happens.
pub struct Walk<T> {
    expected: u64,
    next: Link<Node<T>>,
}

impl<T> Walk<T> {
    pub(crate) fn new(tree: &SeqTree<T>) -> Walk<T> {
        Walk {
            expected: tree.version(),
            next: tree.first_raw(),
        }
    }

    /// Advances the walk, returning the next element in sequence order.
    ///
    /// Returns `Ok(None)` once the sequence is exhausted, and
    /// `Err(TreeChanged)` if `tree` was mutated since the walk began.
    pub fn next<'tree>(&mut self, tree: &'tree SeqTree<T>) -> Result<Option<&'tree T>, TreeChanged> {
        self.next_node(tree)
            .map(|node| node.map(|node| unsafe { tree.value(node) }))
    }

    /// Advances the walk, returning a handle to the next element.
    pub fn next_node(&mut self, tree: &SeqTree<T>) -> Result<Option<NodeRef<T>>, TreeChanged> {
        if tree.version() != self.expected {
            return Err(TreeChanged);
        }

        let Some(node) = self.next else {
            return Ok(None);
        };

        // A matching stamp proves `tree` still owns `node` and has not been
        // mutated since this walk recorded it, so the pointer is live.
        self.next = tree.successor_raw(node);
        Ok(Some(NodeRef::from_raw(node)))
    }
}

/// A borrowing iterator over the elements of a [`SeqTree`] in sequence
/// order.
///
/// Stepping follows the neighbor threading from the tree's minimum, so each
/// step is O(1).
pub struct Iter<'tree, T> {
    tree: &'tree SeqTree<T>,

    front: Link<Node<T>>,
    back: Link<Node<T>>,

    len: usize,
}

impl<'tree, T> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree SeqTree<T>) -> Self {
        Iter {
            tree,
            front: tree.first_raw(),
            back: tree.last_raw(),
            len: tree.len(),
        }
    }
}

impl<'tree, T> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let node = self.front.expect("iterator length is nonzero");
        self.front = self.tree.successor_raw(node);
        self.len -= 1;

        Some(unsafe { node.as_ref().value() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T> DoubleEndedIterator for Iter<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let node = self.back.expect("iterator length is nonzero");
        self.back = self.tree.predecessor_raw(node);
        self.len -= 1;

        Some(unsafe { node.as_ref().value() })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    fn len(&self) -> usize {
        self.len
    }
}

impl<T> core::iter::FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}
