//! An order-maintenance AVL tree.
//!
//! [`SeqTree`] keeps its elements in an explicit left-to-right order rather
//! than sorting them by key: there is no comparator anywhere, and new
//! elements can only enter the sequence at one of its two ends. In exchange
//! the tree threads every node into a doubly-linked neighbor overlay, so
//! successor and predecessor queries are O(1), and it supports splitting a
//! sequence in two and joining two sequences end-to-end in O(log n).
//!
//! Handles to individual elements are returned as [`NodeRef`]s. A handle
//! stays valid for as long as its element is attached to a tree, and can be
//! passed back into neighbor queries and split operations. Operations that
//! trust a handle's membership are `unsafe`; the [`CursorMut`] API offers a
//! safe alternative for splitting at a position.
//!
//! ```
//! use cordyceps_seqtree::SeqTree;
//!
//! let mut tree: SeqTree<u32> = SeqTree::new();
//! let two = tree.push_back(2);
//! tree.push_back(3);
//! tree.push_front(1);
//!
//! assert!(tree.iter().eq(&[1, 2, 3]));
//!
//! let mut rest = unsafe { tree.split_after(two) };
//! assert!(tree.iter().eq(&[1, 2]));
//! assert!(rest.iter().eq(&[3]));
//!
//! tree.append(&mut rest);
//! assert_eq!(tree.len(), 3);
//! assert!(rest.is_empty());
//! ```

use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomPinned,
    mem,
    ops::Not,
    ptr::NonNull,
    sync::atomic::{AtomicU64, Ordering},
};

use cordyceps::Linked;

mod cursor;
mod debug;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
#[cfg(test)]
mod tests;

pub use cursor::{Cursor, CursorMut};
pub use iter::{Iter, TreeChanged, Walk};

/// An order-maintenance AVL tree.
///
/// The tree performs no key comparison: the order of its elements is exactly
/// the order in which they were pushed onto its ends, refined by splits and
/// joins. Structurally it is a height-balanced binary tree whose in-order
/// traversal is mirrored by a doubly-linked neighbor chain, with each node
/// caching the size, height, minimum and maximum of its subtree.
pub struct SeqTree<T> {
    sentinel: NonNull<Node<T>>,
    version: u64,
}

/// A single element of a [`SeqTree`], allocated on the heap.
///
/// Detached nodes are owned as `Box<Node<T>>` and can be re-inserted into
/// any tree (see [`SeqTree::push_back_node`]), letting callers reuse an
/// allocation across trees.
pub struct Node<T> {
    links: Links<Node<T>>,
    // `None` only for the per-tree sentinel, which is never exposed.
    value: Option<T>,
}

/// Link block of a tree node: structural, neighbor and aggregate state.
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

/// A copyable handle to an element attached to a [`SeqTree`].
pub struct NodeRef<T> {
    node: NonNull<Node<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    // In-order neighbors: `Left` is the predecessor, `Right` the successor.
    neighbors: [Link<T>; 2],
    // Cached extremes of the subtree rooted here; a detached node is its
    // own minimum and maximum.
    ends: [Link<T>; 2],
    height: u8,
    size: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// Version stamps are drawn from one process-wide sequence, so two trees
// never share a stamp unless one took over the other's contents wholesale.
// `Walk` relies on this: a stamp match proves the nodes it recorded are
// still owned, unmutated, by the tree it is handed.
fn next_version() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                neighbors: [None; 2],
                ends: [None; 2],
                height: 1,
                size: 1,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn neighbor(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).neighbors[dir as usize] }
    }

    #[inline]
    fn end(&self, dir: Dir) -> NonNull<T> {
        unsafe { (*self.inner.get()).ends[dir as usize] }.expect("end links are set at reset")
    }

    #[inline]
    fn height(&self) -> u8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn size(&self) -> usize {
        unsafe { (*self.inner.get()).size }
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_neighbor(&mut self, dir: Dir, neighbor: Link<T>) {
        self.inner.get_mut().neighbors[dir as usize] = neighbor;
    }

    #[inline]
    fn set_end(&mut self, dir: Dir, end: NonNull<T>) {
        self.inner.get_mut().ends[dir as usize] = Some(end);
    }

    #[inline]
    fn set_height(&mut self, height: u8) {
        self.inner.get_mut().height = height;
    }

    #[inline]
    fn set_size(&mut self, size: usize) {
        self.inner.get_mut().size = size;
    }

    // Returns the node to the detached singleton state: no parent, children
    // or neighbors, its own minimum and maximum, height 1, size 1.
    fn reset(&mut self, this: NonNull<T>) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.neighbors = [None; 2];
        inner.ends = [Some(this); 2];
        inner.height = 1;
        inner.size = 1;
    }
}

unsafe impl<T> Linked<Links<Node<T>>> for Node<T> {
    type Handle = Box<Node<T>>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Node<T>>> {
        let ptr = ptr.as_ptr();
        NonNull::new(core::ptr::addr_of_mut!((*ptr).links)).unwrap()
    }
}

impl<T> Node<T> {
    /// Allocates a detached node holding `value`.
    pub fn new(value: T) -> Box<Node<T>> {
        Box::new(Node {
            links: Links::new(),
            value: Some(value),
        })
    }

    /// Returns a reference to the node's element.
    pub fn value(&self) -> &T {
        self.value.as_ref().expect("sentinel nodes hold no element")
    }

    /// Returns a mutable reference to the node's element.
    pub fn value_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("sentinel nodes hold no element")
    }

    /// Consumes a detached node, returning its element.
    pub fn into_value(self: Box<Self>) -> T {
        let Node { value, .. } = *self;
        value.expect("sentinel nodes hold no element")
    }

    fn new_sentinel() -> NonNull<Node<T>> {
        let node = Node::into_ptr(Box::new(Node {
            links: Links::new(),
            value: None,
        }));
        unsafe { Node::links(node).as_mut().reset(node) };
        node
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&self.value).finish()
    }
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<T> {}

impl<T> PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<T> Eq for NodeRef<T> {}

impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:p})", self.node)
    }
}

impl<T> NodeRef<T> {
    pub(crate) fn from_raw(node: NonNull<Node<T>>) -> NodeRef<T> {
        NodeRef { node }
    }
}

impl<T> SeqTree<T> {
    /// Returns a new empty tree.
    pub fn new() -> SeqTree<T> {
        SeqTree {
            sentinel: Node::new_sentinel(),
            version: next_version(),
        }
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.root()
            .map(|root| unsafe { Node::links(root).as_ref().size() })
            .unwrap_or(0)
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root().is_none()
    }

    /// Returns the height of the tree: 0 when empty, 1 for a single element.
    pub fn height(&self) -> usize {
        self.root()
            .map(|root| unsafe { Node::links(root).as_ref().height() as usize })
            .unwrap_or(0)
    }

    /// Returns a reference to the first element of the sequence.
    pub fn front(&self) -> Option<&T> {
        self.first_raw().map(|node| unsafe { node.as_ref().value() })
    }

    /// Returns a reference to the last element of the sequence.
    pub fn back(&self) -> Option<&T> {
        self.last_raw().map(|node| unsafe { node.as_ref().value() })
    }

    /// Returns a handle to the first element of the sequence.
    pub fn front_node(&self) -> Option<NodeRef<T>> {
        self.first_raw().map(|node| NodeRef { node })
    }

    /// Returns a handle to the last element of the sequence.
    pub fn back_node(&self) -> Option<NodeRef<T>> {
        self.last_raw().map(|node| NodeRef { node })
    }

    /// Inserts `value` before the current first element.
    ///
    /// Finding the attach point is O(1) through the cached minimum; the
    /// rebalancing walk costs amortized constant time per insertion.
    pub fn push_front(&mut self, value: T) -> NodeRef<T> {
        self.push_node_at(Dir::Left, Node::new(value))
    }

    /// Inserts `value` after the current last element.
    ///
    /// Finding the attach point is O(1) through the cached maximum; the
    /// rebalancing walk costs amortized constant time per insertion.
    pub fn push_back(&mut self, value: T) -> NodeRef<T> {
        self.push_node_at(Dir::Right, Node::new(value))
    }

    /// Inserts a detached node before the current first element.
    pub fn push_front_node(&mut self, node: Box<Node<T>>) -> NodeRef<T> {
        self.push_node_at(Dir::Left, node)
    }

    /// Inserts a detached node after the current last element.
    pub fn push_back_node(&mut self, node: Box<Node<T>>) -> NodeRef<T> {
        self.push_node_at(Dir::Right, node)
    }

    /// Removes the first element and returns it, or `None` if the tree is
    /// empty.
    pub fn pop_front(&mut self) -> Option<T> {
        self.pop_node(Dir::Left).map(Node::into_value)
    }

    /// Removes the last element and returns it, or `None` if the tree is
    /// empty.
    pub fn pop_back(&mut self) -> Option<T> {
        self.pop_node(Dir::Right).map(Node::into_value)
    }

    /// Removes the first element, returning it as a detached node.
    pub fn pop_front_node(&mut self) -> Option<Box<Node<T>>> {
        self.pop_node(Dir::Left)
    }

    /// Removes the last element, returning it as a detached node.
    pub fn pop_back_node(&mut self) -> Option<Box<Node<T>>> {
        self.pop_node(Dir::Right)
    }

    /// Returns a handle to the element immediately after `node`, or `None`
    /// if `node` is the last element.
    ///
    /// This operation completes in constant time.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not of any other tree or detached.
    pub unsafe fn successor(&self, node: NodeRef<T>) -> Option<NodeRef<T>> {
        self.successor_raw(node.node).map(|node| NodeRef { node })
    }

    /// Returns a handle to the element immediately before `node`, or `None`
    /// if `node` is the first element.
    ///
    /// This operation completes in constant time.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not of any other tree or detached.
    pub unsafe fn predecessor(&self, node: NodeRef<T>) -> Option<NodeRef<T>> {
        self.predecessor_raw(node.node).map(|node| NodeRef { node })
    }

    /// Returns a reference to the element behind `node`.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not of any other tree or detached.
    pub unsafe fn value(&self, node: NodeRef<T>) -> &T {
        unsafe { node.node.as_ref().value() }
    }

    /// Returns a mutable reference to the element behind `node`.
    ///
    /// The tree never inspects its elements, so mutating one cannot disturb
    /// the structure.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not of any other tree or detached.
    pub unsafe fn value_mut(&mut self, node: NodeRef<T>) -> &mut T {
        unsafe { (*node.node.as_ptr()).value_mut() }
    }

    /// Splits the sequence in two after `node`.
    ///
    /// Elements up to and including `node` are retained in `self`; the
    /// elements after it are moved into the returned tree. Handles into
    /// either part remain valid.
    ///
    /// This operation completes in _O(log(n))_ time.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not of any other tree or detached.
    pub unsafe fn split_after(&mut self, node: NodeRef<T>) -> SeqTree<T> {
        self.touch();
        let node = node.node;

        unsafe {
            let mut parent = Node::links(node)
                .as_ref()
                .parent()
                .expect("attached nodes have a parent");
            let mut from_left = Node::links(parent).as_ref().left() == Some(node);

            let left = Node::links(node).as_ref().left();
            let right = Node::links(node).as_ref().right();
            if let Some(left) = left {
                Node::links(left).as_mut().set_parent(None);
            }
            if let Some(right) = right {
                Node::links(right).as_mut().set_parent(None);
            }
            Node::links(node).as_mut().reset(node);

            // `node` becomes the maximum of the retained part; its right
            // subtree seeds the split-off part.
            let mut left_acc = Some(self.merge_nodes(node, left, None));
            let mut right_acc = right;

            // Walk the former ancestor chain, consuming each ancestor as the
            // junction of one join. Ascending out of a left child means the
            // ancestor and its right subtree sort after `node`; out of a
            // right child, the ancestor and its left subtree sort before it.
            while parent != self.sentinel {
                let next_parent = Node::links(parent)
                    .as_ref()
                    .parent()
                    .expect("non-sentinel nodes have a parent");
                let next_from_left = Node::links(next_parent).as_ref().left() == Some(parent);

                let p_left = Node::links(parent).as_ref().left();
                let p_right = Node::links(parent).as_ref().right();

                if from_left {
                    if let Some(p_right) = p_right {
                        Node::links(p_right).as_mut().set_parent(None);
                    }
                    Node::links(parent).as_mut().reset(parent);
                    right_acc = Some(self.merge_nodes(parent, right_acc, p_right));
                } else {
                    if let Some(p_left) = p_left {
                        Node::links(p_left).as_mut().set_parent(None);
                    }
                    Node::links(parent).as_mut().reset(parent);
                    left_acc = Some(self.merge_nodes(parent, p_left, left_acc));
                }

                parent = next_parent;
                from_left = next_from_left;
            }

            // The split-off minimum still remembers a predecessor from the
            // retained part; sever it.
            if let Some(right_root) = right_acc {
                let min = Node::links(right_root).as_ref().end(Dir::Left);
                Node::links(min).as_mut().set_neighbor(Dir::Left, None);
            }

            self.attach_root(left_acc);

            let mut split = SeqTree::new();
            split.attach_root(right_acc);
            split
        }
    }

    /// Splits the sequence in two before `node`.
    ///
    /// Elements before `node` are retained in `self`; `node` and the
    /// elements after it are moved into the returned tree. If `node` is the
    /// first element, the entire sequence moves and `self` is left empty.
    ///
    /// This operation completes in _O(log(n))_ time.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not of any other tree or detached.
    pub unsafe fn split_before(&mut self, node: NodeRef<T>) -> SeqTree<T> {
        unsafe {
            match self.predecessor_raw(node.node) {
                Some(node) => self.split_after(NodeRef { node }),
                None => {
                    self.touch();
                    let root = self.take_root();
                    let mut split = SeqTree::new();
                    split.attach_root(root);
                    split
                }
            }
        }
    }

    /// Moves all elements of `other` after the elements of `self`, leaving
    /// `other` empty.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn append(&mut self, other: &mut SeqTree<T>) {
        if other.is_empty() {
            return;
        }

        self.touch();

        if other.len() == 1 {
            let node = other
                .pop_node(Dir::Left)
                .expect("`other` is known to be non-empty");
            self.push_node_at(Dir::Right, node);
            return;
        }

        other.touch();

        unsafe {
            // The junction joining the two halves is recruited from `other`:
            // removing its minimum rebalances `other` and leaves a detached
            // node that sorts between the two sequences.
            let junction = Node::into_ptr(
                other
                    .pop_node(Dir::Left)
                    .expect("`other` is known to be non-empty"),
            );
            let left = self.take_root();
            let right = other.take_root();
            let merged = self.merge_nodes(junction, left, right);
            self.attach_root(Some(merged));
        }
    }

    /// Moves all elements of `other` before the elements of `self`, leaving
    /// `other` empty.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn prepend(&mut self, other: &mut SeqTree<T>) {
        other.append(self);
        mem::swap(self, other);
        self.touch();
        other.touch();
    }

    /// Removes all elements, leaving the tree empty.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }

        self.touch();

        unsafe {
            let mut cur = self.first_raw();
            while let Some(node) = cur {
                cur = self.successor_raw(node);
                drop(Node::from_ptr(node));
            }

            self.set_child(self.sentinel, Dir::Left, None);
        }
    }

    /// Returns a borrowing iterator over the elements in sequence order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns a detached forward walk over the elements.
    ///
    /// Unlike [`iter`](SeqTree::iter), a walk does not borrow the tree;
    /// instead every [`Walk::next`] call revalidates the tree and reports
    /// [`TreeChanged`] if any mutation happened since the walk began.
    pub fn walk(&self) -> Walk<T> {
        Walk::new(self)
    }

    /// Returns a cursor pointing to the first element.
    pub fn cursor_front(&self) -> Cursor<'_, T> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing to the last element.
    pub fn cursor_back(&self) -> Cursor<'_, T> {
        Cursor::last(self)
    }

    /// Returns an editing cursor pointing to the first element.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::first(self)
    }

    /// Returns an editing cursor pointing to the last element.
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::last(self)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let root = match self.root() {
            Some(root) => root,
            None => {
                assert_eq!(self.len(), 0);
                assert!(self.first_raw().is_none());
                assert!(self.last_raw().is_none());
                return;
            }
        };

        unsafe {
            assert!(
                Node::links(self.sentinel).as_ref().parent().is_none(),
                "the sentinel must terminate upward walks"
            );
            assert_eq!(
                Node::links(root).as_ref().parent(),
                Some(self.sentinel),
                "the root must hang off the sentinel"
            );

            let size = self.assert_invariants_at(root);
            assert_eq!(size, self.len());

            // The neighbor chain must spell out the in-order traversal.
            let mut in_order = Vec::with_capacity(size);
            self.collect_in_order(root, &mut in_order);

            let min = Node::links(root).as_ref().end(Dir::Left);
            let max = Node::links(root).as_ref().end(Dir::Right);
            assert_eq!(in_order.first(), Some(&min));
            assert_eq!(in_order.last(), Some(&max));
            assert_eq!(
                Node::links(min).as_ref().neighbor(Dir::Left),
                None,
                "the minimum has no predecessor"
            );
            assert_eq!(
                Node::links(max).as_ref().neighbor(Dir::Right),
                Some(self.sentinel),
                "the maximum is threaded back to the sentinel"
            );

            let mut cur = Some(min);
            for (i, &expected) in in_order.iter().enumerate() {
                let node = cur.expect("neighbor chain ended early");
                assert_eq!(node, expected, "neighbor chain diverges at index {i}");

                if let Some(next) = self.successor_raw(node) {
                    assert_eq!(
                        Node::links(next).as_ref().neighbor(Dir::Left),
                        Some(node),
                        "predecessor link is not the inverse of successor"
                    );
                }

                cur = self.successor_raw(node);
            }
            assert!(cur.is_none(), "neighbor chain outlives the in-order traversal");
        }
    }

    // Checks balance, aggregates and parent links below `node`, returning
    // the subtree's actual size.
    unsafe fn assert_invariants_at(&self, node: NonNull<Node<T>>) -> usize {
        unsafe {
            let left = Node::links(node).as_ref().left();
            let right = Node::links(node).as_ref().right();

            for child in [left, right].into_iter().flatten() {
                assert_eq!(
                    Node::links(child).as_ref().parent(),
                    Some(node),
                    "child's parent link does not point back"
                );
            }

            let left_size = left.map(|l| self.assert_invariants_at(l)).unwrap_or(0);
            let right_size = right.map(|r| self.assert_invariants_at(r)).unwrap_or(0);

            let lh = self.height_of(left);
            let rh = self.height_of(right);
            assert!(
                lh.abs_diff(rh) <= 1,
                "balance bound violated: left height {lh}, right height {rh}"
            );

            let links = Node::links(node).as_ref();
            assert_eq!(links.height(), 1 + lh.max(rh));
            assert_eq!(links.size(), 1 + left_size + right_size);

            let min = left
                .map(|l| Node::links(l).as_ref().end(Dir::Left))
                .unwrap_or(node);
            let max = right
                .map(|r| Node::links(r).as_ref().end(Dir::Right))
                .unwrap_or(node);
            assert_eq!(links.end(Dir::Left), min, "stale subtree minimum");
            assert_eq!(links.end(Dir::Right), max, "stale subtree maximum");

            links.size()
        }
    }

    unsafe fn collect_in_order(&self, node: NonNull<Node<T>>, out: &mut Vec<NonNull<Node<T>>>) {
        unsafe {
            if let Some(left) = Node::links(node).as_ref().left() {
                self.collect_in_order(left, out);
            }
            out.push(node);
            if let Some(right) = Node::links(node).as_ref().right() {
                self.collect_in_order(right, out);
            }
        }
    }

    // Internals =============================================================

    #[inline]
    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    fn touch(&mut self) {
        self.version = next_version();
    }

    #[inline]
    fn root(&self) -> Link<Node<T>> {
        unsafe { Node::links(self.sentinel).as_ref().left() }
    }

    #[inline]
    pub(crate) fn first_raw(&self) -> Link<Node<T>> {
        self.end_raw(Dir::Left)
    }

    #[inline]
    pub(crate) fn last_raw(&self) -> Link<Node<T>> {
        self.end_raw(Dir::Right)
    }

    fn end_raw(&self, dir: Dir) -> Link<Node<T>> {
        self.root()
            .map(|root| unsafe { Node::links(root).as_ref().end(dir) })
    }

    pub(crate) fn successor_raw(&self, node: NonNull<Node<T>>) -> Link<Node<T>> {
        unsafe {
            Node::links(node)
                .as_ref()
                .neighbor(Dir::Right)
                .filter(|&next| next != self.sentinel)
        }
    }

    pub(crate) fn predecessor_raw(&self, node: NonNull<Node<T>>) -> Link<Node<T>> {
        unsafe {
            Node::links(node)
                .as_ref()
                .neighbor(Dir::Left)
                .filter(|&prev| prev != self.sentinel)
        }
    }

    fn push_node_at(&mut self, dir: Dir, node: Box<Node<T>>) -> NodeRef<T> {
        self.touch();

        let node = Node::into_ptr(node);

        unsafe {
            Node::links(node).as_mut().reset(node);

            match self.end_raw(dir) {
                // The attach point is the current extreme, whose outward
                // child slot is necessarily empty.
                Some(extreme) => {
                    self.set_child(extreme, dir, Some(node));
                    self.balance(extreme);
                }
                None => self.set_child(self.sentinel, Dir::Left, Some(node)),
            }
        }

        NodeRef { node }
    }

    fn pop_node(&mut self, dir: Dir) -> Option<Box<Node<T>>> {
        let node = self.end_raw(dir)?;

        self.touch();

        unsafe {
            let parent = Node::links(node)
                .as_ref()
                .parent()
                .expect("attached nodes have a parent");
            // An extreme node has at most one child, on its inward side.
            let child = Node::links(node).as_ref().child(!dir);

            self.substitute_child(parent, node, child);
            self.balance(parent);

            // The new minimum may still remember the removed node as its
            // predecessor; the sentinel re-threading during the balance walk
            // only heals the maximum side.
            if dir == Dir::Left {
                if let Some(min) = self.first_raw() {
                    Node::links(min).as_mut().set_neighbor(Dir::Left, None);
                }
            }

            Node::links(node).as_mut().reset(node);
            Some(Node::from_ptr(node))
        }
    }

    // Hangs `child` off `node` on side `dir`, keeping the neighbor threading
    // and the subtree extreme caches of `node` consistent. Heights and sizes
    // are not touched here.
    unsafe fn set_child(&mut self, node: NonNull<Node<T>>, dir: Dir, child: Link<Node<T>>) {
        unsafe {
            Node::links(node).as_mut().set_child(dir, child);

            match child {
                Some(child) => {
                    Node::links(child).as_mut().set_parent(Some(node));

                    // The child subtree's far extreme is this node's new
                    // in-order neighbor on that side, and vice versa.
                    let adjacent = Node::links(child).as_ref().end(!dir);
                    Node::links(node).as_mut().set_neighbor(dir, Some(adjacent));
                    Node::links(adjacent).as_mut().set_neighbor(!dir, Some(node));

                    let end = Node::links(child).as_ref().end(dir);
                    Node::links(node).as_mut().set_end(dir, end);
                }
                None => {
                    Node::links(node).as_mut().set_neighbor(dir, None);
                    Node::links(node).as_mut().set_end(dir, node);
                }
            }
        }
    }

    // Replaces the child slot of `parent` holding `old` with `new`.
    //
    // `old` must currently be a child of `parent`; anything else is a logic
    // error in the surgery above this call.
    unsafe fn substitute_child(
        &mut self,
        parent: NonNull<Node<T>>,
        old: NonNull<Node<T>>,
        new: Link<Node<T>>,
    ) {
        unsafe {
            if Node::links(parent).as_ref().left() == Some(old) {
                self.set_child(parent, Dir::Left, new);
            } else if Node::links(parent).as_ref().right() == Some(old) {
                self.set_child(parent, Dir::Right, new);
            } else {
                unreachable!("`old` must be a child of `parent`");
            }
        }
    }

    unsafe fn height_of(&self, node: Link<Node<T>>) -> u8 {
        node.map(|node| unsafe { Node::links(node).as_ref().height() })
            .unwrap_or(0)
    }

    unsafe fn size_of(&self, node: Link<Node<T>>) -> usize {
        node.map(|node| unsafe { Node::links(node).as_ref().size() })
            .unwrap_or(0)
    }

    // Recomputes `node`'s height and size from its children's caches. Never
    // descends into the subtree.
    unsafe fn update_height_and_size(&mut self, node: NonNull<Node<T>>) {
        unsafe {
            let left = Node::links(node).as_ref().left();
            let right = Node::links(node).as_ref().right();
            let height = 1 + self.height_of(left).max(self.height_of(right));
            let size = 1 + self.size_of(left) + self.size_of(right);

            let links = Node::links(node).as_mut();
            links.set_height(height);
            links.set_size(size);
        }
    }

    // Rotates `node` downward in direction `dir`, lifting its `!dir` child
    // into `node`'s place. Returns the lifted child; the caller re-hangs it
    // under `node`'s former parent. Only the two touched nodes' aggregates
    // are refreshed.
    unsafe fn rotate(&mut self, node: NonNull<Node<T>>, dir: Dir) -> NonNull<Node<T>> {
        unsafe {
            let pivot = Node::links(node)
                .as_ref()
                .child(!dir)
                .expect("rotation requires a child to lift");
            Node::links(pivot).as_mut().set_parent(None);

            let across = Node::links(pivot).as_ref().child(dir);
            self.set_child(node, !dir, across);
            self.set_child(pivot, dir, Some(node));

            self.update_height_and_size(node);
            self.update_height_and_size(pivot);

            pivot
        }
    }

    // Restores the balance bound at `node`, returning the (possibly new)
    // root of its subtree. A doubly-heavy side is first straightened with an
    // inner rotation if its child leans the other way.
    unsafe fn balance_node(&mut self, node: NonNull<Node<T>>) -> NonNull<Node<T>> {
        unsafe {
            self.update_height_and_size(node);

            let lh = self.height_of(Node::links(node).as_ref().left());
            let rh = self.height_of(Node::links(node).as_ref().right());

            if lh > rh + 1 {
                let left = Node::links(node)
                    .as_ref()
                    .left()
                    .expect("doubly-heavy side has a child");
                let inner_left = Node::links(left).as_ref().left();
                let inner_right = Node::links(left).as_ref().right();
                if self.height_of(inner_right) > self.height_of(inner_left) {
                    let straightened = self.rotate(left, Dir::Left);
                    self.set_child(node, Dir::Left, Some(straightened));
                }
                self.rotate(node, Dir::Right)
            } else if rh > lh + 1 {
                let right = Node::links(node)
                    .as_ref()
                    .right()
                    .expect("doubly-heavy side has a child");
                let inner_left = Node::links(right).as_ref().left();
                let inner_right = Node::links(right).as_ref().right();
                if self.height_of(inner_left) > self.height_of(inner_right) {
                    let straightened = self.rotate(right, Dir::Right);
                    self.set_child(node, Dir::Right, Some(straightened));
                }
                self.rotate(node, Dir::Left)
            } else {
                node
            }
        }
    }

    // Rebalances every node from `start` up to the sentinel. Re-hanging each
    // balanced subtree under its parent also refreshes the parent's neighbor
    // threading and extreme caches, so the walk doubles as the aggregate
    // propagation pass.
    unsafe fn balance(&mut self, start: NonNull<Node<T>>) {
        let mut node = start;

        unsafe {
            while node != self.sentinel {
                let parent = Node::links(node)
                    .as_ref()
                    .parent()
                    .expect("non-sentinel nodes have a parent");
                let balanced = self.balance_node(node);
                self.substitute_child(parent, node, Some(balanced));
                node = parent;
            }
        }
    }

    // Joins `left`, `junction` and `right` into one balanced tree whose
    // order is left-to-right, returning its root. `junction` must be
    // detached; the subtree roots must be parentless. Descends the taller
    // side until the height gap closes, then rebalances on the way out.
    unsafe fn merge_nodes(
        &mut self,
        junction: NonNull<Node<T>>,
        left: Link<Node<T>>,
        right: Link<Node<T>>,
    ) -> NonNull<Node<T>> {
        unsafe {
            let lh = self.height_of(left);
            let rh = self.height_of(right);

            if lh.abs_diff(rh) <= 1 {
                self.set_child(junction, Dir::Left, left);
                self.set_child(junction, Dir::Right, right);
                self.update_height_and_size(junction);
                junction
            } else if lh > rh {
                let anchor = left.expect("taller side is non-empty");
                let inner = Node::links(anchor).as_ref().right();
                let merged = self.merge_nodes(junction, inner, right);
                self.set_child(anchor, Dir::Right, Some(merged));
                self.balance_node(anchor)
            } else {
                let anchor = right.expect("taller side is non-empty");
                let inner = Node::links(anchor).as_ref().left();
                let merged = self.merge_nodes(junction, left, inner);
                self.set_child(anchor, Dir::Left, Some(merged));
                self.balance_node(anchor)
            }
        }
    }

    // Detaches and returns the root subtree, leaving the tree empty. The
    // detached maximum's threading back to the sentinel is severed.
    unsafe fn take_root(&mut self) -> Link<Node<T>> {
        unsafe {
            let root = self.root()?;
            self.set_child(self.sentinel, Dir::Left, None);
            Node::links(root).as_mut().set_parent(None);

            let max = Node::links(root).as_ref().end(Dir::Right);
            Node::links(max).as_mut().set_neighbor(Dir::Right, None);

            Some(root)
        }
    }

    unsafe fn attach_root(&mut self, root: Link<Node<T>>) {
        unsafe { self.set_child(self.sentinel, Dir::Left, root) };
    }
}

impl<T> Drop for SeqTree<T> {
    fn drop(&mut self) {
        self.clear();
        unsafe { drop(Node::from_ptr(self.sentinel)) };
    }
}

impl<T> Default for SeqTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

// The tree exclusively owns its nodes, and shared access only ever reads
// through them.
unsafe impl<T: Send> Send for SeqTree<T> {}
unsafe impl<T: Sync> Sync for SeqTree<T> {}

impl<T: fmt::Debug> fmt::Debug for SeqTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for SeqTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for SeqTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = SeqTree::new();
        tree.extend(iter);
        tree
    }
}

impl<'tree, T> IntoIterator for &'tree SeqTree<T> {
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
