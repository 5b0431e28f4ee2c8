use core::{marker::PhantomData, ptr::NonNull};

use crate::{Link, Node, NodeRef, SeqTree};

/// A cursor over a [`SeqTree`].
///
/// A cursor points either to an element of the tree or to a "ghost"
/// non-element that connects the last element to the first. Moves follow the
/// tree's neighbor threading and complete in constant time.
pub struct Cursor<'tree, T> {
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree SeqTree<T>>,
}

impl<'tree, T> Cursor<'tree, T> {
    pub(crate) fn first(tree: &'tree SeqTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::first(tree.into()),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree SeqTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::last(tree.into()),
            phantom: PhantomData,
        }
    }

    /// Moves the cursor to the next element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// moves it to the first element. If it is pointing to the last element,
    /// this method moves it to the "ghost" non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// moves it to the last element. If it is pointing to the first element,
    /// this method moves it to the "ghost" non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the element pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the
    /// "ghost" non-element.
    pub fn get(&self) -> Option<&'tree T> {
        unsafe { self.curs.get() }
    }

    /// Returns a handle to the element pointed to by the cursor.
    pub fn node(&self) -> Option<NodeRef<T>> {
        self.curs.node()
    }

    /// Returns a reference to the next element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// returns the first element. If it is pointing to the last element,
    /// this method returns `None`.
    pub fn peek_next(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns a reference to the previous element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// returns the last element. If it is pointing to the first element,
    /// this method returns `None`.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek_prev() }
    }
}

/// A cursor over a [`SeqTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost"
/// non-element that connects the last element to the first.
pub struct CursorMut<'tree, T> {
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree mut SeqTree<T>>,
}

impl<'tree, T> CursorMut<'tree, T> {
    pub(crate) fn first(tree: &'tree mut SeqTree<T>) -> CursorMut<'tree, T> {
        CursorMut {
            curs: CursorRaw::first(NonNull::from(&mut *tree)),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree mut SeqTree<T>) -> CursorMut<'tree, T> {
        CursorMut {
            curs: CursorRaw::last(NonNull::from(&mut *tree)),
            phantom: PhantomData,
        }
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the
    /// returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Moves the cursor to the next element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// moves it to the first element. If it is pointing to the last element,
    /// this method moves it to the "ghost" non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// moves it to the last element. If it is pointing to the first element,
    /// this method moves it to the "ghost" non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the element pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the
    /// "ghost" non-element.
    pub fn get(&self) -> Option<&T> {
        unsafe { self.curs.get() }
    }

    /// Returns a mutable reference to the element pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the
    /// "ghost" non-element.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        unsafe { self.curs.get_mut() }
    }

    /// Returns a handle to the element pointed to by the cursor.
    pub fn node(&self) -> Option<NodeRef<T>> {
        self.curs.node()
    }

    /// Returns a reference to the next element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// returns the first element. If it is pointing to the last element,
    /// this method returns `None`.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns a reference to the previous element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method
    /// returns the last element. If it is pointing to the first element,
    /// this method returns `None`.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek_prev() }
    }

    /// Splits the tree after the current element, consuming the cursor.
    ///
    /// Elements after the cursor are moved into the returned tree. If the
    /// cursor is pointing to the "ghost" non-element, this method returns
    /// `None` and the tree is not modified.
    pub fn split_after(self) -> Option<SeqTree<T>> {
        let node = self.curs.node()?;
        let mut tree = self.curs.tree;

        // The cursor held the only live borrow of the tree, and the node was
        // read out of that same tree.
        unsafe { Some(tree.as_mut().split_after(node)) }
    }

    /// Splits the tree before the current element, consuming the cursor.
    ///
    /// The current element and those after it are moved into the returned
    /// tree. If the cursor is pointing to the "ghost" non-element, this
    /// method returns `None` and the tree is not modified.
    pub fn split_before(self) -> Option<SeqTree<T>> {
        let node = self.curs.node()?;
        let mut tree = self.curs.tree;

        unsafe { Some(tree.as_mut().split_before(node)) }
    }
}

struct CursorRaw<T> {
    tree: NonNull<SeqTree<T>>,
    ptr: Link<Node<T>>,
}

impl<T> CursorRaw<T> {
    fn first(tree: NonNull<SeqTree<T>>) -> CursorRaw<T> {
        CursorRaw {
            tree,
            ptr: unsafe { tree.as_ref().first_raw() },
        }
    }

    fn last(tree: NonNull<SeqTree<T>>) -> CursorRaw<T> {
        CursorRaw {
            tree,
            ptr: unsafe { tree.as_ref().last_raw() },
        }
    }

    fn node(&self) -> Option<NodeRef<T>> {
        self.ptr.map(NodeRef::from_raw)
    }

    unsafe fn move_next(&mut self) {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => self.ptr = tree.successor_raw(p),
            None => self.ptr = tree.first_raw(),
        }
    }

    unsafe fn move_prev(&mut self) {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => self.ptr = tree.predecessor_raw(p),
            None => self.ptr = tree.last_raw(),
        }
    }

    unsafe fn get<'a>(&self) -> Option<&'a T> {
        self.ptr.map(|p| unsafe { p.as_ref().value() })
    }

    unsafe fn get_mut<'a>(&mut self) -> Option<&'a mut T> {
        self.ptr.map(|p| unsafe { (*p.as_ptr()).value_mut() })
    }

    unsafe fn peek_next<'a>(&self) -> Option<&'a T> {
        let tree = unsafe { self.tree.as_ref() };

        let next_ptr = match self.ptr {
            Some(p) => tree.successor_raw(p),
            None => tree.first_raw(),
        };

        next_ptr.map(|p| unsafe { p.as_ref().value() })
    }

    unsafe fn peek_prev<'a>(&self) -> Option<&'a T> {
        let tree = unsafe { self.tree.as_ref() };

        let prev_ptr = match self.ptr {
            Some(p) => tree.predecessor_raw(p),
            None => tree.last_raw(),
        };

        prev_ptr.map(|p| unsafe { p.as_ref().value() })
    }
}
