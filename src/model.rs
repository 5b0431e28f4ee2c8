use std::collections::VecDeque;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::SeqTree;

/// One step of a randomized run against the [`VecDeque`] reference model.
///
/// Split operations pick a position, verify both halves, then join the
/// halves back so every run keeps exercising a single growing sequence.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    PushFront(u16),
    PushBack(u16),
    PopFront,
    PopBack,
    Front,
    Back,
    SplitAfterAt(u8),
    SplitBeforeAt(u8),
    AppendNew(u8),
    PrependNew(u8),
}

proptest::prop_compose! {
    fn value_strategy()(
        value in 0u16..1000,
    ) -> u16 {
        value
    }
}

proptest::prop_compose! {
    fn position_strategy()(
        position in 0u8..=255,
    ) -> u8 {
        position
    }
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::PushFront),
        value_strategy().prop_map(Op::PushBack),
        Just(Op::PopFront),
        Just(Op::PopBack),
        Just(Op::Front),
        Just(Op::Back),
        position_strategy().prop_map(Op::SplitAfterAt),
        position_strategy().prop_map(Op::SplitBeforeAt),
        position_strategy().prop_map(Op::AppendNew),
        position_strategy().prop_map(Op::PrependNew),
    ]
}

// Walks `idx` successor hops from the front.
fn nth_node(tree: &SeqTree<u16>, idx: usize) -> crate::NodeRef<u16> {
    let mut node = tree.front_node().expect("position is in range");
    for _ in 0..idx {
        node = unsafe { tree.successor(node).expect("position is in range") };
    }
    node
}

fn assert_matches(tree: &SeqTree<u16>, deque: &VecDeque<u16>) {
    tree.assert_invariants();
    assert_eq!(tree.len(), deque.len());
    assert_eq!(tree.front(), deque.front());
    assert_eq!(tree.back(), deque.back());
    assert!(tree.iter().eq(deque.iter()));
    assert!(tree.iter().rev().eq(deque.iter().rev()));
}

pub fn run_deque_equivalence(ops: Vec<Op>) {
    let mut deque: VecDeque<u16> = VecDeque::new();
    let mut tree: SeqTree<u16> = SeqTree::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        match op {
            Op::PushFront(value) => {
                deque.push_front(value);
                tree.push_front(value);
            }

            Op::PushBack(value) => {
                deque.push_back(value);
                tree.push_back(value);
            }

            Op::PopFront => {
                let from_deque = deque.pop_front();
                let from_tree = tree.pop_front();

                assert_eq!(from_deque, from_tree, "Op #{op_id}: {op:?}");
            }

            Op::PopBack => {
                let from_deque = deque.pop_back();
                let from_tree = tree.pop_back();

                assert_eq!(from_deque, from_tree, "Op #{op_id}: {op:?}");
            }

            Op::Front => {
                assert_eq!(deque.front(), tree.front(), "Op #{op_id}: {op:?}");
            }

            Op::Back => {
                assert_eq!(deque.back(), tree.back(), "Op #{op_id}: {op:?}");
            }

            Op::SplitAfterAt(position) => {
                if tree.is_empty() {
                    continue;
                }

                let idx = position as usize % tree.len();
                let node = nth_node(&tree, idx);
                let mut split = unsafe { tree.split_after(node) };

                split.assert_invariants();
                assert_eq!(tree.len(), idx + 1, "Op #{op_id}: {op:?}");
                assert!(tree.iter().eq(deque.iter().take(idx + 1)));
                assert!(split.iter().eq(deque.iter().skip(idx + 1)));

                tree.append(&mut split);
                assert!(split.is_empty());
            }

            Op::SplitBeforeAt(position) => {
                if tree.is_empty() {
                    continue;
                }

                let idx = position as usize % tree.len();
                let node = nth_node(&tree, idx);
                let mut split = unsafe { tree.split_before(node) };

                split.assert_invariants();
                assert_eq!(tree.len(), idx, "Op #{op_id}: {op:?}");
                assert!(tree.iter().eq(deque.iter().take(idx)));
                assert!(split.iter().eq(deque.iter().skip(idx)));

                tree.append(&mut split);
                assert!(split.is_empty());
            }

            Op::AppendNew(count) => {
                let count = count as usize % 8;
                let mut fresh: SeqTree<u16> = SeqTree::new();
                for i in 0..count {
                    let value = i as u16;
                    fresh.push_back(value);
                    deque.push_back(value);
                }

                tree.append(&mut fresh);
                assert!(fresh.is_empty(), "Op #{op_id}: {op:?}");
            }

            Op::PrependNew(count) => {
                let count = count as usize % 8;
                let mut fresh: SeqTree<u16> = SeqTree::new();
                for i in 0..count {
                    fresh.push_back(i as u16);
                }
                for i in (0..count).rev() {
                    deque.push_front(i as u16);
                }

                tree.prepend(&mut fresh);
                assert!(fresh.is_empty(), "Op #{op_id}: {op:?}");
            }
        }

        assert_matches(&tree, &deque);
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to
    // check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub values: Vec<u16>,
    pub ops: Vec<CursorOp>,
}

impl<'a> Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u16 {
            u16::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> CursorOp {
            CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(CursorEquivalenceInput { values, ops })
    }
}

pub fn run_cursor_equivalence(values: Vec<u16>, ops: Vec<CursorOp>) {
    let mut vec = Vec::new();
    let mut tree: SeqTree<u16> = SeqTree::new();

    for val in values {
        vec.push(val);
        tree.push_back(val);
    }

    fn vec_curs_prev(v: &Vec<u16>, curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &Vec<u16>, curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    let mut vec_curs = vec_curs_next(&vec, None);
    let mut tree_curs = tree.cursor_front();

    // Check that the initial states are equivalent.
    {
        let v = vec_curs.map(|i| &vec[i]);
        let t = tree_curs.get();

        assert_eq!(v, t);
    }

    for op in ops {
        match op {
            CursorOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                tree_curs.move_next();
            }

            CursorOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                tree_curs.move_prev();
            }

            CursorOp::PeekNext => {
                let v = vec_curs_next(&vec, vec_curs).map(|i| &vec[i]);
                let t = tree_curs.peek_next();

                assert_eq!(v, t);
            }

            CursorOp::PeekPrev => {
                let v = vec_curs_prev(&vec, vec_curs).map(|i| &vec[i]);
                let t = tree_curs.peek_prev();

                assert_eq!(v, t);
            }
        }

        let v = vec_curs.map(|i| &vec[i]);
        let t = tree_curs.get();

        assert_eq!(v, t);
    }
}
