use std::ops::Range;

use proptest::prelude::*;

use crate::model;

use super::*;

fn tree_of(values: Range<u32>) -> SeqTree<u32> {
    let mut tree = SeqTree::new();
    for value in values {
        tree.push_back(value);
        tree.assert_invariants();
    }
    tree
}

#[test]
fn new_tree_is_empty() {
    let tree: SeqTree<u32> = SeqTree::new();

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.front(), None);
    assert_eq!(tree.back(), None);
    assert_eq!(tree.iter().next(), None);
    tree.assert_invariants();
}

#[test]
fn push_back_keeps_insertion_order() {
    let tree = tree_of(1..8);

    assert!(tree.iter().eq(&[1, 2, 3, 4, 5, 6, 7]));
    assert_eq!(tree.len(), 7);
    assert!(tree.height() <= 3);
}

#[test]
fn push_front_reverses_insertion_order() {
    let mut tree = SeqTree::new();
    for value in 1..8 {
        tree.push_front(value);
        tree.assert_invariants();
    }

    assert!(tree.iter().eq(&[7, 6, 5, 4, 3, 2, 1]));
    assert!(tree.height() <= 3);
}

#[test]
fn mixed_pushes_interleave_correctly() {
    let mut tree = SeqTree::new();
    tree.push_back(3);
    tree.push_front(2);
    tree.push_back(4);
    tree.push_front(1);
    tree.push_back(5);
    tree.assert_invariants();

    assert!(tree.iter().eq(&[1, 2, 3, 4, 5]));
    assert!(tree.iter().rev().eq(&[5, 4, 3, 2, 1]));
}

#[test]
fn pop_front_drains_in_order() {
    let mut tree = tree_of(1..4);

    for expected in 1..4 {
        assert_eq!(tree.pop_front(), Some(expected));
        tree.assert_invariants();
    }

    // Exhausted: popping keeps reporting nothing removed and stays valid.
    for _ in 0..4 {
        assert_eq!(tree.pop_front(), None);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn pop_back_drains_in_reverse_order() {
    let mut tree = tree_of(1..4);

    for expected in (1..4).rev() {
        assert_eq!(tree.pop_back(), Some(expected));
        tree.assert_invariants();
    }

    assert_eq!(tree.pop_back(), None);
    assert!(tree.is_empty());
}

#[test]
fn pops_from_both_ends_meet_in_the_middle() {
    let mut tree = tree_of(1..8);

    assert_eq!(tree.pop_front(), Some(1));
    assert_eq!(tree.pop_back(), Some(7));
    assert_eq!(tree.pop_front(), Some(2));
    assert_eq!(tree.pop_back(), Some(6));
    tree.assert_invariants();

    assert!(tree.iter().eq(&[3, 4, 5]));
}

#[test]
fn split_after_partitions_the_sequence() {
    let mut tree = SeqTree::new();
    let mut handles = Vec::new();
    for value in 1..8 {
        handles.push(tree.push_back(value));
    }

    let at_four = handles[3];
    let split = unsafe { tree.split_after(at_four) };

    tree.assert_invariants();
    split.assert_invariants();
    assert!(tree.iter().eq(&[1, 2, 3, 4]));
    assert!(split.iter().eq(&[5, 6, 7]));
}

#[test]
fn split_after_every_position_round_trips() {
    const N: u32 = 32;

    for split_at in 0..N {
        let mut tree = tree_of(0..N);
        let mut handle = tree.front_node().unwrap();
        for _ in 0..split_at {
            handle = unsafe { tree.successor(handle).unwrap() };
        }

        let mut split = unsafe { tree.split_after(handle) };
        tree.assert_invariants();
        split.assert_invariants();

        assert!(tree.iter().copied().eq(0..=split_at));
        assert!(split.iter().copied().eq(split_at + 1..N));

        // Joining the halves back is the identity on content and order.
        tree.append(&mut split);
        tree.assert_invariants();
        assert!(split.is_empty());
        assert!(tree.iter().copied().eq(0..N));
    }
}

#[test]
fn split_before_first_element_moves_everything() {
    let mut tree = tree_of(1..6);
    let first = tree.front_node().unwrap();

    let split = unsafe { tree.split_before(first) };

    tree.assert_invariants();
    split.assert_invariants();
    assert!(tree.is_empty());
    assert!(split.iter().eq(&[1, 2, 3, 4, 5]));
}

#[test]
fn split_before_partitions_the_sequence() {
    let mut tree = tree_of(1..6);
    let mut node = tree.front_node().unwrap();
    node = unsafe { tree.successor(node).unwrap() };
    node = unsafe { tree.successor(node).unwrap() };

    let split = unsafe { tree.split_before(node) };

    assert!(tree.iter().eq(&[1, 2]));
    assert!(split.iter().eq(&[3, 4, 5]));
}

#[test]
fn append_moves_every_element() {
    let mut first = tree_of(1..4);
    let mut second = tree_of(4..7);

    first.append(&mut second);

    first.assert_invariants();
    second.assert_invariants();
    assert!(first.iter().eq(&[1, 2, 3, 4, 5, 6]));
    assert!(second.is_empty());
}

#[test]
fn append_one_element_tree() {
    let mut first = tree_of(1..4);
    let mut second = tree_of(4..5);

    first.append(&mut second);

    assert!(first.iter().eq(&[1, 2, 3, 4]));
    assert!(second.is_empty());
}

#[test]
fn append_into_empty_tree() {
    let mut first: SeqTree<u32> = SeqTree::new();
    let mut second = tree_of(1..9);

    first.append(&mut second);

    first.assert_invariants();
    assert!(first.iter().copied().eq(1..9));
    assert!(second.is_empty());
}

#[test]
fn append_empty_tree_is_a_no_op() {
    let mut first = tree_of(1..4);
    let mut second: SeqTree<u32> = SeqTree::new();

    first.append(&mut second);

    assert!(first.iter().eq(&[1, 2, 3]));
    assert!(second.is_empty());
}

#[test]
fn append_lopsided_trees() {
    let mut first = tree_of(0..100);
    let mut second = tree_of(100..104);
    first.append(&mut second);
    first.assert_invariants();
    assert!(first.iter().copied().eq(0..104));

    let mut small = tree_of(0..3);
    let mut large = tree_of(3..120);
    small.append(&mut large);
    small.assert_invariants();
    assert!(small.iter().copied().eq(0..120));
}

#[test]
fn prepend_moves_elements_in_front() {
    let mut first = tree_of(4..7);
    let mut second = tree_of(1..4);

    first.prepend(&mut second);

    first.assert_invariants();
    second.assert_invariants();
    assert!(first.iter().eq(&[1, 2, 3, 4, 5, 6]));
    assert!(second.is_empty());
}

#[test]
fn thousand_appends_stay_balanced() {
    let mut tree = SeqTree::new();
    for value in 0..1000u32 {
        tree.push_back(value);
    }

    // 1.44 * log2(1001) is a little over 14.
    assert!(tree.height() <= 14, "height was {}", tree.height());
    tree.assert_invariants();
    assert!(tree.iter().copied().eq(0..1000));
}

#[test]
fn neighbor_queries_are_exact_inverses() {
    let tree = tree_of(0..64);

    let mut node = tree.front_node().unwrap();
    assert_eq!(unsafe { tree.predecessor(node) }, None);

    let mut seen: usize = 1;
    while let Some(next) = unsafe { tree.successor(node) } {
        assert_eq!(unsafe { tree.predecessor(next) }, Some(node));
        node = next;
        seen += 1;
    }

    assert_eq!(seen, tree.len());
    assert_eq!(Some(node), tree.back_node());
}

#[test]
fn handles_stay_valid_across_rebalancing() {
    let mut tree = SeqTree::new();
    let handle = tree.push_back(42u32);

    for value in 0..100 {
        tree.push_front(value);
        tree.push_back(value);
    }

    assert_eq!(unsafe { *tree.value(handle) }, 42);
}

#[test]
fn value_mut_updates_an_element_in_place() {
    let mut tree = SeqTree::new();
    tree.push_back(1u32);
    let handle = tree.push_back(2);
    tree.push_back(3);

    unsafe { *tree.value_mut(handle) = 20 };

    assert!(tree.iter().eq(&[1, 20, 3]));
}

#[test]
fn detached_nodes_can_be_reused() {
    let mut first = tree_of(1..5);
    let mut second: SeqTree<u32> = SeqTree::new();

    while let Some(node) = first.pop_front_node() {
        second.push_back_node(node);
        second.assert_invariants();
    }

    assert!(first.is_empty());
    assert!(second.iter().eq(&[1, 2, 3, 4]));
}

#[test]
fn walk_yields_the_sequence() {
    let tree = tree_of(1..6);

    let mut walk = tree.walk();
    let mut seen = Vec::new();
    while let Some(value) = walk.next(&tree).unwrap() {
        seen.push(*value);
    }

    assert_eq!(seen, [1, 2, 3, 4, 5]);
    // Exhausted walks stay exhausted.
    assert_eq!(walk.next(&tree), Ok(None));
}

#[test]
fn walk_fails_fast_after_mutation() {
    let mut tree = tree_of(1..6);

    let mut walk = tree.walk();
    assert_eq!(walk.next(&tree), Ok(Some(&1)));

    tree.push_back(6);

    assert_eq!(walk.next(&tree), Err(TreeChanged));
    // The condition is sticky until a new walk is taken.
    assert_eq!(walk.next(&tree), Err(TreeChanged));

    let mut fresh = tree.walk();
    assert_eq!(fresh.next(&tree), Ok(Some(&1)));
}

#[test]
fn walk_fails_fast_after_pop_and_clear() {
    let mut tree = tree_of(1..6);

    let mut walk = tree.walk();
    tree.pop_back();
    assert_eq!(walk.next(&tree), Err(TreeChanged));

    let mut walk = tree.walk();
    tree.clear();
    assert_eq!(walk.next(&tree), Err(TreeChanged));
}

#[test]
fn cursor_wraps_through_the_ghost() {
    let tree = tree_of(1..4);

    let mut curs = tree.cursor_front();
    assert_eq!(curs.get(), Some(&1));
    assert_eq!(curs.peek_prev(), None);

    curs.move_next();
    curs.move_next();
    assert_eq!(curs.get(), Some(&3));
    assert_eq!(curs.peek_next(), None);

    // Stepping past the back lands on the ghost, then wraps to the front.
    curs.move_next();
    assert_eq!(curs.get(), None);
    assert_eq!(curs.peek_next(), Some(&1));
    assert_eq!(curs.peek_prev(), Some(&3));

    curs.move_next();
    assert_eq!(curs.get(), Some(&1));
}

#[test]
fn cursor_split_after_retains_the_prefix() {
    let mut tree = tree_of(1..6);

    let mut curs = tree.cursor_front_mut();
    curs.move_next();
    let split = curs.split_after().unwrap();

    assert!(tree.iter().eq(&[1, 2]));
    assert!(split.iter().eq(&[3, 4, 5]));
}

#[test]
fn cursor_split_at_ghost_is_refused() {
    let mut tree = tree_of(1..4);

    let mut curs = tree.cursor_back_mut();
    curs.move_next();
    assert!(curs.get().is_none());
    assert!(curs.split_after().is_none());

    assert!(tree.iter().eq(&[1, 2, 3]));
}

#[test]
fn clear_empties_the_tree() {
    let mut tree = tree_of(0..50);

    tree.clear();

    assert!(tree.is_empty());
    tree.assert_invariants();

    tree.push_back(7);
    assert!(tree.iter().eq(&[7]));
}

#[test]
fn collect_and_extend_preserve_order() {
    let mut tree: SeqTree<u32> = (0..10).collect();
    tree.extend(10..20);

    tree.assert_invariants();
    assert!(tree.iter().copied().eq(0..20));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn deque_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_deque_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u16..1000, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }
}
