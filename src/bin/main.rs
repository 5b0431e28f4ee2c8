use cordyceps_seqtree::SeqTree;

fn main() {
    let mut tree: SeqTree<u32> = SeqTree::new();

    for value in [3, 4, 5] {
        tree.push_back(value);
        tree.assert_invariants();
        println!("{:?}", tree.iter().collect::<Vec<_>>());
    }

    for value in [2, 1, 0] {
        tree.push_front(value);
        tree.assert_invariants();
        println!("{:?}", tree.iter().collect::<Vec<_>>());
    }

    let three = tree
        .cursor_front()
        .node()
        .map(|mut node| {
            for _ in 0..3 {
                node = unsafe { tree.successor(node).unwrap() };
            }
            node
        })
        .unwrap();

    let mut rest = unsafe { tree.split_after(three) };
    tree.assert_invariants();
    rest.assert_invariants();
    println!("split: {:?} / {:?}", tree, rest);

    tree.append(&mut rest);
    tree.assert_invariants();
    println!("joined: {:?}", tree);

    let zero = tree.pop_front().unwrap();
    assert_eq!(zero, 0);
    tree.assert_invariants();

    let mut walk = tree.walk();
    while let Some(value) = walk.next(&tree).expect("tree is not being mutated") {
        print!("{value} ");
    }
    println!();

    drop(tree);
}
