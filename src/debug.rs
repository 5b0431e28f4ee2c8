use core::{fmt, ptr::NonNull};
use std::collections::VecDeque;

use cordyceps::Linked;

use crate::{Node, SeqTree};

impl<T> SeqTree<T>
where
    T: fmt::Debug,
{
    /// Renders the tree's structure as a Graphviz digraph, one rank row per
    /// tree level. Node labels carry the element plus the cached height and
    /// subtree size.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root() {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T> {
            Node(NonNull<Node<T>>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        loop {
            use fmt::Write;
            let remaining = queue.len();
            if remaining == 0 {
                break;
            }

            write!(w, "{{rank=same; ")?;

            for _level_node in 0..remaining {
                let node = queue.pop_front().unwrap();

                let node = match node {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let id = node.as_ptr() as usize;
                let (value, height, size) = unsafe {
                    let links = Node::links(node).as_ref();
                    (node.as_ref().value(), links.height(), links.size())
                };
                write!(
                    w,
                    "\"graph{name}-{id}\" [label=\"{value:?} h{height} s{size}\"]; "
                )?;

                for child in unsafe {
                    let node_links = Node::links(node).as_ref();
                    [node_links.left(), node_links.right()]
                } {
                    match child {
                        Some(child) => {
                            let child_id = child.as_ptr() as usize;

                            queue.push_back(Item::Node(child));
                            writeln!(
                                links,
                                "\"graph{name}-{id}\" -> \"graph{name}-{child_id}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{id}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
