//! Depth-first tree traversal with enter/exit events.
//!
//! The iterator is non-recursive (it follows sibling and parent links) and
//! resumable: [`TreeIter::reset`] repositions it mid-walk, which renderers
//! use to skip subtrees they have emitted through another path.

use crate::tree::{NodeId, Tree};

/// Traversal event paired with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterEvent {
    Enter,
    Exit,
    Done,
}

/// Depth-first iterator over a subtree. Every node produces an `Enter`;
/// nodes that may have children also produce an `Exit`.
pub struct TreeIter<'a> {
    tree: &'a Tree,
    root: NodeId,
    current: NodeId,
    event: IterEvent,
}

impl<'a> TreeIter<'a> {
    pub fn new(tree: &'a Tree, root: NodeId) -> Self {
        Self {
            tree,
            root,
            current: root,
            event: IterEvent::Enter,
        }
    }

    /// Node the iterator is currently positioned on.
    pub fn node(&self) -> NodeId {
        self.current
    }

    pub fn event(&self) -> IterEvent {
        self.event
    }

    /// Reposition the iterator. The next `next()` call yields `(node, event)`
    /// and continues from there.
    pub fn reset(&mut self, node: NodeId, event: IterEvent) {
        self.current = node;
        self.event = event;
    }

    fn step(&mut self) {
        let tree = self.tree;
        match self.event {
            IterEvent::Done => {}
            IterEvent::Enter => {
                if let Some(child) = tree.first_child(self.current) {
                    self.current = child;
                    self.event = IterEvent::Enter;
                } else if tree.value(self.current).can_have_children() {
                    self.event = IterEvent::Exit;
                } else {
                    self.advance_past();
                }
            }
            IterEvent::Exit => self.advance_past(),
        }
    }

    /// Move on after `current` is finished: next sibling, else exit parent.
    fn advance_past(&mut self) {
        if self.current == self.root {
            self.event = IterEvent::Done;
            return;
        }
        if let Some(sib) = self.tree.next_sibling(self.current) {
            self.current = sib;
            self.event = IterEvent::Enter;
        } else if let Some(parent) = self.tree.parent(self.current) {
            self.current = parent;
            self.event = IterEvent::Exit;
        } else {
            self.event = IterEvent::Done;
        }
    }
}

impl Iterator for TreeIter<'_> {
    type Item = (NodeId, IterEvent);

    fn next(&mut self) -> Option<Self::Item> {
        if self.event == IterEvent::Done {
            return None;
        }
        let item = (self.current, self.event);
        // The root's Exit (or a leaf root's Enter) is the last item.
        if self.current == self.root
            && (self.event == IterEvent::Exit || !self.tree.value(self.root).can_have_children())
        {
            self.event = IterEvent::Done;
            return Some(item);
        }
        self.step();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeValue;

    #[test]
    fn events_pair_for_containers_only() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = tree.create(NodeValue::Text("a".into()));
        tree.append_child(p, a);
        let em = tree.create(NodeValue::Emph);
        tree.append_child(p, em);
        let b = tree.create(NodeValue::Text("b".into()));
        tree.append_child(em, b);

        let events: Vec<_> = TreeIter::new(&tree, tree.root()).collect();
        assert_eq!(
            events,
            vec![
                (tree.root(), IterEvent::Enter),
                (p, IterEvent::Enter),
                (a, IterEvent::Enter),
                (em, IterEvent::Enter),
                (b, IterEvent::Enter),
                (em, IterEvent::Exit),
                (p, IterEvent::Exit),
                (tree.root(), IterEvent::Exit),
            ]
        );
    }

    #[test]
    fn leaf_root_enters_once() {
        let mut tree = Tree::new();
        let t = tree.create(NodeValue::Text("x".into()));
        let events: Vec<_> = TreeIter::new(&tree, t).collect();
        assert_eq!(events, vec![(t, IterEvent::Enter)]);
    }

    #[test]
    fn reset_skips_a_subtree() {
        let mut tree = Tree::new();
        let p1 = tree.create(NodeValue::Paragraph);
        let p2 = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), p1);
        tree.append_child(tree.root(), p2);
        let a = tree.create(NodeValue::Text("a".into()));
        tree.append_child(p1, a);

        let mut iter = TreeIter::new(&tree, tree.root());
        // consume root Enter and p1 Enter
        iter.next();
        iter.next();
        // skip p1's contents
        iter.reset(p1, IterEvent::Exit);
        let rest: Vec<_> = iter.collect();
        assert_eq!(
            rest,
            vec![
                (p1, IterEvent::Exit),
                (p2, IterEvent::Enter),
                (p2, IterEvent::Exit),
                (tree.root(), IterEvent::Exit),
            ]
        );
    }
}
