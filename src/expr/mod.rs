//! The expression tree (§3, §4.D): a tagged node arena with a builder API.

pub mod field;
pub mod node;

pub use node::{Header, Node, NodeId, NodeKind};

/// Owns every node for one search; freeing the arena frees the whole tree in
/// one pass (§3 "the context owns all expressions via an arena").
///
/// Child lists are `Vec<NodeId>` rather than the C source's intrusive
/// next-sibling links (§9): the optimizer's reorder pass (§4.F pass 3) needs
/// indexed, in-place stable sorting of a child run, which a singly linked
/// list cannot offer without an O(n) splice per swap.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { nodes: Vec::new() }
    }

    /// Allocate a new node (§4.D `new`). Flags default false, cost zero,
    /// probability 0.5, per the spec.
    pub fn new_node(&mut self, kind: NodeKind, argv_span: (usize, usize)) -> NodeId {
        self.nodes.push(Node::new(kind, argv_span));
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn is_parent(&self, id: NodeId) -> bool {
        self.get(id).is_parent()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).children()
    }

    /// Move `child` into `parent`'s child list, recomputing `parent`'s
    /// aggregate header fields (§4.D `append`).
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        match &mut self.get_mut(parent).kind {
            NodeKind::And(cs) | NodeKind::Or(cs) | NodeKind::Comma(cs) => cs.push(child),
            NodeKind::Not(_) => panic!("`not` takes exactly one child; use replace_child"),
            _ => panic!("cannot append to a non-operator node"),
        }
        self.recompute_aggregate(parent);
    }

    pub fn extend(&mut self, parent: NodeId, children: impl IntoIterator<Item = NodeId>) {
        for c in children {
            self.append(parent, c);
        }
    }

    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        match &mut self.get_mut(parent).kind {
            NodeKind::And(cs) | NodeKind::Or(cs) | NodeKind::Comma(cs) => *cs = children,
            NodeKind::Not(c) => {
                *c = *children.first().expect("`not` requires exactly one child");
            }
            _ => panic!("cannot set children on a non-operator node"),
        }
        self.recompute_aggregate(parent);
    }

    /// Recompute `persistent_fds` (sum over children) and `ephemeral_fds`
    /// (max over children) for an operator node, per the §3 invariant.
    pub fn recompute_aggregate(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).to_vec();
        if children.is_empty() {
            return;
        }
        let mut persistent = 0u32;
        let mut ephemeral = 0u32;
        for c in &children {
            let h = &self.get(*c).header;
            persistent += h.persistent_fds;
            ephemeral = ephemeral.max(h.ephemeral_fds);
        }
        let header = &mut self.get_mut(id).header;
        header.persistent_fds = persistent;
        header.ephemeral_fds = ephemeral;
    }

    /// Release variant-owned resources before the node slot is abandoned
    /// (§4.D `clear`). The arena itself is reclaimed in bulk when the
    /// `Context` is dropped; this exists for variants with non-trivial
    /// teardown semantics worth naming explicitly (closing sinks is handled
    /// by the context, not here, since sinks are shared across nodes).
    pub fn clear(&mut self, id: NodeId) {
        self.get_mut(id).kind = NodeKind::True;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Evaluate an `IntCmp`-family comparison (§4.D `cmp` helper).
pub fn cmp_holds(cmp: field::Cmp, lhs: i64, rhs: i64) -> bool {
    cmp.holds(lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::{Cmp, IntCmpSpec, IntField};

    #[test]
    fn append_recomputes_fd_aggregates() {
        let mut arena = Arena::new();
        let a = arena.new_node(NodeKind::True, (0, 0));
        let b = arena.new_node(NodeKind::False, (0, 0));
        arena.get_mut(a).header.persistent_fds = 1;
        arena.get_mut(b).header.persistent_fds = 2;
        arena.get_mut(a).header.ephemeral_fds = 3;
        arena.get_mut(b).header.ephemeral_fds = 1;
        let and = arena.new_node(NodeKind::And(vec![]), (0, 0));
        arena.append(and, a);
        arena.append(and, b);
        assert_eq!(arena.get(and).header.persistent_fds, 3);
        assert_eq!(arena.get(and).header.ephemeral_fds, 3);
    }

    #[test]
    fn int_cmp_holds_matches_field_semantics() {
        let spec = IntCmpSpec { field: IntField::Depth, cmp: Cmp::Gt, operand: 2 };
        assert!(cmp_holds(spec.cmp, 3, spec.operand));
        assert!(!cmp_holds(spec.cmp, 2, spec.operand));
    }
}
