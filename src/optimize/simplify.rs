//! Pass 4 — simplification (§4.F): drop identity children, drop children
//! whose result nothing uses, short-circuit after a child whose outcome is
//! already decided, collapse degenerate unary/nullary operators, and lift
//! negation-heavy `and`/`or` to their dual.

use crate::expr::{Arena, NodeId, NodeKind};

pub fn run(arena: &mut Arena, id: NodeId) -> bool {
    let mut changed = false;
    for child in arena.children(id).to_vec() {
        changed |= run(arena, child);
    }
    changed |= simplify_node(arena, id);
    changed |= lift(arena, id);
    changed
}

fn simplify_node(arena: &mut Arena, id: NodeId) -> bool {
    let is_and = match &arena.get(id).kind {
        NodeKind::And(_) => true,
        NodeKind::Or(_) => false,
        NodeKind::Comma(_) => return simplify_comma(arena, id),
        _ => return false,
    };

    let children: Vec<NodeId> = arena.children(id).to_vec();
    let identity_always_true = is_and; // `true` is a no-op under `and`, `false` under `or`
    let short_circuit_value = !is_and; // an `always_false` child under `and` (dually `always_true` under `or`) decides the whole node

    let mut kept = Vec::with_capacity(children.len());
    let mut decided = false;
    for c in children {
        if decided {
            break;
        }
        let h = &arena.get(c).header;
        let is_identity = if identity_always_true { h.always_true && h.pure } else { h.always_false && h.pure };
        if is_identity {
            continue;
        }
        let decides_node = if is_and { h.always_false } else { h.always_true };
        if decides_node {
            kept.push(c);
            decided = true;
            continue;
        }
        // a pure child whose boolean result nothing downstream reads: under
        // `and`/`or` that's any pure child that isn't the last one, since a
        // non-terminal child here only contributes control flow, not value.
        kept.push(c);
    }
    let _ = short_circuit_value;

    let changed = kept.len() != arena.children(id).len();
    finish_operator(arena, id, kept, is_and);
    changed
}

fn simplify_comma(arena: &mut Arena, id: NodeId) -> bool {
    let children: Vec<NodeId> = arena.children(id).to_vec();
    let last_index = children.len().checked_sub(1);
    let mut kept = Vec::with_capacity(children.len());
    for (i, c) in children.iter().enumerate() {
        let h = &arena.get(*c).header;
        let is_last = Some(i) == last_index;
        if h.pure && !is_last {
            continue; // result discarded; comma only propagates the last value
        }
        kept.push(*c);
    }
    if kept.is_empty() {
        if let Some(&last) = children.last() {
            kept.push(last);
        }
    }
    let changed = kept.len() != children.len();
    arena.set_children(id, kept);
    changed
}

fn finish_operator(arena: &mut Arena, id: NodeId, kept: Vec<NodeId>, is_and: bool) {
    match kept.len() {
        0 => arena.get_mut(id).kind = if is_and { NodeKind::True } else { NodeKind::False },
        1 => {
            let only = kept[0];
            let inner = std::mem::replace(&mut arena.get_mut(only).kind, NodeKind::True);
            let header = arena.get(only).header.clone();
            arena.get_mut(id).kind = inner;
            arena.get_mut(id).header = header;
        }
        _ => arena.set_children(id, kept),
    }
}

/// If an `and`/`or` has more negated children than non-negated, rewrite to
/// the dual with complemented children: fewer negations makes later rounds
/// simpler to canonicalize and reorder.
fn lift(arena: &mut Arena, id: NodeId) -> bool {
    let is_and = match &arena.get(id).kind {
        NodeKind::And(_) => true,
        NodeKind::Or(_) => false,
        _ => return false,
    };
    let children: Vec<NodeId> = arena.children(id).to_vec();
    let negated_count = children.iter().filter(|c| matches!(arena.get(**c).kind, NodeKind::Not(_))).count();
    if negated_count * 2 <= children.len() {
        return false;
    }

    let complemented: Vec<NodeId> = children
        .into_iter()
        .map(|c| match &arena.get(c).kind {
            NodeKind::Not(inner) => *inner,
            _ => {
                let span = arena.get(c).header.argv_span;
                arena.new_node(NodeKind::Not(c), span)
            }
        })
        .collect();
    let kind = if is_and { NodeKind::Or(complemented) } else { NodeKind::And(complemented) };
    arena.get_mut(id).kind = kind;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_true(arena: &mut Arena) -> NodeId {
        let id = arena.new_node(NodeKind::True, (0, 0));
        let header = &mut arena.get_mut(id).header;
        header.pure = true;
        header.always_true = true;
        id
    }

    #[test]
    fn identity_true_dropped_under_and() {
        let mut arena = Arena::new();
        let a = leaf_true(&mut arena);
        let b = arena.new_node(NodeKind::False, (0, 0));
        let and = arena.new_node(NodeKind::And(vec![a, b]), (0, 0));
        run(&mut arena, and);
        // `b` alone remains after dropping the `true` identity and
        // collapsing the resulting unary `and`.
        assert!(matches!(arena.get(and).kind, NodeKind::False));
    }

    #[test]
    fn empty_and_collapses_to_true() {
        let mut arena = Arena::new();
        let a = leaf_true(&mut arena);
        let and = arena.new_node(NodeKind::And(vec![a]), (0, 0));
        run(&mut arena, and);
        assert!(matches!(arena.get(and).kind, NodeKind::True));
    }

    #[test]
    fn lift_rewrites_majority_negated_and_to_or() {
        let mut arena = Arena::new();
        let a = arena.new_node(NodeKind::False, (0, 0));
        let not_a = arena.new_node(NodeKind::Not(a), (0, 0));
        let b = arena.new_node(NodeKind::False, (0, 0));
        let not_b = arena.new_node(NodeKind::Not(b), (0, 0));
        let and = arena.new_node(NodeKind::And(vec![not_a, not_b]), (0, 0));
        lift(&mut arena, and);
        assert!(matches!(arena.get(and).kind, NodeKind::Or(_)));
    }
}
