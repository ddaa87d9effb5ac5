//! Pass 1 — canonicalization (§4.F), top-down. De Morgan sinking, double
//! negation removal, negation commuting past comma's non-final children, and
//! associative flattening.

use crate::expr::{Arena, NodeId, NodeKind};

/// Returns `true` if anything in the subtree rooted at `id` changed.
pub fn run(arena: &mut Arena, id: NodeId) -> bool {
    let mut changed = false;
    loop {
        let mut pass_changed = false;
        pass_changed |= rewrite_not(arena, id);
        pass_changed |= rewrite_comma_negation(arena, id);
        pass_changed |= flatten(arena, id);
        for child in arena.children(id).to_vec() {
            pass_changed |= run(arena, child);
        }
        changed |= pass_changed;
        if !pass_changed {
            break;
        }
    }
    changed
}

/// `not(true) -> false`, `not(false) -> true`, `not(not(x)) -> x`,
/// `not(and(..)) -> or(not(..))` and dually (De Morgan, sunk here only).
fn rewrite_not(arena: &mut Arena, id: NodeId) -> bool {
    let child = match &arena.get(id).kind {
        NodeKind::Not(c) => *c,
        _ => return false,
    };
    match &arena.get(child).kind {
        NodeKind::True => {
            arena.get_mut(id).kind = NodeKind::False;
            true
        }
        NodeKind::False => {
            arena.get_mut(id).kind = NodeKind::True;
            true
        }
        NodeKind::Not(grandchild) => {
            let grandchild = *grandchild;
            let inner = std::mem::replace(&mut arena.get_mut(grandchild).kind, NodeKind::True);
            arena.get_mut(id).kind = inner;
            true
        }
        NodeKind::And(cs) => {
            let cs = cs.clone();
            let negated: Vec<NodeId> = cs.into_iter().map(|c| wrap_not(arena, c)).collect();
            arena.get_mut(id).kind = NodeKind::Or(negated);
            true
        }
        NodeKind::Or(cs) => {
            let cs = cs.clone();
            let negated: Vec<NodeId> = cs.into_iter().map(|c| wrap_not(arena, c)).collect();
            arena.get_mut(id).kind = NodeKind::And(negated);
            true
        }
        _ => false,
    }
}

fn wrap_not(arena: &mut Arena, id: NodeId) -> NodeId {
    let span = arena.get(id).header.argv_span;
    arena.new_node(NodeKind::Not(id), span)
}

/// `not(comma(.., last)) -> comma(.., not(last))`: negation commutes past
/// comma's non-final children (§4.F pass 1).
fn rewrite_comma_negation(arena: &mut Arena, id: NodeId) -> bool {
    let child = match &arena.get(id).kind {
        NodeKind::Not(c) => *c,
        _ => return false,
    };
    let mut cs = match &arena.get(child).kind {
        NodeKind::Comma(cs) => cs.clone(),
        _ => return false,
    };
    if let Some(last) = cs.pop() {
        let negated_last = wrap_not(arena, last);
        cs.push(negated_last);
        arena.get_mut(id).kind = NodeKind::Comma(cs);
        true
    } else {
        false
    }
}

/// Flatten associative operators and collapse unary/empty degenerate cases
/// (`and(and(a,b),c) -> and(a,b,c)`; empty `and()` is identity-true, empty
/// `or()` is identity-false; a unary operator collapses to its child).
fn flatten(arena: &mut Arena, id: NodeId) -> bool {
    let mut changed = false;
    loop {
        let (is_and, cs) = match &arena.get(id).kind {
            NodeKind::And(cs) => (true, cs.clone()),
            NodeKind::Or(cs) => (false, cs.clone()),
            _ => return changed,
        };

        let mut flattened = Vec::with_capacity(cs.len());
        let mut did_flatten = false;
        for c in cs {
            let same_shape = match &arena.get(c).kind {
                NodeKind::And(inner) if is_and => Some(inner.clone()),
                NodeKind::Or(inner) if !is_and => Some(inner.clone()),
                _ => None,
            };
            match same_shape {
                Some(inner) => {
                    flattened.extend(inner);
                    did_flatten = true;
                }
                None => flattened.push(c),
            }
        }

        if flattened.len() == 1 {
            let only = flattened[0];
            let inner = std::mem::replace(&mut arena.get_mut(only).kind, NodeKind::True);
            arena.get_mut(id).kind = inner;
            changed = true;
            continue;
        }
        if flattened.is_empty() {
            arena.get_mut(id).kind = if is_and { NodeKind::True } else { NodeKind::False };
            changed = true;
            continue;
        }
        if did_flatten {
            let kind = if is_and { NodeKind::And(flattened) } else { NodeKind::Or(flattened) };
            arena.get_mut(id).kind = kind;
            changed = true;
            continue;
        }
        return changed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_negation_collapses() {
        let mut arena = Arena::new();
        let name = arena.new_node(NodeKind::True, (0, 0));
        let inner_not = arena.new_node(NodeKind::Not(name), (0, 0));
        let outer_not = arena.new_node(NodeKind::Not(inner_not), (0, 0));
        run(&mut arena, outer_not);
        assert!(matches!(arena.get(outer_not).kind, NodeKind::True));
    }

    #[test]
    fn de_morgan_sinks_negation_into_and() {
        let mut arena = Arena::new();
        let a = arena.new_node(NodeKind::True, (0, 0));
        let b = arena.new_node(NodeKind::False, (0, 0));
        let and = arena.new_node(NodeKind::And(vec![a, b]), (0, 0));
        let not = arena.new_node(NodeKind::Not(and), (0, 0));
        run(&mut arena, not);
        assert!(matches!(arena.get(not).kind, NodeKind::Or(_)));
    }

    #[test]
    fn flatten_merges_nested_and() {
        let mut arena = Arena::new();
        let a = arena.new_node(NodeKind::True, (0, 0));
        let b = arena.new_node(NodeKind::True, (0, 0));
        let c = arena.new_node(NodeKind::True, (0, 0));
        let inner = arena.new_node(NodeKind::And(vec![a, b]), (0, 0));
        let outer = arena.new_node(NodeKind::And(vec![inner, c]), (0, 0));
        run(&mut arena, outer);
        match &arena.get(outer).kind {
            NodeKind::And(cs) => assert_eq!(cs.len(), 3),
            other => panic!("expected a flattened And, got {other:?}"),
        }
    }
}
