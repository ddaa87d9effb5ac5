//! Pass 3 — cost-based reordering (§4.F), optional: only at optimization
//! level ≥ 3, and never on the first fixpoint round so early diagnostics
//! stay attributable to the argv order the user wrote.
//!
//! Within an associative operator, children split into maximal runs of pure
//! children separated by impure ones; each pure run is stable-sorted by a
//! pairwise cost comparator. Impure children never move, since reordering
//! them could reorder their visible side effects.

use std::cmp::Ordering;

use crate::expr::{Arena, NodeId, NodeKind};

pub fn run(arena: &mut Arena, id: NodeId) {
    let children: Vec<NodeId> = arena.children(id).to_vec();
    for c in &children {
        run(arena, *c);
    }

    let is_and = match &arena.get(id).kind {
        NodeKind::And(_) => true,
        NodeKind::Or(_) => false,
        _ => return,
    };

    let mut reordered = Vec::with_capacity(children.len());
    let mut run_start = 0;
    while run_start < children.len() {
        let mut run_end = run_start;
        while run_end < children.len() && arena.get(children[run_end]).header.pure {
            run_end += 1;
        }
        if run_end == run_start {
            // `children[run_start]` is impure; it stays put.
            reordered.push(children[run_start]);
            run_start += 1;
            continue;
        }
        let mut pure_run = children[run_start..run_end].to_vec();
        merge_sort(arena, &mut pure_run, is_and);
        reordered.extend(pure_run);
        run_start = run_end;
    }

    match &mut arena.get_mut(id).kind {
        NodeKind::And(cs) | NodeKind::Or(cs) => *cs = reordered,
        _ => unreachable!(),
    }
}

/// The cost of evaluating `lhs` before `rhs`: for `and`, `rhs` only runs
/// when `lhs` is true; for `or`, only when `lhs` is false.
fn pair_cost(arena: &Arena, lhs: NodeId, rhs: NodeId, is_and: bool) -> f64 {
    let lh = &arena.get(lhs).header;
    let rh = &arena.get(rhs).header;
    if is_and {
        lh.cost + lh.probability * rh.cost
    } else {
        lh.cost + (1.0 - lh.probability) * rh.cost
    }
}

fn compare(arena: &Arena, lhs: NodeId, rhs: NodeId, is_and: bool) -> Ordering {
    let forward = pair_cost(arena, lhs, rhs, is_and);
    let backward = pair_cost(arena, rhs, lhs, is_and);
    forward.partial_cmp(&backward).unwrap_or(Ordering::Equal)
}

/// A stable merge sort driven by the pairwise comparator above: a plain
/// total-order sort would be unsound here, since `pair_cost` compares two
/// items at a time and isn't guaranteed transitive in general, but the merge
/// step only ever needs pairwise comparisons between adjacent candidates.
fn merge_sort(arena: &Arena, items: &mut Vec<NodeId>, is_and: bool) {
    let len = items.len();
    if len <= 1 {
        return;
    }
    let mid = len / 2;
    let mut left = items[..mid].to_vec();
    let mut right = items[mid..].to_vec();
    merge_sort(arena, &mut left, is_and);
    merge_sort(arena, &mut right, is_and);

    let mut out = Vec::with_capacity(len);
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(arena, left[i], right[j], is_and) != Ordering::Greater {
            out.push(left[i]);
            i += 1;
        } else {
            out.push(right[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    *items = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(arena: &mut Arena, cost: f64, probability: f64) -> NodeId {
        let id = arena.new_node(NodeKind::True, (0, 0));
        let header = &mut arena.get_mut(id).header;
        header.pure = true;
        header.cost = cost;
        header.probability = probability;
        id
    }

    #[test]
    fn cheap_likely_to_fail_test_moves_first_under_and() {
        let mut arena = Arena::new();
        let expensive = leaf(&mut arena, 20_000.0, 0.9);
        let cheap = leaf(&mut arena, 40.0, 0.1);
        let and = arena.new_node(NodeKind::And(vec![expensive, cheap]), (0, 0));
        run(&mut arena, and);
        match &arena.get(and).kind {
            NodeKind::And(cs) => assert_eq!(cs[0], cheap),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn impure_child_is_not_moved() {
        let mut arena = Arena::new();
        let cheap = leaf(&mut arena, 40.0, 0.1);
        let impure = arena.new_node(NodeKind::Delete, (0, 0));
        let expensive = leaf(&mut arena, 20_000.0, 0.9);
        let and = arena.new_node(NodeKind::And(vec![expensive, impure, cheap]), (0, 0));
        run(&mut arena, and);
        match &arena.get(and).kind {
            NodeKind::And(cs) => assert_eq!(cs[1], impure),
            other => panic!("expected And, got {other:?}"),
        }
    }
}
