//! Pass 2 — data-flow analysis (§4.F). A forward analysis over the lattice
//! of §3: each operator installs the transfer function the spec names, each
//! primitive narrows the handful of lattice components it constrains, and a
//! pure node whose true (or false) branch lattice is bottom is rewritten to
//! the constant it can no longer avoid being.

use crate::expr::field::{Cmp, IntField};
use crate::expr::{Arena, NodeId, NodeKind};
use crate::optimize::lattice::{Lattice, Range};

pub struct DataflowResult {
    pub after_true: Lattice,
    pub after_false: Lattice,
    /// Join, over every impure program point entered, of the lattice in
    /// effect when it was entered (§4.F "join `before` into `impure`").
    pub impure: Lattice,
}

pub fn run(arena: &mut Arena, root: NodeId) -> DataflowResult {
    let mut impure = Lattice::bottom();
    let (after_true, after_false) = transfer(arena, root, Lattice::top(), &mut impure);
    DataflowResult { after_true, after_false, impure }
}

fn transfer(arena: &mut Arena, id: NodeId, before: Lattice, impure: &mut Lattice) -> (Lattice, Lattice) {
    let pure = arena.get(id).header.pure;
    if !pure {
        *impure = impure.join(&before);
    }

    let (after_true, after_false) = match &arena.get(id).kind {
        NodeKind::Not(c) => {
            let c = *c;
            let (at, af) = transfer(arena, c, before, impure);
            (af, at)
        }
        NodeKind::And(_) => transfer_and(arena, id, before, impure),
        NodeKind::Or(_) => transfer_or(arena, id, before, impure),
        NodeKind::Comma(_) => transfer_comma(arena, id, before, impure),
        NodeKind::True | NodeKind::Print(_) | NodeKind::Exec(_) | NodeKind::Delete | NodeKind::Prune | NodeKind::Quit | NodeKind::Exit(_) => {
            (before, Lattice::bottom())
        }
        NodeKind::False => (Lattice::bottom(), before),
        NodeKind::IntCmp(spec) => {
            let field = spec.field;
            let cmp = spec.cmp;
            let operand = spec.operand;
            narrow_int_field(before, field, cmp, operand)
        }
        NodeKind::Type(mask) => {
            let mask = *mask;
            let mut at = before;
            let mut af = before;
            at.types = at.types.intersect(mask);
            af.types = af.types.intersect(mask.complement());
            (at, af)
        }
        NodeKind::XType(mask) => {
            let mask = *mask;
            let mut at = before;
            let mut af = before;
            at.xtypes = at.xtypes.intersect(mask);
            af.xtypes = af.xtypes.intersect(mask.complement());
            (at, af)
        }
        NodeKind::TriTest(pred) => {
            let pred = *pred;
            let mut at = before;
            let mut af = before;
            at.predicates.set(pred, at.predicates.get(pred).force_true());
            af.predicates.set(pred, af.predicates.get(pred).force_false());
            (at, af)
        }
        NodeKind::SameFile(spec) => {
            let inode = spec.inode as i64;
            let mut at = before;
            at.inum = at.inum.meet(Range::exact(inode));
            (at, before)
        }
        NodeKind::SizeCmp(_) | NodeKind::TimeCmp(_) | NodeKind::ModeCmp(_) | NodeKind::StringMatch(_) | NodeKind::Regex(_) => {
            (before, before)
        }
    };

    apply_rewrite(arena, id, pure, &after_true, &after_false);
    (after_true, after_false)
}

fn transfer_and(arena: &mut Arena, id: NodeId, before: Lattice, impure: &mut Lattice) -> (Lattice, Lattice) {
    let children: Vec<NodeId> = arena.children(id).to_vec();
    let mut cur = before;
    let mut after_false = Lattice::bottom();
    let mut after_true = before;
    for c in children {
        let (at, af) = transfer(arena, c, cur, impure);
        after_false = after_false.join(&af);
        after_true = at;
        cur = at;
    }
    (after_true, after_false)
}

fn transfer_or(arena: &mut Arena, id: NodeId, before: Lattice, impure: &mut Lattice) -> (Lattice, Lattice) {
    let children: Vec<NodeId> = arena.children(id).to_vec();
    let mut cur = before;
    let mut after_true = Lattice::bottom();
    let mut after_false = before;
    for c in children {
        let (at, af) = transfer(arena, c, cur, impure);
        after_true = after_true.join(&at);
        after_false = af;
        cur = af;
    }
    (after_true, after_false)
}

fn transfer_comma(arena: &mut Arena, id: NodeId, before: Lattice, impure: &mut Lattice) -> (Lattice, Lattice) {
    let children: Vec<NodeId> = arena.children(id).to_vec();
    let mut cur = before;
    let mut last = (before, Lattice::bottom());
    for c in children {
        let (at, af) = transfer(arena, c, cur, impure);
        cur = at.join(&af);
        last = (at, af);
    }
    last
}

/// `x == v` narrows to `[v,v]` on the true branch and removes `v` on the
/// false branch; `x < v` / `x > v` split the range at the boundary.
fn narrow_int_field(before: Lattice, field: IntField, cmp: Cmp, operand: i64) -> (Lattice, Lattice) {
    let mut at = before;
    let mut af = before;
    let cur = *range_for(&before, field);
    let (true_range, false_range) = match cmp {
        Cmp::Eq => (cur.meet(Range::exact(operand)), cur.remove(operand)),
        Cmp::Lt => (
            cur.meet(Range { min: i64::MIN, max: operand.saturating_sub(1) }),
            cur.meet(Range { min: operand, max: i64::MAX }),
        ),
        Cmp::Gt => (
            cur.meet(Range { min: operand.saturating_add(1), max: i64::MAX }),
            cur.meet(Range { min: i64::MIN, max: operand }),
        ),
    };
    *range_for_mut(&mut at, field) = true_range;
    *range_for_mut(&mut af, field) = false_range;
    (at, af)
}

fn range_for(lattice: &Lattice, field: IntField) -> &Range {
    match field {
        IntField::Depth => &lattice.depth,
        IntField::Links => &lattice.links,
        IntField::Inode => &lattice.inum,
        IntField::Uid => &lattice.uid,
        IntField::Gid => &lattice.gid,
    }
}

fn range_for_mut(lattice: &mut Lattice, field: IntField) -> &mut Range {
    match field {
        IntField::Depth => &mut lattice.depth,
        IntField::Links => &mut lattice.links,
        IntField::Inode => &mut lattice.inum,
        IntField::Uid => &mut lattice.uid,
        IntField::Gid => &mut lattice.gid,
    }
}

/// If `after_true`/`after_false` of a pure node is bottom, that branch is
/// unreachable: rewrite to the constant the other branch guarantees. An
/// impure node cannot be deleted (its side effect must still run), so it
/// gets `always_true`/`always_false` flagged instead.
fn apply_rewrite(arena: &mut Arena, id: NodeId, pure: bool, after_true: &Lattice, after_false: &Lattice) {
    let true_unreachable = after_true.is_bottom();
    let false_unreachable = after_false.is_bottom();
    if pure {
        if true_unreachable {
            arena.get_mut(id).kind = NodeKind::False;
        } else if false_unreachable {
            arena.get_mut(id).kind = NodeKind::True;
        }
    }
    let header = &mut arena.get_mut(id).header;
    if true_unreachable {
        header.always_false = true;
    }
    if false_unreachable {
        header.always_true = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::{FileKind, IntCmpSpec};

    #[test]
    fn inum_eq_then_ne_is_unreachable() {
        let mut arena = Arena::new();
        let eq = arena.new_node(
            NodeKind::IntCmp(IntCmpSpec { field: IntField::Inode, cmp: Cmp::Eq, operand: 5 }),
            (0, 0),
        );
        arena.get_mut(eq).header.pure = true;
        let not_eq = arena.new_node(
            NodeKind::IntCmp(IntCmpSpec { field: IntField::Inode, cmp: Cmp::Eq, operand: 5 }),
            (0, 0),
        );
        arena.get_mut(not_eq).header.pure = true;
        let negated = arena.new_node(NodeKind::Not(not_eq), (0, 0));
        arena.get_mut(negated).header.pure = true;
        let and = arena.new_node(NodeKind::And(vec![eq, negated]), (0, 0));
        arena.get_mut(and).header.pure = true;

        run(&mut arena, and);
        assert!(matches!(arena.get(and).kind, NodeKind::False));
    }

    #[test]
    fn type_mask_narrows_on_true_branch() {
        use crate::expr::field::TypeMask;
        let mut arena = Arena::new();
        let ty = arena.new_node(NodeKind::Type(TypeMask::single(FileKind::Dir)), (0, 0));
        arena.get_mut(ty).header.pure = true;
        let result = run(&mut arena, ty);
        assert!(result.after_true.types.contains(FileKind::Dir));
        assert!(!result.after_true.types.contains(FileKind::Regular));
    }

    #[test]
    fn impure_leaf_is_joined_into_impure_lattice() {
        let mut arena = Arena::new();
        let spec = crate::predicate::print::PrintSpec {
            sink: crate::predicate::print::SinkId::STDOUT,
            format: None,
            terminator: crate::predicate::print::Terminator::Newline,
            style: crate::predicate::print::PrintStyle::Plain,
        };
        let print = arena.new_node(NodeKind::Print(spec), (0, 0));
        let result = run(&mut arena, print);
        assert!(!result.impure.is_bottom());
    }
}
