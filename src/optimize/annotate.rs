//! Pass 0 — annotation (§4.F). Pure bottom-up fill of `pure`, `always_true`,
//! `always_false`, `calls_stat`, baseline `cost`, and baseline `probability`.

use crate::expr::field::FileKind;
use crate::expr::{Arena, NodeId, NodeKind};
use crate::predicate::print::SinkId;

/// Cost tiers (§4.F): scalars, not time units.
mod cost {
    pub const FAST: f64 = 40.0;
    pub const FNMATCH: f64 = 400.0;
    pub const STAT: f64 = 1000.0;
    pub const PRINT: f64 = 20_000.0;
    pub const EMPTY: f64 = 2.0 * STAT;
}

/// Empirical per-type base rates (§4.F, §9: "part of the specification, not
/// a freely chosen heuristic"). Regular files and directories dominate most
/// trees; device/door/whiteout nodes are rare.
fn type_base_rate(kind: FileKind) -> f64 {
    match kind {
        FileKind::Regular => 0.75,
        FileKind::Dir => 0.15,
        FileKind::Symlink => 0.07,
        FileKind::Fifo => 0.005,
        FileKind::Socket => 0.005,
        FileKind::BlockDev => 0.005,
        FileKind::CharDev => 0.005,
        FileKind::Door => 0.0005,
        FileKind::Whiteout => 0.0005,
        FileKind::Unknown | FileKind::Error => 0.0,
    }
}

pub fn run(arena: &mut Arena) {
    for id in 0..arena.len() {
        annotate_node(arena, id);
    }
}

fn annotate_node(arena: &mut Arena, id: NodeId) {
    let (pure, calls_stat, base_cost, probability, always_true, always_false, persistent_fds) = match &arena.get(id).kind {
        NodeKind::Not(_) | NodeKind::And(_) | NodeKind::Or(_) | NodeKind::Comma(_) => {
            annotate_operator(arena, id);
            return;
        }
        NodeKind::IntCmp(_) => (true, true, cost::STAT, 0.5, false, false, 0),
        NodeKind::SizeCmp(_) => (true, true, cost::STAT, 0.5, false, false, 0),
        NodeKind::TimeCmp(_) => (true, true, cost::STAT, 0.5, false, false, 0),
        NodeKind::ModeCmp(_) => (true, true, cost::STAT, 0.5, false, false, 0),
        NodeKind::StringMatch(spec) => {
            let p = if spec.literal.is_some() { cost::FAST } else { cost::FNMATCH };
            let prob = if spec.always_false { 0.0 } else { 0.3 };
            (true, false, p, prob, spec.always_false, spec.always_false, 0)
        }
        NodeKind::Regex(_) => (true, false, cost::FNMATCH, 0.3, false, false, 0),
        NodeKind::Type(mask) => {
            let prob: f64 = crate::expr::field::FileKind::ALL.iter().filter(|k| mask.contains(**k)).map(|k| type_base_rate(*k)).sum();
            (true, false, cost::FAST, prob.clamp(0.0, 1.0), mask.is_top(), mask.is_bottom(), 0)
        }
        NodeKind::XType(mask) => (true, true, cost::STAT, if mask.is_bottom() { 0.0 } else { 0.5 }, false, mask.is_bottom(), 0),
        NodeKind::TriTest(pred) => {
            use crate::expr::field::TriPred;
            // Access-mode tri-tests are an AND of three component odds; the
            // rest default to a neutral midpoint.
            let prob = match pred {
                TriPred::Readable => 0.9,
                TriPred::Writable => 0.7,
                TriPred::Executable => 0.2,
                _ => 0.5,
            };
            (true, true, cost::STAT, prob, false, false, 0)
        }
        NodeKind::SameFile(_) => (true, true, cost::STAT, 0.01, false, false, 0),
        // A `-fprint`-style sink holds its file handle open for the whole
        // run (§4.C "the handles expression nodes hold persistently");
        // stdout doesn't count against the directory-handle budget.
        NodeKind::Print(spec) => {
            let fds = if spec.sink == SinkId::STDOUT { 0 } else { 1 };
            (false, false, cost::PRINT, 1.0, false, false, fds)
        }
        NodeKind::Exec(_) => (false, true, cost::PRINT, 1.0, false, false, 0),
        NodeKind::Delete => (false, true, cost::STAT, 1.0, false, false, 0),
        NodeKind::Prune | NodeKind::Quit | NodeKind::Exit(_) => (false, false, cost::FAST, 1.0, false, false, 0),
        NodeKind::True => (true, false, cost::FAST, 1.0, true, false, 0),
        NodeKind::False => (true, false, cost::FAST, 0.0, false, true, 0),
    };

    let header = &mut arena.get_mut(id).header;
    header.pure = pure;
    header.calls_stat = calls_stat;
    header.cost = base_cost;
    header.probability = probability;
    header.always_true = always_true;
    header.always_false = always_false;
    header.persistent_fds = persistent_fds;
}

fn annotate_operator(arena: &mut Arena, id: NodeId) {
    let children: Vec<NodeId> = arena.children(id).to_vec();
    for c in &children {
        annotate_node(arena, *c);
    }
    match &arena.get(id).kind {
        NodeKind::Not(c) => {
            let c = *c;
            let ch = &arena.get(c).header;
            let (pure, calls_stat, cost, probability, always_true, always_false, persistent_fds) =
                (ch.pure, ch.calls_stat, ch.cost, 1.0 - ch.probability, ch.always_false, ch.always_true, ch.persistent_fds);
            let header = &mut arena.get_mut(id).header;
            header.pure = pure;
            header.calls_stat = calls_stat;
            header.cost = cost;
            header.probability = probability;
            header.always_true = always_true;
            header.always_false = always_false;
            header.persistent_fds = persistent_fds;
        }
        NodeKind::And(_) => annotate_and_or(arena, id, &children, true),
        NodeKind::Or(_) => annotate_and_or(arena, id, &children, false),
        NodeKind::Comma(_) => {
            let pure = children.iter().all(|c| arena.get(*c).header.pure);
            let calls_stat = children.iter().any(|c| arena.get(*c).header.calls_stat);
            let cost: f64 = children.iter().map(|c| arena.get(*c).header.cost).sum();
            let persistent_fds: u32 = children.iter().map(|c| arena.get(*c).header.persistent_fds).sum();
            let (always_true, always_false, probability) = match children.last() {
                Some(last) => {
                    let h = &arena.get(*last).header;
                    (h.always_true, h.always_false, h.probability)
                }
                None => (true, false, 1.0),
            };
            let header = &mut arena.get_mut(id).header;
            header.pure = pure;
            header.calls_stat = calls_stat;
            header.cost = cost;
            header.probability = probability;
            header.always_true = always_true;
            header.always_false = always_false;
            header.persistent_fds = persistent_fds;
        }
        _ => unreachable!(),
    }
}

fn annotate_and_or(arena: &mut Arena, id: NodeId, children: &[NodeId], is_and: bool) {
    let pure = children.iter().all(|c| arena.get(*c).header.pure);
    let calls_stat = children.iter().any(|c| arena.get(*c).header.calls_stat);
    let cost: f64 = children.iter().map(|c| arena.get(*c).header.cost).sum();
    let persistent_fds: u32 = children.iter().map(|c| arena.get(*c).header.persistent_fds).sum();
    let probability = if is_and {
        children.iter().map(|c| arena.get(*c).header.probability).product()
    } else {
        1.0 - children.iter().map(|c| 1.0 - arena.get(*c).header.probability).product::<f64>()
    };
    let (always_true, always_false) = if is_and {
        (
            children.iter().all(|c| arena.get(*c).header.always_true),
            children.iter().any(|c| arena.get(*c).header.always_false),
        )
    } else {
        (
            children.iter().any(|c| arena.get(*c).header.always_true),
            children.iter().all(|c| arena.get(*c).header.always_false),
        )
    };
    let (always_true, always_false) = if children.is_empty() { (is_and, !is_and) } else { (always_true, always_false) };
    let header = &mut arena.get_mut(id).header;
    header.pure = pure;
    header.calls_stat = calls_stat;
    header.cost = cost;
    header.probability = probability.clamp(0.0, 1.0);
    header.always_true = always_true;
    header.always_false = always_false;
    header.persistent_fds = persistent_fds;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Arena;
    use crate::predicate::print::{PrintSpec, PrintStyle, SinkId, Terminator};

    fn fprint(sink: SinkId) -> NodeKind {
        NodeKind::Print(PrintSpec { sink, format: None, terminator: Terminator::Newline, style: PrintStyle::Plain })
    }

    #[test]
    fn fprint_target_reserves_one_handle_but_stdout_print_does_not() {
        let mut arena = Arena::new();
        let stdout_print = arena.new_node(fprint(SinkId::STDOUT), (0, 0));
        run(&mut arena);
        assert_eq!(arena.get(stdout_print).header.persistent_fds, 0);

        let mut arena = Arena::new();
        let file_print = arena.new_node(fprint(SinkId(1)), (0, 0));
        run(&mut arena);
        assert_eq!(arena.get(file_print).header.persistent_fds, 1);
    }

    #[test]
    fn and_aggregates_persistent_fds_from_both_branches() {
        let mut arena = Arena::new();
        let a = arena.new_node(fprint(SinkId(1)), (0, 0));
        let b = arena.new_node(fprint(SinkId(2)), (0, 0));
        let and = arena.new_node(NodeKind::And(vec![a, b]), (0, 0));
        run(&mut arena);
        assert_eq!(arena.get(and).header.persistent_fds, 2);
    }
}
