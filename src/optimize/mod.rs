//! The optimizer (§4.F): `optimize(context)` rewrites `context.exclude` and
//! `context.main_expr` in place, and may tighten `context.mindepth` /
//! `context.maxdepth` and `context.walk.stat_eagerly`.

pub mod annotate;
pub mod canonicalize;
pub mod dataflow;
pub mod lattice;
pub mod reorder;
pub mod simplify;

use crate::context::{Context, DebugFlags};
use crate::expr::NodeId;

/// Bounded fixpoint rounds (§4.F "bounded, e.g. three rounds").
const MAX_ROUNDS: u32 = 3;

pub fn optimize(ctx: &mut Context) {
    optimize_tree(ctx, ctx.main_expr);
    if let Some(exclude) = ctx.exclude {
        optimize_tree(ctx, exclude);
    }
    post_process(ctx);
}

fn optimize_tree(ctx: &mut Context, root: NodeId) {
    annotate::run(&mut ctx.arena);

    for round in 0..MAX_ROUNDS {
        let mut changed = canonicalize::run(&mut ctx.arena, root);
        annotate::run(&mut ctx.arena);

        dataflow::run(&mut ctx.arena, root);
        annotate::run(&mut ctx.arena);

        changed |= simplify::run(&mut ctx.arena, root);
        annotate::run(&mut ctx.arena);

        if ctx.optimization_level >= 3 && round > 0 {
            reorder::run(&mut ctx.arena, root);
            annotate::run(&mut ctx.arena);
        }

        if ctx.debug.contains(DebugFlags::OPT) {
            crate::error::print_warning(format!(
                "optimizer round {round}: tree {}",
                if changed { "changed" } else { "stable" }
            ));
        }

        if !changed {
            break;
        }
    }
}

fn post_process(ctx: &mut Context) {
    let result = dataflow::run(&mut ctx.arena, ctx.main_expr);

    if ctx.optimization_level >= 2 {
        let min_reachable = result.impure.depth.min;
        if min_reachable > ctx.mindepth as i64 {
            ctx.mindepth = min_reachable.max(0) as usize;
        }
    }
    if ctx.optimization_level >= 4 {
        let max_reachable = result.impure.depth.max;
        let tightened = if max_reachable < 0 { Some(0) } else { Some(max_reachable as usize) };
        if let Some(tight) = tightened {
            ctx.maxdepth = Some(match ctx.maxdepth {
                Some(existing) => existing.min(tight),
                None => tight,
            });
        }
    }
    if let Some(maxdepth) = ctx.maxdepth {
        ctx.walk.max_depth = Some(match ctx.walk.max_depth {
            Some(existing) => existing.min(maxdepth),
            None => maxdepth,
        });
    }

    if result.impure.is_bottom() {
        crate::error::print_warning("this command has no effect");
    }

    if ctx.optimization_level >= 3 {
        run_stat_heuristic(ctx);
    }
}

/// Estimate the odds that evaluating the main expression on a typical file
/// calls `stat` at all; if eager parallel stat looks cheaper than per-file
/// lazy stat given the configured thread count, flip the traversal flag.
fn run_stat_heuristic(ctx: &mut Context) {
    const STAT_COST: f64 = 1000.0; // matches annotate::cost::STAT

    let header = &ctx.arena.get(ctx.main_expr).header;
    if !header.calls_stat {
        ctx.walk.stat_eagerly = false;
        return;
    }
    let lazy_cost = header.cost;
    let threads = ctx.walk.threads.max(1) as f64;
    let eager_cost = STAT_COST / threads;
    ctx.walk.stat_eagerly = eager_cost < lazy_cost;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::expr::{Arena, NodeId as Id, NodeKind};
    use std::path::PathBuf;

    fn ctx_with(arena: Arena, main: Id) -> Context {
        Context::new(arena, vec![PathBuf::from(".")], main)
    }

    #[test]
    fn contradictory_and_collapses_to_false_and_warns() {
        use crate::expr::field::{Cmp, IntCmpSpec, IntField};
        let mut arena = Arena::new();
        let a = arena.new_node(NodeKind::IntCmp(IntCmpSpec { field: IntField::Inode, cmp: Cmp::Eq, operand: 5 }), (0, 0));
        let b_inner = arena.new_node(NodeKind::IntCmp(IntCmpSpec { field: IntField::Inode, cmp: Cmp::Eq, operand: 5 }), (0, 0));
        let b = arena.new_node(NodeKind::Not(b_inner), (0, 0));
        let and = arena.new_node(NodeKind::And(vec![a, b]), (0, 0));
        let mut ctx = ctx_with(arena, and);
        optimize(&mut ctx);
        assert!(matches!(ctx.arena.get(ctx.main_expr).kind, NodeKind::False));
    }

    #[test]
    fn pure_print_only_command_tightens_nothing_but_does_not_warn() {
        let mut arena = Arena::new();
        let print_spec = crate::predicate::print::PrintSpec {
            sink: crate::predicate::print::SinkId::STDOUT,
            format: None,
            terminator: crate::predicate::print::Terminator::Newline,
            style: crate::predicate::print::PrintStyle::Plain,
        };
        let print = arena.new_node(NodeKind::Print(print_spec), (0, 0));
        let mut ctx = ctx_with(arena, print);
        optimize(&mut ctx);
        assert!(ctx.arena.get(ctx.main_expr).header.evaluations == 0); // untouched by optimization itself
    }
}
