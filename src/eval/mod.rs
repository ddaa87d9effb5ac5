//! The evaluator (§4.E): recursive descent over the expression tree,
//! short-circuiting at logical connectives, producing a `(bool, Control)`
//! pair per the source's longjmp replacement described in §9.

use std::time::Instant;

use crate::context::{Context, DebugFlags, UserGroupLookup};
use crate::control::Control;
use crate::error::RfindError;
use crate::expr::field::{IntCmpSpec, IntField, ModeCmpSpec, SizeCmpSpec, TimeCmpSpec, TimeKind};
use crate::expr::{NodeId, NodeKind};
use crate::predicate::exec::{ExecBuffer, ProcessSpawner, Spawn};
use crate::predicate::print::PrintSpec;
use crate::predicate::{delete, filetype, name, perm, print, regexp, samefile, tritest, CapabilityProbe};
use crate::walk::record::FileRecord;
use crate::walk::statcache::{Metadata, StatMode};

/// Drive one file through the uniqueness filter, the exclude expression, the
/// depth gate, and finally the main expression (§4.E).
pub fn visit_file(
    ctx: &mut Context,
    record: &mut FileRecord,
    caps: &dyn CapabilityProbe,
    spawner: &mut dyn ProcessSpawner,
) -> Control {
    if ctx.unique {
        match record.file_id(StatMode::NoFollow) {
            Some(id) => {
                if !ctx.mark_seen(id.as_bytes()) {
                    return Control::Prune;
                }
            }
            None => {
                ctx.note_error();
                crate::error::print_error(io_err(record, std::io::ErrorKind::NotFound));
            }
        }
    }

    if let Some(exclude) = ctx.exclude {
        let (matched, control) = eval_node(ctx, exclude, record, caps, spawner);
        if control != Control::Continue {
            return control;
        }
        if matched {
            return Control::Prune;
        }
    }

    if !depth_in_range(ctx, record.depth) {
        return Control::Continue;
    }

    let main_expr = ctx.main_expr;
    let (_, control) = eval_node(ctx, main_expr, record, caps, spawner);
    control
}

/// Flush any `-exec ... +` batches left accumulated at the end of the walk
/// (§4.G execute state machine: `flush` on end-of-input).
pub fn finish_exec_actions(ctx: &mut Context, spawner: &mut dyn ProcessSpawner) -> Result<(), RfindError> {
    for id in 0..ctx.arena.len() {
        let spawn = match &ctx.arena.get(id).kind {
            NodeKind::Exec(spec) => spec.buffer.borrow_mut().finish(),
            _ => None,
        };
        if let Some(spawn) = spawn {
            if let NodeKind::Exec(spec) = &ctx.arena.get(id).kind {
                run_spawn(spec.buffer.borrow().flags.confirm, &spec.buffer, &spawn, spawner)?;
            }
        }
    }
    Ok(())
}

fn depth_in_range(ctx: &Context, depth: usize) -> bool {
    if depth < ctx.mindepth {
        return false;
    }
    if let Some(max) = ctx.maxdepth {
        if depth > max {
            return false;
        }
    }
    true
}

enum ChildShape {
    Not(NodeId),
    And(Vec<NodeId>),
    Or(Vec<NodeId>),
    Comma(Vec<NodeId>),
}

fn eval_node(
    ctx: &mut Context,
    id: NodeId,
    record: &mut FileRecord,
    caps: &dyn CapabilityProbe,
    spawner: &mut dyn ProcessSpawner,
) -> (bool, Control) {
    let timing = ctx.debug.contains(DebugFlags::RATES).then(Instant::now);

    let shape = match &ctx.arena.get(id).kind {
        NodeKind::Not(c) => Some(ChildShape::Not(*c)),
        NodeKind::And(cs) => Some(ChildShape::And(cs.clone())),
        NodeKind::Or(cs) => Some(ChildShape::Or(cs.clone())),
        NodeKind::Comma(cs) => Some(ChildShape::Comma(cs.clone())),
        _ => None,
    };

    let (result, control) = match shape {
        Some(ChildShape::Not(child)) => {
            let (value, control) = eval_node(ctx, child, record, caps, spawner);
            (!value, control)
        }
        Some(ChildShape::And(children)) => {
            let mut value = true;
            let mut control = Control::Continue;
            for child in children {
                let (v, c) = eval_node(ctx, child, record, caps, spawner);
                value = v;
                control = c;
                if !v || control != Control::Continue {
                    break;
                }
            }
            (value, control)
        }
        Some(ChildShape::Or(children)) => {
            let mut value = false;
            let mut control = Control::Continue;
            for child in children {
                let (v, c) = eval_node(ctx, child, record, caps, spawner);
                value = v;
                control = c;
                if v || control != Control::Continue {
                    break;
                }
            }
            (value, control)
        }
        Some(ChildShape::Comma(children)) => {
            let mut value = true;
            let mut control = Control::Continue;
            for child in children {
                let (v, c) = eval_node(ctx, child, record, caps, spawner);
                value = v;
                control = c;
                if control != Control::Continue {
                    break;
                }
            }
            (value, control)
        }
        None => eval_leaf(ctx, id, record, caps, spawner),
    };

    debug_assert!(!ctx.arena.get(id).header.always_true || result || control != Control::Continue);
    debug_assert!(!ctx.arena.get(id).header.always_false || !result || control != Control::Continue);

    let header = &mut ctx.arena.get_mut(id).header;
    header.evaluations += 1;
    if result {
        header.successes += 1;
    }
    if let Some(start) = timing {
        header.elapsed += start.elapsed();
    }

    (result, control)
}

fn eval_leaf(
    ctx: &mut Context,
    id: NodeId,
    record: &mut FileRecord,
    caps: &dyn CapabilityProbe,
    spawner: &mut dyn ProcessSpawner,
) -> (bool, Control) {
    let depth = record.depth;
    match &ctx.arena.get(id).kind {
        NodeKind::IntCmp(spec) => {
            let result = int_cmp(spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::SizeCmp(spec) => {
            let result = size_cmp(spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::TimeCmp(spec) => {
            let result = time_cmp(spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::ModeCmp(spec) => {
            let result = perm::eval(spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::StringMatch(spec) => {
            let result = name::eval(spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::Regex(spec) => {
            let result = regexp::eval(spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::Type(mask) => (filetype::eval_type(*mask, record), Control::Continue),
        NodeKind::XType(mask) => {
            let result = filetype::eval_xtype(*mask, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::TriTest(pred) => {
            let result = tritest::eval(*pred, record, caps);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::SameFile(spec) => {
            let result = samefile::eval(*spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::Delete => {
            let result = delete::eval(record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::Print(spec) => {
            let result = eval_print(&mut ctx.sinks, &ctx.user_cache, &ctx.group_cache, spec, record);
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::Exec(spec) => {
            let confirm = spec.buffer.borrow().flags.confirm;
            let spawn = spec.buffer.borrow_mut().push(record.full_path());
            let result = match spawn {
                Some(spawn) => run_spawn(confirm, &spec.buffer, &spawn, spawner),
                None => Ok(true),
            };
            (leaf_result(ctx, depth, result), Control::Continue)
        }
        NodeKind::Prune => (true, Control::Prune),
        NodeKind::Quit => (true, Control::Stop),
        NodeKind::Exit(code) => {
            let code = *code;
            ctx.exit_code = Some(code);
            (true, Control::Stop)
        }
        NodeKind::True => (true, Control::Continue),
        NodeKind::False => (false, Control::Continue),
        NodeKind::Not(_) | NodeKind::And(_) | NodeKind::Or(_) | NodeKind::Comma(_) => {
            unreachable!("operator nodes are dispatched in eval_node")
        }
    }
}

fn eval_print(
    sinks: &mut [crate::predicate::print::Sink],
    user_cache: &std::cell::RefCell<std::collections::HashMap<u32, Option<String>>>,
    group_cache: &std::cell::RefCell<std::collections::HashMap<u32, Option<String>>>,
    spec: &PrintSpec,
    record: &mut FileRecord,
) -> Result<bool, RfindError> {
    let lookup = UserGroupLookup::new(user_cache, group_cache);
    let sink = sinks
        .get_mut(spec.sink.0)
        .ok_or_else(|| RfindError::Invariant { message: "print node references an unopened sink".into() })?;
    print::evaluate(spec, sink, record, &lookup)
}

fn run_spawn(
    confirm: bool,
    buffer: &std::cell::RefCell<ExecBuffer>,
    spawn: &Spawn,
    spawner: &mut dyn ProcessSpawner,
) -> Result<bool, RfindError> {
    if confirm && !ExecBuffer::confirm(&spawn.argv, std::io::stdin()) {
        return Ok(false);
    }
    let program = spawn.argv.first().cloned().unwrap_or_default();
    let code = spawner
        .spawn(spawn)
        .map_err(|e| RfindError::PerFile { path: program.into(), source: e })?;
    buffer.borrow_mut().deferred_result = code;
    Ok(code == 0)
}

/// Convert a predicate's `Result` into a plain bool, surfacing the error
/// through the context's out-of-band channel unless it is a suppressed race
/// (§4.E "Error surfacing", §7).
fn leaf_result(ctx: &mut Context, depth: usize, result: Result<bool, RfindError>) -> bool {
    match result {
        Ok(value) => value,
        Err(e) => {
            let suppress = ctx.ignore_races && e.is_race_class() && depth > 0;
            if !suppress {
                ctx.note_error();
                crate::error::print_error(&e);
            }
            false
        }
    }
}

fn meta(record: &mut FileRecord) -> Result<Metadata, RfindError> {
    record.stat(StatMode::NoFollow).map_err(|kind| io_err(record, kind))
}

fn io_err(record: &FileRecord, kind: std::io::ErrorKind) -> RfindError {
    let path = record.full_path().to_path_buf();
    if kind == std::io::ErrorKind::NotFound && record.depth > 0 {
        RfindError::Race { path, source: std::io::Error::from(kind) }
    } else {
        RfindError::PerFile { path, source: std::io::Error::from(kind) }
    }
}

fn int_cmp(spec: &IntCmpSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    let lhs = match spec.field {
        IntField::Depth => record.depth as i64,
        IntField::Links => meta(record)?.nlink as i64,
        IntField::Inode => meta(record)?.inode as i64,
        IntField::Uid => meta(record)?.uid as i64,
        IntField::Gid => meta(record)?.gid as i64,
    };
    Ok(crate::expr::cmp_holds(spec.cmp, lhs, spec.operand))
}

fn size_cmp(spec: &SizeCmpSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    let rounded = spec.unit.round_up(meta(record)?.size) as i64;
    Ok(crate::expr::cmp_holds(spec.cmp, rounded, spec.operand))
}

fn time_cmp(spec: &TimeCmpSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    let m = meta(record)?;
    let stat_time = match spec.which {
        TimeKind::Mtime => m.mtime,
        TimeKind::Atime => m.atime,
        TimeKind::Ctime => m.ctime,
    };
    let diff_secs = match stat_time.duration_since(spec.reference) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    };
    let units = diff_secs.div_euclid(spec.unit.seconds());
    Ok(crate::expr::cmp_holds(spec.cmp, units, spec.operand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::{Cmp, FileKind};
    use crate::expr::{Arena, NodeKind};
    use crate::predicate::Tri;
    use crate::walk::record::VisitPhase;
    use std::path::PathBuf;

    struct NoopSpawner;
    impl ProcessSpawner for NoopSpawner {
        fn spawn(&mut self, _spawn: &Spawn) -> std::io::Result<i32> {
            Ok(0)
        }
    }

    struct StubCaps;
    impl CapabilityProbe for StubCaps {
        fn has_acl(&self, _path: &std::path::Path) -> Tri {
            Tri::No
        }
        fn has_capabilities(&self, _path: &std::path::Path) -> Tri {
            Tri::No
        }
        fn has_xattr(&self, _path: &std::path::Path) -> Tri {
            Tri::No
        }
        fn is_sparse(&self, _path: &std::path::Path, _apparent_size: u64) -> Tri {
            Tri::No
        }
    }

    fn record(path: &str, depth: usize) -> FileRecord {
        FileRecord::new(path.into(), ".".into(), 2, depth, FileKind::Regular, VisitPhase::Pre, PathBuf::from("."))
    }

    #[test]
    fn and_short_circuits_on_false() {
        let mut arena = Arena::new();
        let a = arena.new_node(NodeKind::False, (0, 0));
        let b = arena.new_node(NodeKind::True, (0, 0));
        let and = arena.new_node(NodeKind::And(vec![a, b]), (0, 0));
        let mut ctx = Context::new(arena, vec![], and);
        let mut rec = record("./x", 1);
        let control = visit_file(&mut ctx, &mut rec, &StubCaps, &mut NoopSpawner);
        assert_eq!(control, Control::Continue);
        assert_eq!(ctx.arena.get(b).header.evaluations, 0, "second `and` child must not run after a false first child");
    }

    #[test]
    fn depth_gate_skips_out_of_range_files() {
        let mut arena = Arena::new();
        let print = arena.new_node(
            NodeKind::Print(PrintSpec {
                sink: crate::predicate::print::SinkId::STDOUT,
                format: None,
                terminator: crate::predicate::print::Terminator::Newline,
                style: crate::predicate::print::PrintStyle::Plain,
            }),
            (0, 0),
        );
        let mut ctx = Context::new(arena, vec![], print);
        ctx.mindepth = 2;
        let mut rec = record("./x", 1);
        visit_file(&mut ctx, &mut rec, &StubCaps, &mut NoopSpawner);
        assert_eq!(ctx.arena.get(print).header.evaluations, 0);
    }

    #[test]
    fn exclude_expression_prunes_without_running_main() {
        let mut arena = Arena::new();
        let main = arena.new_node(NodeKind::True, (0, 0));
        let exclude = arena.new_node(NodeKind::True, (0, 0));
        let mut ctx = Context::new(arena, vec![], main);
        ctx.exclude = Some(exclude);
        let mut rec = record("./x", 1);
        let control = visit_file(&mut ctx, &mut rec, &StubCaps, &mut NoopSpawner);
        assert_eq!(control, Control::Prune);
        assert_eq!(ctx.arena.get(main).header.evaluations, 0);
    }

    #[test]
    fn int_cmp_reads_depth_directly() {
        let mut arena = Arena::new();
        let node = arena.new_node(
            NodeKind::IntCmp(IntCmpSpec { field: IntField::Depth, cmp: Cmp::Eq, operand: 3 }),
            (0, 0),
        );
        let mut ctx = Context::new(arena, vec![], node);
        let mut rec = record("./a/b/c", 3);
        let (value, control) = eval_node(&mut ctx, node, &mut rec, &StubCaps, &mut NoopSpawner);
        assert!(value);
        assert_eq!(control, Control::Continue);
    }

    #[test]
    fn exit_sets_exit_code_and_stops() {
        let mut arena = Arena::new();
        let node = arena.new_node(NodeKind::Exit(7), (0, 0));
        let mut ctx = Context::new(arena, vec![], node);
        let mut rec = record("./x", 0);
        let control = visit_file(&mut ctx, &mut rec, &StubCaps, &mut NoopSpawner);
        assert_eq!(control, Control::Stop);
        assert_eq!(ctx.exit_code, Some(7));
    }
}
