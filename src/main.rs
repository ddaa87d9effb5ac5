//! The `rfind` binary: wires the CLI front-end (§6) to the arena, optimizer,
//! and traversal engine the library crate owns. Kept thin on purpose — every
//! decision with a name in the specification lives in `rfind::*`; this file
//! only translates `clap`'s parsed `Opts` into the one `Context` the rest of
//! the pipeline runs against, matching the teacher's own `main` in spirit
//! (parse, build a run-wide config struct, drive the walk, compute the exit
//! code).

use anyhow::Context as _;
use clap::Parser;

use rfind::cli::{split_roots_and_expression, Opts};
use rfind::context::Context;
use rfind::error::{print_error, print_warning, RfindError};
use rfind::expr::Arena;
use rfind::parser::{parse_exclude, parse_program};
use rfind::predicate::capability::DefaultCapabilities;
use rfind::predicate::exec::DefaultSpawner;
use rfind::walk::{Engine, WalkConfig};
use rfind::{eval, filesystem, optimize};

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let code = run(opts)?;
    std::process::exit(code);
}

fn run(opts: Opts) -> anyhow::Result<i32> {
    if std::env::var_os("POSIXLY_CORRECT").is_some() && opts.follow_roots && opts.follow_all {
        print_warning("-H and -L are mutually exclusive under POSIXLY_CORRECT; -L wins".to_string());
    }

    let debug = opts.debug_flags().map_err(|message| anyhow::anyhow!(message))?;
    let (mut roots, expr_tokens) = split_roots_and_expression(&opts.rest);

    if let Some(target) = &opts.files0_from {
        let extra = filesystem::paths_from_file(target).with_context(|| format!("reading paths from '{target}'"))?;
        roots.extend(extra);
    }

    let mut missing_root = false;
    for root in &roots {
        if !filesystem::is_existing(root) {
            missing_root = true;
            print_error(&RfindError::Configuration { message: format!("'{}': No such file or directory", root.display()) });
        }
    }

    let mut arena = Arena::new();
    let parsed = parse_program(&mut arena, &expr_tokens).map_err(anyhow::Error::from)?;
    let exclude = parse_exclude(&mut arena, &opts.exclude).map_err(anyhow::Error::from)?;

    let mut ctx = Context::new(arena, roots, parsed.root);
    if missing_root {
        ctx.note_error();
    }
    ctx.exclude = exclude;
    ctx.mindepth = opts.mindepth.unwrap_or(0);
    ctx.maxdepth = opts.maxdepth;
    ctx.optimization_level = opts.optimize_level;
    ctx.debug = debug;
    ctx.ignore_races = opts.ignore_races;
    ctx.unique = opts.unique;

    let (follow_roots, follow_all) = opts.follow_policy();
    ctx.walk = WalkConfig {
        strategy: opts.strategy.into(),
        threads: opts.threads.max(1),
        follow_roots,
        follow_all,
        skip_mounts: opts.dont_cross_mounts,
        prune_mounts: opts.dont_cross_mounts,
        sort: opts.sort,
        post_order: opts.post_order,
        max_depth: opts.maxdepth,
        ..WalkConfig::default()
    };

    // Replay the sink targets the parser discovered, in the same order it
    // discovered them, so the `SinkId`s baked into the tree's `Print` nodes
    // line up with the sinks actually opened here (index 0 is always stdout).
    for target in parsed.sink_targets.iter().skip(1) {
        ctx.sink_for(target).with_context(|| format!("opening output file '{target}'"))?;
    }

    check_execdir_path_safety();

    optimize::optimize(&mut ctx);

    if ctx.debug.contains(rfind::context::DebugFlags::TREE) {
        print_warning(format!("optimized main expression rooted at node {}", ctx.main_expr));
    }

    // The handles `-fprint`-style sinks hold open for the whole run don't
    // count against the walk's own directory-handle budget, but they do
    // shrink it (§4.C "on top of the handles expression nodes hold
    // persistently").
    ctx.walk.reserved_fds = ctx.arena.get(ctx.main_expr).header.persistent_fds as usize;

    let engine = Engine::new(ctx.walk.clone());
    let roots = ctx.roots.clone();
    let mut spawner = DefaultSpawner;
    let caps = DefaultCapabilities;

    engine
        .walk(&roots, |mut record| eval::visit_file(&mut ctx, &mut record, &caps, &mut spawner))
        .map_err(anyhow::Error::from)?;

    eval::finish_exec_actions(&mut ctx, &mut spawner).map_err(anyhow::Error::from)?;

    Ok(ctx.exit_code())
}

/// §6 environment variables: `PATH` is read for the `-execdir`/`-okdir`
/// safety check that rejects relative entries (a relative `PATH` entry run
/// from inside the matched directory could resolve to an attacker-planted
/// binary). Non-goals exclude color/terminal rendering, not this check.
fn check_execdir_path_safety() {
    let Some(path) = std::env::var_os("PATH") else {
        return;
    };
    for entry in std::env::split_paths(&path) {
        if entry.as_os_str().is_empty() || !entry.is_absolute() {
            print_warning("PATH contains a relative or empty entry; -execdir/-okdir will not run it".to_string());
            return;
        }
    }
}
