//! The traversal engine (§4.C): walks a set of roots under a configurable
//! strategy, fd budget, and policy set, delivering one callback per file in
//! the order the strategy prescribes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::control::Control;
use crate::error::RfindError;
use crate::expr::field::FileKind;
use crate::walk::cycle::CycleGuard;
use crate::walk::dirreader::{DirReader, RawEntry};
use crate::walk::fdbudget::FdBudget;
use crate::walk::pool::{DirJob, DirPool, ReorderBuffer};
use crate::walk::record::{FileRecord, VisitPhase};
use crate::walk::statcache::StatMode;
use crate::walk::strategy::{Frontier, PendingDir, Strategy};

#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub strategy: Strategy,
    pub threads: usize,
    pub recover: bool,
    pub post_order: bool,
    pub follow_roots: bool,
    pub follow_all: bool,
    pub detect_cycles: bool,
    pub skip_mounts: bool,
    pub prune_mounts: bool,
    pub sort: bool,
    /// Upper bound on concurrently open directory handles (§4.C "Fd
    /// budget", §5: "global; the worker pool must never exceed it").
    pub fd_budget: usize,
    /// Handles expression nodes hold open for the whole run (an `-fprint`
    /// target, say) and that therefore must be carved out of `fd_budget`
    /// before the walk ever opens a directory. Sourced from the optimized
    /// tree's aggregated `Header::persistent_fds` (§3).
    pub reserved_fds: usize,
    /// Engine-level early cutoff the optimizer may tighten (§4.F
    /// post-processing); `None` means unbounded.
    pub max_depth: Option<usize>,
    /// Set by the optimizer's heuristic pass (§4.F, level ≥ 3) when eager
    /// parallel stat is predicted cheaper than lazy per-predicate stat.
    pub stat_eagerly: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        WalkConfig {
            strategy: Strategy::Bfs,
            threads: 1,
            recover: true,
            post_order: false,
            follow_roots: false,
            follow_all: false,
            detect_cycles: true,
            skip_mounts: false,
            prune_mounts: false,
            sort: false,
            fd_budget: 256,
            reserved_fds: 0,
            max_depth: None,
            stat_eagerly: false,
        }
    }
}

/// Bookkeeping for one directory's deferred post-order visit (§4.C
/// `post_order`). Only consulted when `post_order` is set; otherwise every
/// directory fires its single callback at discovery time.
struct DirNode {
    path: PathBuf,
    root_index: usize,
    depth: usize,
    parent: Option<usize>,
    remaining: usize,
    finished_reading: bool,
    completed: bool,
}

/// Shared walk state threaded through both the serial and pooled read
/// paths, so `process_entries` doesn't care which one produced its entries.
struct WalkState {
    nodes: Vec<DirNode>,
    frontier: Frontier,
    token_by_path: HashMap<PathBuf, usize>,
    cycle_guards: HashMap<usize, CycleGuard>,
    root_devices: Vec<Option<u64>>,
    stopped: bool,
}

pub struct Engine {
    config: WalkConfig,
}

impl Engine {
    pub fn new(config: WalkConfig) -> Self {
        Engine { config }
    }

    /// Visit every reachable file beneath `roots`, calling `callback` once
    /// per file in strategy order. Returns `Ok(true)` if the walk ran to
    /// completion, `Ok(false)` if an action requested `Stop`.
    pub fn walk(
        &self,
        roots: &[PathBuf],
        mut callback: impl FnMut(FileRecord) -> Control,
    ) -> Result<bool, RfindError> {
        if self.config.strategy.is_bounded_rounds() {
            self.walk_bounded_rounds(roots, &mut callback)
        } else {
            self.walk_once(roots, &mut callback, self.config.max_depth)
        }
    }

    /// `ids`/`eds` (§4.C): repeat a bounded-depth walk, growing the bound
    /// each round, until a round delivers no file the previous rounds
    /// hadn't already delivered. Pruned directories stay pruned across
    /// rounds; already-delivered files are replayed silently so the deeper
    /// round can still walk through (not just past) them.
    fn walk_bounded_rounds(
        &self,
        roots: &[PathBuf],
        callback: &mut impl FnMut(FileRecord) -> Control,
    ) -> Result<bool, RfindError> {
        let mut visited: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut pruned: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut bound = 1usize;

        loop {
            let effective_limit = match self.config.max_depth {
                Some(hard) => bound.min(hard),
                None => bound,
            };
            let mut discovered_new = false;

            let mut round_callback = |record: FileRecord| -> Control {
                if pruned.contains(&record.path) {
                    return Control::Prune;
                }
                let is_new = visited.insert(record.path.clone());
                let path_for_prune = record.path.clone();
                let control = if is_new {
                    discovered_new = true;
                    callback(record)
                } else {
                    Control::Continue
                };
                if let Control::Prune = control {
                    pruned.insert(path_for_prune);
                }
                control
            };

            let ran_to_completion = self.walk_once(roots, &mut round_callback, Some(effective_limit))?;
            if !ran_to_completion {
                return Ok(false);
            }

            let hit_ceiling = self.config.max_depth.is_some_and(|hard| effective_limit >= hard);
            if !discovered_new || hit_ceiling {
                return Ok(true);
            }
            bound = self.config.strategy.next_bound(bound);
        }
    }

    /// One depth-bounded pass over `roots`, in the queue discipline the
    /// strategy prescribes. `depth_limit` is the bound for *this* pass
    /// (tighter than `self.config.max_depth` when called from the
    /// iterative/exponential-deepening driver).
    fn walk_once(
        &self,
        roots: &[PathBuf],
        callback: &mut impl FnMut(FileRecord) -> Control,
        depth_limit: Option<usize>,
    ) -> Result<bool, RfindError> {
        let mut state = WalkState {
            nodes: Vec::new(),
            frontier: Frontier::new(self.config.strategy.round_discipline()),
            token_by_path: HashMap::new(),
            cycle_guards: HashMap::new(),
            root_devices: Vec::with_capacity(roots.len()),
            stopped: false,
        };

        for (root_index, root) in roots.iter().enumerate() {
            let follow = self.config.follow_roots || self.config.follow_all;
            let kind = entry_kind(root, follow);
            state.root_devices.push(device_of(root, follow));

            if kind == FileKind::Dir {
                let token = state.nodes.len();
                state.nodes.push(DirNode {
                    path: root.clone(),
                    root_index,
                    depth: 0,
                    parent: None,
                    remaining: 0,
                    finished_reading: false,
                    completed: false,
                });
                state.cycle_guards.entry(root_index).or_default();

                if !self.config.post_order {
                    let record = make_record(root, root, 0, kind, VisitPhase::Pre, root.clone(), self.config.stat_eagerly);
                    match callback(record) {
                        Control::Stop => return Ok(false),
                        Control::Prune => {
                            state.nodes[token].finished_reading = true;
                            state.nodes[token].completed = true;
                            continue;
                        }
                        Control::Continue => {}
                    }
                }
                state.token_by_path.insert(root.clone(), token);
                state.frontier.push(PendingDir { path: root.clone(), depth: 0, root_index });
            } else {
                let record = make_record(root, root, 0, kind, VisitPhase::Pre, root.clone(), self.config.stat_eagerly);
                if let Control::Stop = callback(record) {
                    return Ok(false);
                }
            }
        }

        if self.config.threads > 1 {
            self.drive_pooled(roots, &mut state, callback, depth_limit)?;
        } else {
            self.drive_serial(roots, &mut state, callback, depth_limit)?;
        }

        Ok(!state.stopped)
    }

    /// Single directory handle open at a time, budget-accounted for
    /// consistency with the pooled path even though one in-flight handle
    /// against a multi-hundred default budget never actually blocks.
    fn drive_serial(
        &self,
        roots: &[PathBuf],
        state: &mut WalkState,
        callback: &mut impl FnMut(FileRecord) -> Control,
        depth_limit: Option<usize>,
    ) -> Result<(), RfindError> {
        let mut budget = FdBudget::new(self.config.fd_budget, self.config.reserved_fds);

        while let Some(pending) = state.frontier.pop() {
            if state.stopped {
                break;
            }
            if self.beyond_bound(&pending, depth_limit, state, callback) {
                continue;
            }
            let token = *state.token_by_path.get(&pending.path).expect("every frontier entry has a registered node");

            // One in-flight handle against a multi-hundred default budget
            // never actually blocks here; accounted anyway for consistency
            // with `drive_pooled`, which genuinely depends on it.
            let acquired = budget.try_acquire();
            if !acquired {
                crate::error::print_warning(format!("fd budget exhausted opening '{}'; proceeding unaccounted", pending.path.display()));
            }

            let mut reader = match DirReader::open(&pending.path) {
                Ok(r) => r,
                Err(e) => {
                    if acquired {
                        budget.release();
                    }
                    let record = error_record(&pending.path, pending.depth, e.kind());
                    let _ = callback(record);
                    if !self.config.recover {
                        return Err(RfindError::PerFile { path: pending.path.clone(), source: e });
                    }
                    self.finish_reading(&mut state.nodes, token, callback, self.config.post_order, &mut state.stopped);
                    continue;
                }
            };

            let (raw_entries, read_error) = reader.read_all();
            reader.close();
            if acquired {
                budget.release();
            }

            self.process_entries(roots, state, callback, &pending, token, raw_entries, read_error)?;
        }
        Ok(())
    }

    /// `threads > 1` (§4.C concurrency, §5 scheduling): directory opens and
    /// reads happen on `DirPool` workers; this thread only ever does the
    /// (cheap) per-entry bookkeeping and calls `callback`, so evaluation is
    /// never interleaved across directories. `FdBudget` caps how many jobs
    /// may be outstanding at once, which bounds concurrently open handles
    /// since a job holds its handle open from submission until its result
    /// is delivered.
    fn drive_pooled(
        &self,
        roots: &[PathBuf],
        state: &mut WalkState,
        callback: &mut impl FnMut(FileRecord) -> Control,
        depth_limit: Option<usize>,
    ) -> Result<(), RfindError> {
        let pool = DirPool::new(self.config.threads);
        let mut budget = FdBudget::new(self.config.fd_budget, self.config.reserved_fds);
        let mut reorder = ReorderBuffer::new();
        let mut awaiting: HashMap<u64, (PendingDir, usize)> = HashMap::new();
        let mut next_seq: u64 = 0;
        let mut inflight: usize = 0;

        loop {
            if state.stopped {
                break;
            }

            // Keep the pool saturated: submit as much outstanding frontier
            // work as the fd budget allows before waiting on a result.
            while !state.stopped && !state.frontier.is_empty() {
                let Some(pending) = state.frontier.pop() else { break };
                if self.beyond_bound(&pending, depth_limit, state, callback) {
                    continue;
                }
                if !budget.try_acquire() && inflight > 0 {
                    // A slot will free up once one of the outstanding reads
                    // finishes; wait for that rather than overrunning the
                    // budget.
                    state.frontier.push(pending);
                    break;
                }
                // `inflight == 0` means nothing will ever release a slot on
                // its own (a `reserved_fds`/`fd_budget` misconfiguration);
                // proceed unaccounted rather than stalling forever.
                let token = *state.token_by_path.get(&pending.path).expect("every frontier entry has a registered node");
                let seq = next_seq;
                next_seq += 1;
                pool.submit(DirJob { seq, path: pending.path.clone() });
                awaiting.insert(seq, (pending, token));
                inflight += 1;
            }

            if inflight == 0 {
                break;
            }

            let result = match pool.recv() {
                Some(r) => r,
                None => break,
            };
            budget.release();
            inflight -= 1;
            reorder.offer(result);

            for ready in reorder.drain_ready() {
                let (pending, token) = awaiting.remove(&ready.seq).expect("reorder buffer only releases submitted jobs");
                let entries = ready.entries;
                let mut error = ready.error;
                // Mirrors the serial path's `DirReader::open` failure: no
                // entries were ever read, so there is nothing to hand to
                // `process_entries` beyond the synthetic error record.
                if entries.is_empty() {
                    if let Some(e) = error.take() {
                        let record = error_record(&pending.path, pending.depth, e.kind());
                        let _ = callback(record);
                        if !self.config.recover {
                            return Err(RfindError::PerFile { path: pending.path.clone(), source: e });
                        }
                        self.finish_reading(&mut state.nodes, token, callback, self.config.post_order, &mut state.stopped);
                        continue;
                    }
                }
                self.process_entries(roots, state, callback, &pending, token, entries, error)?;
            }
        }
        Ok(())
    }

    fn beyond_bound(
        &self,
        pending: &PendingDir,
        depth_limit: Option<usize>,
        state: &mut WalkState,
        callback: &mut impl FnMut(FileRecord) -> Control,
    ) -> bool {
        if let Some(limit) = depth_limit {
            if pending.depth >= limit {
                if let Some(&token) = state.token_by_path.get(&pending.path) {
                    self.finish_reading(&mut state.nodes, token, callback, self.config.post_order, &mut state.stopped);
                }
                return true;
            }
        }
        false
    }

    #[allow(clippy::too_many_arguments)]
    fn process_entries(
        &self,
        roots: &[PathBuf],
        state: &mut WalkState,
        callback: &mut impl FnMut(FileRecord) -> Control,
        pending: &PendingDir,
        token: usize,
        mut raw_entries: Vec<RawEntry>,
        read_error: Option<std::io::Error>,
    ) -> Result<(), RfindError> {
        if self.config.sort {
            raw_entries.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let root_index = pending.root_index;
        let root_device = state.root_devices[root_index];

        for entry in raw_entries {
            if state.stopped {
                break;
            }
            let name = entry.name.to_string_lossy().into_owned();
            let child_path = pending.path.join(&name);
            let follow = self.config.follow_all;
            let kind = entry.type_hint.unwrap_or_else(|| entry_kind(&child_path, follow));

            if kind == FileKind::Dir {
                let mount_boundary = self.config.skip_mounts || self.config.prune_mounts;
                let crosses_mount =
                    mount_boundary && root_device.is_some() && device_of(&child_path, follow) != root_device;

                if crosses_mount && self.config.skip_mounts {
                    continue;
                }

                if self.config.detect_cycles {
                    if let Some((dev, ino)) = identity_of(&child_path) {
                        let guard = state.cycle_guards.entry(root_index).or_default();
                        if guard.would_close(dev, ino) {
                            crate::error::print_warning(format!("'{}': filesystem loop detected", child_path.display()));
                            continue;
                        }
                    }
                }

                let child_token = state.nodes.len();
                state.nodes.push(DirNode {
                    path: child_path.clone(),
                    root_index,
                    depth: pending.depth + 1,
                    parent: Some(token),
                    remaining: 0,
                    finished_reading: false,
                    completed: false,
                });
                state.nodes[token].remaining += 1;

                let prune_here = crosses_mount && self.config.prune_mounts;

                if !self.config.post_order {
                    let record = make_record(
                        &child_path,
                        &roots_for(pending, roots),
                        pending.depth + 1,
                        kind,
                        VisitPhase::Pre,
                        pending.path.clone(),
                        self.config.stat_eagerly,
                    );
                    match callback(record) {
                        Control::Stop => {
                            state.stopped = true;
                            continue;
                        }
                        Control::Prune => {
                            state.nodes[child_token].finished_reading = true;
                            self.complete(&mut state.nodes, child_token, callback, false, &mut state.stopped);
                            continue;
                        }
                        Control::Continue => {}
                    }
                }

                if prune_here {
                    state.nodes[child_token].finished_reading = true;
                    self.complete(&mut state.nodes, child_token, callback, self.config.post_order, &mut state.stopped);
                    continue;
                }

                if self.config.detect_cycles {
                    if let Some((dev, ino)) = identity_of(&child_path) {
                        state.cycle_guards.entry(root_index).or_default().push(dev, ino);
                    }
                }
                state.token_by_path.insert(child_path.clone(), child_token);
                state.frontier.push(PendingDir { path: child_path, depth: pending.depth + 1, root_index });
            } else {
                let record = make_record(
                    &child_path,
                    &roots_for(pending, roots),
                    pending.depth + 1,
                    kind,
                    VisitPhase::Pre,
                    pending.path.clone(),
                    self.config.stat_eagerly,
                );
                if let Control::Stop = callback(record) {
                    state.stopped = true;
                }
            }
        }

        if let Some(e) = read_error {
            if !self.config.recover {
                return Err(RfindError::PerFile { path: pending.path.clone(), source: e });
            }
        }

        self.finish_reading(&mut state.nodes, token, callback, self.config.post_order, &mut state.stopped);
        Ok(())
    }

    fn finish_reading(
        &self,
        nodes: &mut [DirNode],
        token: usize,
        callback: &mut impl FnMut(FileRecord) -> Control,
        post_order: bool,
        stopped: &mut bool,
    ) {
        nodes[token].finished_reading = true;
        self.complete(nodes, token, callback, post_order, stopped);
    }

    fn complete(
        &self,
        nodes: &mut [DirNode],
        token: usize,
        callback: &mut impl FnMut(FileRecord) -> Control,
        post_order: bool,
        stopped: &mut bool,
    ) {
        if nodes[token].completed || !nodes[token].finished_reading || nodes[token].remaining != 0 {
            return;
        }
        nodes[token].completed = true;

        if post_order && !*stopped {
            let path = nodes[token].path.clone();
            let depth = nodes[token].depth;
            let record = make_record(&path, &path, depth, FileKind::Dir, VisitPhase::Post, path.clone(), false);
            // §9: `-prune` is a no-op here since children already ran.
            if let Control::Stop = callback(record) {
                *stopped = true;
            }
        }

        if let Some(parent) = nodes[token].parent {
            nodes[parent].remaining = nodes[parent].remaining.saturating_sub(1);
            self.complete(nodes, parent, callback, post_order, stopped);
        }
    }
}

fn roots_for(pending: &PendingDir, roots: &[PathBuf]) -> PathBuf {
    roots[pending.root_index].clone()
}

fn make_record(
    path: &Path,
    root: &Path,
    depth: usize,
    kind: FileKind,
    phase: VisitPhase,
    dir_path: PathBuf,
    stat_eagerly: bool,
) -> FileRecord {
    let path_string = path.to_string_lossy().into_owned();
    let name_offset = path
        .file_name()
        .map(|n| path_string.len() - n.to_string_lossy().len())
        .unwrap_or(0);
    let mut record = FileRecord::new(path_string, root.to_string_lossy().into_owned(), name_offset, depth, kind, phase, dir_path);
    // §4.F level-≥3 heuristic: pay for the stat up front, off the critical
    // path of the first predicate that would otherwise trigger it lazily.
    if stat_eagerly && kind != FileKind::Error {
        let _ = record.stat(StatMode::NoFollow);
    }
    record
}

fn error_record(path: &Path, depth: usize, error: std::io::ErrorKind) -> FileRecord {
    let mut record = make_record(path, path, depth, FileKind::Error, VisitPhase::Pre, path.to_path_buf(), false);
    record.enum_error = Some(error);
    record
}

fn entry_kind(path: &Path, follow: bool) -> FileKind {
    let meta = if follow { std::fs::metadata(path) } else { std::fs::symlink_metadata(path) };
    match meta {
        Ok(m) => kind_of_std(&m),
        Err(_) => FileKind::Error,
    }
}

fn kind_of_std(meta: &std::fs::Metadata) -> FileKind {
    let ft = meta.file_type();
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if ft.is_dir() {
            FileKind::Dir
        } else if ft.is_file() {
            FileKind::Regular
        } else if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_block_device() {
            FileKind::BlockDev
        } else if ft.is_char_device() {
            FileKind::CharDev
        } else if ft.is_fifo() {
            FileKind::Fifo
        } else if ft.is_socket() {
            FileKind::Socket
        } else {
            FileKind::Unknown
        }
    }
    #[cfg(not(unix))]
    {
        if ft.is_dir() {
            FileKind::Dir
        } else if ft.is_file() {
            FileKind::Regular
        } else if ft.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Unknown
        }
    }
}

#[cfg(unix)]
fn device_of(path: &Path, follow: bool) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    let meta = if follow { std::fs::metadata(path) } else { std::fs::symlink_metadata(path) };
    meta.ok().map(|m| m.dev())
}

#[cfg(not(unix))]
fn device_of(_path: &Path, _follow: bool) -> Option<u64> {
    None
}

#[cfg(unix)]
fn identity_of(path: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| (m.dev(), m.ino()))
}

#[cfg(not(unix))]
fn identity_of(_path: &Path) -> Option<(u64, u64)> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfs_visits_every_file_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/x"), b"1").unwrap();
        std::fs::write(dir.path().join("a/y"), b"1").unwrap();

        let engine = Engine::new(WalkConfig { sort: true, ..WalkConfig::default() });
        let mut visited = Vec::new();
        let ok = engine
            .walk(&[dir.path().to_path_buf()], |record| {
                visited.push(record.path.clone());
                Control::Continue
            })
            .unwrap();
        assert!(ok);
        assert_eq!(visited.len(), 4); // root, a, a/x, a/y
    }

    #[test]
    fn prune_skips_directory_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("skip")).unwrap();
        std::fs::write(dir.path().join("skip/hidden"), b"1").unwrap();
        std::fs::write(dir.path().join("visible"), b"1").unwrap();

        let engine = Engine::new(WalkConfig { sort: true, ..WalkConfig::default() });
        let mut visited = Vec::new();
        engine
            .walk(&[dir.path().to_path_buf()], |record| {
                visited.push(record.path.clone());
                if record.name() == "skip" {
                    Control::Prune
                } else {
                    Control::Continue
                }
            })
            .unwrap();
        assert!(!visited.iter().any(|p| p.ends_with("hidden")));
    }

    #[test]
    fn post_order_emits_directory_after_children() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/x"), b"1").unwrap();

        let engine = Engine::new(WalkConfig { post_order: true, sort: true, ..WalkConfig::default() });
        let mut order = Vec::new();
        engine
            .walk(&[dir.path().to_path_buf()], |record| {
                order.push((record.path.clone(), record.visit_phase));
                Control::Continue
            })
            .unwrap();
        let a_index = order.iter().position(|(p, _)| p.ends_with("/a")).unwrap();
        let x_index = order.iter().position(|(p, _)| p.ends_with("/a/x")).unwrap();
        assert!(x_index < a_index);
        assert_eq!(order[a_index].1, VisitPhase::Post);
    }

    #[test]
    fn pooled_walk_with_multiple_threads_visits_every_file_once() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
            std::fs::write(dir.path().join(name).join("f"), b"1").unwrap();
        }

        let engine = Engine::new(WalkConfig { threads: 4, sort: true, ..WalkConfig::default() });
        let mut visited = std::collections::HashSet::new();
        let ok = engine
            .walk(&[dir.path().to_path_buf()], |record| {
                assert!(visited.insert(record.path.clone()), "duplicate visit: {}", record.path);
                Control::Continue
            })
            .unwrap();
        assert!(ok);
        assert_eq!(visited.len(), 7); // root, a, b, c, a/f, b/f, c/f
    }

    #[test]
    fn ids_strategy_eventually_visits_every_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/deep"), b"1").unwrap();

        let engine = Engine::new(WalkConfig { strategy: Strategy::Ids, sort: true, ..WalkConfig::default() });
        let mut visited = std::collections::HashSet::new();
        let ok = engine
            .walk(&[dir.path().to_path_buf()], |record| {
                assert!(visited.insert(record.path.clone()), "duplicate visit: {}", record.path);
                Control::Continue
            })
            .unwrap();
        assert!(ok);
        assert_eq!(visited.len(), 4); // root, a, a/b, a/b/deep
    }

    #[test]
    fn ids_strategy_honors_prune_across_rounds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("skip/nested")).unwrap();
        std::fs::write(dir.path().join("skip/nested/hidden"), b"1").unwrap();
        std::fs::write(dir.path().join("visible"), b"1").unwrap();

        let engine = Engine::new(WalkConfig { strategy: Strategy::Ids, sort: true, ..WalkConfig::default() });
        let mut visited = Vec::new();
        engine
            .walk(&[dir.path().to_path_buf()], |record| {
                visited.push(record.path.clone());
                if record.name() == "skip" {
                    Control::Prune
                } else {
                    Control::Continue
                }
            })
            .unwrap();
        assert!(!visited.iter().any(|p| p.ends_with("hidden")));
    }
}
