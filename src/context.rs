//! The long-lived search context (§3 "Context"): owns the expression arena,
//! the parsed roots, traversal configuration, and every piece of run-wide
//! mutable state (sinks, dedup trie, exit status).

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::expr::{Arena, NodeId};
use crate::predicate::format::NameLookup;
use crate::predicate::print::Sink;
use crate::support::Trie;
use crate::walk::WalkConfig;

/// `-D debugopts` (§6, §4.F diagnostics): user-controlled, not an ambient
/// tracing layer, matching the teacher's choice to carry no `log`
/// dependency. A hand-rolled bitset in the same style as `TypeMask`
/// (`src/expr/field.rs`) rather than pulling in a flags crate for four bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugFlags(u32);

impl DebugFlags {
    pub const OPT: DebugFlags = DebugFlags(1 << 0);
    pub const RATES: DebugFlags = DebugFlags(1 << 1);
    pub const TREE: DebugFlags = DebugFlags(1 << 2);
    pub const EXEC: DebugFlags = DebugFlags(1 << 3);

    pub fn empty() -> Self {
        DebugFlags(0)
    }

    pub fn contains(self, other: DebugFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: DebugFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for DebugFlags {
    type Output = DebugFlags;
    fn bitor(self, rhs: DebugFlags) -> DebugFlags {
        DebugFlags(self.0 | rhs.0)
    }
}

/// The arena owns all expression nodes (§3); the context owns the arena plus
/// everything else a single search needs.
pub struct Context {
    pub arena: Arena,
    pub roots: Vec<PathBuf>,
    pub exclude: Option<NodeId>,
    pub main_expr: NodeId,

    pub mindepth: usize,
    pub maxdepth: Option<usize>,

    pub walk: WalkConfig,
    pub optimization_level: u8,
    pub debug: DebugFlags,

    pub ignore_races: bool,
    pub unique: bool,

    pub(crate) user_cache: RefCell<HashMap<u32, Option<String>>>,
    pub(crate) group_cache: RefCell<HashMap<u32, Option<String>>>,

    pub(crate) sinks: Vec<Sink>,
    sink_by_target: HashMap<String, usize>,
    dedup: Trie<()>,

    pub had_error: bool,
    pub exit_code: Option<i32>,
}

impl Context {
    pub fn new(arena: Arena, roots: Vec<PathBuf>, main_expr: NodeId) -> Self {
        Context {
            arena,
            roots,
            exclude: None,
            main_expr,
            mindepth: 0,
            maxdepth: None,
            walk: WalkConfig::default(),
            optimization_level: 1,
            debug: DebugFlags::empty(),
            ignore_races: false,
            unique: false,
            user_cache: RefCell::new(HashMap::new()),
            group_cache: RefCell::new(HashMap::new()),
            sinks: vec![Sink::stdout()],
            sink_by_target: HashMap::new(),
            dedup: Trie::new(),
            had_error: false,
            exit_code: None,
        }
    }

    /// Insert `id` into the dedup trie; returns `true` if this is the first
    /// time this file identity has been seen (§4.E "Uniqueness filter").
    pub fn mark_seen(&mut self, id: &[u8; 16]) -> bool {
        let (is_new, _) = self.dedup.insert_bytes_with(id, || ());
        is_new
    }

    /// Open (or reuse) a sink for `target`; `-` always maps to the shared
    /// stdout sink (§5 "Output sinks are deduplicated").
    pub fn sink_for(&mut self, target: &str) -> std::io::Result<crate::predicate::print::SinkId> {
        if target == "-" {
            return Ok(crate::predicate::print::SinkId::STDOUT);
        }
        if let Some(&index) = self.sink_by_target.get(target) {
            return Ok(crate::predicate::print::SinkId(index));
        }
        let sink = Sink::file(std::path::Path::new(target))?;
        let index = self.sinks.len();
        self.sinks.push(sink);
        self.sink_by_target.insert(target.to_string(), index);
        Ok(crate::predicate::print::SinkId(index))
    }

    pub fn sink_mut(&mut self, id: crate::predicate::print::SinkId) -> &mut Sink {
        &mut self.sinks[id.0]
    }

    /// Looks up and caches a username for `uid` (§1 "user/group name lookup
    /// with caching" is an explicit external capability; this is the default
    /// implementation backing it). Takes `&self`: the cache lives behind a
    /// `RefCell` so this can satisfy [`NameLookup`], which the `-printf` `%u`
    /// directive needs while only holding a shared context reference.
    pub fn user_name(&self, uid: u32) -> Option<String> {
        self.user_cache.borrow_mut().entry(uid).or_insert_with(|| resolve_user(uid)).clone()
    }

    pub fn group_name(&self, gid: u32) -> Option<String> {
        self.group_cache.borrow_mut().entry(gid).or_insert_with(|| resolve_group(gid)).clone()
    }

    /// Record a run-ending failure for the exit-code computation (§6, §7).
    pub fn note_error(&mut self) {
        self.had_error = true;
    }

    /// The process exit code this run should report (§6).
    pub fn exit_code(&self) -> i32 {
        if let Some(n) = self.exit_code {
            n
        } else if self.had_error {
            1
        } else {
            0
        }
    }
}

impl NameLookup for Context {
    fn user_name(&self, uid: u32) -> Option<String> {
        Context::user_name(self, uid)
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        Context::group_name(self, gid)
    }
}

/// A [`NameLookup`] borrowing only the two caches rather than the whole
/// context, so the evaluator can hold it alongside a mutable borrow of
/// `ctx.sinks` while printing (§4.G `-printf %u`/`%g`).
pub struct UserGroupLookup<'a> {
    user_cache: &'a RefCell<HashMap<u32, Option<String>>>,
    group_cache: &'a RefCell<HashMap<u32, Option<String>>>,
}

impl<'a> UserGroupLookup<'a> {
    pub fn new(
        user_cache: &'a RefCell<HashMap<u32, Option<String>>>,
        group_cache: &'a RefCell<HashMap<u32, Option<String>>>,
    ) -> Self {
        UserGroupLookup { user_cache, group_cache }
    }
}

#[cfg(unix)]
fn resolve_user(uid: u32) -> Option<String> {
    nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)).ok().flatten().map(|u| u.name)
}

#[cfg(not(unix))]
fn resolve_user(_uid: u32) -> Option<String> {
    None
}

#[cfg(unix)]
fn resolve_group(gid: u32) -> Option<String> {
    nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid)).ok().flatten().map(|g| g.name)
}

#[cfg(not(unix))]
fn resolve_group(_gid: u32) -> Option<String> {
    None
}

impl<'a> NameLookup for UserGroupLookup<'a> {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.user_cache.borrow_mut().entry(uid).or_insert_with(|| resolve_user(uid)).clone()
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        self.group_cache.borrow_mut().entry(gid).or_insert_with(|| resolve_group(gid)).clone()
    }
}
