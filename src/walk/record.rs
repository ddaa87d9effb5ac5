//! The per-visit file record (§3 "File record").

use std::io;
use std::path::{Path, PathBuf};

use crate::expr::field::FileKind;
use crate::walk::statcache::{FileId, Metadata, StatCache, StatMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitPhase {
    Pre,
    Post,
}

/// An immutable-to-callers snapshot the traversal engine hands to the
/// evaluator for each file (§3). The stat cache is the one field that is
/// genuinely mutated in place, since it is lazily populated on demand.
#[derive(Debug)]
pub struct FileRecord {
    pub path: String,
    pub root: String,
    pub name_offset: usize,
    pub depth: usize,
    pub kind: FileKind,
    pub visit_phase: VisitPhase,
    /// The resolved path of the containing directory, so predicates avoid
    /// re-walking from a root (§3 "dir_handle").
    pub dir_path: PathBuf,
    /// Populated instead of `kind == Error` data when enumeration itself
    /// failed for this entry (§3: "the last indicating the file could not be
    /// enumerated, with an associated error code").
    pub enum_error: Option<io::ErrorKind>,
    stat_cache: StatCache,
}

impl FileRecord {
    pub fn new(
        path: String,
        root: String,
        name_offset: usize,
        depth: usize,
        kind: FileKind,
        visit_phase: VisitPhase,
        dir_path: PathBuf,
    ) -> Self {
        FileRecord {
            path,
            root,
            name_offset,
            depth,
            kind,
            visit_phase,
            dir_path,
            enum_error: None,
            stat_cache: StatCache::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.path[self.name_offset..]
    }

    pub fn full_path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn stat(&mut self, mode: StatMode) -> Result<Metadata, io::ErrorKind> {
        let path = self.path.clone();
        self.stat_cache.stat(Path::new(&path), mode)
    }

    /// Best-effort metadata for formatting/printing, using whichever mode
    /// has already been populated; if neither has, forces a no-follow stat.
    pub fn metadata(&mut self) -> Option<Metadata> {
        self.stat(StatMode::NoFollow).ok()
    }

    pub fn file_id(&mut self, mode: StatMode) -> Option<FileId> {
        self.stat(mode).ok().map(|m| FileId::of(&m))
    }
}
