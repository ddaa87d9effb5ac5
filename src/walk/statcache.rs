//! Stat cache & file identity (§4.A).
//!
//! Centralizes the choice between follow- and no-follow-symlink metadata
//! queries and caches both per file record so no predicate issues the same
//! `stat`/`lstat` twice.

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// The subset of `stat(2)` fields the predicates and the optimizer lattice
/// need. Kept small and `Copy` so caching it is cheap.
#[derive(Debug, Clone, Copy)]
pub struct Metadata {
    pub device: u64,
    pub inode: u64,
    pub size: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    /// 512-byte blocks actually allocated (`-size`'s sparse-aware cousin,
    /// §4.G `%b`/`%k` and the sparseness probe).
    pub blocks: u64,
    pub mtime: std::time::SystemTime,
    pub atime: std::time::SystemTime,
    pub ctime: std::time::SystemTime,
    /// Birth/creation time, when the platform and filesystem expose one
    /// (§4.G `%w`/`%W`). `None` rather than an epoch stand-in so callers can
    /// tell "unsupported" apart from "genuinely created at the epoch".
    pub btime: Option<std::time::SystemTime>,
    pub is_symlink: bool,
}

impl Metadata {
    fn from_std(m: &fs::Metadata, is_symlink: bool) -> Self {
        Metadata {
            device: m.dev(),
            inode: m.ino(),
            size: m.size(),
            nlink: m.nlink(),
            uid: m.uid(),
            gid: m.gid(),
            mode: m.mode(),
            blocks: m.blocks(),
            mtime: m.modified().unwrap_or(std::time::UNIX_EPOCH),
            atime: m.accessed().unwrap_or(std::time::UNIX_EPOCH),
            ctime: std::time::UNIX_EPOCH + std::time::Duration::new(m.ctime().max(0) as u64, 0),
            btime: m.created().ok(),
            is_symlink,
        }
    }
}

/// 16-byte stable identity used for dedup (§4.A `file_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub [u8; 16]);

impl FileId {
    pub fn of(meta: &Metadata) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&meta.device.to_le_bytes());
        bytes[8..].copy_from_slice(&meta.inode.to_le_bytes());
        FileId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatMode {
    Follow,
    NoFollow,
    TryFollow,
}

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Ok(Metadata),
    Err(io::ErrorKind),
}

/// Two lazily populated slots, one per symlink policy, as described in §3.
#[derive(Debug, Clone)]
pub struct StatCache {
    follow: Slot,
    nofollow: Slot,
}

impl StatCache {
    pub fn new() -> Self {
        StatCache { follow: Slot::Empty, nofollow: Slot::Empty }
    }

    /// Fetch metadata under `mode`, issuing the underlying syscall at most
    /// once per mode for the lifetime of this cache.
    pub fn stat(&mut self, path: &Path, mode: StatMode) -> Result<Metadata, io::ErrorKind> {
        match mode {
            StatMode::NoFollow => self.stat_slot(path, false),
            StatMode::Follow => self.stat_slot(path, true),
            StatMode::TryFollow => match self.stat_slot(path, true) {
                Ok(m) => Ok(m),
                Err(_) => self.stat_slot(path, false),
            },
        }
    }

    fn stat_slot(&mut self, path: &Path, follow: bool) -> Result<Metadata, io::ErrorKind> {
        let slot = if follow { &mut self.follow } else { &mut self.nofollow };
        if let Slot::Empty = slot {
            let result = if follow { fs::metadata(path) } else { fs::symlink_metadata(path) };
            *slot = match result {
                Ok(m) => Slot::Ok(Metadata::from_std(&m, !follow && m.file_type().is_symlink())),
                Err(e) => Slot::Err(e.kind()),
            };
        }
        match slot {
            Slot::Ok(m) => Ok(*m),
            Slot::Err(kind) => Err(*kind),
            Slot::Empty => unreachable!("just populated"),
        }
    }
}

impl Default for StatCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_is_cached_after_first_call() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"hi").unwrap();
        let mut cache = StatCache::new();
        let first = cache.stat(&file, StatMode::NoFollow).unwrap();
        std::fs::remove_file(&file).unwrap();
        // Second call must come from cache, not the (now missing) file.
        let second = cache.stat(&file, StatMode::NoFollow).unwrap();
        assert_eq!(first.inode, second.inode);
    }

    #[test]
    fn try_follow_falls_back_on_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink("/nonexistent-rfind-target", &link).unwrap();
        let mut cache = StatCache::new();
        let meta = cache.stat(&link, StatMode::TryFollow).unwrap();
        assert!(meta.is_symlink);
    }

    #[test]
    fn file_id_combines_device_and_inode() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"hi").unwrap();
        let mut cache = StatCache::new();
        let m = cache.stat(&file, StatMode::NoFollow).unwrap();
        let id1 = FileId::of(&m);
        let id2 = FileId::of(&m);
        assert_eq!(id1, id2);
    }
}
