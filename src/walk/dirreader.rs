//! Directory reader (§4.B): opens, iterates, and closes one directory,
//! skipping `.`/`..` and surfacing the filesystem's own type hint when it is
//! cheap to get one (`DirEntry::file_type()` on most platforms needs no
//! extra syscall).

use std::ffi::OsString;
use std::fs::ReadDir;
use std::io;
use std::path::{Path, PathBuf};

use crate::expr::field::FileKind;

#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: OsString,
    pub type_hint: Option<FileKind>,
}

/// A directory handle that may or may not currently have an open
/// `ReadDir` behind it. Kept as its own type (rather than just using
/// `ReadDir` directly) so the engine can hold a pool of vacant readers and
/// hand them to workers without allocating a new one per directory (§4.B:
/// "allocate an uninitialized directory handle separately from opening").
#[derive(Default)]
pub struct DirReader {
    inner: Option<ReadDir>,
    path: PathBuf,
}

impl DirReader {
    pub fn vacant() -> Self {
        DirReader { inner: None, path: PathBuf::new() }
    }

    pub fn open(path: &Path) -> io::Result<Self> {
        let mut reader = Self::vacant();
        reader.open_into(path)?;
        Ok(reader)
    }

    /// Reuse this handle's storage for a new directory.
    pub fn open_into(&mut self, path: &Path) -> io::Result<()> {
        self.inner = Some(std::fs::read_dir(path)?);
        self.path = path.to_path_buf();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` at end of directory. An error leaves the reader closable;
    /// subsequent calls may still return `None` or surface further errors
    /// depending on the underlying platform iterator.
    pub fn read_next(&mut self) -> Option<io::Result<RawEntry>> {
        loop {
            let inner = self.inner.as_mut()?;
            match inner.next() {
                None => return None,
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(entry)) => {
                    let name = entry.file_name();
                    if name == "." || name == ".." {
                        continue;
                    }
                    let type_hint = entry.file_type().ok().map(kind_of);
                    return Some(Ok(RawEntry { name, type_hint }));
                }
            }
        }
    }

    /// Drain the whole directory into memory (the `buffer` traversal option,
    /// §4.C): immune to readdir invalidation if the directory is mutated
    /// concurrently with the walk.
    pub fn read_all(&mut self) -> (Vec<RawEntry>, Option<io::Error>) {
        let mut entries = Vec::new();
        loop {
            match self.read_next() {
                Some(Ok(e)) => entries.push(e),
                Some(Err(e)) => return (entries, Some(e)),
                None => return (entries, None),
            }
        }
    }

    pub fn close(&mut self) {
        self.inner = None;
    }
}

fn kind_of(ft: std::fs::FileType) -> FileKind {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_dot_and_dotdot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"x").unwrap();
        let mut reader = DirReader::open(dir.path()).unwrap();
        let (entries, err) = reader.read_all();
        assert!(err.is_none());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
    }

    #[test]
    fn vacant_reader_can_be_reused() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        std::fs::write(dir1.path().join("a"), b"x").unwrap();
        std::fs::write(dir2.path().join("b"), b"x").unwrap();
        let mut reader = DirReader::vacant();
        reader.open_into(dir1.path()).unwrap();
        let (first, _) = reader.read_all();
        reader.open_into(dir2.path()).unwrap();
        let (second, _) = reader.read_all();
        assert_eq!(first[0].name, "a");
        assert_eq!(second[0].name, "b");
    }
}
