//! `-type`/`-xtype` bit-test against a `TypeMask` (§3, §4.G).
//!
//! `-xtype` reuses `-type`'s mask but resolves the *target* kind when the
//! entry itself is a symlink, following exactly one level (§4.G note on
//! `xtype` being `type` with the follow/no-follow sense inverted for links).

use crate::error::RfindError;
use crate::expr::field::{FileKind, TypeMask};
use crate::walk::record::FileRecord;

pub fn eval_type(mask: TypeMask, record: &FileRecord) -> bool {
    mask.contains(record.kind)
}

pub fn eval_xtype(mask: TypeMask, record: &mut FileRecord) -> Result<bool, RfindError> {
    if record.kind != FileKind::Symlink {
        return Ok(mask.contains(record.kind));
    }
    match std::fs::metadata(record.full_path()) {
        Ok(meta) => Ok(mask.contains(kind_of(&meta))),
        // A dangling symlink resolves to itself for `-xtype`'s purposes.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(mask.contains(FileKind::Symlink)),
        Err(e) => Err(RfindError::PerFile { path: record.full_path().to_path_buf(), source: e }),
    }
}

#[cfg(unix)]
fn kind_of(meta: &std::fs::Metadata) -> FileKind {
    use std::os::unix::fs::FileTypeExt;
    let ft = meta.file_type();
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
fn kind_of(meta: &std::fs::Metadata) -> FileKind {
    let ft = meta.file_type();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::record::VisitPhase;

    #[test]
    fn type_mask_matches_directory() {
        let mask = TypeMask::single(FileKind::Dir);
        let record = FileRecord::new(".".into(), ".".into(), 0, 0, FileKind::Dir, VisitPhase::Pre, ".".into());
        assert!(eval_type(mask, &record));
    }

    #[test]
    fn xtype_follows_symlink_to_target_kind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::write(&target, b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let mut record = FileRecord::new(
            link.to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
            0,
            1,
            FileKind::Symlink,
            VisitPhase::Pre,
            dir.path().to_path_buf(),
        );
        let mask = TypeMask::single(FileKind::Regular);
        assert!(eval_xtype(mask, &mut record).unwrap());
    }

    #[test]
    fn xtype_dangling_symlink_resolves_to_symlink_kind() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("nonexistent"), &link).unwrap();
        let mut record = FileRecord::new(
            link.to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
            0,
            1,
            FileKind::Symlink,
            VisitPhase::Pre,
            dir.path().to_path_buf(),
        );
        let mask = TypeMask::single(FileKind::Symlink);
        assert!(eval_xtype(mask, &mut record).unwrap());
    }
}
