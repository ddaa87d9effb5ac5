//! `-delete` (§4.G, §9 Open Question: behavior on the literal root `"."`).
//!
//! The reference treats `-delete` on a literal `"."` root argument as a
//! no-op that still reports success, rather than an error or an actual
//! `rmdir` of the working directory (decided in DESIGN.md). Other literal
//! root forms (`"/"`, a trailing-slash root, `".."`) get the same treatment:
//! deleting a root by its own dot-relative name is never attempted.

use std::path::Path;

use crate::error::RfindError;
use crate::expr::field::FileKind;
use crate::walk::record::FileRecord;

pub fn is_noop_root(record: &FileRecord) -> bool {
    record.depth == 0 && is_dot_like(record.full_path())
}

fn is_dot_like(path: &Path) -> bool {
    matches!(path.file_name(), None) || path.as_os_str() == "." || path.as_os_str() == ".."
}

pub fn eval(record: &mut FileRecord) -> Result<bool, RfindError> {
    if is_noop_root(record) {
        return Ok(true);
    }
    let path = record.full_path().to_path_buf();
    let result = if record.kind == FileKind::Dir { std::fs::remove_dir(&path) } else { std::fs::remove_file(&path) };
    match result {
        Ok(()) => Ok(true),
        Err(e) => Err(RfindError::PerFile { path, source: e }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::record::VisitPhase;

    #[test]
    fn root_literal_dot_is_a_noop() {
        let mut record = FileRecord::new(".".into(), ".".into(), 0, 0, FileKind::Dir, VisitPhase::Pre, ".".into());
        assert!(eval(&mut record).unwrap());
    }

    #[test]
    fn nested_file_is_not_a_noop_root() {
        let record =
            FileRecord::new("./a/b".into(), ".".into(), 4, 2, FileKind::Regular, VisitPhase::Pre, "./a".into());
        assert!(!is_noop_root(&record));
    }

    #[test]
    fn delete_removes_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doomed");
        std::fs::write(&file, b"x").unwrap();
        let mut record = FileRecord::new(
            file.to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
            0,
            1,
            FileKind::Regular,
            VisitPhase::Pre,
            dir.path().to_path_buf(),
        );
        assert!(eval(&mut record).unwrap());
        assert!(!file.exists());
    }
}
