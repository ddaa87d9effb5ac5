//! `-samefile` (§4.G): compares device+inode against a reference path
//! resolved once at parse time.

use std::path::Path;

use crate::error::RfindError;
use crate::expr::node::SameFileSpec;
use crate::walk::record::FileRecord;
use crate::walk::statcache::StatMode;

pub fn build(reference: &Path) -> Result<SameFileSpec, RfindError> {
    let meta = std::fs::metadata(reference)
        .map_err(|e| RfindError::Parse { message: format!("'{}': {e}", reference.display()), argv_span: None })?;
    use std::os::unix::fs::MetadataExt;
    Ok(SameFileSpec { device: meta.dev(), inode: meta.ino() })
}

pub fn eval(spec: SameFileSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    let meta = record.stat(StatMode::Follow).map_err(|kind| RfindError::PerFile {
        path: record.full_path().to_path_buf(),
        source: std::io::Error::from(kind),
    })?;
    Ok(meta.device == spec.device && meta.inode == spec.inode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::FileKind;
    use crate::walk::record::VisitPhase;

    #[test]
    fn matches_the_exact_file_it_was_built_from() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"x").unwrap();
        let spec = build(&file).unwrap();
        let mut record = FileRecord::new(
            file.to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
            0,
            1,
            FileKind::Regular,
            VisitPhase::Pre,
            dir.path().to_path_buf(),
        );
        assert!(eval(spec, &mut record).unwrap());
    }

    #[test]
    fn does_not_match_a_different_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"y").unwrap();
        let spec = build(&a).unwrap();
        let mut record = FileRecord::new(
            b.to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
            0,
            1,
            FileKind::Regular,
            VisitPhase::Pre,
            dir.path().to_path_buf(),
        );
        assert!(!eval(spec, &mut record).unwrap());
    }
}
