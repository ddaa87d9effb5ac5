//! `-perm` mode comparison (§4.G): exact, all-bits-set, and any-bit-set forms.

use crate::error::RfindError;
use crate::expr::field::{ModeCmpKind, ModeCmpSpec};
use crate::walk::record::FileRecord;
use crate::walk::statcache::StatMode;

const PERM_BITS: u32 = 0o7777;

pub fn eval(spec: &ModeCmpSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    let meta = record
        .stat(StatMode::Follow)
        .map_err(|kind| RfindError::PerFile { path: record.full_path().to_path_buf(), source: std::io::Error::from(kind) })?;
    let mode = meta.mode & PERM_BITS;
    Ok(match spec.cmp {
        ModeCmpKind::Exact => mode == spec.set_bits,
        ModeCmpKind::All => mode & spec.set_bits == spec.set_bits,
        ModeCmpKind::Any => spec.set_bits == 0 || mode & spec.set_bits != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::FileKind;
    use crate::walk::record::VisitPhase;
    use std::os::unix::fs::PermissionsExt;

    fn record(path: &std::path::Path) -> FileRecord {
        FileRecord::new(
            path.to_string_lossy().into_owned(),
            path.parent().unwrap().to_string_lossy().into_owned(),
            0,
            1,
            FileKind::Regular,
            VisitPhase::Pre,
            path.parent().unwrap().to_path_buf(),
        )
    }

    #[test]
    fn exact_mode_matches() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"x").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();
        let spec = ModeCmpSpec { set_bits: 0o644, clear_bits: 0, cmp: ModeCmpKind::Exact };
        assert!(eval(&spec, &mut record(&file)).unwrap());
    }

    #[test]
    fn any_mode_with_zero_bits_is_vacuously_true() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"x").unwrap();
        let spec = ModeCmpSpec { set_bits: 0, clear_bits: 0, cmp: ModeCmpKind::Any };
        assert!(eval(&spec, &mut record(&file)).unwrap());
    }

    #[test]
    fn all_mode_requires_every_bit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        std::fs::write(&file, b"x").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o600)).unwrap();
        let spec = ModeCmpSpec { set_bits: 0o644, clear_bits: 0, cmp: ModeCmpKind::All };
        assert!(!eval(&spec, &mut record(&file)).unwrap());
    }
}
