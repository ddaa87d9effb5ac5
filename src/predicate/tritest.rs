//! Evaluation for the eleven yes/no tests the optimizer lattice tracks by
//! name (§3 `predicates[K]`, §4.G "perm/flags" sketch for readable/writable/
//! executable).

use crate::error::RfindError;
use crate::expr::field::TriPred;
use crate::predicate::capability::{CapabilityProbe, Tri};
use crate::walk::record::FileRecord;
use crate::walk::statcache::StatMode;

pub fn eval(pred: TriPred, record: &mut FileRecord, caps: &dyn CapabilityProbe) -> Result<bool, RfindError> {
    match pred {
        TriPred::Readable => Ok(faccess::PathExt::readable(record.full_path())),
        TriPred::Writable => Ok(faccess::PathExt::writable(record.full_path())),
        TriPred::Executable => Ok(faccess::PathExt::executable(record.full_path())),
        TriPred::Hidden => {
            let name = record.name();
            Ok(name.starts_with('.') && name != "." && name != "..")
        }
        TriPred::Empty => eval_empty(record),
        TriPred::Acl => tri_to_result(caps.has_acl(record.full_path())),
        TriPred::Capable => tri_to_result(caps.has_capabilities(record.full_path())),
        TriPred::XAttr => tri_to_result(caps.has_xattr(record.full_path())),
        TriPred::Sparse => {
            let size = record.metadata().map(|m| m.size).unwrap_or(0);
            tri_to_result(caps.is_sparse(record.full_path(), size))
        }
        TriPred::NoGroup => eval_nogroup(record),
        TriPred::NoUser => eval_nouser(record),
    }
}

fn tri_to_result(tri: Tri) -> Result<bool, RfindError> {
    match tri {
        Tri::Yes => Ok(true),
        Tri::No => Ok(false),
        Tri::Error(message) => Err(RfindError::Configuration { message }),
    }
}

fn eval_empty(record: &mut FileRecord) -> Result<bool, RfindError> {
    use crate::expr::field::FileKind;
    match record.kind {
        FileKind::Regular => Ok(record.metadata().map(|m| m.size == 0).unwrap_or(false)),
        FileKind::Dir => match std::fs::read_dir(record.full_path()) {
            Ok(mut iter) => Ok(iter.next().is_none()),
            Err(e) => Err(RfindError::PerFile { path: record.full_path().to_path_buf(), source: e }),
        },
        _ => Ok(false),
    }
}

#[cfg(unix)]
fn eval_nogroup(record: &mut FileRecord) -> Result<bool, RfindError> {
    let gid = match record.stat(StatMode::NoFollow) {
        Ok(m) => m.gid,
        Err(kind) => return Err(io_error(record, kind)),
    };
    Ok(nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid)).ok().flatten().is_none())
}

#[cfg(unix)]
fn eval_nouser(record: &mut FileRecord) -> Result<bool, RfindError> {
    let uid = match record.stat(StatMode::NoFollow) {
        Ok(m) => m.uid,
        Err(kind) => return Err(io_error(record, kind)),
    };
    Ok(nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)).ok().flatten().is_none())
}

fn io_error(record: &FileRecord, kind: std::io::ErrorKind) -> RfindError {
    RfindError::PerFile { path: record.full_path().to_path_buf(), source: std::io::Error::from(kind) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::FileKind;
    use crate::walk::record::VisitPhase;

    #[test]
    fn hidden_detects_leading_dot() {
        let mut record = FileRecord::new(
            "./.secret".into(),
            ".".into(),
            2,
            1,
            FileKind::Regular,
            VisitPhase::Pre,
            ".".into(),
        );
        let caps = crate::predicate::capability::DefaultCapabilities;
        assert!(eval(TriPred::Hidden, &mut record, &caps).unwrap());
    }

    #[test]
    fn empty_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = FileRecord::new(
            dir.path().to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
            0,
            0,
            FileKind::Dir,
            VisitPhase::Pre,
            dir.path().to_path_buf(),
        );
        let caps = crate::predicate::capability::DefaultCapabilities;
        assert!(eval(TriPred::Empty, &mut record, &caps).unwrap());
    }
}
