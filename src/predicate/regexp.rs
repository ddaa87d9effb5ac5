//! `Regex` construction and evaluation (§4.G `-regex`/`-iregex`).

use regex::bytes::{Regex, RegexBuilder};

use crate::error::RfindError;
use crate::expr::field::StringTarget;
use crate::expr::node::RegexSpec;
use crate::walk::record::FileRecord;

/// Build an anchored-by-default regex matcher over the full subject string,
/// mirroring GNU find's behavior of matching the whole name/path rather than
/// searching for a substring.
pub fn build(pattern: &str, target: StringTarget, case_fold: bool, anchored: bool) -> Result<RegexSpec, RfindError> {
    let source = if anchored { format!("(?:{pattern})\\z") } else { pattern.to_string() };
    let regex: Regex = RegexBuilder::new(&source)
        .case_insensitive(case_fold)
        .build()
        .map_err(|e| RfindError::Parse { message: format!("invalid regex '{pattern}': {e}"), argv_span: None })?;
    Ok(RegexSpec { regex, anchored, target })
}

pub fn eval(spec: &RegexSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    let subject: String = match spec.target {
        StringTarget::Name => record.name().to_string(),
        StringTarget::Path => record.full_path().to_string_lossy().into_owned(),
        StringTarget::LinkTarget => match std::fs::read_link(record.full_path()) {
            Ok(target) => target.to_string_lossy().into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => String::new(),
            Err(e) => return Err(RfindError::PerFile { path: record.full_path().to_path_buf(), source: e }),
        },
    };
    Ok(spec.regex.is_match(subject.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::FileKind;
    use crate::walk::record::VisitPhase;

    fn record(path: &str) -> FileRecord {
        FileRecord::new(path.to_string(), ".".into(), 0, 1, FileKind::Regular, VisitPhase::Pre, ".".into())
    }

    #[test]
    fn anchored_regex_matches_whole_path() {
        let spec = build(r".*\.rs", StringTarget::Path, false, true).unwrap();
        let mut r = record("./src/main.rs");
        assert!(eval(&spec, &mut r).unwrap());
        let mut partial = record("./src/main.rs.bak");
        assert!(!eval(&spec, &mut partial).unwrap());
    }

    #[test]
    fn case_insensitive_regex() {
        let spec = build(r".*main.*", StringTarget::Path, true, true).unwrap();
        let mut r = record("./SRC/MAIN.RS");
        assert!(eval(&spec, &mut r).unwrap());
    }
}
