//! `StringMatch` construction and evaluation: literal filename/path/symlink
//! matching and glob matching (§4.G name/iname/path/ipath/lname/ilname).

use crate::error::RfindError;
use crate::expr::field::StringTarget;
use crate::expr::node::StringMatchSpec;
use crate::walk::record::FileRecord;
use crate::walk::statcache::StatMode;

/// Build a `StringMatchSpec` from a raw pattern (§4.G). An unescaped trailing
/// backslash is a parse-time warning that makes the predicate unconditionally
/// false, matching GNU find's own quirk rather than rejecting the argument.
pub fn build(pattern: &str, target: StringTarget, case_fold: bool) -> Result<StringMatchSpec, RfindError> {
    let trailing_backslash = pattern.ends_with('\\') && !pattern.ends_with("\\\\");
    let literal = if is_glob_free(pattern) { Some(pattern.as_bytes().to_vec()) } else { None };

    let mut builder = globset::GlobBuilder::new(pattern);
    builder.case_insensitive(case_fold).literal_separator(false);
    let glob = builder
        .build()
        .map_err(|e| RfindError::Parse { message: format!("invalid pattern '{pattern}': {e}"), argv_span: None })?
        .compile_matcher();

    if trailing_backslash {
        crate::error::print_warning(format!("pattern '{pattern}' ends with an unescaped '\\'; this can never match"));
    }

    Ok(StringMatchSpec {
        target,
        case_fold,
        literal,
        glob,
        always_false: trailing_backslash,
        original: pattern.to_string(),
    })
}

fn is_glob_free(pattern: &str) -> bool {
    !pattern.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b']' | b'{' | b'}' | b'\\'))
}

pub fn eval(spec: &StringMatchSpec, record: &mut FileRecord) -> Result<bool, RfindError> {
    if spec.always_false {
        return Ok(false);
    }
    let subject = subject_string(spec.target, record)?;
    if let Some(literal) = &spec.literal {
        let candidate = subject.into_bytes();
        let (candidate, needle) = if spec.case_fold {
            (ascii_lowercase(&candidate), ascii_lowercase(literal))
        } else {
            (candidate, literal.clone())
        };
        return Ok(candidate == needle);
    }
    Ok(spec.glob.is_match(subject))
}

fn subject_string(target: StringTarget, record: &mut FileRecord) -> Result<String, RfindError> {
    match target {
        StringTarget::Name => Ok(record.name().to_string()),
        StringTarget::Path => Ok(record.full_path().to_string_lossy().into_owned()),
        StringTarget::LinkTarget => match std::fs::read_link(record.full_path()) {
            Ok(target) => Ok(target.to_string_lossy().into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(String::new()),
            Err(e) => Err(RfindError::PerFile { path: record.full_path().to_path_buf(), source: e }),
        },
    }
}

fn ascii_lowercase(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(u8::to_ascii_lowercase).collect()
}

/// Used by the stat-avoidance check (§4.G lname): a link-target match never
/// needs a follow-mode stat, only `readlink`.
pub fn needs_stat(target: StringTarget) -> bool {
    !matches!(target, StringTarget::LinkTarget)
}

#[allow(dead_code)]
fn _touch_stat_mode() -> StatMode {
    StatMode::NoFollow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::FileKind;
    use crate::walk::record::VisitPhase;

    fn record(path: &str) -> FileRecord {
        let offset = path.rfind('/').map(|i| i + 1).unwrap_or(0);
        FileRecord::new(path.to_string(), ".".into(), offset, 1, FileKind::Regular, VisitPhase::Pre, ".".into())
    }

    #[test]
    fn literal_pattern_matches_exact_name() {
        let spec = build("main.rs", StringTarget::Name, false).unwrap();
        let mut r = record("src/main.rs");
        assert!(eval(&spec, &mut r).unwrap());
        let mut other = record("src/lib.rs");
        assert!(!eval(&spec, &mut other).unwrap());
    }

    #[test]
    fn glob_pattern_matches_extension() {
        let spec = build("*.rs", StringTarget::Name, false).unwrap();
        let mut r = record("src/main.rs");
        assert!(eval(&spec, &mut r).unwrap());
    }

    #[test]
    fn case_fold_matches_regardless_of_case() {
        let spec = build("MAIN.RS", StringTarget::Name, true).unwrap();
        let mut r = record("src/main.rs");
        assert!(eval(&spec, &mut r).unwrap());
    }

    #[test]
    fn trailing_unescaped_backslash_is_always_false() {
        let spec = build("foo\\", StringTarget::Name, false).unwrap();
        let mut r = record("foo\\");
        assert!(!eval(&spec, &mut r).unwrap());
    }
}
