//! Duck-typed platform probes (§9): ACL/capability/xattr checks return a
//! tri-state rather than a plain bool, so "not supported here" is
//! distinguishable from "checked and false." Missing platform support is a
//! parse-time configuration error (§7), never a silent no-op.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tri {
    Yes,
    No,
    Error(String),
}

impl Tri {
    pub fn as_bool(&self) -> bool {
        matches!(self, Tri::Yes)
    }
}

pub trait CapabilityProbe {
    fn has_acl(&self, path: &Path) -> Tri;
    fn has_capabilities(&self, path: &Path) -> Tri;
    fn has_xattr(&self, path: &Path) -> Tri;
    fn is_sparse(&self, path: &Path, apparent_size: u64) -> Tri;
}

/// The capability set this core actually ships: xattr presence via the
/// `xattr` crate, sparseness via block-count vs. apparent-size comparison,
/// ACL/capabilities left unimplemented (they require platform-specific
/// syscalls this crate does not currently bind) and reported as a
/// configuration error rather than silently returning `No`.
pub struct DefaultCapabilities;

impl CapabilityProbe for DefaultCapabilities {
    fn has_acl(&self, _path: &Path) -> Tri {
        Tri::Error("ACL queries are not supported on this platform build".into())
    }

    fn has_capabilities(&self, _path: &Path) -> Tri {
        Tri::Error("file capability queries are not supported on this platform build".into())
    }

    fn has_xattr(&self, path: &Path) -> Tri {
        match xattr::list(path) {
            Ok(mut iter) => {
                if iter.next().is_some() {
                    Tri::Yes
                } else {
                    Tri::No
                }
            }
            Err(e) => Tri::Error(e.to_string()),
        }
    }

    #[cfg(unix)]
    fn is_sparse(&self, path: &Path, apparent_size: u64) -> Tri {
        use std::os::unix::fs::MetadataExt;
        match std::fs::symlink_metadata(path) {
            Ok(m) => {
                let allocated = m.blocks() * 512;
                Tri::from_bool(allocated < apparent_size)
            }
            Err(e) => Tri::Error(e.to_string()),
        }
    }

    #[cfg(not(unix))]
    fn is_sparse(&self, _path: &Path, _apparent_size: u64) -> Tri {
        Tri::Error("sparse-file queries require a unix platform".into())
    }
}

impl Tri {
    fn from_bool(b: bool) -> Tri {
        if b {
            Tri::Yes
        } else {
            Tri::No
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_probe_is_a_configuration_error_by_default() {
        let caps = DefaultCapabilities;
        assert!(matches!(caps.has_acl(Path::new("/")), Tri::Error(_)));
    }
}
