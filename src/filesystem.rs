//! Small filesystem helpers used at the CLI boundary (§6): resolving root
//! arguments, normalizing paths for display, and loading the NUL-separated
//! `-files0-from` batch format. Everything past this module treats a root
//! as an already-validated directory or file path.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use normpath::PathExt;

pub fn is_existing_directory(path: &Path) -> bool {
    path.is_dir()
}

pub fn is_existing(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Resolve `path` to an absolute path without following a trailing symlink
/// component, for `-a`/`--absolute-path`-style display.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(path))
    }
}

/// Normalize `.`/`..` components without touching the filesystem beyond
/// what `normpath` needs to resolve them, matching the teacher's own use of
/// the crate in its path-handling helpers.
pub fn normalize(path: &Path) -> io::Result<PathBuf> {
    Ok(path.normalize()?.into_path_buf())
}

/// Read a NUL-separated sequence of paths (§6 "Paths-from-file"). `-` reads
/// from standard input, matching the convention the rest of the CLI surface
/// uses for sink targets.
pub fn paths_from_file(target: &str) -> io::Result<Vec<PathBuf>> {
    let mut contents = String::new();
    if target == "-" {
        io::stdin().read_to_string(&mut contents)?;
    } else {
        File::open(target)?.read_to_string(&mut contents)?;
    }
    Ok(contents
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Read newline-separated paths, the historical alternative to
/// `-files0-from` when callers know their paths contain no newlines.
pub fn paths_from_lines(target: &str) -> io::Result<Vec<PathBuf>> {
    let reader: Box<dyn BufRead> = if target == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(target)?))
    };
    reader
        .lines()
        .filter(|l| l.as_ref().map(|s| !s.is_empty()).unwrap_or(true))
        .map(|l| l.map(PathBuf::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_separated_paths_split_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths");
        std::fs::write(&file, b"./a\0./b/c\0").unwrap();
        let paths = paths_from_file(file.to_str().unwrap()).unwrap();
        assert_eq!(paths, vec![PathBuf::from("./a"), PathBuf::from("./b/c")]);
    }

    #[test]
    fn absolute_path_joins_relative_to_cwd() {
        let resolved = absolute_path(Path::new("x")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("x"));
    }
}
