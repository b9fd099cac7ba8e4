//! Stateless filesystem queries over named artifacts.
//!
//! Absence is a normal, representable outcome here, never an error: the
//! freshness policy reasons about missing files constantly. Only a malformed
//! glob pattern is reported as a failure.

use anyhow::{Context, Result};
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub fn exists(path: &Path) -> bool {
    path.is_file()
}

pub fn dir_exists(path: &Path) -> bool {
    path.is_dir()
}

/// Modification time of a file, or `None` when the file is absent (or its
/// metadata cannot be read, which the decision logic treats the same way).
pub fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Entries of `dir` whose file name matches `pattern`, sorted
/// lexicographically for deterministic downstream ordering. A missing
/// directory yields an empty list.
pub fn glob_dir(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("invalid glob pattern '{pattern}'"))?
        .compile_matcher();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(Vec::new()),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir {}", dir.display()))?;
        if matcher.is_match(entry.file_name().as_os_str()) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_paths_are_normal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.mat");
        assert!(!exists(&missing));
        assert!(mtime(&missing).is_none());
        assert!(glob_dir(&dir.path().join("nope"), "*").unwrap().is_empty());
    }

    #[test]
    fn glob_matches_are_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["37_42_2m.mat", "37_42_2m.fin", "37_42_10m.mat", "other.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let matches = glob_dir(dir.path(), "37_42_2m*").unwrap();
        let names: Vec<_> = matches
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["37_42_2m.fin", "37_42_2m.mat"]);
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(glob_dir(dir.path(), "[").is_err());
    }
}
