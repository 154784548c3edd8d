//! Build artifact set checks.
//!
//! The launcher must never start against a missing or empty artifact
//! directory; it would serve stale or absent assets.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

/// Ensure the artifact directory exists and contains at least one file.
///
/// Returns the number of files found (directories alone do not count).
pub fn ensure_artifacts(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Err(anyhow!("missing artifact directory {}", dir.display()));
    }
    if !dir.is_dir() {
        return Err(anyhow!("expected artifact directory {}", dir.display()));
    }
    let count = count_files(dir)?;
    if count == 0 {
        return Err(anyhow!("artifact directory {} is empty", dir.display()));
    }
    Ok(count)
}

fn count_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries =
            fs::read_dir(&current).with_context(|| format!("read {}", current.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read entry in {}", current.display()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = ensure_artifacts(&temp.path().join("dist")).unwrap_err();
        assert!(err.to_string().contains("missing artifact directory"));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("assets")).expect("mkdir");
        let err = ensure_artifacts(&dist).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn nested_files_count() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("assets")).expect("mkdir");
        fs::write(dist.join("index.html"), "<html>").expect("write");
        fs::write(dist.join("assets").join("app.js"), "js").expect("write");
        assert_eq!(ensure_artifacts(&dist).expect("artifacts"), 2);
    }
}
