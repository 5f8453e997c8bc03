//! Scoped temporary files and directories.
//!
//! The resources are deleted on every exit path of the body. A failed
//! deletion is logged with the leaked path and never replaces the body's
//! result.

use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::{PipelineError, Result};

const PREFIX: &str = "anvil-";

/// Runs `body` with `count` fresh, empty temporary files.
pub fn with_temp_files<T>(count: usize, body: impl FnOnce(&[PathBuf]) -> Result<T>) -> Result<T> {
    let mut files: Vec<TempPath> = Vec::with_capacity(count);
    for _ in 0..count {
        let file = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempfile()
            .map_err(PipelineError::io(std::env::temp_dir()))?;
        files.push(file.into_temp_path());
    }
    let paths: Vec<PathBuf> = files.iter().map(|file| file.to_path_buf()).collect();

    let result = body(&paths);

    for file in files {
        let path = file.to_path_buf();
        match file.close() {
            Ok(()) => {}
            // the body removed or moved it
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn_leaked(&path, &err),
        }
    }
    result
}

/// Runs `body` with a fresh temporary directory.
pub fn with_temp_dir<T>(body: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let dir = tempfile::Builder::new()
        .prefix(PREFIX)
        .tempdir()
        .map_err(PipelineError::io(std::env::temp_dir()))?;
    let path = dir.path().to_path_buf();

    let result = body(&path);

    if let Err(err) = dir.close() {
        warn_leaked(&path, &err);
    }
    result
}

fn warn_leaked(path: &Path, err: &std::io::Error) {
    tracing::warn!(
        target: "anvil.pipeline",
        path = %path.display(),
        error = %err,
        "failed to delete temporary file; remove it manually"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_are_removed_after_success_and_failure() {
        let mut seen = Vec::new();
        let value = with_temp_files(2, |paths| {
            assert_eq!(paths.len(), 2);
            assert_ne!(paths[0], paths[1]);
            for path in paths {
                assert!(path.is_file());
                std::fs::write(path, b"data").unwrap();
            }
            seen.extend_from_slice(paths);
            Ok(7)
        })
        .unwrap();
        assert_eq!(value, 7);
        assert!(seen.iter().all(|path| !path.exists()));

        seen.clear();
        let err = with_temp_files(1, |paths| -> Result<()> {
            seen.extend_from_slice(paths);
            Err(PipelineError::UnknownVersion {
                version: "0.0".into(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownVersion { .. }));
        assert!(!seen[0].exists());
    }

    #[test]
    fn body_may_delete_its_own_file() {
        with_temp_files(1, |paths| {
            std::fs::remove_file(&paths[0]).unwrap();
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn directory_is_removed_with_contents() {
        let mut kept = PathBuf::new();
        with_temp_dir(|dir| {
            std::fs::create_dir_all(dir.join("nested")).unwrap();
            std::fs::write(dir.join("nested/file.txt"), b"x").unwrap();
            kept = dir.to_path_buf();
            Ok(())
        })
        .unwrap();
        assert!(!kept.exists());
    }
}
