use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use tracing::debug;

use crate::error::{FsError, FsResult};

/// Create `path` and any missing parents with permission bits `mode`.
///
/// Succeeds without touching anything if the directory already exists.
pub fn ensure_dir(path: &Path, mode: u32) -> FsResult<()> {
    if path.is_dir() {
        debug!(path = %path.display(), "directory already exists");
        return Ok(());
    }

    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(|source| FsError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        ensure_dir(&target, 0o700).unwrap();
        assert!(target.is_dir());
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x");
        ensure_dir(&target, 0o700).unwrap();
        ensure_dir(&target, 0o700).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn fails_when_a_file_is_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = ensure_dir(&blocker.join("sub"), 0o700).unwrap_err();
        assert!(matches!(err, FsError::CreateDir { .. }));
    }
}
