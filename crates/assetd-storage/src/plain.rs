use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use assetd_types::AssetOpts;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};
use crate::traits::{AssetReader, StorageOps};

/// Asset backend mapping each path directly to a file under the storage root.
///
/// Permission bits live on the files themselves; there is no separate index.
pub struct PlainStorage {
    root: PathBuf,
    temp_dir: PathBuf,
    dirs_mode: u32,
}

impl PlainStorage {
    pub fn new(root: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>, dirs_mode: u32) -> Self {
        Self {
            root: root.into(),
            temp_dir: temp_dir.into(),
            dirs_mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an asset path to its file, refusing anything that would leave the root.
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let invalid = || StorageError::InvalidPath(path.to_string());
        let mut resolved = self.root.clone();
        let mut parts = 0;
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    parts += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid())
                }
            }
        }
        if parts == 0 {
            return Err(invalid());
        }
        Ok(resolved)
    }
}

fn file_mode(metadata: &fs::Metadata) -> AssetOpts {
    AssetOpts::with_mode(metadata.permissions().mode() & 0o7777)
}

impl StorageOps for PlainStorage {
    fn initialize(&self) -> StorageResult<()> {
        assetd_fs::ensure_dir(&self.root, self.dirs_mode)?;
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn create_asset(&self, path: &str, reader: &mut dyn Read, opts: AssetOpts) -> StorageResult<()> {
        let dest = self.resolve(path)?;
        if dest.exists() {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        // Parents are created below the root, never the root itself.
        if !self.root.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("storage root {} is missing", self.root.display()),
            )));
        }
        if let Some(parent) = dest.parent() {
            assetd_fs::ensure_dir(parent, self.dirs_mode)?;
        }

        let mut tmp = assetd_fs::new_temp_file(&self.temp_dir)?;
        let copied = io::copy(reader, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        tmp.as_file()
            .set_permissions(Permissions::from_mode(opts.mode))?;

        tmp.persist_noclobber(&dest).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(path.to_string())
            } else {
                warn!(dest = %dest.display(), error = %e.error, "rename into storage failed");
                StorageError::Io(e.error)
            }
        })?;

        debug!(path, dest = %dest.display(), size = copied, opts = %opts, "stored plain asset");
        Ok(())
    }

    fn read_asset(&self, path: &str) -> StorageResult<AssetReader> {
        let src = self.resolve(path)?;
        let file = match File::open(&src) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(AssetReader::new(BufReader::new(file), file_mode(&metadata)))
    }

    fn range(&self, f: &mut dyn FnMut(&str, AssetOpts) -> bool) -> StorageResult<()> {
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let Some(relative) = relative.to_str() else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 asset path");
                continue;
            };
            let metadata = entry.metadata().map_err(io::Error::from)?;
            if !f(relative, file_mode(&metadata)) {
                break;
            }
        }
        Ok(())
    }
}
