use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use assetd_types::{ObjectId, StorageId};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{VaultError, VaultResult};
use crate::opened::OpenTracker;
use crate::refs::{Ref, RefAdd, RefsDb};

/// Fan-out depth used when the configured depth is zero.
pub const DEFAULT_VAULT_DEPTH: usize = 2;

/// Vault settings, derived from the storages manager configuration.
#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Directory holding the object tree and the reference database.
    pub root: PathBuf,
    /// Number of two-hex-character directory levels above each object.
    pub depth: usize,
    /// Permission bits for created directories.
    pub dirs_mode: u32,
    /// Permission bits for object files and the reference database.
    pub files_mode: u32,
    /// File name of the reference database inside `root`.
    pub refs_file: String,
    /// Directory for atomic-write temp files. Must share a filesystem with `root`.
    pub temp_dir: PathBuf,
}

/// The object an asset points at, plus the logical asset path holding the
/// reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultAsset {
    pub object: ObjectId,
    pub path: String,
}

struct VaultState {
    refs: RefsDb,
    opened: OpenTracker<ObjectId>,
}

/// Content-addressed, reference-counted object store shared by all hashed
/// storages.
pub struct Vault {
    config: VaultConfig,
    depth: usize,
    state: Mutex<VaultState>,
}

/// Object path relative to the vault root for a given fan-out depth.
pub fn relative_object_path(object: &ObjectId, depth: usize) -> PathBuf {
    let hex = object.to_hex();
    let mut path = PathBuf::new();
    for level in 0..depth {
        path.push(&hex[level * 2..level * 2 + 2]);
    }
    path.push(&hex[depth * 2..]);
    path
}

fn effective_depth(depth: usize) -> usize {
    if depth == 0 {
        DEFAULT_VAULT_DEPTH
    } else {
        // Keep at least two characters for the leaf file name.
        depth.min(ObjectId::HEX_LEN / 2 - 1)
    }
}

fn remove_object_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed unreferenced object"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove unreferenced object"),
    }
}

impl Vault {
    /// Open the vault, creating its root and loading the reference database.
    pub fn open(config: VaultConfig) -> VaultResult<Self> {
        info!(root = %config.root.display(), "open vault");
        assetd_fs::ensure_dir(&config.root, config.dirs_mode)?;

        let refs = RefsDb::open(
            &config.root.join(&config.refs_file),
            &config.temp_dir,
            config.files_mode,
        )?;

        Ok(Self {
            depth: effective_depth(config.depth),
            config,
            state: Mutex::new(VaultState {
                refs,
                opened: OpenTracker::new(),
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().expect("vault mutex poisoned")
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Canonical on-disk location of `object`.
    pub fn object_path(&self, object: &ObjectId) -> PathBuf {
        self.config.root.join(relative_object_path(object, self.depth))
    }

    /// Adopt a fully written temp file as the bytes of `asset.object` and
    /// record a reference from `storage`/`asset.path`.
    ///
    /// If the object already exists the temp file is discarded and the
    /// existing copy is reused. A deletion pending on the object is cancelled.
    pub fn put(&self, storage: &StorageId, asset: &VaultAsset, source: NamedTempFile) -> VaultResult<RefAdd> {
        let mut state = self.state();
        let object_path = self.object_path(&asset.object);

        if object_path.exists() {
            debug!(object = %asset.object, source = %source.path().display(), "object exists; discarding source");
            drop(source);
        } else {
            if let Some(parent) = object_path.parent() {
                assetd_fs::ensure_dir(parent, self.config.dirs_mode)?;
            }
            source
                .as_file()
                .set_permissions(Permissions::from_mode(self.config.files_mode))?;
            source.persist(&object_path).map_err(|e| {
                warn!(object = %asset.object, error = %e.error, "rename into vault failed");
                VaultError::Io(e.error)
            })?;
            debug!(object = %asset.object, path = %object_path.display(), "created new object");
        }

        state.opened.cancel(&asset.object);

        match state.refs.add(asset.object, storage, &asset.path) {
            Ok(added) => Ok(added),
            Err(e) => {
                if state.refs.refs_count(&asset.object) == 0 {
                    self.remove_object(&mut state, asset.object);
                }
                Err(e)
            }
        }
    }

    /// Open `asset.object` for reading. The returned handle keeps the object
    /// alive until it is dropped.
    pub fn open_object(self: &Arc<Self>, asset: &VaultAsset) -> VaultResult<VaultFile> {
        let mut state = self.state();
        let object_path = self.object_path(&asset.object);

        let file = match File::open(&object_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VaultError::ObjectNotFound(asset.object));
            }
            Err(e) => {
                warn!(object = %asset.object, error = %e, "open object failed");
                return Err(e.into());
            }
        };

        state.opened.open(asset.object);
        debug!(object = %asset.object, "open object reader");

        Ok(VaultFile {
            reader: Some(BufReader::new(file)),
            object: asset.object,
            vault: Arc::clone(self),
        })
    }

    fn close_object(&self, object: &ObjectId) {
        let mut state = self.state();
        state.opened.close(object);
        debug!(object = %object, "close object reader");
    }

    /// Drop the `storage`/`asset.path` reference. When the last reference
    /// goes, the object is deleted now, or when its last reader closes.
    ///
    /// # Panics
    ///
    /// Panics if the object was never referenced.
    pub fn unref(&self, storage: &StorageId, asset: &VaultAsset) -> VaultResult<usize> {
        let mut state = self.state();
        let remaining = state.refs.remove(&asset.object, storage, &asset.path)?;
        if remaining == 0 {
            self.remove_object(&mut state, asset.object);
        }
        Ok(remaining)
    }

    fn remove_object(&self, state: &mut VaultState, object: ObjectId) {
        let path = self.object_path(&object);
        if state.opened.is_open(&object) {
            debug!(object = %object, "object still open; deferring removal");
            state
                .opened
                .on_close(object, Box::new(move || remove_object_file(&path)));
        } else {
            remove_object_file(&path);
        }
    }

    /// Current number of references to `object`.
    pub fn refs_count(&self, object: &ObjectId) -> usize {
        self.state().refs.refs_count(object)
    }

    /// References to `object`, in insertion order.
    pub fn refs(&self, object: &ObjectId) -> Vec<Ref> {
        self.state().refs.refs(object).to_vec()
    }

    /// `true` if the object's bytes are physically present.
    pub fn contains(&self, object: &ObjectId) -> bool {
        self.object_path(object).is_file()
    }

    /// `true` if at least one reader holds `object` open.
    pub fn is_open(&self, object: &ObjectId) -> bool {
        self.state().opened.is_open(object)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("root", &self.config.root)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Read handle on a vault object.
///
/// Dropping it closes the file and releases the open-reader count, running
/// any deletion that was deferred while it was open.
pub struct VaultFile {
    reader: Option<BufReader<File>>,
    object: ObjectId,
    vault: Arc<Vault>,
}

impl VaultFile {
    pub fn object(&self) -> &ObjectId {
        &self.object
    }
}

impl Read for VaultFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for VaultFile {
    fn drop(&mut self) {
        self.reader.take();
        self.vault.close_object(&self.object);
    }
}
