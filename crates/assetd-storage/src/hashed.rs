use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use assetd_types::{AssetOpts, ObjectId, StorageId};
use assetd_vault::{ChecksumWriter, Vault, VaultAsset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::traits::{AssetReader, StorageOps};

/// One indexed asset: the logical path, the vault object holding its bytes
/// and its options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub path: String,
    pub object: ObjectId,
    pub opts: AssetOpts,
}

impl AssetRecord {
    fn vault_asset(&self) -> VaultAsset {
        VaultAsset {
            object: self.object,
            path: self.path.clone(),
        }
    }
}

/// Locations and permission bits for a hashed storage.
#[derive(Clone, Debug)]
pub struct HashedStorageConfig {
    /// Per-storage directory holding the asset index.
    pub root: PathBuf,
    /// File name of the asset index inside `root`.
    pub index_file: String,
    /// Staging directory on the vault's filesystem.
    pub temp_dir: PathBuf,
    pub dirs_mode: u32,
    /// Mode of the asset index file.
    pub files_mode: u32,
}

/// Vault-backed asset backend.
///
/// Asset bytes live in the shared [`Vault`], deduplicated by SHA-256. This
/// backend only keeps a path -> object index, rewritten atomically on every
/// mutation. Lock order is index then vault.
pub struct HashedStorage {
    storage_id: StorageId,
    config: HashedStorageConfig,
    vault: Arc<Vault>,
    index: Mutex<BTreeMap<String, AssetRecord>>,
}

impl HashedStorage {
    pub fn new(storage_id: StorageId, config: HashedStorageConfig, vault: Arc<Vault>) -> Self {
        Self {
            storage_id,
            config,
            vault,
            index: Mutex::new(BTreeMap::new()),
        }
    }

    fn index(&self) -> MutexGuard<'_, BTreeMap<String, AssetRecord>> {
        self.index.lock().expect("index mutex poisoned")
    }

    fn index_path(&self) -> PathBuf {
        self.config.root.join(&self.config.index_file)
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Indexed record for `path`, if any.
    pub fn record(&self, path: &str) -> Option<AssetRecord> {
        self.index().get(path).cloned()
    }

    fn store_index(&self, index: &BTreeMap<String, AssetRecord>) -> StorageResult<()> {
        assetd_fs::write_json_atomic(
            &self.index_path(),
            &self.config.temp_dir,
            self.config.files_mode,
            index,
        )?;
        Ok(())
    }

    /// Stream `reader` into a fresh temp file, hashing as it goes.
    fn stage(&self, reader: &mut dyn Read) -> StorageResult<(tempfile::NamedTempFile, ObjectId, u64)> {
        let mut tmp = assetd_fs::new_temp_file(&self.config.temp_dir)?;
        let (object, size) = {
            let mut writer = ChecksumWriter::new(BufWriter::new(tmp.as_file_mut()));
            io::copy(reader, &mut writer)?;
            writer.flush()?;
            let size = writer.bytes_written();
            let (_, object) = writer.finish();
            (object, size)
        };
        tmp.as_file().sync_all()?;
        Ok((tmp, object, size))
    }
}

impl StorageOps for HashedStorage {
    fn initialize(&self) -> StorageResult<()> {
        assetd_fs::ensure_dir(&self.config.root, self.config.dirs_mode)?;
        let loaded: Option<BTreeMap<String, AssetRecord>> = assetd_fs::read_json(&self.index_path())?;
        let mut index = self.index();
        *index = loaded.unwrap_or_default();
        debug!(storage = %self.storage_id, assets = index.len(), "loaded asset index");
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        // Persist the shrunken index before each unref: an interrupted
        // destroy may leak a reference but never lists a released asset.
        let mut index = self.index();
        while let Some((path, record)) = index.pop_first() {
            if let Err(e) = self.store_index(&index) {
                index.insert(path, record);
                return Err(e);
            }
            if let Err(e) = self.vault.unref(&self.storage_id, &record.vault_asset()) {
                index.insert(path.clone(), record);
                if let Err(store_err) = self.store_index(&index) {
                    warn!(storage = %self.storage_id, path = %path, error = %store_err, "failed to restore index after unref failure");
                }
                return Err(e.into());
            }
        }

        match fs::remove_dir_all(&self.config.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(storage = %self.storage_id, "hashed storage destroyed");
        Ok(())
    }

    fn create_asset(&self, path: &str, reader: &mut dyn Read, opts: AssetOpts) -> StorageResult<()> {
        if self.index().contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        let (tmp, object, size) = self.stage(reader)?;

        let mut index = self.index();
        if index.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        let record = AssetRecord {
            path: path.to_string(),
            object,
            opts,
        };
        let added = self.vault.put(&self.storage_id, &record.vault_asset(), tmp)?;

        index.insert(path.to_string(), record.clone());
        if let Err(e) = self.store_index(&index) {
            index.remove(path);
            if let Err(unref_err) = self.vault.unref(&self.storage_id, &record.vault_asset()) {
                warn!(storage = %self.storage_id, path, error = %unref_err, "failed to release object after index write failure");
            }
            return Err(e);
        }

        debug!(storage = %self.storage_id, path, object = %object, size, refs = added.count(), "stored hashed asset");
        Ok(())
    }

    fn read_asset(&self, path: &str) -> StorageResult<AssetReader> {
        let index = self.index();
        let record = index
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        let file = self.vault.open_object(&record.vault_asset())?;
        Ok(AssetReader::new(file, record.opts))
    }

    fn range(&self, f: &mut dyn FnMut(&str, AssetOpts) -> bool) -> StorageResult<()> {
        let snapshot: Vec<(String, AssetOpts)> = self
            .index()
            .values()
            .map(|r| (r.path.clone(), r.opts))
            .collect();
        for (path, opts) in &snapshot {
            if !f(path, *opts) {
                break;
            }
        }
        Ok(())
    }
}
