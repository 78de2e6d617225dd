use std::collections::HashMap;
use std::io::BufReader;
use std::sync::{Arc, Mutex, MutexGuard};

use assetd_buffers::BuffersManager;
use assetd_storage::Storage;
use assetd_types::{AssetOpts, StorageId, StorageType};
use assetd_vault::Vault;
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::error::{ManagerError, ManagerResult};
use crate::factory::create_ops;
use crate::registry;

/// Owner of every live storage, the shared vault and the buffers manager.
///
/// Construct one per process and share it. The registry is rewritten
/// atomically after every create, destroy and reattachment cleanup.
pub struct StoragesManager {
    config: ManagerConfig,
    vault: Arc<Vault>,
    buffers: BuffersManager,
    storages: Mutex<HashMap<StorageId, Arc<Storage>>>,
}

impl StoragesManager {
    /// Open the manager and reattach to every persisted non-memory storage.
    pub fn open(config: ManagerConfig) -> ManagerResult<Self> {
        config.validate()?;
        info!(
            registry = %config.registry_file.display(),
            default_type = %config.default_storage_type,
            "open storages manager"
        );

        assetd_fs::ensure_dir(&config.temp_dir, config.dirs_mode)?;
        if let Some(parent) = config.registry_file.parent() {
            if !parent.as_os_str().is_empty() {
                assetd_fs::ensure_dir(parent, config.dirs_mode)?;
            }
        }

        let vault = Arc::new(Vault::open(config.vault_config())?);
        let buffers = BuffersManager::new(&config.buffers_root, config.dirs_mode, config.buffers_mode)?;

        let manager = Self {
            config,
            vault,
            buffers,
            storages: Mutex::new(HashMap::new()),
        };
        manager.reattach()?;
        Ok(manager)
    }

    fn storages(&self) -> MutexGuard<'_, HashMap<StorageId, Arc<Storage>>> {
        self.storages.lock().expect("storages mutex poisoned")
    }

    fn reattach(&self) -> ManagerResult<()> {
        let records = registry::load(&self.config.registry_file)?;
        let mut storages = self.storages();
        let mut dropped = 0;

        for (id, record) in records {
            if record.storage_type == StorageType::Memory {
                info!(storage = %id, "dropping memory storage from registry");
                dropped += 1;
                continue;
            }

            let (ops, storage_type) = create_ops(&self.config, &self.vault, &id, record.storage_type);
            let storage = Storage::new(id.clone(), storage_type, ops);
            storage.initialize()?;
            info!(storage = %storage.name(), "reattached storage");
            storages.insert(id, Arc::new(storage));
        }

        if dropped > 0 {
            registry::store(&self.config, &storages)?;
        }
        Ok(())
    }

    /// Create, initialize and register a new storage.
    ///
    /// # Panics
    ///
    /// Panics if `Default` is requested while the configured default is also
    /// `Default`.
    pub fn create(&self, storage_type: StorageType) -> ManagerResult<Arc<Storage>> {
        let id = StorageId::generate();
        let (ops, resolved) = create_ops(&self.config, &self.vault, &id, storage_type);
        let storage = Arc::new(Storage::new(id.clone(), resolved, ops));

        storage.initialize()?;

        let mut storages = self.storages();
        storages.insert(id.clone(), Arc::clone(&storage));
        if let Err(e) = registry::store(&self.config, &storages) {
            storages.remove(&id);
            if let Err(destroy_err) = storage.destroy() {
                warn!(storage = %storage.name(), error = %destroy_err, "cleanup of unregistered storage failed");
            }
            return Err(e);
        }

        info!(storage = %storage.name(), "created storage");
        Ok(storage)
    }

    /// Destroy storage `id` and drop it from the registry.
    ///
    /// A backend or registry failure leaves the storage registered so the
    /// call can be retried.
    pub fn destroy(&self, id: &StorageId) -> ManagerResult<()> {
        let mut storages = self.storages();
        let storage = storages
            .get(id)
            .cloned()
            .ok_or_else(|| ManagerError::StorageNotFound(id.clone()))?;

        info!(storage = %storage.name(), "destroy storage");
        storage.destroy()?;

        storages.remove(id);
        if let Err(e) = registry::store(&self.config, &storages) {
            warn!(storage = %storage.name(), error = %e, "registry write failed; storage stays registered");
            storages.insert(id.clone(), storage);
            return Err(e);
        }
        Ok(())
    }

    /// Live storage `id`.
    pub fn get(&self, id: &StorageId) -> ManagerResult<Arc<Storage>> {
        self.storages().get(id).cloned().ok_or_else(|| {
            debug!(storage = %id, "unknown storage id");
            ManagerError::StorageNotFound(id.clone())
        })
    }

    /// Ids of every live storage.
    pub fn ids(&self) -> Vec<StorageId> {
        let mut ids: Vec<StorageId> = self.storages().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Commit staged buffer `bid` into storage `sid` as asset `path`.
    ///
    /// The buffer is left in place; discarding it is the caller's choice.
    pub fn create_storage_asset_from_buffer(
        &self,
        sid: &StorageId,
        path: &str,
        bid: &str,
        opts: AssetOpts,
    ) -> ManagerResult<()> {
        let storage = self.get(sid)?;
        let file = self.buffers.open(bid)?;
        debug!(storage = %storage.name(), buffer = bid, path, "commit buffer as asset");
        storage.create_asset(path, &mut BufReader::new(file), opts)?;
        Ok(())
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    pub fn buffers(&self) -> &BuffersManager {
        &self.buffers
    }
}

impl std::fmt::Debug for StoragesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragesManager")
            .field("registry", &self.config.registry_file)
            .field("storages", &self.storages().len())
            .finish()
    }
}
