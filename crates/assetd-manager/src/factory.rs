use std::sync::Arc;

use assetd_storage::{HashedStorage, HashedStorageConfig, MemoryStorage, PlainStorage, StorageOps};
use assetd_types::{StorageId, StorageType};
use assetd_vault::Vault;

use crate::config::ManagerConfig;

/// Build the backend for storage `id`, resolving `Default` to the configured
/// default type. Returns the backend and the concrete type it implements.
///
/// # Panics
///
/// Panics if the configured default is itself `Default`.
pub(crate) fn create_ops(
    config: &ManagerConfig,
    vault: &Arc<Vault>,
    id: &StorageId,
    requested: StorageType,
) -> (Box<dyn StorageOps>, StorageType) {
    match requested {
        StorageType::Default => {
            if config.default_storage_type == StorageType::Default {
                panic!("default_storage_type is set to default; refusing to recurse");
            }
            create_ops(config, vault, id, config.default_storage_type)
        }
        StorageType::Memory => (Box::new(MemoryStorage::new()), requested),
        StorageType::PlainFilesystem => (
            Box::new(PlainStorage::new(
                config.storages_root.join(id.as_str()),
                &config.temp_dir,
                config.dirs_mode,
            )),
            requested,
        ),
        StorageType::HashedFilesystem => (
            Box::new(HashedStorage::new(
                id.clone(),
                HashedStorageConfig {
                    root: config.storages_root.join(id.as_str()),
                    index_file: config.index_file.clone(),
                    temp_dir: config.temp_dir.clone(),
                    dirs_mode: config.dirs_mode,
                    files_mode: config.vault_mode,
                },
                Arc::clone(vault),
            )),
            requested,
        ),
    }
}
