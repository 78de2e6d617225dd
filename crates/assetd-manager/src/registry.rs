//! Persisted storage registry: `{ "<id>": { "id": "<id>", "type": <code> } }`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use assetd_storage::Storage;
use assetd_types::{StorageId, StorageType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ManagerConfig;
use crate::error::ManagerResult;

/// Runtime-independent part of a storage, as written to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: StorageId,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
}

pub(crate) fn load(path: &Path) -> ManagerResult<BTreeMap<StorageId, StorageRecord>> {
    debug!(path = %path.display(), "load storage registry");
    Ok(assetd_fs::read_json(path)?.unwrap_or_default())
}

pub(crate) fn store(config: &ManagerConfig, storages: &HashMap<StorageId, Arc<Storage>>) -> ManagerResult<()> {
    let records: BTreeMap<&StorageId, StorageRecord> = storages
        .values()
        .map(|s| {
            (
                s.id(),
                StorageRecord {
                    id: s.id().clone(),
                    storage_type: s.storage_type(),
                },
            )
        })
        .collect();

    debug!(path = %config.registry_file.display(), storages = records.len(), "store storage registry");
    assetd_fs::write_json_atomic(&config.registry_file, &config.temp_dir, config.vault_mode, &records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_shape() {
        let record = StorageRecord {
            id: StorageId::new("abc"),
            storage_type: StorageType::HashedFilesystem,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":"abc","type":3}"#);
    }

    #[test]
    fn missing_registry_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("storages.json")).unwrap().is_empty());
    }
}
