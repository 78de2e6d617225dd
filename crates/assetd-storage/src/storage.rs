use std::fmt;
use std::io::Read;

use assetd_types::{AssetEntry, AssetOpts, StorageId, StorageType};
use tracing::debug;

use crate::error::StorageResult;
use crate::traits::{AssetReader, StorageOps};

/// Handle on one live storage: its identity plus the backend that holds the
/// bytes.
pub struct Storage {
    id: StorageId,
    storage_type: StorageType,
    ops: Box<dyn StorageOps>,
}

impl Storage {
    pub fn new(id: StorageId, storage_type: StorageType, ops: Box<dyn StorageOps>) -> Self {
        Self {
            id,
            storage_type,
            ops,
        }
    }

    pub fn id(&self) -> &StorageId {
        &self.id
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    /// Log-friendly name, `"<id>(<type code>)"`.
    pub fn name(&self) -> String {
        format!("{}({})", self.id, self.storage_type.code())
    }

    pub fn initialize(&self) -> StorageResult<()> {
        self.ops.initialize()
    }

    pub fn destroy(&self) -> StorageResult<()> {
        self.ops.destroy()
    }

    pub fn create_asset(&self, path: &str, reader: &mut dyn Read, opts: AssetOpts) -> StorageResult<()> {
        debug!(storage = %self.name(), path, opts = %opts, "create asset");
        self.ops.create_asset(path, reader, opts)
    }

    pub fn read_asset(&self, path: &str) -> StorageResult<AssetReader> {
        debug!(storage = %self.name(), path, "read asset");
        self.ops.read_asset(path)
    }

    pub fn range(&self, f: &mut dyn FnMut(&str, AssetOpts) -> bool) -> StorageResult<()> {
        self.ops.range(f)
    }

    /// Every asset with its properties.
    pub fn list(&self) -> StorageResult<Vec<AssetEntry>> {
        let mut entries = Vec::new();
        self.ops.range(&mut |path, opts| {
            entries.push(AssetEntry::new(path, opts));
            true
        })?;
        Ok(entries)
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("id", &self.id)
            .field("type", &self.storage_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[test]
    fn name_combines_id_and_type_code() {
        let s = Storage::new(
            StorageId::new("abc"),
            StorageType::Memory,
            Box::new(MemoryStorage::new()),
        );
        assert_eq!(s.name(), "abc(1)");
    }

    #[test]
    fn list_reports_mode_as_decimal_string() {
        let s = Storage::new(
            StorageId::generate(),
            StorageType::Memory,
            Box::new(MemoryStorage::new()),
        );
        s.create_asset("a", &mut &b"x"[..], AssetOpts::with_mode(0o644))
            .unwrap();
        let listed = s.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "a");
        assert_eq!(listed[0].properties["mode"], "420");

        let json = serde_json::to_value(&listed).unwrap();
        assert_eq!(json[0]["properties"]["mode"], "420");
    }
}
