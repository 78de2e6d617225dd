use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, RwLock};

use assetd_types::AssetOpts;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::traits::{AssetReader, StorageOps};

struct MemoryAsset {
    opts: AssetOpts,
    data: Arc<[u8]>,
}

/// In-process asset backend.
///
/// Payloads are buffered fully before being registered, so a failed copy
/// never leaves a partial asset behind. Nothing survives a restart.
pub struct MemoryStorage {
    assets: RwLock<HashMap<String, MemoryAsset>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of assets currently stored.
    pub fn len(&self) -> usize {
        self.assets.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().expect("lock poisoned").is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageOps for MemoryStorage {
    fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        self.assets.write().expect("lock poisoned").clear();
        Ok(())
    }

    fn create_asset(&self, path: &str, reader: &mut dyn Read, opts: AssetOpts) -> StorageResult<()> {
        if self.assets.read().expect("lock poisoned").contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut assets = self.assets.write().expect("lock poisoned");
        if assets.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        debug!(path, size = data.len(), opts = %opts, "store memory asset");
        assets.insert(
            path.to_string(),
            MemoryAsset {
                opts,
                data: Arc::from(data),
            },
        );
        Ok(())
    }

    fn read_asset(&self, path: &str) -> StorageResult<AssetReader> {
        let assets = self.assets.read().expect("lock poisoned");
        let asset = assets
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(AssetReader::new(Cursor::new(Arc::clone(&asset.data)), asset.opts))
    }

    fn range(&self, f: &mut dyn FnMut(&str, AssetOpts) -> bool) -> StorageResult<()> {
        let snapshot: Vec<(String, AssetOpts)> = self
            .assets
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(path, asset)| (path.clone(), asset.opts))
            .collect();

        for (path, opts) in &snapshot {
            if !f(path, *opts) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_read() {
        let store = MemoryStorage::new();
        store
            .create_asset("a", &mut &b"hello"[..], AssetOpts::with_mode(0o600))
            .unwrap();
        let reader = store.read_asset("a").unwrap();
        assert_eq!(reader.opts().mode, 0o600);
        assert_eq!(reader.into_bytes().unwrap(), b"hello");
    }

    #[test]
    fn duplicate_path_is_conflict_and_keeps_original() {
        let store = MemoryStorage::new();
        store
            .create_asset("a", &mut &b"first"[..], AssetOpts::with_mode(0o644))
            .unwrap();
        let err = store
            .create_asset("a", &mut &b"second"[..], AssetOpts::with_mode(0o600))
            .unwrap_err();
        assert!(err.is_conflict());

        let reader = store.read_asset("a").unwrap();
        assert_eq!(reader.opts().mode, 0o644);
        assert_eq!(reader.into_bytes().unwrap(), b"first");
    }

    #[test]
    fn missing_asset_is_not_found() {
        let store = MemoryStorage::new();
        assert!(store.read_asset("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn range_stops_when_callback_returns_false() {
        let store = MemoryStorage::new();
        for i in 0..5 {
            store
                .create_asset(&format!("p{i}"), &mut &b"x"[..], AssetOpts::default())
                .unwrap();
        }
        let mut seen = 0;
        store
            .range(&mut |_, _| {
                seen += 1;
                seen < 2
            })
            .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn destroy_drops_everything() {
        let store = MemoryStorage::new();
        store
            .create_asset("a", &mut &b"x"[..], AssetOpts::default())
            .unwrap();
        store.destroy().unwrap();
        assert!(store.is_empty());
    }
}
