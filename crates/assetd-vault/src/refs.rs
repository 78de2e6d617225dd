//! Persistent reference database: object -> list of (storage, path).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use assetd_types::{ObjectId, StorageId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VaultResult;

/// One (storage, asset path) location that depends on an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub storage_id: StorageId,
    pub path: String,
}

/// Outcome of [`RefsDb::add`]. Both variants carry the object's current
/// reference count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefAdd {
    /// A new reference was recorded.
    Added(usize),
    /// The exact (storage, path) pair was already recorded.
    Exists(usize),
}

impl RefAdd {
    pub fn count(self) -> usize {
        match self {
            RefAdd::Added(n) | RefAdd::Exists(n) => n,
        }
    }
}

/// Reference database.
///
/// Serialized as one JSON document `{ "<object hex>": [ {storage_id, path}, ... ] }`,
/// rewritten atomically after every mutation and loaded once on open. If the
/// rewrite fails the in-memory mutation is undone, so memory never runs ahead
/// of what is on disk.
#[derive(Debug)]
pub struct RefsDb {
    dbpath: PathBuf,
    temp_dir: PathBuf,
    mode: u32,
    values: BTreeMap<ObjectId, Vec<Ref>>,
}

impl RefsDb {
    /// Open the database at `dbpath`, loading it if the file exists.
    pub fn open(dbpath: &Path, temp_dir: &Path, mode: u32) -> VaultResult<Self> {
        debug!(path = %dbpath.display(), "load references database");
        let values = assetd_fs::read_json(dbpath)?.unwrap_or_default();
        Ok(Self {
            dbpath: dbpath.to_path_buf(),
            temp_dir: temp_dir.to_path_buf(),
            mode,
            values,
        })
    }

    fn store(&self) -> VaultResult<()> {
        debug!(path = %self.dbpath.display(), "store references database");
        assetd_fs::write_json_atomic(&self.dbpath, &self.temp_dir, self.mode, &self.values)?;
        Ok(())
    }

    /// Record that `storage_id`/`path` references `object`.
    pub fn add(&mut self, object: ObjectId, storage_id: &StorageId, path: &str) -> VaultResult<RefAdd> {
        let refs = self.values.entry(object).or_default();
        if refs
            .iter()
            .any(|r| r.storage_id == *storage_id && r.path == path)
        {
            return Ok(RefAdd::Exists(refs.len()));
        }

        refs.push(Ref {
            storage_id: storage_id.clone(),
            path: path.to_string(),
        });
        let count = refs.len();

        if let Err(e) = self.store() {
            if let Some(refs) = self.values.get_mut(&object) {
                refs.pop();
                if refs.is_empty() {
                    self.values.remove(&object);
                }
            }
            return Err(e);
        }

        debug!(object = %object, storage = %storage_id, path, refs = count, "reference added");
        Ok(RefAdd::Added(count))
    }

    /// Drop the `storage_id`/`path` reference to `object` and return the
    /// remaining count. An object whose list empties is removed entirely.
    ///
    /// # Panics
    ///
    /// Panics if `object` has no record: unreferencing an object that was
    /// never referenced is a caller bug.
    pub fn remove(&mut self, object: &ObjectId, storage_id: &StorageId, path: &str) -> VaultResult<usize> {
        let refs = self.values.get_mut(object).unwrap_or_else(|| {
            panic!("no refs record for object {object}; called by storage {storage_id} for asset {path}")
        });

        let Some(idx) = refs
            .iter()
            .position(|r| r.storage_id == *storage_id && r.path == path)
        else {
            return Ok(refs.len());
        };

        let removed = refs.remove(idx);
        let count = refs.len();
        if count == 0 {
            self.values.remove(object);
        }

        if let Err(e) = self.store() {
            self.values.entry(*object).or_default().insert(idx, removed);
            return Err(e);
        }

        debug!(object = %object, storage = %storage_id, path, refs = count, "reference removed");
        Ok(count)
    }

    /// Point-in-time reference count, zero if absent.
    pub fn refs_count(&self, object: &ObjectId) -> usize {
        self.values.get(object).map_or(0, Vec::len)
    }

    /// References to `object`, in insertion order.
    pub fn refs(&self, object: &ObjectId) -> &[Ref] {
        self.values.get(object).map_or(&[], Vec::as_slice)
    }

    /// Number of objects with at least one reference.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db(dir: &Path) -> RefsDb {
        RefsDb::open(&dir.join("refs.db"), dir, 0o600).unwrap()
    }

    #[test]
    fn add_reports_new_and_existing_refs() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_db(dir.path());
        let obj = ObjectId::from_bytes(b"hello");
        let s1 = StorageId::new("s1");

        assert_eq!(db.add(obj, &s1, "a").unwrap(), RefAdd::Added(1));
        assert_eq!(db.add(obj, &s1, "a").unwrap(), RefAdd::Exists(1));
        assert_eq!(db.add(obj, &s1, "b").unwrap(), RefAdd::Added(2));
        assert_eq!(db.add(obj, &StorageId::new("s2"), "a").unwrap(), RefAdd::Added(3));
        assert_eq!(db.refs_count(&obj), 3);
        assert_eq!(db.refs(&obj)[0].path, "a");
    }

    #[test]
    fn remove_drops_entry_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_db(dir.path());
        let obj = ObjectId::from_bytes(b"hello");
        let s1 = StorageId::new("s1");

        db.add(obj, &s1, "a").unwrap();
        db.add(obj, &s1, "b").unwrap();
        assert_eq!(db.remove(&obj, &s1, "a").unwrap(), 1);
        assert_eq!(db.remove(&obj, &s1, "b").unwrap(), 0);
        assert_eq!(db.refs_count(&obj), 0);
        assert!(db.is_empty());
    }

    #[test]
    fn remove_of_unknown_pair_keeps_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_db(dir.path());
        let obj = ObjectId::from_bytes(b"hello");
        db.add(obj, &StorageId::new("s1"), "a").unwrap();
        assert_eq!(db.remove(&obj, &StorageId::new("s9"), "a").unwrap(), 1);
    }

    #[test]
    #[should_panic(expected = "no refs record")]
    fn remove_of_unknown_object_panics() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = open_db(dir.path());
        let _ = db.remove(&ObjectId::from_bytes(b"x"), &StorageId::new("s1"), "a");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let obj = ObjectId::from_bytes(b"persist");
        {
            let mut db = open_db(dir.path());
            db.add(obj, &StorageId::new("s1"), "a").unwrap();
            db.add(obj, &StorageId::new("s2"), "b").unwrap();
        }
        let db = open_db(dir.path());
        assert_eq!(db.refs_count(&obj), 2);
        assert_eq!(db.refs(&obj)[1].storage_id, StorageId::new("s2"));
    }

    #[test]
    fn failed_store_rolls_back_add() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("temp");
        std::fs::create_dir(&temp).unwrap();
        let mut db = RefsDb::open(&dir.path().join("refs.db"), &temp, 0o600).unwrap();
        let obj = ObjectId::from_bytes(b"rollback");
        db.add(obj, &StorageId::new("s1"), "a").unwrap();

        std::fs::remove_dir(&temp).unwrap();
        assert!(db.add(obj, &StorageId::new("s1"), "b").is_err());
        assert_eq!(db.refs_count(&obj), 1);
        assert!(db.remove(&obj, &StorageId::new("s1"), "a").is_err());
        assert_eq!(db.refs_count(&obj), 1);
    }
}
