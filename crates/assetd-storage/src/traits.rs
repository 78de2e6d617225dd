use std::fmt;
use std::io::{self, Read};

use assetd_types::AssetOpts;

use crate::error::StorageResult;

/// Asset backend for one storage.
///
/// Every implementation is constructed for a single storage and already knows
/// its root, temp directory and any shared collaborator (the vault). All
/// implementations must satisfy these invariants:
/// - `create_asset` is atomic: after it returns the asset is either fully
///   present or absent.
/// - A path is registered at most once; creating an existing path fails with
///   [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists) and
///   mutates nothing.
/// - Dropping the [`AssetReader`] returned by `read_asset` releases every
///   backend resource it holds.
pub trait StorageOps: Send + Sync {
    /// Prepare backend-local state (root directory, persisted index).
    fn initialize(&self) -> StorageResult<()>;

    /// Release everything this backend owns for the storage.
    fn destroy(&self) -> StorageResult<()>;

    /// Stream `reader` into a new asset at `path`.
    fn create_asset(&self, path: &str, reader: &mut dyn Read, opts: AssetOpts) -> StorageResult<()>;

    /// Open the asset at `path` for reading.
    fn read_asset(&self, path: &str) -> StorageResult<AssetReader>;

    /// Call `f` for every registered asset until it returns `false`.
    fn range(&self, f: &mut dyn FnMut(&str, AssetOpts) -> bool) -> StorageResult<()>;
}

/// Readable asset stream plus the asset's options.
///
/// Backend resources (open files, vault reader counts) are held by the inner
/// reader and released when this value is dropped, on every exit path.
pub struct AssetReader {
    reader: Box<dyn Read + Send>,
    opts: AssetOpts,
}

impl AssetReader {
    pub fn new(reader: impl Read + Send + 'static, opts: AssetOpts) -> Self {
        Self {
            reader: Box::new(reader),
            opts,
        }
    }

    pub fn opts(&self) -> AssetOpts {
        self.opts
    }

    /// Read the remaining bytes into memory, releasing the reader afterwards.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for AssetReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for AssetReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetReader").field("opts", &self.opts).finish()
    }
}
