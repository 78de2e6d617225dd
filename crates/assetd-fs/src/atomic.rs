use std::fs::{File, Permissions};
use std::io::{self, BufReader, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{FsError, FsResult};

const TEMP_PREFIX: &str = ".assetd-";

/// Create a fresh temp file inside `temp_dir`.
///
/// The file is removed when the handle is dropped unless it is persisted.
pub fn new_temp_file(temp_dir: &Path) -> FsResult<NamedTempFile> {
    let tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(temp_dir)?;
    Ok(tmp)
}

/// Atomically replace `dest` with the bytes produced by `write`.
///
/// The content goes to a temp file in `temp_dir`, which is flushed, synced,
/// given permission bits `mode` and then renamed over `dest`. `temp_dir` must
/// be on the same filesystem as `dest`.
pub fn write_atomic<F>(dest: &Path, temp_dir: &Path, mode: u32, write: F) -> FsResult<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut tmp = new_temp_file(temp_dir)?;

    let result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
        drop(writer);
        tmp.as_file().sync_all()?;
        tmp.as_file().set_permissions(Permissions::from_mode(mode))
    })();

    if let Err(e) = result {
        warn!(dest = %dest.display(), temp = %tmp.path().display(), error = %e, "atomic write failed; removing temp file");
        return Err(e.into());
    }

    tmp.persist(dest).map_err(|e| {
        warn!(dest = %dest.display(), error = %e.error, "rename into place failed");
        FsError::Io(e.error)
    })?;

    debug!(dest = %dest.display(), "atomic write complete");
    Ok(())
}

/// Atomically replace `dest` with the JSON encoding of `value`.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    dest: &Path,
    temp_dir: &Path,
    mode: u32,
    value: &T,
) -> FsResult<()> {
    let data = serde_json::to_vec(value).map_err(|e| FsError::Serialization {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_atomic(dest, temp_dir, mode, |w| w.write_all(&data))
}

/// Load a JSON document. Returns `Ok(None)` if `path` does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> FsResult<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no file; skip loading");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        FsError::Serialization {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    Ok(Some(value))
}
