use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BufferError, BufferResult};

/// Owns the buffers root directory and the staged files inside it.
#[derive(Debug)]
pub struct BuffersManager {
    root: PathBuf,
    files_mode: u32,
}

impl BuffersManager {
    /// Open the manager, creating `root` with `root_mode` if needed.
    pub fn new(root: impl Into<PathBuf>, root_mode: u32, files_mode: u32) -> BufferResult<Self> {
        let root = root.into();
        info!(root = %root.display(), files_mode = format_args!("{files_mode:o}"), "open buffers manager");
        assetd_fs::ensure_dir(&root, root_mode)?;
        Ok(Self { root, files_mode })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backing file of buffer `bid`. Does not check existence.
    pub fn abspath(&self, bid: &str) -> PathBuf {
        self.root.join(bid)
    }

    /// Fail with [`BufferError::NotFound`] unless `bid` is a staged buffer.
    pub fn ensure_buffer(&self, bid: &str) -> BufferResult<()> {
        if Uuid::parse_str(bid).is_err() || !self.abspath(bid).is_file() {
            return Err(BufferError::NotFound(bid.to_string()));
        }
        Ok(())
    }

    /// Allocate a new empty buffer and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the freshly generated id collides with an existing file.
    pub fn create(&self) -> BufferResult<String> {
        let bid = Uuid::new_v4().to_string();
        let path = self.abspath(&bid);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(self.files_mode)
            .open(&path)
        {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                panic!("buffer {bid} storage file already exists")
            }
            Err(e) => return Err(e.into()),
        }

        debug!(buffer = %bid, "created buffer");
        Ok(bid)
    }

    /// Append everything `source` yields to buffer `bid`. Returns the number
    /// of bytes appended.
    pub fn append(&self, bid: &str, source: &mut dyn Read) -> BufferResult<u64> {
        self.ensure_buffer(bid)?;
        let mut file = OpenOptions::new().append(true).open(self.abspath(bid))?;
        let copied = io::copy(source, &mut file)?;
        debug!(buffer = %bid, bytes = copied, "appended to buffer");
        Ok(copied)
    }

    /// Open buffer `bid` read-only.
    pub fn open(&self, bid: &str) -> BufferResult<File> {
        self.ensure_buffer(bid)?;
        match File::open(self.abspath(bid)) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BufferError::NotFound(bid.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove buffer `bid`.
    pub fn discard(&self, bid: &str) -> BufferResult<()> {
        self.ensure_buffer(bid)?;
        match fs::remove_file(self.abspath(bid)) {
            Ok(()) => {
                debug!(buffer = %bid, "discarded buffer");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BufferError::NotFound(bid.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
