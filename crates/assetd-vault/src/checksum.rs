use std::io::{self, Write};

use assetd_types::ObjectId;
use sha2::{Digest, Sha256};

/// Writer adapter that computes the SHA-256 [`ObjectId`] of everything
/// written through it while forwarding the bytes to `inner`.
pub struct ChecksumWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes forwarded so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Consume the adapter, returning the inner writer and the digest.
    pub fn finish(self) -> (W, ObjectId) {
        let id = ObjectId::from_hash(self.hasher.finalize().into());
        (self.inner, id)
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
