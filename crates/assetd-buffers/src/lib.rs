//! Staging area for streamed uploads.
//!
//! A buffer is a plain file named by a UUID under the buffers root. Callers
//! create one, append chunks to it, and finally either discard it or commit
//! it into a storage as a named asset.

pub mod error;
pub mod manager;

pub use error::{BufferError, BufferResult};
pub use manager::BuffersManager;
