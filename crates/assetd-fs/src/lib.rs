//! Filesystem helpers shared by every disk-backed assetd component.
//!
//! - [`ensure_dir`] -- idempotent recursive directory creation with explicit
//!   permission bits
//! - [`write_atomic`] / [`write_json_atomic`] -- write into a fresh temp file,
//!   flush, chmod, then rename over the destination. Readers never observe a
//!   partially written destination; on any failure the temp file is removed
//!   and the previous destination (or its absence) is left untouched.
//! - [`read_json`] -- load a JSON document if it exists

pub mod atomic;
pub mod dir;
pub mod error;

pub use atomic::{new_temp_file, read_json, write_atomic, write_json_atomic};
pub use dir::ensure_dir;
pub use error::{FsError, FsResult};
