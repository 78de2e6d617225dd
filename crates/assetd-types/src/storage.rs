use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Opaque identifier of one storage instance.
///
/// Generated as a random UUID when the storage is created and immutable
/// afterwards. Buffer ids use the same shape.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(String);

impl StorageId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id string (e.g. one taken from a request URL).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageId({})", self.0)
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StorageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Storage backend variant.
///
/// `Default` is an indirection resolved by the storages manager to the
/// configured default variant; it never names a live storage. Persisted as a
/// small integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StorageType {
    #[default]
    Default,
    Memory,
    PlainFilesystem,
    HashedFilesystem,
}

impl StorageType {
    /// Integer code used in the persisted registry.
    pub fn code(self) -> u8 {
        match self {
            StorageType::Default => 0,
            StorageType::Memory => 1,
            StorageType::PlainFilesystem => 2,
            StorageType::HashedFilesystem => 3,
        }
    }

    /// Name used on the request boundary.
    pub fn name(self) -> &'static str {
        match self {
            StorageType::Default => "default",
            StorageType::Memory => "memory",
            StorageType::PlainFilesystem => "filesystem",
            StorageType::HashedFilesystem => "hashed",
        }
    }
}

impl From<StorageType> for u8 {
    fn from(t: StorageType) -> Self {
        t.code()
    }
}

impl TryFrom<u8> for StorageType {
    type Error = TypeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StorageType::Default),
            1 => Ok(StorageType::Memory),
            2 => Ok(StorageType::PlainFilesystem),
            3 => Ok(StorageType::HashedFilesystem),
            other => Err(TypeError::InvalidStorageType(other)),
        }
    }
}

/// Unknown names resolve to [`StorageType::Default`].
impl FromStr for StorageType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "memory" => StorageType::Memory,
            "filesystem" => StorageType::PlainFilesystem,
            "hashed" => StorageType::HashedFilesystem,
            _ => StorageType::Default,
        })
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = StorageId::generate();
        let b = StorageId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn storage_id_serializes_as_plain_string() {
        let id = StorageId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn type_names_roundtrip() {
        for t in [
            StorageType::Default,
            StorageType::Memory,
            StorageType::PlainFilesystem,
            StorageType::HashedFilesystem,
        ] {
            assert_eq!(t.name().parse::<StorageType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_name_is_default() {
        assert_eq!("s3".parse::<StorageType>().unwrap(), StorageType::Default);
    }

    #[test]
    fn type_persists_as_integer() {
        let json = serde_json::to_string(&StorageType::HashedFilesystem).unwrap();
        assert_eq!(json, "3");
        let parsed: StorageType = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, StorageType::PlainFilesystem);
        assert!(serde_json::from_str::<StorageType>("9").is_err());
    }
}
