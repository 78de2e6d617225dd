use std::path::{Path, PathBuf};

use assetd_types::{ObjectId, StorageType};
use assetd_vault::{VaultConfig, DEFAULT_VAULT_DEPTH};
use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};

/// Workspace used when no configuration names one.
pub const DEFAULT_WORKSPACE: &str = ".assetd";

/// Every option the storages manager, its backends, the vault and the
/// buffers manager recognise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Concrete type used when a caller asks for `default`.
    #[serde(with = "storage_type_name")]
    pub default_storage_type: StorageType,
    /// Storage registry document.
    pub registry_file: PathBuf,
    /// Parent of every per-storage root directory.
    pub storages_root: PathBuf,
    /// Staging directory for atomic writes. Must share a filesystem with the
    /// storages and vault roots.
    pub temp_dir: PathBuf,
    pub dirs_mode: u32,
    pub vault_root: PathBuf,
    /// Mode of vault objects and of every metadata document.
    pub vault_mode: u32,
    pub vault_depth: usize,
    pub refs_file: String,
    /// Per-storage asset index file name for hashed storages.
    pub index_file: String,
    pub buffers_root: PathBuf,
    pub buffers_mode: u32,
}

impl ManagerConfig {
    /// Lay every root out under one workspace directory.
    pub fn prefixed(workspace: impl AsRef<Path>) -> Self {
        let ws = workspace.as_ref();
        Self {
            default_storage_type: StorageType::Memory,
            registry_file: ws.join("storages.json"),
            storages_root: ws.join("storages"),
            temp_dir: ws.join("temp"),
            dirs_mode: 0o700,
            vault_root: ws.join("vault"),
            vault_mode: 0o600,
            vault_depth: DEFAULT_VAULT_DEPTH,
            refs_file: "refs.db".into(),
            index_file: "metadata.json".into(),
            buffers_root: ws.join("buffers"),
            buffers_mode: 0o600,
        }
    }

    /// Move every root under `workspace`, keeping all other settings.
    pub fn with_workspace(self, workspace: impl AsRef<Path>) -> Self {
        let laid_out = Self::prefixed(workspace);
        Self {
            registry_file: laid_out.registry_file,
            storages_root: laid_out.storages_root,
            temp_dir: laid_out.temp_dir,
            vault_root: laid_out.vault_root,
            buffers_root: laid_out.buffers_root,
            ..self
        }
    }

    /// Reject settings that would make the manager misbehave at runtime.
    pub fn validate(&self) -> ManagerResult<()> {
        if self.default_storage_type == StorageType::Default {
            return Err(ManagerError::Config(
                "default_storage_type must name a concrete storage type".into(),
            ));
        }
        if self.vault_depth >= ObjectId::HEX_LEN / 2 {
            return Err(ManagerError::Config(format!(
                "vault_depth {} leaves no room for object file names",
                self.vault_depth
            )));
        }
        if self.refs_file.is_empty() || self.index_file.is_empty() {
            return Err(ManagerError::Config("metadata file names must not be empty".into()));
        }
        Ok(())
    }

    pub fn vault_config(&self) -> VaultConfig {
        VaultConfig {
            root: self.vault_root.clone(),
            depth: self.vault_depth,
            dirs_mode: self.dirs_mode,
            files_mode: self.vault_mode,
            refs_file: self.refs_file.clone(),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::prefixed(DEFAULT_WORKSPACE)
    }
}

/// Storage types appear by name in configuration files.
mod storage_type_name {
    use assetd_types::StorageType;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &StorageType, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(t.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<StorageType, D::Error> {
        let name = String::deserialize(d)?;
        // Infallible: unknown names resolve to `default` and fail validation.
        Ok(name.parse().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_layout() {
        let c = ManagerConfig::prefixed("/ws");
        assert_eq!(c.registry_file, PathBuf::from("/ws/storages.json"));
        assert_eq!(c.vault_root, PathBuf::from("/ws/vault"));
        assert_eq!(c.storages_root, PathBuf::from("/ws/storages"));
        assert_eq!(c.temp_dir, PathBuf::from("/ws/temp"));
        assert_eq!(c.buffers_root, PathBuf::from("/ws/buffers"));
        assert_eq!(c.default_storage_type, StorageType::Memory);
        assert_eq!(c.dirs_mode, 0o700);
        assert_eq!(c.vault_depth, 2);
        c.validate().unwrap();
    }

    #[test]
    fn with_workspace_moves_roots_only() {
        let mut c = ManagerConfig::prefixed("/a");
        c.vault_depth = 4;
        c.default_storage_type = StorageType::HashedFilesystem;
        let moved = c.with_workspace("/b");
        assert_eq!(moved.vault_root, PathBuf::from("/b/vault"));
        assert_eq!(moved.temp_dir, PathBuf::from("/b/temp"));
        assert_eq!(moved.vault_depth, 4);
        assert_eq!(moved.default_storage_type, StorageType::HashedFilesystem);
    }

    #[test]
    fn default_of_default_is_rejected() {
        let mut c = ManagerConfig::default();
        c.default_storage_type = StorageType::Default;
        assert!(matches!(c.validate(), Err(ManagerError::Config(_))));
    }

    #[test]
    fn oversized_depth_is_rejected() {
        let mut c = ManagerConfig::default();
        c.vault_depth = 32;
        assert!(c.validate().is_err());
    }

    #[test]
    fn toml_uses_type_names_and_fills_defaults() {
        let c: ManagerConfig = toml::from_str(
            r#"
            default_storage_type = "hashed"
            vault_depth = 3
            "#,
        )
        .unwrap();
        assert_eq!(c.default_storage_type, StorageType::HashedFilesystem);
        assert_eq!(c.vault_depth, 3);
        assert_eq!(c.refs_file, "refs.db");

        let unknown: ManagerConfig = toml::from_str(r#"default_storage_type = "tape""#).unwrap();
        assert!(unknown.validate().is_err());
    }
}
