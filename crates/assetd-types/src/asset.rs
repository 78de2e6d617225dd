use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Mode applied when a caller does not specify one.
pub const DEFAULT_ASSET_MODE: u32 = 0o644;

/// Per-asset options. Round-trips through every backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetOpts {
    /// Permission bits.
    pub mode: u32,
}

impl AssetOpts {
    pub fn with_mode(mode: u32) -> Self {
        Self { mode }
    }

    /// Parse permission bits the way the request boundary receives them.
    ///
    /// Accepts `0o`/`0x`/`0b` prefixes, a bare leading `0` for octal, and
    /// plain decimal otherwise.
    pub fn parse_mode(input: &str) -> Result<u32, TypeError> {
        let s = input.trim();
        let invalid = || TypeError::InvalidMode(input.to_string());
        let parsed = if let Some(rest) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
            u32::from_str_radix(rest, 8)
        } else if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u32::from_str_radix(rest, 16)
        } else if let Some(rest) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
            u32::from_str_radix(rest, 2)
        } else if s.len() > 1 && s.starts_with('0') {
            u32::from_str_radix(&s[1..], 8)
        } else {
            s.parse::<u32>()
        };
        let mode = parsed.map_err(|_| invalid())?;
        if mode > 0o7777 {
            return Err(invalid());
        }
        Ok(mode)
    }
}

impl Default for AssetOpts {
    fn default() -> Self {
        Self {
            mode: DEFAULT_ASSET_MODE,
        }
    }
}

impl fmt::Display for AssetOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ mode: 0{:03o}({}) }}", self.mode, self.mode)
    }
}

/// One row of a storage listing: `{"path": ..., "properties": {"mode": "420"}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub path: String,
    pub properties: BTreeMap<String, String>,
}

impl AssetEntry {
    pub fn new(path: impl Into<String>, opts: AssetOpts) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("mode".to_string(), opts.mode.to_string());
        Self {
            path: path.into(),
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_0644() {
        assert_eq!(AssetOpts::default().mode, 0o644);
    }

    #[test]
    fn parse_mode_prefixes() {
        assert_eq!(AssetOpts::parse_mode("0o600").unwrap(), 0o600);
        assert_eq!(AssetOpts::parse_mode("0644").unwrap(), 0o644);
        assert_eq!(AssetOpts::parse_mode("0x1ff").unwrap(), 0o777);
        assert_eq!(AssetOpts::parse_mode("420").unwrap(), 0o644);
        assert_eq!(AssetOpts::parse_mode("0").unwrap(), 0);
    }

    #[test]
    fn parse_mode_rejects_garbage() {
        assert!(AssetOpts::parse_mode("rwx").is_err());
        assert!(AssetOpts::parse_mode("0o9").is_err());
        assert!(AssetOpts::parse_mode("99999").is_err());
    }

    #[test]
    fn display_shows_octal_and_decimal() {
        assert_eq!(AssetOpts::with_mode(0o644).to_string(), "{ mode: 0644(420) }");
    }

    #[test]
    fn entry_renders_mode_as_decimal_string() {
        let entry = AssetEntry::new("a/b", AssetOpts::with_mode(0o600));
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"path":"a/b","properties":{"mode":"384"}}"#);
    }
}
