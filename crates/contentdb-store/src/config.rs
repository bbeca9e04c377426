//! Store configuration
//!
//! `StoreConfig` is plain serde data, loadable from TOML:
//!
//! ```toml
//! database_path = "app.db"
//! authority = "com.example.app"
//! version = 3
//! default_conflict_rule = "abort"
//!
//! [conflict_rules]
//! settings = "replace"
//! ```

use crate::errors::{config_error, io_error, Result};
use contentdb_core::ConflictRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Path value selecting a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

pub const DEFAULT_AUTHORITY: &str = "contentdb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub authority: String,
    /// Schema version the registered creators describe; must be at least 1
    pub version: u32,
    pub foreign_keys: bool,
    pub wal: bool,
    pub default_conflict_rule: ConflictRule,
    /// Per-table override of `default_conflict_rule`
    pub conflict_rules: BTreeMap<String, ConflictRule>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY),
            authority: DEFAULT_AUTHORITY.to_string(),
            version: 1,
            foreign_keys: true,
            wal: true,
            default_conflict_rule: ConflictRule::Abort,
            conflict_rules: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    /// In-memory store at `version`
    pub fn in_memory(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// On-disk store at `path` and `version`
    pub fn at_path(path: impl AsRef<Path>, version: u32) -> Self {
        Self {
            database_path: path.as_ref().to_path_buf(),
            version,
            ..Self::default()
        }
    }

    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.to_string();
        self
    }

    pub fn with_conflict_rule(mut self, table: &str, rule: ConflictRule) -> Self {
        self.conflict_rules.insert(table.to_string(), rule);
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(source).map_err(|e| config_error(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version == 0 {
            return Err(config_error("version must be at least 1"));
        }
        if self.authority.trim().is_empty() || self.authority.contains('/') {
            return Err(config_error(format!(
                "authority '{}' must be non-empty and contain no '/'",
                self.authority
            )));
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    pub fn conflict_rule_for(&self, table: &str) -> ConflictRule {
        self.conflict_rules
            .get(table)
            .copied()
            .unwrap_or(self.default_conflict_rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentdb_core::ExErrorKind;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(config.is_in_memory());
        assert_eq!(config.authority, "contentdb");
        assert_eq!(config.version, 1);
        assert_eq!(config.conflict_rule_for("anything"), ConflictRule::Abort);
    }

    #[test]
    fn test_from_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
            database_path = "app.db"
            version = 3
            wal = false

            [conflict_rules]
            settings = "replace"
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("app.db"));
        assert_eq!(config.version, 3);
        assert!(!config.wal);
        assert!(config.foreign_keys);
        assert_eq!(config.conflict_rule_for("settings"), ConflictRule::Replace);
        assert_eq!(config.conflict_rule_for("orders"), ConflictRule::Abort);
    }

    #[test]
    fn test_version_zero_rejected() {
        let err = StoreConfig::from_toml_str("version = 0").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = StoreConfig::from_toml_str("verison = 2").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
    }
}
