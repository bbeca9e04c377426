//! Model manifest
//!
//! A TOML description of tables, read by the `ddl` and `migrate` commands
//! and registered as declared models:
//!
//! ```toml
//! version = 2
//!
//! [[tables]]
//! name = "customer"
//! indices = [["email"]]
//! seed = [{ name = "guest", email = "guest@example.com" }]
//!
//! [[tables.columns]]
//! name = "name"
//! type = "text"
//! not_null = true
//! default = "anonymous"
//!
//! [[tables.columns]]
//! name = "email"
//! type = "text"
//! unique = true
//!
//! [[tables.upgrades]]
//! since = 2
//! columns = [{ name = "nickname", type = "text" }]
//! ```
//!
//! An upgrade applies when migrating from a version older than `since`.

use contentdb_core::{
    ColumnType, ContentValues, DefaultValue, ExError, ExErrorKind, Registry, Result as CoreResult,
    SchemaBuilder, SchemaUpgrader, TableCreator, TableDefinition, Value,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

type Result<T> = std::result::Result<T, ExError>;

fn manifest_error(message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("load_manifest")
        .with_message(message)
}

// ----- Raw TOML shape -----

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    tables: Vec<RawTable>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    name: String,
    #[serde(default)]
    columns: Vec<RawColumn>,
    #[serde(default)]
    primary_keys: Vec<String>,
    #[serde(default)]
    unique: Vec<String>,
    #[serde(default)]
    indices: Vec<Vec<String>>,
    #[serde(default)]
    seed: Vec<BTreeMap<String, toml::Value>>,
    #[serde(default)]
    upgrades: Vec<RawUpgrade>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawColumn {
    name: String,
    #[serde(rename = "type")]
    column_type: RawColumnType,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    autoincrement: bool,
    #[serde(default)]
    not_null: bool,
    #[serde(default)]
    unique: bool,
    default: Option<toml::Value>,
    default_current: Option<RawCurrent>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawColumnType {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawCurrent {
    Time,
    Date,
    Timestamp,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUpgrade {
    since: u32,
    #[serde(default)]
    columns: Vec<RawColumn>,
    #[serde(default)]
    indices: Vec<Vec<String>>,
    #[serde(default)]
    seed: Vec<BTreeMap<String, toml::Value>>,
    #[serde(default)]
    recreate: bool,
}

// ----- Typed manifest -----

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestUpgrade {
    pub since: u32,
    pub columns: Vec<ManifestColumn>,
    pub indices: Vec<Vec<String>>,
    pub seed: Vec<ContentValues>,
    pub recreate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestTable {
    pub name: String,
    pub columns: Vec<ManifestColumn>,
    pub primary_keys: Vec<String>,
    pub unique: Vec<String>,
    pub indices: Vec<Vec<String>>,
    pub seed: Vec<ContentValues>,
    pub upgrades: Vec<ManifestUpgrade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub version: u32,
    pub tables: Vec<ManifestTable>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_manifest")
                .with_entity_id(path.display().to_string())
                .with_message(e.to_string())
        })?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> Result<Self> {
        let raw: RawManifest =
            toml::from_str(source).map_err(|e| manifest_error(format!("invalid manifest: {}", e)))?;
        if raw.version == 0 {
            return Err(manifest_error("version must be at least 1"));
        }
        let tables = raw
            .tables
            .into_iter()
            .map(ManifestTable::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            version: raw.version,
            tables,
        })
    }

    /// Registry with every table registered as a declared model
    pub fn registry(&self, authority: &str) -> Result<Registry> {
        let mut registry = Registry::new(authority);
        for table in &self.tables {
            registry.register_declared(&table.name, table.clone())?;
        }
        Ok(registry)
    }
}

impl TryFrom<RawTable> for ManifestTable {
    type Error = ExError;

    fn try_from(raw: RawTable) -> Result<Self> {
        let columns = raw
            .columns
            .into_iter()
            .map(|c| column(&raw.name, c))
            .collect::<Result<Vec<_>>>()?;
        let seed = seed_rows(&raw.name, raw.seed)?;
        let mut upgrades = Vec::with_capacity(raw.upgrades.len());
        for upgrade in raw.upgrades {
            let columns = upgrade
                .columns
                .into_iter()
                .map(|c| column(&raw.name, c))
                .collect::<Result<Vec<_>>>()?;
            if let Some(c) = columns.iter().find(|c| c.primary_key || c.unique || c.autoincrement) {
                return Err(manifest_error(format!(
                    "{}.{}: key and unique constraints cannot be added by an upgrade",
                    raw.name, c.name
                )));
            }
            upgrades.push(ManifestUpgrade {
                since: upgrade.since,
                columns,
                indices: upgrade.indices,
                seed: seed_rows(&raw.name, upgrade.seed)?,
                recreate: upgrade.recreate,
            });
        }

        Ok(Self {
            name: raw.name,
            columns,
            primary_keys: raw.primary_keys,
            unique: raw.unique,
            indices: raw.indices,
            seed,
            upgrades,
        })
    }
}

fn column(table: &str, raw: RawColumn) -> Result<ManifestColumn> {
    let default = match (raw.default, raw.default_current) {
        (Some(_), Some(_)) => {
            return Err(manifest_error(format!(
                "{}.{}: set either default or default_current",
                table, raw.name
            )))
        }
        (Some(value), None) => Some(default_value(table, &raw.name, value)?),
        (None, Some(RawCurrent::Time)) => Some(DefaultValue::CurrentTime),
        (None, Some(RawCurrent::Date)) => Some(DefaultValue::CurrentDate),
        (None, Some(RawCurrent::Timestamp)) => Some(DefaultValue::CurrentTimestamp),
        (None, None) => None,
    };
    let column_type = match raw.column_type {
        RawColumnType::Null => ColumnType::Null,
        RawColumnType::Integer => ColumnType::Integer,
        RawColumnType::Real => ColumnType::Float,
        RawColumnType::Text => ColumnType::Text,
        RawColumnType::Blob => ColumnType::Blob,
    };
    Ok(ManifestColumn {
        name: raw.name,
        column_type,
        primary_key: raw.primary_key,
        autoincrement: raw.autoincrement,
        not_null: raw.not_null,
        unique: raw.unique,
        default,
    })
}

fn default_value(table: &str, column: &str, value: toml::Value) -> Result<DefaultValue> {
    match value {
        toml::Value::String(s) => Ok(DefaultValue::from(s)),
        toml::Value::Integer(i) => Ok(DefaultValue::from(i)),
        toml::Value::Float(f) => Ok(DefaultValue::from(f)),
        toml::Value::Boolean(b) => Ok(DefaultValue::from(b)),
        other => Err(manifest_error(format!(
            "{}.{}: unsupported default {}",
            table, column, other
        ))),
    }
}

fn seed_rows(table: &str, rows: Vec<BTreeMap<String, toml::Value>>) -> Result<Vec<ContentValues>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(column, value)| {
                    let value = match value {
                        toml::Value::String(s) => Value::Text(s),
                        toml::Value::Integer(i) => Value::Integer(i),
                        toml::Value::Float(f) => Value::Real(f),
                        toml::Value::Boolean(b) => Value::from(b),
                        toml::Value::Datetime(d) => Value::Text(d.to_string()),
                        other => {
                            return Err(manifest_error(format!(
                                "{}.{}: unsupported seed value {}",
                                table, column, other
                            )))
                        }
                    };
                    Ok((column, value))
                })
                .collect::<Result<ContentValues>>()
        })
        .collect()
}

impl TableCreator for ManifestTable {
    fn create_schema(&self, mut builder: SchemaBuilder) -> CoreResult<Option<TableDefinition>> {
        for c in &self.columns {
            builder = builder.add_column(&c.name, c.column_type);
            if c.primary_key {
                builder = builder.primary_key();
            }
            if c.autoincrement {
                builder = builder.autoincrement();
            }
            if c.not_null {
                builder = builder.not_null();
            }
            if c.unique {
                builder = builder.unique();
            }
            if let Some(default) = &c.default {
                builder = builder.default_value(default.clone());
            }
        }
        if !self.primary_keys.is_empty() {
            builder = builder.primary_keys(&self.primary_keys);
        }
        if !self.unique.is_empty() {
            builder = builder.unique_columns(&self.unique);
        }
        for index in &self.indices {
            builder = builder.index(index);
        }
        builder.seed(self.seed.clone()).build().map(Some)
    }

    fn upgrade_schema(
        &self,
        mut upgrader: SchemaUpgrader,
        old_version: u32,
    ) -> CoreResult<Option<TableDefinition>> {
        let pending: Vec<&ManifestUpgrade> = self
            .upgrades
            .iter()
            .filter(|u| old_version < u.since)
            .collect();
        if pending.is_empty() {
            return Ok(None);
        }
        if pending.iter().any(|u| u.recreate) {
            return upgrader.recreate().build().map(Some);
        }

        for upgrade in pending {
            for c in &upgrade.columns {
                upgrader = upgrader.add_column(&c.name, c.column_type);
                if c.not_null {
                    upgrader = upgrader.not_null();
                }
                if let Some(default) = &c.default {
                    upgrader = upgrader.default_value(default.clone());
                }
            }
            for index in &upgrade.indices {
                upgrader = upgrader.index(index);
            }
            upgrader = upgrader.seed(upgrade.seed.clone());
        }
        upgrader.build().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        version = 2

        [[tables]]
        name = "customer"
        indices = [["email"]]
        seed = [{ name = "guest", email = "guest@example.com" }]

        [[tables.columns]]
        name = "name"
        type = "text"
        not_null = true
        default = "anonymous"

        [[tables.columns]]
        name = "email"
        type = "text"
        unique = true

        [[tables.upgrades]]
        since = 2
        columns = [{ name = "nickname", type = "text" }]
    "#;

    #[test]
    fn test_parse_and_render() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.version, 2);
        let table = &manifest.tables[0];
        assert_eq!(table.seed.len(), 1);

        let definition = table
            .create_schema(SchemaBuilder::new("customer"))
            .unwrap()
            .unwrap();
        assert_eq!(
            definition.create_sql(),
            "CREATE TABLE customer (name TEXT NOT NULL DEFAULT 'anonymous', email TEXT UNIQUE, _id INTEGER PRIMARY KEY AUTOINCREMENT);"
        );
        assert_eq!(
            definition.index_sql(),
            vec!["CREATE INDEX IF NOT EXISTS customer_email_idx ON customer (email);"]
        );
    }

    #[test]
    fn test_upgrades_apply_by_version() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let table = &manifest.tables[0];

        let upgrade = table
            .upgrade_schema(SchemaUpgrader::new("customer"), 1)
            .unwrap()
            .unwrap();
        assert_eq!(
            upgrade.update_sql(),
            ["ALTER TABLE customer ADD COLUMN nickname TEXT;".to_string()]
        );
        assert!(table
            .upgrade_schema(SchemaUpgrader::new("customer"), 2)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unique_upgrade_column_rejected() {
        let err = Manifest::parse(
            r#"
            [[tables]]
            name = "t"
            [[tables.upgrades]]
            since = 2
            columns = [{ name = "code", type = "text", unique = true }]
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_registry_uses_declared_models() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let registry = manifest.registry("contentdb").unwrap();
        assert_eq!(registry.table_names(), vec!["customer"]);
        assert!(registry.model_for_table("customer").unwrap().is_declared());
    }
}
