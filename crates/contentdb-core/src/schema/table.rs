use super::column::{ColumnSpec, ColumnType, DefaultValue};
use crate::errors::{ContentDbError, Result};
use crate::value::ContentValues;
use std::sync::OnceLock;

/// A secondary index declared on a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
}

impl IndexSpec {
    /// Index named `<table>_<col1>_<col2>_idx`, lowercased
    pub fn for_columns(table_name: &str, columns: Vec<String>) -> Self {
        let name = format!("{}_{}_idx", table_name, columns.join("_").to_lowercase());
        Self { name, columns }
    }

    pub fn sql(&self, table_name: &str) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
            self.name,
            table_name,
            self.columns.join(", ")
        )
    }
}

/// Ordered columns plus table-level constraints for one table
///
/// Produced by `SchemaBuilder::build` or `SchemaUpgrader::build` and never
/// mutated afterwards. Rendered statements are computed on first use and
/// cached for the lifetime of the definition.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub(crate) table_name: String,
    pub(crate) columns: Vec<ColumnSpec>,
    pub(crate) primary_key: Option<Vec<String>>,
    pub(crate) unique: Option<Vec<String>>,
    pub(crate) indices: Vec<IndexSpec>,
    pub(crate) seed: Vec<ContentValues>,
    pub(crate) recreate_on_upgrade: bool,
    create_sql: OnceLock<String>,
    update_sql: OnceLock<Vec<String>>,
}

impl TableDefinition {
    pub(crate) fn empty(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: Vec::new(),
            primary_key: None,
            unique: None,
            indices: Vec::new(),
            seed: Vec::new(),
            recreate_on_upgrade: false,
            create_sql: OnceLock::new(),
            update_sql: OnceLock::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Columns in declaration order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Table-level composite primary key, if declared
    pub fn composite_primary_key(&self) -> Option<&[String]> {
        self.primary_key.as_deref()
    }

    /// Table-level composite unique constraint, if declared
    pub fn composite_unique(&self) -> Option<&[String]> {
        self.unique.as_deref()
    }

    pub fn indices(&self) -> &[IndexSpec] {
        &self.indices
    }

    pub fn seed_rows(&self) -> &[ContentValues] {
        &self.seed
    }

    /// Whether an upgrade drops and rebuilds the table instead of altering it
    pub fn is_recreate(&self) -> bool {
        self.recreate_on_upgrade
    }

    /// `CREATE TABLE` statement, rendered once and cached
    pub fn create_sql(&self) -> &str {
        self.create_sql.get_or_init(|| self.render_create())
    }

    /// One `ALTER TABLE ... ADD COLUMN` per declared column, in order
    ///
    /// Empty for a table marked `recreate`.
    pub fn update_sql(&self) -> &[String] {
        self.update_sql.get_or_init(|| {
            if self.recreate_on_upgrade {
                return Vec::new();
            }
            self.columns
                .iter()
                .map(|col| {
                    format!(
                        "ALTER TABLE {} ADD COLUMN {};",
                        self.table_name,
                        col.alter_definition()
                    )
                })
                .collect()
        })
    }

    pub fn index_sql(&self) -> Vec<String> {
        self.indices
            .iter()
            .map(|index| index.sql(&self.table_name))
            .collect()
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.table_name)
    }

    fn render_create(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(ColumnSpec::create_definition)
            .collect();
        if let Some(pk) = &self.primary_key {
            defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }
        if let Some(unique) = &self.unique {
            defs.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        let sql = format!("CREATE TABLE {} ({});", self.table_name, defs.join(", "));
        tracing::debug!(table = %self.table_name, sql = %sql, "rendered create statement");
        sql
    }

    /// Check the invariants `build()` guarantees
    pub(crate) fn validate(&self) -> Result<()> {
        let mut primary_keys = self.columns.iter().filter(|c| c.primary_key).count();
        if self.primary_key.is_some() {
            primary_keys += 1;
        }
        if primary_keys > 1 {
            return Err(ContentDbError::DuplicatePrimaryKey {
                table: self.table_name.clone(),
            });
        }

        for col in &self.columns {
            if let Some(DefaultValue::Real(r)) = &col.default_value {
                if !r.is_finite() {
                    return Err(ContentDbError::NonFiniteDefault {
                        table: self.table_name.clone(),
                        column: col.name.clone(),
                        value: r.to_string(),
                    });
                }
            }
        }

        for col in self.columns.iter().filter(|c| c.not_null) {
            if col.column_type == ColumnType::Null {
                return Err(ContentDbError::NotNullOnNullColumn {
                    table: self.table_name.clone(),
                    column: col.name.clone(),
                });
            }
            if col.default_value.is_none() {
                return Err(ContentDbError::NotNullWithoutDefault {
                    table: self.table_name.clone(),
                    column: col.name.clone(),
                });
            }
        }
        Ok(())
    }
}
