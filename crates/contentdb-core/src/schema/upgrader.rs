use super::column::{ColumnType, DefaultValue};
use super::table::TableDefinition;
use super::TableDraft;
use crate::errors::Result;
use crate::value::ContentValues;

/// Migrate-mode schema builder
///
/// Declares what changes when an existing table is upgraded. Columns are
/// rendered as additive `ALTER TABLE ... ADD COLUMN` statements, so only the
/// constraints such a statement can carry are offered. Anything else
/// (removing or retyping a column, adding keys) is expressed with
/// `recreate()`, which drops the table and rebuilds it from the create-mode
/// schema.
#[derive(Debug)]
pub struct SchemaUpgrader {
    draft: TableDraft,
}

impl SchemaUpgrader {
    pub fn new(table_name: &str) -> Self {
        Self {
            draft: TableDraft::new(table_name),
        }
    }

    pub fn table_name(&self) -> &str {
        self.draft.table.table_name()
    }

    pub fn add_column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.draft.add_column(name, column_type);
        self
    }

    pub fn add_text_column(self, name: &str) -> Self {
        self.add_column(name, ColumnType::Text)
    }

    pub fn add_integer_column(self, name: &str) -> Self {
        self.add_column(name, ColumnType::Integer)
    }

    pub fn add_real_column(self, name: &str) -> Self {
        self.add_column(name, ColumnType::Float)
    }

    pub fn add_blob_column(self, name: &str) -> Self {
        self.add_column(name, ColumnType::Blob)
    }

    pub fn add_null_column(self, name: &str) -> Self {
        self.add_column(name, ColumnType::Null)
    }

    pub fn not_null(mut self) -> Self {
        if let Some(col) = self.draft.last_column("not_null()") {
            col.not_null = true;
        }
        self
    }

    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        if let Some(col) = self.draft.last_column("default_value()") {
            col.default_value = Some(value.into());
        }
        self
    }

    pub fn default_current_time(self) -> Self {
        self.default_value(DefaultValue::CurrentTime)
    }

    pub fn default_current_date(self) -> Self {
        self.default_value(DefaultValue::CurrentDate)
    }

    pub fn default_current_timestamp(self) -> Self {
        self.default_value(DefaultValue::CurrentTimestamp)
    }

    pub fn index<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.draft.add_index(columns);
        self
    }

    pub fn seed(mut self, rows: impl IntoIterator<Item = ContentValues>) -> Self {
        self.draft.table.seed.extend(rows);
        self
    }

    /// Drop and rebuild the table from its create-mode schema on upgrade
    pub fn recreate(mut self) -> Self {
        self.draft.table.recreate_on_upgrade = true;
        self
    }

    /// Finish the upgrade definition; no identity column is injected
    pub fn build(self) -> Result<TableDefinition> {
        self.draft.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ContentDbError;

    #[test]
    fn test_additive_upgrade_renders_one_alter_per_column() {
        let table = SchemaUpgrader::new("notes")
            .add_text_column("subtitle")
            .add_integer_column("priority")
            .not_null()
            .default_value(0i64)
            .build()
            .unwrap();
        assert_eq!(
            table.update_sql(),
            &[
                "ALTER TABLE notes ADD COLUMN subtitle TEXT;".to_string(),
                "ALTER TABLE notes ADD COLUMN priority INTEGER NOT NULL DEFAULT 0;".to_string(),
            ]
        );
        assert!(table.column("_id").is_none());
    }

    #[test]
    fn test_recreate_renders_no_alter() {
        let table = SchemaUpgrader::new("notes")
            .add_text_column("subtitle")
            .recreate()
            .build()
            .unwrap();
        assert!(table.is_recreate());
        assert!(table.update_sql().is_empty());
    }

    #[test]
    fn test_upgrader_validates_not_null() {
        let err = SchemaUpgrader::new("notes")
            .add_text_column("subtitle")
            .not_null()
            .build()
            .unwrap_err();
        assert!(matches!(err, ContentDbError::NotNullWithoutDefault { .. }));
    }

    #[test]
    fn test_upgrader_constraint_before_column() {
        let err = SchemaUpgrader::new("notes")
            .default_value("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ContentDbError::ConstraintBeforeColumn { .. }));
    }

    #[test]
    fn test_update_sql_is_memoized() {
        let table = SchemaUpgrader::new("notes")
            .add_text_column("subtitle")
            .build()
            .unwrap();
        assert!(std::ptr::eq(table.update_sql(), table.update_sql()));
    }

    #[test]
    fn test_non_finite_default_rejected_on_upgrade() {
        let err = SchemaUpgrader::new("notes")
            .add_real_column("weight")
            .default_value(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, ContentDbError::NonFiniteDefault { .. }));
    }
}
