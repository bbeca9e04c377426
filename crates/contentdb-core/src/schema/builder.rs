use super::column::{ColumnSpec, ColumnType, DefaultValue, ID_COLUMN};
use super::table::TableDefinition;
use super::TableDraft;
use crate::errors::{ContentDbError, Result};
use crate::value::ContentValues;

/// Create-mode schema builder
///
/// Columns are added one at a time; each constraint call applies to the most
/// recently added column. Errors are deferred: the first usage error or
/// primary key conflict is kept and reported by `build()`, and later calls
/// become no-ops.
///
/// ```
/// use contentdb_core::SchemaBuilder;
///
/// let table = SchemaBuilder::new("t")
///     .add_text_column("name")
///     .not_null()
///     .default_value("x")
///     .build()
///     .unwrap();
/// assert_eq!(
///     table.create_sql(),
///     "CREATE TABLE t (name TEXT NOT NULL DEFAULT 'x', _id INTEGER PRIMARY KEY AUTOINCREMENT);"
/// );
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    draft: TableDraft,
}

impl SchemaBuilder {
    pub fn new(table_name: &str) -> Self {
        Self {
            draft: TableDraft::new(table_name),
        }
    }

    pub fn table_name(&self) -> &str {
        self.draft.table.table_name()
    }

    // ----- Column adders -----

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

    // ----- Column constraints -----

    /// Make the last added column the table's primary key
    pub fn primary_key(mut self) -> Self {
        if self.draft.last_column("primary_key()").is_none() {
            return self;
        }
        if self.draft.claim_primary_key() {
            if let Some(col) = self.draft.last_column("primary_key()") {
                col.primary_key = true;
            }
        }
        self
    }

    pub fn autoincrement(mut self) -> Self {
        if let Some(col) = self.draft.last_column("autoincrement()") {
            col.autoincrement = true;
        }
        self
    }

    /// Requires a default value by the time `build()` runs
    pub fn not_null(mut self) -> Self {
        if let Some(col) = self.draft.last_column("not_null()") {
            col.not_null = true;
        }
        self
    }

    pub fn unique(mut self) -> Self {
        if let Some(col) = self.draft.last_column("unique()") {
            col.unique = true;
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

    // ----- Table constraints -----

    /// Composite primary key over `columns`
    pub fn primary_keys<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        if self.draft.claim_primary_key() {
            self.draft.table.primary_key =
                Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        }
        self
    }

    /// Composite unique constraint over `columns`
    pub fn unique_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.draft.table.unique = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn index<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.draft.add_index(columns);
        self
    }

    /// Rows inserted right after the table and its indices are created
    pub fn seed(mut self, rows: impl IntoIterator<Item = ContentValues>) -> Self {
        self.draft.table.seed.extend(rows);
        self
    }

    /// Finish the table, appending the identity column when not declared
    ///
    /// The injected `_id` column is the primary key unless another primary
    /// key was declared.
    /// A declared `_id` must be INTEGER so it stays the row identity.
    pub fn build(mut self) -> Result<TableDefinition> {
        let declared = self
            .draft
            .table
            .columns
            .iter()
            .find(|c| c.name == ID_COLUMN)
            .map(|c| c.column_type);
        match declared {
            Some(ColumnType::Integer) => {}
            Some(other) => self.draft.fail(ContentDbError::NonIntegerIdentity {
                table: self.draft.table.table_name.clone(),
                declared: other.sql_name().to_string(),
            }),
            None => {
                let mut id = ColumnSpec::new(ID_COLUMN, ColumnType::Integer);
                id.autoincrement = true;
                id.primary_key = !self.draft.primary_key_defined;
                self.draft.table.columns.push(id);
            }
        }
        self.draft.finish()
    }
}
