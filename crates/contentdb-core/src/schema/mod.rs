//! Schema declaration and DDL rendering
//!
//! A `TableCreator` receives a `SchemaBuilder` (create mode) or a
//! `SchemaUpgrader` (migrate mode), declares columns and constraints through
//! the fluent API and returns the resulting `TableDefinition`.

mod builder;
mod column;
mod table;
mod upgrader;

pub use builder::SchemaBuilder;
pub use column::{ColumnSpec, ColumnType, DefaultValue, ID_COLUMN};
pub use table::{IndexSpec, TableDefinition};
pub use upgrader::SchemaUpgrader;

use crate::errors::{ContentDbError, Result};

/// Accumulated state shared by both builder modes
///
/// Tracks the most recently added column so constraint calls can target it,
/// and keeps the first usage or conflict error for `build()` to report.
#[derive(Debug)]
pub(crate) struct TableDraft {
    pub(crate) table: TableDefinition,
    last_column: Option<usize>,
    pub(crate) primary_key_defined: bool,
    error: Option<ContentDbError>,
}

impl TableDraft {
    pub(crate) fn new(table_name: &str) -> Self {
        Self {
            table: TableDefinition::empty(table_name),
            last_column: None,
            primary_key_defined: false,
            error: None,
        }
    }

    pub(crate) fn add_column(&mut self, name: &str, column_type: ColumnType) {
        if self.error.is_some() {
            return;
        }
        let position = match self.table.columns.iter().position(|c| c.name == name) {
            Some(existing) => existing,
            None => {
                self.table.columns.push(ColumnSpec::new(name, column_type));
                self.table.columns.len() - 1
            }
        };
        self.last_column = Some(position);
    }

    /// The column the next constraint applies to
    ///
    /// Records a usage error when no column has been added yet.
    pub(crate) fn last_column(&mut self, call: &str) -> Option<&mut ColumnSpec> {
        if self.error.is_some() {
            return None;
        }
        match self.last_column {
            Some(index) => self.table.columns.get_mut(index),
            None => {
                self.error = Some(ContentDbError::ConstraintBeforeColumn {
                    table: self.table.table_name.clone(),
                    call: call.to_string(),
                });
                None
            }
        }
    }

    /// Claim the table's single primary key, recording a conflict if taken
    pub(crate) fn claim_primary_key(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.primary_key_defined {
            self.fail(ContentDbError::DuplicatePrimaryKey {
                table: self.table.table_name.clone(),
            });
            return false;
        }
        self.primary_key_defined = true;
        true
    }

    pub(crate) fn add_index<S: AsRef<str>>(&mut self, columns: &[S]) {
        if self.error.is_some() {
            return;
        }
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let index = IndexSpec::for_columns(&self.table.table_name, columns);
        self.table.indices.push(index);
    }

    pub(crate) fn fail(&mut self, err: ContentDbError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Report the first recorded error or validate and hand out the table
    pub(crate) fn finish(self) -> Result<TableDefinition> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.table.validate()?;
        Ok(self.table)
    }
}
