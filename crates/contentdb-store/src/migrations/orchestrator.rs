//! Migration orchestrator
//!
//! Brings every registered table to the configured schema version inside one
//! transaction:
//! - a table missing physically is created from its create-mode schema
//! - an existing table, when the recorded version is older, gets its
//!   migrate-mode schema applied: additive `ALTER`s, or drop and recreate
//!
//! Within one table the order is always schema, then indices, then seed rows.

use crate::db;
use crate::errors::{from_rusqlite, migration_error, table_error, Result};
use crate::migrations::introspect;
use contentdb_core::query::compose_insert;
use contentdb_core::{
    log_op_end, log_op_error, log_op_start, ConflictRule, ContentDbError, Registry, Route,
    SchemaBuilder, SchemaUpgrader, TableDefinition, TableEntry,
};
use rusqlite::{Connection, Transaction};

/// What one orchestration run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub created: Vec<String>,
    pub upgraded: Vec<String>,
    pub recreated: Vec<String>,
    /// Every DDL statement executed, in order
    pub statements: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.statements.is_empty() && self.from_version == self.to_version
    }
}

/// Create or evolve all registered tables for `version`
///
/// A recorded version newer than `version` is refused; downgrades are not
/// supported.
pub fn migrate(conn: &mut Connection, registry: &Registry, version: u32) -> Result<MigrationReport> {
    log_op_start!("migrate", version = version);
    let start = std::time::Instant::now();

    let report = migrate_impl(conn, registry, version).map_err(|e| {
        log_op_error!(
            "migrate",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "migrate",
        duration_ms = start.elapsed().as_millis() as u64,
        from_version = report.from_version,
        created = report.created.len(),
        upgraded = report.upgraded.len(),
        recreated = report.recreated.len()
    );
    Ok(report)
}

fn migrate_impl(conn: &mut Connection, registry: &Registry, version: u32) -> Result<MigrationReport> {
    let recorded = db::user_version(conn)?;
    if recorded > version {
        return Err(ContentDbError::UnsupportedDowngrade {
            recorded,
            configured: version,
        }
        .into());
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    let physical = introspect::physical_tables(&tx)?;

    let mut report = MigrationReport {
        from_version: recorded,
        to_version: version,
        ..MigrationReport::default()
    };

    for (slot, entry) in registry.tables().iter().enumerate() {
        let mut run = TableRun {
            tx: &tx,
            entry,
            slot,
            report: &mut report,
        };
        if !physical.contains(&entry.table_name) {
            run.create()?;
        } else if recorded < version {
            run.upgrade(recorded)?;
        }
    }

    if recorded != version {
        db::set_user_version(&tx, version)?;
    }
    tx.commit().map_err(from_rusqlite)?;

    Ok(report)
}

/// Migration work for one registered table
struct TableRun<'a, 'c> {
    tx: &'a Transaction<'c>,
    entry: &'a TableEntry,
    slot: usize,
    report: &'a mut MigrationReport,
}

impl TableRun<'_, '_> {
    fn table(&self) -> &str {
        &self.entry.table_name
    }

    fn create(&mut self) -> Result<()> {
        let builder = SchemaBuilder::new(self.table());
        let Some(definition) = self.entry.creator().create_schema(builder)? else {
            tracing::debug!(table = %self.table(), "no create schema, skipping");
            return Ok(());
        };

        self.ddl(definition.create_sql())?;
        self.indices_and_seeds(&definition)?;
        let table = self.table().to_string();
        self.report.created.push(table);
        Ok(())
    }

    fn upgrade(&mut self, old_version: u32) -> Result<()> {
        let upgrader = SchemaUpgrader::new(self.table());
        let Some(definition) = self.entry.creator().upgrade_schema(upgrader, old_version)? else {
            tracing::debug!(table = %self.table(), old_version, "no upgrade schema, skipping");
            return Ok(());
        };

        if definition.is_recreate() {
            return self.recreate();
        }

        let existing = introspect::table_columns(self.tx, self.table())?;
        for (column, sql) in definition.columns().iter().zip(definition.update_sql()) {
            if existing.contains(&column.name) {
                tracing::debug!(table = %self.table(), column = %column.name, "column exists, skipping");
                continue;
            }
            self.ddl(sql)?;
        }
        self.indices_and_seeds(&definition)?;
        let table = self.table().to_string();
        self.report.upgraded.push(table);
        Ok(())
    }

    /// Drop and rebuild from the create-mode schema; existing rows are lost
    fn recreate(&mut self) -> Result<()> {
        let builder = SchemaBuilder::new(self.table());
        let Some(definition) = self.entry.creator().create_schema(builder)? else {
            tracing::debug!(table = %self.table(), "recreate requested without create schema");
            return Ok(());
        };

        self.ddl(&definition.drop_sql())?;
        self.ddl(definition.create_sql())?;
        self.indices_and_seeds(&definition)?;
        let table = self.table().to_string();
        self.report.recreated.push(table);
        Ok(())
    }

    fn indices_and_seeds(&mut self, definition: &TableDefinition) -> Result<()> {
        for sql in definition.index_sql() {
            self.ddl(&sql)?;
        }

        let route = Route {
            table: self.table().to_string(),
            slot: self.slot,
            item: None,
            join: false,
        };
        for row in definition.seed_rows() {
            let stmt = compose_insert(&self.entry.resource_id, &route, row, ConflictRule::Ignore)?;
            db::execute(self.tx, &stmt).map_err(|e| table_error("seed", self.table(), e))?;
        }
        Ok(())
    }

    fn ddl(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(table = %self.table(), sql = %sql, "migration statement");
        self.tx
            .execute_batch(sql)
            .map_err(|e| migration_error(&self.entry.table_name, &e.to_string()))?;
        self.report.statements.push(sql.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentdb_core::{ExErrorKind, IdentityOnly, TableCreator};

    struct Note;
    struct Tag;

    struct NoteTable;

    impl TableCreator for NoteTable {
        fn create_schema(
            &self,
            builder: SchemaBuilder,
        ) -> contentdb_core::Result<Option<TableDefinition>> {
            builder
                .add_text_column("body")
                .add_text_column("title")
                .index(&["title"])
                .build()
                .map(Some)
        }

        fn upgrade_schema(
            &self,
            upgrader: SchemaUpgrader,
            old_version: u32,
        ) -> contentdb_core::Result<Option<TableDefinition>> {
            if old_version < 2 {
                return upgrader.add_text_column("title").build().map(Some);
            }
            Ok(None)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new("contentdb");
        registry.register::<Note>(NoteTable).unwrap();
        registry.register::<Tag>(IdentityOnly).unwrap();
        registry
    }

    #[test]
    fn test_fresh_database_creates_everything() {
        let mut conn = Connection::open_in_memory().unwrap();
        let report = migrate(&mut conn, &registry(), 1).unwrap();

        assert_eq!(report.created, vec!["note", "tag"]);
        assert_eq!(
            introspect::physical_tables(&conn).unwrap(),
            vec!["note", "tag"]
        );
        assert_eq!(db::user_version(&conn).unwrap(), 1);
        assert!(report
            .statements
            .iter()
            .any(|s| s.starts_with("CREATE INDEX IF NOT EXISTS note_title_idx")));
    }

    #[test]
    fn test_same_version_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, &registry(), 1).unwrap();
        let report = migrate(&mut conn, &registry(), 1).unwrap();
        assert!(report.is_noop());
    }

    #[test]
    fn test_existing_columns_are_not_altered_again() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, &registry(), 1).unwrap();

        // the create schema already has `title`
        let report = migrate(&mut conn, &registry(), 2).unwrap();
        assert_eq!(report.upgraded, vec!["note"]);
        assert!(report.statements.iter().all(|s| !s.starts_with("ALTER")));
    }

    #[test]
    fn test_downgrade_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, &registry(), 3).unwrap();
        let err = migrate(&mut conn, &registry(), 2).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
        assert_eq!(db::user_version(&conn).unwrap(), 3);
    }
}
