//! Database connection management
//!
//! Opens and configures SQLite connections and reads/writes the schema
//! version recorded in `PRAGMA user_version`.

use crate::config::StoreConfig;
use crate::errors::{from_rusqlite, Result};
use crate::rows::to_sql;
use contentdb_core::Statement;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Open and configure the database a config points at
pub fn open_configured(config: &StoreConfig) -> Result<Connection> {
    let conn = if config.is_in_memory() {
        open_in_memory()?
    } else {
        open(&config.database_path)?
    };
    configure(&conn, config)?;
    Ok(conn)
}

/// Apply connection pragmas
pub fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(from_rusqlite)?;

    // journal_mode reports the resulting mode as a row
    if config.wal && !config.is_in_memory() {
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        tracing::debug!(journal_mode = %mode, "configured journal mode");
    }

    Ok(())
}

/// Schema version recorded in the database header
pub fn user_version(conn: &Connection) -> Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(from_rusqlite)
}

pub fn set_user_version(conn: &Connection, version: u32) -> Result<()> {
    conn.pragma_update(None, "user_version", version)
        .map_err(from_rusqlite)
}

/// Execute a composed statement, returning the number of changed rows
///
/// The raw rusqlite error is returned so callers can attach table context.
pub fn execute(conn: &Connection, stmt: &Statement) -> rusqlite::Result<usize> {
    tracing::debug!(sql = %stmt.sql, args = stmt.args.len(), "execute");
    conn.execute(
        &stmt.sql,
        rusqlite::params_from_iter(stmt.args.iter().map(to_sql)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_version_round_trip() {
        let conn = open_in_memory().unwrap();
        assert_eq!(user_version(&conn).unwrap(), 0);
        set_user_version(&conn, 4).unwrap();
        assert_eq!(user_version(&conn).unwrap(), 4);
    }

    #[test]
    fn test_open_configured_enables_foreign_keys() {
        let conn = open_configured(&StoreConfig::default()).unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }

    #[test]
    fn test_wal_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::at_path(dir.path().join("wal.db"), 1);
        let conn = open_configured(&config).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
