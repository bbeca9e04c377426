//! Physical schema introspection

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;

/// User tables physically present, by name
pub fn physical_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(from_rusqlite)?;
    let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(names)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    Ok(physical_tables(conn)?.iter().any(|t| t == table))
}

/// Column names of a physical table in declaration order
///
/// Empty when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let sql = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let columns = stmt
        .query_map([], |row| row.get(1))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_user_tables_only() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE b (_id INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE a (x TEXT);",
        )
        .unwrap();
        // AUTOINCREMENT creates sqlite_sequence
        assert_eq!(physical_tables(&conn).unwrap(), vec!["a", "b"]);
        assert!(table_exists(&conn, "a").unwrap());
        assert!(!table_exists(&conn, "c").unwrap());
    }

    #[test]
    fn test_table_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT, age INTEGER);")
            .unwrap();
        assert_eq!(table_columns(&conn, "t").unwrap(), vec!["name", "age"]);
        assert!(table_columns(&conn, "missing").unwrap().is_empty());
    }
}
