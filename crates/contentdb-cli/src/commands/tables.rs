//! Tables command
//!
//! Usage: contentdb tables <DB>

use clap::Args;
use contentdb_store::db;
use contentdb_store::migrations::introspect;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Database file
    pub db: PathBuf,
}

/// Execute tables command
pub fn execute(args: TablesArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.db.exists() {
        return Err(format!("no database at {}", args.db.display()).into());
    }
    let conn = db::open(&args.db)?;

    println!("version {}", db::user_version(&conn)?);
    for table in introspect::physical_tables(&conn)? {
        let columns = introspect::table_columns(&conn, &table)?;
        println!("{} ({})", table, columns.join(", "));
    }

    Ok(())
}
