//! DDL command
//!
//! Usage: contentdb ddl <MANIFEST> [--upgrade-from <VERSION>]

use crate::manifest::Manifest;
use clap::Args;
use contentdb_core::{SchemaBuilder, SchemaUpgrader, TableCreator};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DdlArgs {
    /// Manifest file (TOML)
    pub manifest: PathBuf,

    /// Print the upgrade statements for a database at this version instead
    #[arg(long)]
    pub upgrade_from: Option<u32>,
}

/// Execute ddl command
pub fn execute(args: DdlArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = Manifest::load(&args.manifest)?;

    for table in &manifest.tables {
        match args.upgrade_from {
            None => {
                let Some(definition) = table.create_schema(SchemaBuilder::new(&table.name))? else {
                    continue;
                };
                println!("{}", definition.create_sql());
                for sql in definition.index_sql() {
                    println!("{}", sql);
                }
            }
            Some(old_version) => {
                let upgrader = SchemaUpgrader::new(&table.name);
                let Some(definition) = table.upgrade_schema(upgrader, old_version)? else {
                    continue;
                };
                if definition.is_recreate() {
                    println!("{}", definition.drop_sql());
                    if let Some(created) = table.create_schema(SchemaBuilder::new(&table.name))? {
                        println!("{}", created.create_sql());
                        for sql in created.index_sql() {
                            println!("{}", sql);
                        }
                    }
                    continue;
                }
                for sql in definition.update_sql() {
                    println!("{}", sql);
                }
                for sql in definition.index_sql() {
                    println!("{}", sql);
                }
            }
        }
    }

    Ok(())
}
