//! Migrate command
//!
//! Usage: contentdb migrate <MANIFEST> [--config <FILE>] [--db <PATH>] [--show-sql]

use crate::manifest::Manifest;
use clap::Args;
use contentdb_store::{ContentProvider, StoreConfig};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Manifest file (TOML)
    pub manifest: PathBuf,

    /// Store configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the configuration
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Print every executed statement
    #[arg(long)]
    pub show_sql: bool,
}

/// Execute migrate command
///
/// The manifest's version is the target schema version.
pub fn execute(args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = Manifest::load(&args.manifest)?;

    let mut config = match &args.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(db) = args.db {
        config.database_path = db;
    }
    config.version = manifest.version;

    let registry = manifest.registry(&config.authority)?;
    let provider = ContentProvider::new(config, registry)?;
    provider.open()?;

    let Some(report) = provider.last_migration() else {
        return Ok(());
    };
    println!(
        "{}: version {} -> {}",
        provider.config().database_path.display(),
        report.from_version,
        report.to_version
    );
    for (label, tables) in [
        ("created", &report.created),
        ("upgraded", &report.upgraded),
        ("recreated", &report.recreated),
    ] {
        if !tables.is_empty() {
            println!("{}: {}", label, tables.join(", "));
        }
    }
    if args.show_sql {
        for sql in &report.statements {
            println!("{}", sql);
        }
    }

    provider.close()?;
    Ok(())
}
