//! contentdb CLI
//!
//! Command-line interface for manifest-driven content databases

use clap::{Parser, Subcommand};
use contentdb_core::logging_facility::{init, Profile};

mod commands;
mod manifest;

#[derive(Debug, Parser)]
#[command(name = "contentdb")]
#[command(about = "contentdb - Declarative SQLite schemas and migrations", long_about = None)]
struct Cli {
    /// Human-readable debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON logs on stderr
    #[arg(long, global = true, conflicts_with = "verbose")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the DDL a manifest renders to
    Ddl(commands::ddl::DdlArgs),
    /// Create or evolve a database from a manifest
    Migrate(commands::migrate::MigrateArgs),
    /// List the tables and columns of a database
    Tables(commands::tables::TablesArgs),
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        init(Profile::Development);
    } else if cli.log_json {
        init(Profile::Production);
    }

    let result = match cli.command {
        Commands::Ddl(args) => commands::ddl::execute(args),
        Commands::Migrate(args) => commands::migrate::execute(args),
        Commands::Tables(args) => commands::tables::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
