//! contentdb Store - SQLite binding for the content database
//!
//! Provides:
//! - Connection management and store configuration
//! - Physical schema introspection
//! - The migration orchestrator creating and evolving registered tables
//! - `ContentProvider`, the CRUD surface keyed by resource identifier
//! - Row sets and typed row readers

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod provider;
pub mod rows;

// Re-export key types
pub use config::StoreConfig;
pub use errors::Result;
pub use migrations::MigrationReport;
pub use provider::ContentProvider;
pub use rows::{RowGetter, RowSet};
