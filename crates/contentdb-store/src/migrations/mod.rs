//! Migration framework
//!
//! Provides:
//! - Physical schema introspection
//! - The orchestrator that creates missing registered tables and evolves
//!   existing ones across schema versions

pub mod introspect;
mod orchestrator;

pub use orchestrator::{migrate, MigrationReport};
