//! contentdb Core - schema declaration, registration and request routing
//!
//! This crate is storage independent and provides:
//! - Column/table schema declaration through `SchemaBuilder` and `SchemaUpgrader`
//! - DDL and additive-migration rendering with memoized output
//! - The `Registry` binding model types to tables, resource identifiers and
//!   schema producers, including synthesized joins
//! - The `ResourceRouter` resolving identifiers to tables, rows and joins
//! - The query composer turning a route plus caller filters into SQL
//! - The error facility and the structured logging facility

pub mod creator;
pub mod errors;
pub mod logging_facility;
pub mod projection;
pub mod query;
pub mod registry;
pub mod router;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use contentdb_core_types::ResourceId;
pub use creator::{DataModel, IdentityOnly, ModelType, TableCreator};
pub use errors::{ContentDbError, ExError, ExErrorKind, Result};
pub use projection::ProjectionMap;
pub use query::{ConflictRule, QueryRequest, Statement};
pub use registry::{JoinEntry, Registry, TableEntry};
pub use router::{ResourceRouter, Route};
pub use schema::{
    ColumnSpec, ColumnType, DefaultValue, IndexSpec, SchemaBuilder, SchemaUpgrader,
    TableDefinition, ID_COLUMN,
};
pub use value::{ContentValues, Value};
