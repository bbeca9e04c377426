//! Error handling for contentdb-store
//!
//! Wraps contentdb-core ExError with store-specific helpers

use contentdb_core::errors::{ContentDbError, ExError, ExErrorKind};
use rusqlite::ErrorCode;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Whether a rusqlite error is a constraint failure
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Create a database error from rusqlite::Error
///
/// Constraint failures become `ConstraintViolation`, everything else
/// `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = if is_constraint_violation(&err) {
        ExErrorKind::ConstraintViolation
    } else {
        ExErrorKind::Persistence
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Database error for a statement against one table
pub fn table_error(op: &str, table: &str, err: rusqlite::Error) -> ExError {
    if is_constraint_violation(&err) {
        return ExError::from(ContentDbError::ConstraintViolation {
            table: table.to_string(),
            message: err.to_string(),
        })
        .with_op(op);
    }
    from_rusqlite(err).with_op(op).with_entity_id(table)
}

/// Create a migration error
pub fn migration_error(table: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_entity_id(table)
        .with_message(format!("Migration of table {} failed: {}", table, reason))
}

/// Create a configuration error
pub fn config_error(reason: impl Into<String>) -> ExError {
    ExError::from(ContentDbError::InvalidConfig {
        reason: reason.into(),
    })
    .with_op("configure")
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Error for a poisoned connection lock
pub fn lock_poisoned(op: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op.to_string())
        .with_message("connection lock poisoned")
}
