use thiserror::Error;

/// Result type alias using ContentDbError
pub type Result<T> = std::result::Result<T, ContentDbError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and reporting across the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Schema definition
    /// Builder constraint called before any column was added
    Usage,
    InvalidInput,
    SchemaConflict,

    // Registration
    RegistrationConflict,
    Configuration,

    // Request handling
    NotFound,
    NotWritable,
    ConstraintViolation,

    // Integration/IO
    Persistence,
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Usage => "ERR_USAGE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::SchemaConflict => "ERR_SCHEMA_CONFLICT",
            ExErrorKind::RegistrationConflict => "ERR_REGISTRATION_CONFLICT",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::NotWritable => "ERR_NOT_WRITABLE",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a caller can reasonably recover from this kind at runtime
    ///
    /// Definition errors (usage, schema and registration conflicts,
    /// configuration) mean the model declaration itself is wrong.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExErrorKind::NotFound
                | ExErrorKind::NotWritable
                | ExErrorKind::ConstraintViolation
                | ExErrorKind::Persistence
                | ExErrorKind::Io
        )
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context
/// (operation, table or resource) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (a table name or resource identifier)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for schema declaration, registration and routing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentDbError {
    // ===== Usage Errors =====
    /// A column constraint was called before any column was added
    #[error("Table '{table}': '{call}' can only be called after adding a column")]
    ConstraintBeforeColumn { table: String, call: String },

    /// An update was requested with no values to set
    #[error("Update of table '{table}' has no values")]
    EmptyUpdate { table: String },

    /// Table name is not a plain SQL identifier
    #[error("Invalid table name: '{name}'")]
    InvalidTableName { name: String },

    // ===== Schema Conflicts =====
    /// More than one primary key declared on a table
    #[error("Table '{table}' can only have one PRIMARY KEY")]
    DuplicatePrimaryKey { table: String },

    /// NOT NULL column without a default value
    #[error("Column '{table}.{column}': NOT NULL constraint requires a default value")]
    NotNullWithoutDefault { table: String, column: String },

    /// NOT NULL declared on a column typed NULL
    #[error("Column '{table}.{column}' with type NULL cannot have NOT NULL constraint")]
    NotNullOnNullColumn { table: String, column: String },

    /// The identity column declared with a type other than INTEGER
    #[error("Column '{table}._id' must be INTEGER, declared {declared}")]
    NonIntegerIdentity { table: String, declared: String },

    /// REAL default that has no SQL literal (NaN or infinity)
    #[error("Column '{table}.{column}': default {value} is not a finite number")]
    NonFiniteDefault {
        table: String,
        column: String,
        value: String,
    },

    // ===== Registration Conflicts =====
    /// Table name already bound to a different model type
    #[error("Table '{table}' is already registered to {existing}, cannot register {requested}")]
    TableNameConflict {
        table: String,
        existing: String,
        requested: String,
    },

    /// Model type already bound to another table name
    #[error("Model {model} is already registered as table '{table}'")]
    ModelAlreadyRegistered { model: String, table: String },

    /// Model type was never registered
    #[error("Model {model} is not registered; call register() first")]
    UnregisteredModel { model: String },

    /// Join path already registered with a different column pair
    #[error("Join '{path}' is already registered as {registered}, requested {requested}")]
    JoinConflict {
        path: String,
        registered: String,
        requested: String,
    },

    // ===== Configuration =====
    /// Store records a newer schema version than configured
    #[error("Database version {recorded} is newer than configured version {configured}")]
    UnsupportedDowngrade { recorded: u32, configured: u32 },

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Request Errors =====
    /// Identifier matches no registered collection, item or join
    #[error("No resource matches {resource_id}")]
    NoRoute { resource_id: String },

    /// Table name is not registered
    #[error("Table not registered: {table}")]
    UnknownTable { table: String },

    /// Mutation addressed to a join resource
    #[error("Join resource {resource_id} is not writable")]
    JoinNotWritable { resource_id: String },

    /// Row conflicts with a constraint at the storage layer
    #[error("Constraint violation on table '{table}': {message}")]
    ConstraintViolation { table: String, message: String },

    // ===== Generic Errors =====
    /// Storage failure other than a constraint violation
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ContentDbError {
    /// The canonical kind this error classifies as
    pub fn kind(&self) -> ExErrorKind {
        match self {
            ContentDbError::ConstraintBeforeColumn { .. } | ContentDbError::EmptyUpdate { .. } => {
                ExErrorKind::Usage
            }
            ContentDbError::InvalidTableName { .. } => ExErrorKind::InvalidInput,
            ContentDbError::DuplicatePrimaryKey { .. }
            | ContentDbError::NotNullWithoutDefault { .. }
            | ContentDbError::NotNullOnNullColumn { .. }
            | ContentDbError::NonIntegerIdentity { .. }
            | ContentDbError::NonFiniteDefault { .. } => ExErrorKind::SchemaConflict,
            ContentDbError::TableNameConflict { .. }
            | ContentDbError::ModelAlreadyRegistered { .. }
            | ContentDbError::UnregisteredModel { .. }
            | ContentDbError::JoinConflict { .. } => ExErrorKind::RegistrationConflict,
            ContentDbError::UnsupportedDowngrade { .. } | ContentDbError::InvalidConfig { .. } => {
                ExErrorKind::Configuration
            }
            ContentDbError::NoRoute { .. } | ContentDbError::UnknownTable { .. } => {
                ExErrorKind::NotFound
            }
            ContentDbError::JoinNotWritable { .. } => ExErrorKind::NotWritable,
            ContentDbError::ConstraintViolation { .. } => ExErrorKind::ConstraintViolation,
            ContentDbError::Persistence { .. } => ExErrorKind::Persistence,
            ContentDbError::Internal { .. } => ExErrorKind::Internal,
        }
    }

    fn entity(&self) -> Option<&str> {
        match self {
            ContentDbError::ConstraintBeforeColumn { table, .. }
            | ContentDbError::EmptyUpdate { table }
            | ContentDbError::DuplicatePrimaryKey { table }
            | ContentDbError::NotNullWithoutDefault { table, .. }
            | ContentDbError::NotNullOnNullColumn { table, .. }
            | ContentDbError::NonIntegerIdentity { table, .. }
            | ContentDbError::NonFiniteDefault { table, .. }
            | ContentDbError::TableNameConflict { table, .. }
            | ContentDbError::ModelAlreadyRegistered { table, .. }
            | ContentDbError::UnknownTable { table }
            | ContentDbError::ConstraintViolation { table, .. } => Some(table),
            ContentDbError::InvalidTableName { name } => Some(name),
            ContentDbError::UnregisteredModel { model } => Some(model),
            ContentDbError::JoinConflict { path, .. } => Some(path),
            ContentDbError::NoRoute { resource_id }
            | ContentDbError::JoinNotWritable { resource_id } => Some(resource_id),
            ContentDbError::UnsupportedDowngrade { .. }
            | ContentDbError::InvalidConfig { .. }
            | ContentDbError::Persistence { .. }
            | ContentDbError::Internal { .. } => None,
        }
    }
}

/// Conversion from ContentDbError to ExError
///
/// Keeps the variant's display text as the message and its table or
/// resource as entity context.
impl From<ContentDbError> for ExError {
    fn from(err: ContentDbError) -> Self {
        let mut ex = ExError::new(err.kind()).with_message(err.to_string());
        if let Some(entity) = err.entity() {
            ex = ex.with_entity_id(entity);
        }
        ex
    }
}
