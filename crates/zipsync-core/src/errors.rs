use thiserror::Error;

/// Result type alias using ZipSyncError
pub type Result<T> = std::result::Result<T, ZipSyncError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and external API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidConfig,
    NotFound,
    Deleted,
    DuplicateKey,
    UniqueKeyConflict,

    // Store
    StoreFetch,
    StoreCommit,

    // Lifecycle
    Cancelled,
    Concurrency,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Deleted => "ERR_DELETED",
            ExErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            ExErrorKind::UniqueKeyConflict => "ERR_UNIQUE_KEY_CONFLICT",
            ExErrorKind::StoreFetch => "ERR_STORE_FETCH",
            ExErrorKind::StoreCommit => "ERR_STORE_COMMIT",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Structured representation of errors with classification fields for
/// programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    unique_key: Option<String>,
    entity_id: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            unique_key: None,
            entity_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity name context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add unique key context
    pub fn with_unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    /// Add entity identifier context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn unique_key(&self) -> Option<&str> {
        self.unique_key.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
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
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(key) = &self.unique_key {
            write!(f, " (unique_key: {})", key)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for reconciliation, import and store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZipSyncError {
    // ===== Store Errors =====
    /// The batch fetch of existing entities failed; the whole batch is void
    #[error("Fetch of existing {entity} entities failed: {reason}")]
    StoreFetch { entity: String, reason: String },

    /// Writing a unit of work back to the store failed
    #[error("Commit of {entity} entities failed: {reason}")]
    StoreCommit { entity: String, reason: String },

    /// Two committed entities would share one unique key
    #[error("Unique key conflict for {entity}: key {key} is already held by another entity")]
    UniqueKeyConflict { entity: String, key: String },

    // ===== Identity Errors =====
    /// Entity identifier does not resolve in the context or store
    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// Entity was deleted in the current unit of work
    #[error("Entity was deleted: {entity_id}")]
    EntityDeleted { entity_id: String },

    // ===== Validation Errors =====
    /// The same unique key appears more than once in one batch
    #[error("Duplicate key {key} in {entity} batch")]
    DuplicateKey { entity: String, key: String },

    /// An intermediate record could not be applied to its entity
    #[error("Invalid input for key {key}: {reason}")]
    InvalidInput { key: String, reason: String },

    /// Import configuration is unusable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Lifecycle Errors =====
    /// Work was cancelled before it was applied
    #[error("Cancelled after {committed_batches} committed batches")]
    Cancelled { committed_batches: usize },

    /// The worker that owns the store is gone
    #[error("Worker unavailable: {reason}")]
    WorkerUnavailable { reason: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON/TOML encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from ZipSyncError to the canonical ExError
impl From<ZipSyncError> for ExError {
    fn from(err: ZipSyncError) -> Self {
        match err {
            ZipSyncError::StoreFetch { entity, reason } => ExError::new(ExErrorKind::StoreFetch)
                .with_op("fetch_sorted")
                .with_entity(entity)
                .with_message(reason),

            ZipSyncError::StoreCommit { entity, reason } => {
                ExError::new(ExErrorKind::StoreCommit)
                    .with_op("commit")
                    .with_entity(entity)
                    .with_message(reason)
            }

            ZipSyncError::UniqueKeyConflict { entity, key } => {
                ExError::new(ExErrorKind::UniqueKeyConflict)
                    .with_op("commit")
                    .with_entity(entity)
                    .with_unique_key(key)
                    .with_message("Unique key already held by another entity")
            }

            ZipSyncError::EntityNotFound { entity_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(entity_id)
                .with_message("Entity not found"),

            ZipSyncError::EntityDeleted { entity_id } => ExError::new(ExErrorKind::Deleted)
                .with_entity_id(entity_id)
                .with_message("Entity was deleted"),

            ZipSyncError::DuplicateKey { entity, key } => ExError::new(ExErrorKind::DuplicateKey)
                .with_op("check_unique_keys")
                .with_entity(entity)
                .with_unique_key(key)
                .with_message("Batch contains the same key more than once"),

            ZipSyncError::InvalidInput { key, reason } => ExError::new(ExErrorKind::InvalidInput)
                .with_unique_key(key)
                .with_message(reason),

            ZipSyncError::InvalidConfig { reason } => ExError::new(ExErrorKind::InvalidConfig)
                .with_op("validate_config")
                .with_message(reason),

            ZipSyncError::Cancelled { committed_batches } => ExError::new(ExErrorKind::Cancelled)
                .with_message(format!(
                    "Cancelled after {} committed batches",
                    committed_batches
                )),

            ZipSyncError::WorkerUnavailable { reason } => {
                ExError::new(ExErrorKind::Concurrency).with_message(reason)
            }

            ZipSyncError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            ZipSyncError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to ZipSyncError
impl From<serde_json::Error> for ZipSyncError {
    fn from(err: serde_json::Error) -> Self {
        ZipSyncError::Serialization {
            message: err.to_string(),
        }
    }
}
