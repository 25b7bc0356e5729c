use thiserror::Error;

use crate::rules::validation::FieldError;

/// Result type alias using LibrisError
pub type Result<T> = std::result::Result<T, LibrisError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// surfaced by the catalog core. Each kind maps to a stable error code that the
/// HTTP layer can map to a status code without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup
    NotFound,

    // Conflicts
    /// Stored version no longer matches the version read at load time
    EditConflict,
    /// A uniqueness constraint (e.g. user email) rejected the write
    DuplicateKey,

    // Input
    Validation,

    // Backend
    Timeout,
    Persistence,
    Serialization,
    Unsupported,

    // Auth
    /// Token missing, malformed, unknown, expired, or of the wrong scope
    Unauthorised,
    /// Authenticated, but not activated or missing the required permission
    Forbidden,

    // Credentials
    Credential,

    // Startup
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::EditConflict => "ERR_EDIT_CONFLICT",
            ExErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            ExErrorKind::Validation => "ERR_VALIDATION",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Unsupported => "ERR_UNSUPPORTED",
            ExErrorKind::Unauthorised => "ERR_UNAUTHORISED",
            ExErrorKind::Forbidden => "ERR_FORBIDDEN",
            ExErrorKind::Credential => "ERR_CREDENTIAL",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for both conflict causes (stale version, uniqueness violation)
    pub fn is_conflict(&self) -> bool {
        matches!(self, ExErrorKind::EditConflict | ExErrorKind::DuplicateKey)
    }

    /// True for every access-control denial
    pub fn is_authorization(&self) -> bool {
        matches!(self, ExErrorKind::Unauthorised | ExErrorKind::Forbidden)
    }

    /// True for kinds the caller cannot fix by changing its input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Persistence
                | ExErrorKind::Serialization
                | ExErrorKind::Unsupported
                | ExErrorKind::Credential
                | ExErrorKind::Config
                | ExErrorKind::Internal
        )
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    collection: Option<String>,
    entity_id: Option<String>,
    message: String,
    field_errors: Vec<FieldError>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            collection: None,
            entity_id: None,
            message: String::new(),
            field_errors: Vec::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add collection context
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach per-field validation messages
    pub fn with_field_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.field_errors = errors;
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Per-field validation messages, in the order they were detected
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
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
        if let Some(collection) = &self.collection {
            write!(f, " (collection: {})", collection)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for catalog storage, credential and authorization operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LibrisError {
    // ===== Lookup =====
    /// No record matches the key
    #[error("record not found in {collection}: {key}")]
    RecordNotFound { collection: String, key: String },

    // ===== Conflicts =====
    /// Stored version differs from the one presented, or the record vanished
    #[error("edit conflict on {collection} record {id}")]
    EditConflict { collection: String, id: i64 },

    /// Uniqueness constraint violated on insert or update
    #[error("duplicate value for {collection}.{field}")]
    DuplicateKey { collection: String, field: String },

    // ===== Validation =====
    /// One entry per violated invariant, all collected before returning
    #[error("validation failed: {}", format_field_errors(.errors))]
    Validation { errors: Vec<FieldError> },

    // ===== Backend =====
    /// Operation exceeded its deadline and was cancelled
    #[error("operation {op} timed out after {after_ms}ms")]
    Timeout { op: String, after_ms: u64 },

    /// Backend rejected or failed the operation
    #[error("persistence error in {op}: {message}")]
    Persistence { op: String, message: String },

    /// Stored data could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// The collection does not support the requested operation
    #[error("operation {op} is not supported for collection {collection}")]
    Unsupported { op: String, collection: String },

    // ===== Authorization =====
    /// Token malformed, unknown, expired, or of the wrong scope.
    /// Deliberately carries no detail about which.
    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    /// Anonymous principal attempted a protected operation
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    /// Authenticated user has not activated the account
    #[error("user {user_id} must be activated to access this resource")]
    InactiveAccount { user_id: i64 },

    /// Authenticated user lacks the permission code
    #[error("user {user_id} lacks permission {code}")]
    PermissionDenied { user_id: i64, code: String },

    // ===== Credentials =====
    /// Hashing, verification or random generation failed
    #[error("credential error: {message}")]
    Credential { message: String },

    // ===== Startup =====
    /// Store configuration could not be read or is invalid
    #[error("configuration error: {message}")]
    Config { message: String },

    // ===== Generic =====
    #[error("internal error: {message}")]
    Internal { message: String },
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LibrisError {
    /// Canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            LibrisError::RecordNotFound { .. } => ExErrorKind::NotFound,
            LibrisError::EditConflict { .. } => ExErrorKind::EditConflict,
            LibrisError::DuplicateKey { .. } => ExErrorKind::DuplicateKey,
            LibrisError::Validation { .. } => ExErrorKind::Validation,
            LibrisError::Timeout { .. } => ExErrorKind::Timeout,
            LibrisError::Persistence { .. } => ExErrorKind::Persistence,
            LibrisError::Serialization { .. } => ExErrorKind::Serialization,
            LibrisError::Unsupported { .. } => ExErrorKind::Unsupported,
            LibrisError::InvalidAuthenticationToken | LibrisError::AuthenticationRequired => {
                ExErrorKind::Unauthorised
            }
            LibrisError::InactiveAccount { .. } | LibrisError::PermissionDenied { .. } => {
                ExErrorKind::Forbidden
            }
            LibrisError::Credential { .. } => ExErrorKind::Credential,
            LibrisError::Config { .. } => ExErrorKind::Config,
            LibrisError::Internal { .. } => ExErrorKind::Internal,
        }
    }

    /// Shorthand for `RecordNotFound`
    pub fn not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        LibrisError::RecordNotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LibrisError::RecordNotFound { .. })
    }
}

/// Conversion from LibrisError to ExError
///
/// Lets logging macros and the HTTP layer work with the canonical facility
/// regardless of which operation produced the error.
impl From<LibrisError> for ExError {
    fn from(err: LibrisError) -> Self {
        let kind = err.kind();
        match err {
            LibrisError::RecordNotFound { collection, key } => ExError::new(kind)
                .with_collection(collection)
                .with_entity_id(key)
                .with_message("record not found"),

            LibrisError::EditConflict { collection, id } => ExError::new(kind)
                .with_collection(collection)
                .with_entity_id(id.to_string())
                .with_message("unable to update the record due to an edit conflict, please try again"),

            LibrisError::DuplicateKey { collection, field } => ExError::new(kind)
                .with_collection(collection)
                .with_message(format!("a record with this {} already exists", field)),

            LibrisError::Validation { errors } => ExError::new(kind)
                .with_message("failed validation")
                .with_field_errors(errors),

            LibrisError::Timeout { op, after_ms } => ExError::new(kind)
                .with_op(op)
                .with_message(format!("deadline of {}ms exceeded", after_ms)),

            LibrisError::Persistence { op, message } => {
                ExError::new(kind).with_op(op).with_message(message)
            }

            LibrisError::Serialization { message } => ExError::new(kind).with_message(message),

            LibrisError::Unsupported { op, collection } => ExError::new(kind)
                .with_op(op)
                .with_collection(collection)
                .with_message("operation not supported for this collection"),

            LibrisError::InvalidAuthenticationToken => {
                ExError::new(kind).with_message("invalid or missing authentication token")
            }

            LibrisError::AuthenticationRequired => ExError::new(kind)
                .with_message("you must be authenticated to access this resource"),

            LibrisError::InactiveAccount { user_id } => ExError::new(kind)
                .with_entity_id(user_id.to_string())
                .with_message("your user account must be activated to access this resource"),

            LibrisError::PermissionDenied { user_id, code } => ExError::new(kind)
                .with_entity_id(user_id.to_string())
                .with_message(format!(
                    "your user account doesn't have the {} permission",
                    code
                )),

            LibrisError::Credential { message } => ExError::new(kind).with_message(message),

            LibrisError::Config { message } => ExError::new(kind).with_message(message),

            LibrisError::Internal { message } => ExError::new(kind).with_message(message),
        }
    }
}

/// Conversion from serde_json::Error to LibrisError
impl From<serde_json::Error> for LibrisError {
    fn from(err: serde_json::Error) -> Self {
        LibrisError::Serialization {
            message: err.to_string(),
        }
    }
}
