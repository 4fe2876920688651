use thiserror::Error;

/// Result type alias using MigrunError
pub type Result<T> = std::result::Result<T, MigrunError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in structured log events and
/// in test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Connectivity
    Connection,
    Timeout,
    // Script set
    InvalidScript,
    DuplicateVersion,
    MissingMigrations,
    // Execution
    MigrationFailed,
    Persistence,
    Query,
    // Environment
    Config,
    Io,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Connection => "ERR_CONNECTION",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::InvalidScript => "ERR_INVALID_SCRIPT",
            ExErrorKind::DuplicateVersion => "ERR_DUPLICATE_VERSION",
            ExErrorKind::MissingMigrations => "ERR_MISSING_MIGRATIONS",
            ExErrorKind::MigrationFailed => "ERR_MIGRATION_FAILED",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Query => "ERR_QUERY",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
        }
    }
}

/// Canonical structured error type
///
/// Flattened view of a `MigrunError` with classification fields, used by
/// `log_op_error!` to emit `err_kind`/`err_code`.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    version: Option<i64>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            version: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add script version context
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
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

    pub fn version(&self) -> Option<i64> {
        self.version
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
        if let Some(version) = self.version {
            write!(f, " (version: {})", version)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for connecting, probing, migrating and querying
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrunError {
    /// The database could not be reached or refused the handshake
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// The database never answered the liveness probe
    #[error("Database not ready after {attempts} attempt(s): {last_error}")]
    ProbeTimeout { attempts: u32, last_error: String },

    /// A specific script failed to apply; nothing of it was recorded
    #[error("Migration {version} ({name}) failed: {reason}")]
    Migration {
        version: i64,
        name: String,
        reason: String,
    },

    /// Unapplied scripts older than the newest applied one, with allow-missing off
    #[error("Missing migrations older than the current version: {versions:?}")]
    MissingMigrations { versions: Vec<i64> },

    /// Two scripts in one source share a version number
    #[error("Duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        version: i64,
        first: String,
        second: String,
    },

    /// A script file could not be parsed
    #[error("Invalid migration script {file}: {reason}")]
    InvalidScript { file: String, reason: String },

    /// Reading or writing the applied-migration records failed
    #[error("Persistence error in {op}: {message}")]
    Persistence { op: String, message: String },

    /// A data-access call failed
    #[error("Query {op} failed: {message}")]
    Query { op: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error in {op}: {message}")]
    Io { op: String, message: String },
}

impl MigrunError {
    /// Convenience constructor for I/O failures
    pub fn io(op: impl Into<String>, err: std::io::Error) -> Self {
        MigrunError::Io {
            op: op.into(),
            message: err.to_string(),
        }
    }

    /// Convenience constructor for configuration failures
    pub fn config(message: impl Into<String>) -> Self {
        MigrunError::Config {
            message: message.into(),
        }
    }
}

impl From<MigrunError> for ExError {
    fn from(err: MigrunError) -> Self {
        let message = err.to_string();
        match err {
            MigrunError::Connection { .. } => {
                ExError::new(ExErrorKind::Connection).with_op("connect")
            }
            MigrunError::ProbeTimeout { .. } => {
                ExError::new(ExErrorKind::Timeout).with_op("await_ready")
            }
            MigrunError::Migration { version, .. } => ExError::new(ExErrorKind::MigrationFailed)
                .with_op("apply_migration")
                .with_version(version),
            MigrunError::MissingMigrations { .. } => {
                ExError::new(ExErrorKind::MissingMigrations).with_op("plan")
            }
            MigrunError::DuplicateVersion { version, .. } => {
                ExError::new(ExErrorKind::DuplicateVersion)
                    .with_op("load_scripts")
                    .with_version(version)
            }
            MigrunError::InvalidScript { .. } => {
                ExError::new(ExErrorKind::InvalidScript).with_op("load_scripts")
            }
            MigrunError::Persistence { op, .. } => {
                ExError::new(ExErrorKind::Persistence).with_op(op)
            }
            MigrunError::Query { op, .. } => ExError::new(ExErrorKind::Query).with_op(op),
            MigrunError::Config { .. } => ExError::new(ExErrorKind::Config),
            MigrunError::Io { op, .. } => ExError::new(ExErrorKind::Io).with_op(op),
        }
        .with_message(message)
    }
}

impl From<&MigrunError> for ExError {
    fn from(err: &MigrunError) -> Self {
        err.clone().into()
    }
}
