//! Error types for the script backup library.

use thiserror::Error;

/// Exit code for bad arguments or configuration.
pub const EXIT_ARGUMENT_ERROR: u8 = 1;

/// Exit code for failures while connecting, scripting or writing output.
pub const EXIT_RUNTIME_ERROR: u8 = 2;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed command-line input.
    #[error("{0}")]
    Argument(String),

    /// Cannot reach or authenticate to the server.
    ///
    /// Only `message` is shown to users; `detail` carries the driver diagnostic.
    #[error("{message}")]
    Connection { message: String, detail: String },

    /// Catalog enumeration, dependency expansion or rendering failed.
    #[error("Script error in database {database}: {message}")]
    Scripting { database: String, message: String },

    /// The dependency graph of a database contains a cycle.
    #[error("Dependency cycle in database {database} involving: {}", objects.join(", "))]
    DependencyCycle {
        database: String,
        objects: Vec<String>,
    },

    /// The catalog reported an object it cannot resolve.
    #[error("Object {key} not found in database {database}")]
    UnknownObject { database: String, key: String },

    /// Output path template could not be parsed or expanded.
    #[error("Template error: {0}")]
    Template(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// SQL Server driver error
    #[error("SQL Server error: {0}")]
    Source(#[from] tiberius::error::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        BackupError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Connection error with the generic user-facing message.
    pub fn connection(detail: impl ToString) -> Self {
        BackupError::Connection {
            message: "Unable to connect to the server".to_string(),
            detail: detail.to_string(),
        }
    }

    /// Create a Scripting error for a database.
    pub fn scripting(database: impl Into<String>, message: impl ToString) -> Self {
        BackupError::Scripting {
            database: database.into(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BackupError::Config(_)
            | BackupError::Argument(_)
            | BackupError::Template(_)
            | BackupError::Yaml(_) => EXIT_ARGUMENT_ERROR,
            _ => EXIT_RUNTIME_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        if let BackupError::Connection { detail, .. } = self {
            output.push_str(&format!("\nCaused by:\n  1: {}", detail));
            return output;
        }

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, BackupError>;
