//! Error types for the ledger.

use std::path::PathBuf;

/// Errors that can occur while capturing, diffing, or persisting a table
/// definition.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The definition text lacks the `(` or the trailing engine clause.
    #[error("Malformed definition: {reason}")]
    MalformedDefinition {
        /// What was missing or out of place.
        reason: String,
    },

    /// The history log could not be read or appended to.
    #[error("Persistence error on '{}': {source}", path.display())]
    Persistence {
        /// The log resource involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Statements were computed but the entry recording them was not
    /// appended. The statements are carried so the caller can report them.
    #[error("Capture of '{table}' not recorded ({} statements computed): {source}", statements.len())]
    Unrecorded {
        /// Table whose entry was lost.
        table: String,
        /// Statements synthesized for the run.
        statements: Vec<String>,
        /// The persistence failure.
        #[source]
        source: Box<LedgerError>,
    },

    /// A persisted log could not be decoded into entries.
    #[error("Corrupt history log for table '{table}': {message}")]
    CorruptLog {
        /// Table whose log is unreadable.
        table: String,
        /// What went wrong while decoding.
        message: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error while rendering a report.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Multiple tables failed in one run.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<LedgerError>),
}

impl LedgerError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(table: &str, message: impl Into<String>) -> Self {
        Self::CorruptLog {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
