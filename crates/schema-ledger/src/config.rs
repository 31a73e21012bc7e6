//! Resolved configuration.

use std::path::PathBuf;

use crate::error::{LedgerError, Result};

/// Default directory for history logs.
pub const DEFAULT_LOG_DIR: &str = "doc";

/// Origin recorded when none is configured.
pub const DEFAULT_ORIGIN: &str = "unknown";

/// The local machine's host name, or [`DEFAULT_ORIGIN`] if it is not valid
/// UTF-8.
#[must_use]
pub fn local_origin() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| DEFAULT_ORIGIN.to_string())
}

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Directory holding one log file per table.
    pub log_dir: PathBuf,
    /// Origin host recorded in each entry header.
    pub origin: String,
}

impl LedgerConfig {
    /// Creates a validated configuration.
    ///
    /// A blank origin falls back to [`DEFAULT_ORIGIN`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidConfig`] if the origin spans several
    /// lines, which would break the entry header.
    pub fn new(log_dir: impl Into<PathBuf>, origin: &str) -> Result<Self> {
        let origin = origin.trim();
        if origin.contains(['\n', '\r']) {
            return Err(LedgerError::InvalidConfig(format!(
                "origin must be a single line, got {origin:?}"
            )));
        }
        let origin = if origin.is_empty() {
            DEFAULT_ORIGIN
        } else {
            origin
        };
        Ok(Self {
            log_dir: log_dir.into(),
            origin: origin.to_string(),
        })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}
