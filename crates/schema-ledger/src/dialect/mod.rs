//! Statement synthesis.
//!
//! A dialect turns each [`DiffEntry`] into one schema-change statement.
//! Entries it cannot express become [`DiffWarning`]s instead.

mod mysql;

use std::fmt;

use serde::Serialize;
use tracing::warn;

pub use mysql::MysqlDialect;

use crate::diff::{ChangeCategory, DiffEntry, TableDiff};
use crate::element::ElementKind;

/// A change that was detected but not translated into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DiffWarning {
    /// The dialect has no statement for this change.
    UnrepresentableChange {
        /// Table name.
        table: String,
        /// Category of the skipped entry.
        category: ChangeCategory,
        /// Kind of the skipped element.
        kind: ElementKind,
        /// The element line, without indentation.
        line: String,
        /// Why no statement was produced.
        reason: String,
    },
}

impl DiffWarning {
    /// Builds an unrepresentable-change warning for `entry`.
    #[must_use]
    pub fn unrepresentable(table: &str, entry: &DiffEntry, reason: impl Into<String>) -> Self {
        Self::UnrepresentableChange {
            table: table.to_string(),
            category: entry.category,
            kind: entry.kind(),
            line: entry.element.text().to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrepresentableChange {
                table,
                kind,
                line,
                reason,
                ..
            } => write!(f, "{table}: {kind} `{line}` not synthesized: {reason}"),
        }
    }
}

/// Trait for dialect-specific statement generation.
pub trait MigrationDialect {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statement for one diff entry, or the reason it has none.
    ///
    /// # Errors
    ///
    /// Returns a [`DiffWarning`] when the entry cannot be expressed.
    fn generate_sql(&self, table: &str, entry: &DiffEntry) -> Result<String, DiffWarning>;

    /// Generates the statement that creates a table from its definition body
    /// (the text from the first `(` onward).
    fn create_table_sql(&self, table: &str, body: &str) -> String {
        format!("CREATE TABLE IF NOT EXISTS {table} {body}")
    }

    /// Quotes an identifier (column, index, etc.).
    fn quote_identifier(&self, name: &str) -> String;
}

/// Statements synthesized from one table diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    /// Statements in diff order, without terminators.
    pub statements: Vec<String>,
    /// Entries that produced no statement.
    pub warnings: Vec<DiffWarning>,
}

impl Synthesis {
    /// Maps every entry of `diff` through `dialect`, preserving order.
    #[must_use]
    pub fn from_diff(table: &str, diff: &TableDiff, dialect: &impl MigrationDialect) -> Self {
        let mut synthesis = Self::default();
        for entry in &diff.entries {
            match dialect.generate_sql(table, entry) {
                Ok(sql) => synthesis.statements.push(sql),
                Err(warning) => {
                    warn!(dialect = dialect.name(), "{warning}");
                    synthesis.warnings.push(warning);
                }
            }
        }
        synthesis
    }

    /// Returns `true` if no statements were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
