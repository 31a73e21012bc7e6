//! Append-only table definition history with migration synthesis.
//!
//! `schema-ledger` captures a table's `SHOW CREATE TABLE` definition each time
//! it runs, compares it with the previous capture of the same table, and
//! synthesizes the additive statements that evolve the old shape into the new
//! one. Every capture is appended to a per-table log, so the next run always
//! has something to diff against.
//!
//! # Architecture
//!
//! - **Definition** - Extracts the element block from a raw definition
//! - **Element** - Classifies each line as a column or a primary/unique/plain key
//! - **Diff** - Compares two captures and classifies added/removed/modified elements
//! - **Dialect** - Turns each diff entry into one statement
//! - **History** - Append-only per-table log of captures and their statements
//! - **Pipeline** - Runs one table (or many) through all of the above
//!
//! # Example
//!
//! ```rust
//! use schema_ledger::prelude::*;
//!
//! let ledger = Ledger::new(MemoryLogStore::new(), "build-host");
//!
//! let v1 = "CREATE TABLE `users` (\n  `id` int(11) NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";
//! let v2 = "CREATE TABLE `users` (\n  `id` int(11) NOT NULL,\n  `email` varchar(64) DEFAULT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";
//!
//! ledger.capture("users", v1, false)?;
//! let plan = ledger.capture("users", v2, false)?;
//! assert_eq!(
//!     plan.statements,
//!     ["ALTER TABLE users ADD COLUMN `email` varchar(64) DEFAULT NULL"]
//! );
//! # Ok::<(), schema_ledger::error::LedgerError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Record one table's definition and print the statements
//! mysql -N -e 'SHOW CREATE TABLE users' | cut -f2 | schema-ledger capture --table users --definition -
//!
//! # Record every definition in a directory, one file per table
//! schema-ledger run --definitions dumps/
//!
//! # Inspect a table's history
//! schema-ledger history --table users
//! ```

pub mod config;
pub mod definition;
pub mod dialect;
pub mod diff;
pub mod element;
pub mod error;
pub mod history;
pub mod pipeline;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::LedgerConfig;
    pub use crate::definition::Definition;
    pub use crate::dialect::{DiffWarning, MigrationDialect, MysqlDialect, Synthesis};
    pub use crate::diff::{ChangeCategory, DiffEntry, SnapshotDiffer, TableDiff, TextualDiffer};
    pub use crate::element::{Element, ElementKind, KeyKind};
    pub use crate::error::{LedgerError, Result};
    pub use crate::history::{
        Capture, FileLogStore, HistoryLog, LogEntry, LogStore, MemoryLogStore,
    };
    pub use crate::pipeline::{Ledger, Outcome, Pipeline, Plan, RunReport, TableInput};
}
