//! Capture pipeline.
//!
//! One table at a time: parse the current definition, look up the previous
//! capture, diff the two, synthesize statements, and append the new entry.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::definition::{table_body, Definition};
use crate::dialect::{DiffWarning, MigrationDialect, MysqlDialect};
use crate::diff::{SnapshotDiffer, TableDiff, TextualDiffer};
use crate::error::{LedgerError, Result};
use crate::history::{Capture, FileLogStore, HistoryLog, LogEntry, LogStore};

/// What a capture amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// No previous capture existed.
    Initial,
    /// The element block changed.
    Changed,
    /// The element block is identical to the previous capture.
    Unchanged,
}

/// The computed result of one table's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Table identifier.
    pub table: String,
    /// What happened.
    pub outcome: Outcome,
    /// Classified changes against the previous capture.
    pub diff: TableDiff,
    /// Statements to run, in order.
    pub statements: Vec<String>,
    /// Changes that produced no statement.
    pub warnings: Vec<DiffWarning>,
    /// The entry to append, absent when nothing changed.
    #[serde(skip)]
    pub entry: Option<LogEntry>,
}

/// Parses, diffs and synthesizes one capture.
#[derive(Debug, Clone, Default)]
pub struct Pipeline<D = TextualDiffer, M = MysqlDialect> {
    differ: D,
    dialect: M,
}

impl Pipeline {
    /// Creates the default pipeline: textual diffing, MySQL statements.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            differ: TextualDiffer::new(),
            dialect: MysqlDialect::new(),
        }
    }
}

impl<D: SnapshotDiffer, M: MigrationDialect> Pipeline<D, M> {
    /// Creates a pipeline from its parts.
    #[must_use]
    pub const fn with_parts(differ: D, dialect: M) -> Self {
        Self { differ, dialect }
    }

    /// Computes the plan for `definition`, diffing against whatever
    /// `previous` returns for `table`.
    ///
    /// Nothing is persisted here; the returned plan carries the entry the
    /// caller should append.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MalformedDefinition`] if either capture cannot
    /// be parsed, or any error raised by `previous`.
    pub fn plan<F>(&self, table: &str, definition: &str, origin: &str, previous: F) -> Result<Plan>
    where
        F: FnOnce(&str) -> Result<Option<Capture>>,
    {
        let current = Definition::parse(definition)?;
        let capture = Capture::now(table, definition, origin);

        let Some(prior) = previous(table)? else {
            let create = self
                .dialect
                .create_table_sql(table, table_body(definition)?);
            return Ok(Plan {
                table: table.to_string(),
                outcome: Outcome::Initial,
                diff: TableDiff::new(),
                statements: vec![create],
                warnings: Vec::new(),
                entry: Some(LogEntry::initial(capture)),
            });
        };

        let old = Definition::parse(&prior.definition)?;
        if old.block() == current.block() {
            return Ok(Plan {
                table: table.to_string(),
                outcome: Outcome::Unchanged,
                diff: TableDiff::new(),
                statements: Vec::new(),
                warnings: Vec::new(),
                entry: None,
            });
        }

        let diff = self.differ.diff(&old, &current);
        let synthesis = diff.to_sql(table, &self.dialect);
        Ok(Plan {
            table: table.to_string(),
            outcome: Outcome::Changed,
            entry: Some(LogEntry::changed(capture, synthesis.statements.clone())),
            diff,
            statements: synthesis.statements,
            warnings: synthesis.warnings,
        })
    }
}

/// One table's current definition, as supplied by the introspection side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInput {
    /// Table identifier.
    pub table: String,
    /// Raw definition text.
    pub definition: String,
}

impl TableInput {
    /// Creates an input.
    #[must_use]
    pub fn new(table: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            definition: definition.into(),
        }
    }

    /// Loads every `*.sql` file in `dir`, sorted by file name. The table
    /// identifier is the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the directory or a file cannot
    /// be read.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| LedgerError::persistence(dir, e))? {
            let path = entry.map_err(|e| LedgerError::persistence(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .filter_map(|path| {
                let table = path.file_stem()?.to_str()?.to_string();
                Some((table, path))
            })
            .map(|(table, path)| {
                let definition =
                    fs::read_to_string(&path).map_err(|e| LedgerError::persistence(&path, e))?;
                Ok(Self { table, definition })
            })
            .collect()
    }
}

/// A table that failed during a multi-table run.
#[derive(Debug, Serialize)]
pub struct TableFailure {
    /// Table identifier.
    pub table: String,
    /// Rendered error.
    pub message: String,
    /// The error itself.
    #[serde(skip)]
    pub error: LedgerError,
}

/// Results of a multi-table run.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Plans of the tables that completed, in input order.
    pub plans: Vec<Plan>,
    /// Tables that failed, in input order.
    pub failures: Vec<TableFailure>,
}

impl RunReport {
    /// Returns `true` if every table completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts the report into the completed plans, or a combined error if
    /// any table failed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Multiple`] holding every table's error.
    pub fn into_result(self) -> Result<Vec<Plan>> {
        if self.failures.is_empty() {
            Ok(self.plans)
        } else {
            Err(LedgerError::Multiple(
                self.failures.into_iter().map(|f| f.error).collect(),
            ))
        }
    }
}

/// Ties the pipeline to a history log.
#[derive(Debug)]
pub struct Ledger<S, D = TextualDiffer, M = MysqlDialect> {
    history: HistoryLog<S>,
    pipeline: Pipeline<D, M>,
    origin: String,
}

impl Ledger<FileLogStore> {
    /// Opens the file-backed ledger described by `config`.
    #[must_use]
    pub fn open(config: &LedgerConfig) -> Self {
        Self::new(FileLogStore::new(config.log_dir.clone()), &config.origin)
    }
}

impl<S: LogStore> Ledger<S> {
    /// Creates a ledger over `store` with the default pipeline.
    #[must_use]
    pub fn new(store: S, origin: &str) -> Self {
        Self::with_pipeline(store, Pipeline::new(), origin)
    }
}

impl<S: LogStore, D: SnapshotDiffer, M: MigrationDialect> Ledger<S, D, M> {
    /// Creates a ledger with a custom pipeline.
    #[must_use]
    pub fn with_pipeline(store: S, pipeline: Pipeline<D, M>, origin: &str) -> Self {
        Self {
            history: HistoryLog::new(store),
            pipeline,
            origin: origin.to_string(),
        }
    }

    /// The underlying history log.
    #[must_use]
    pub const fn history(&self) -> &HistoryLog<S> {
        &self.history
    }

    /// Runs one table through the pipeline and, unless `dry_run` is set,
    /// appends the resulting entry.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error, or [`LedgerError::Unrecorded`] with the
    /// computed statements if the append fails.
    pub fn capture(&self, table: &str, definition: &str, dry_run: bool) -> Result<Plan> {
        let plan = self
            .pipeline
            .plan(table, definition, &self.origin, |t| {
                self.history.most_recent(t)
            })?;

        for warning in &plan.warnings {
            warn!("{warning}");
        }

        match (&plan.entry, dry_run) {
            (Some(entry), false) => {
                self.history
                    .append(entry)
                    .map_err(|source| LedgerError::Unrecorded {
                        table: table.to_string(),
                        statements: plan.statements.clone(),
                        source: Box::new(source),
                    })?;
            }
            (Some(_), true) => info!(table, "dry run, entry not recorded"),
            (None, _) => info!(table, "definition unchanged"),
        }

        Ok(plan)
    }

    /// Runs every input in order. A failing table is recorded in the report
    /// and does not stop the tables after it.
    pub fn capture_all<I>(&self, inputs: I, dry_run: bool) -> RunReport
    where
        I: IntoIterator<Item = TableInput>,
    {
        let mut report = RunReport::default();
        for input in inputs {
            match self.capture(&input.table, &input.definition, dry_run) {
                Ok(plan) => report.plans.push(plan),
                Err(error) => {
                    warn!(table = input.table.as_str(), "{error}");
                    report.failures.push(TableFailure {
                        table: input.table,
                        message: error.to_string(),
                        error,
                    });
                }
            }
        }
        report
    }
}
