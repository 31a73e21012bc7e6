//! Definition history tracking.
//!
//! Every table has one append-only log of its captured definitions. An entry
//! looks like this:
//!
//! ```text
//! # Create@2026-10-19 09:30:00,By: build-host
//! CREATE TABLE `users` (
//!   `id` int(11) NOT NULL,
//!   PRIMARY KEY (`id`)
//! ) ENGINE=InnoDB;
//! # change:
//! ALTER TABLE users ADD COLUMN `email` varchar(64);
//! # =====================================================================================
//! ```
//!
//! Entries are concatenated in append order. The store interface only knows
//! how to append a block and read everything back; nothing can rewrite a
//! block once written.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{LedgerError, Result};

/// Start-of-entry marker.
pub const ENTRY_MARKER: &str = "# Create@";

/// Separator between the timestamp and the origin in an entry header.
const ORIGIN_SEPARATOR: &str = ",By: ";

/// Header of the statement section.
pub const CHANGE_MARKER: &str = "# change:";

/// Line written in place of statements when a changed capture produced none.
pub const NO_STATEMENTS_NOTE: &str = "-- no statements required";

/// End-of-entry delimiter.
pub const END_DELIMITER: &str =
    "# =====================================================================================";

/// Timestamp format used in entry headers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One captured table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    /// Table identifier.
    pub table: String,
    /// Raw definition text, without a trailing `;`.
    pub definition: String,
    /// When the definition was read.
    pub captured_at: NaiveDateTime,
    /// Host or process that took the capture.
    pub origin: String,
}

impl Capture {
    /// Creates a capture stamped with the current local time, truncated to
    /// whole seconds so it survives a round trip through the log.
    #[must_use]
    pub fn now(
        table: impl Into<String>,
        definition: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        let now = Local::now().naive_local();
        Self::at(
            table,
            definition,
            now.with_nanosecond(0).unwrap_or(now),
            origin,
        )
    }

    /// Creates a capture with an explicit timestamp.
    #[must_use]
    pub fn at(
        table: impl Into<String>,
        definition: impl Into<String>,
        captured_at: NaiveDateTime,
        origin: impl Into<String>,
    ) -> Self {
        let definition = definition.into();
        Self {
            table: table.into(),
            definition: definition.trim_end().trim_end_matches(';').to_string(),
            captured_at,
            origin: origin.into(),
        }
    }
}

/// A capture together with the statements synthesized for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// The captured definition.
    pub capture: Capture,
    /// Statements, without terminators. Empty for a first capture.
    pub statements: Vec<String>,
    /// Whether the entry carries a change section even without statements.
    pub changed: bool,
}

impl LogEntry {
    /// The first entry of a table's log.
    #[must_use]
    pub const fn initial(capture: Capture) -> Self {
        Self {
            capture,
            statements: Vec::new(),
            changed: false,
        }
    }

    /// An entry that follows an earlier capture.
    #[must_use]
    pub const fn changed(capture: Capture, statements: Vec<String>) -> Self {
        Self {
            capture,
            statements,
            changed: true,
        }
    }

    /// Renders the entry as one contiguous block.
    #[must_use]
    pub fn encode(&self) -> String {
        let capture = &self.capture;
        let mut block = String::new();
        block.push_str(ENTRY_MARKER);
        block.push_str(&capture.captured_at.format(TIMESTAMP_FORMAT).to_string());
        block.push_str(ORIGIN_SEPARATOR);
        block.push_str(&capture.origin);
        block.push('\n');
        block.push_str(&capture.definition);
        block.push_str(";\n");
        if self.changed {
            block.push_str(CHANGE_MARKER);
            block.push('\n');
            if self.statements.is_empty() {
                block.push_str(NO_STATEMENTS_NOTE);
                block.push('\n');
            }
            for statement in &self.statements {
                block.push_str(statement);
                block.push_str(";\n");
            }
        }
        block.push_str(END_DELIMITER);
        block.push('\n');
        block
    }

    /// Decodes every complete entry in a table's log.
    ///
    /// Text outside entries is ignored. An entry cut short by an interrupted
    /// append has no end delimiter; it is skipped with a warning, whether it
    /// is the last entry or was followed by later appends.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CorruptLog`] if the header of a complete entry
    /// cannot be read.
    pub fn decode_all(table: &str, text: &str) -> Result<Vec<Self>> {
        let mut entries = Vec::new();
        let mut current: Option<(&str, Vec<&str>)> = None;

        for line in text.lines() {
            if line.starts_with(ENTRY_MARKER) {
                if let Some((torn, _)) = current.replace((line, Vec::new())) {
                    warn!(table, header = torn, "skipping torn log entry");
                }
            } else if line == END_DELIMITER {
                if let Some((header, body)) = current.take() {
                    entries.push(Self::decode_entry(table, header, &body)?);
                }
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line);
            }
        }

        if let Some((header, _)) = current {
            warn!(table, header, "ignoring incomplete trailing log entry");
        }

        Ok(entries)
    }

    fn decode_entry(table: &str, header: &str, body: &[&str]) -> Result<Self> {
        let (captured_at, origin) = parse_header(table, header)?;
        let mut definition: Vec<&str> = Vec::new();
        let mut statements: Vec<String> = Vec::new();
        let mut pending = String::new();
        let mut in_changes = false;

        for &line in body {
            if !in_changes && line == CHANGE_MARKER {
                in_changes = true;
            } else if !in_changes {
                definition.push(line);
            } else if line != NO_STATEMENTS_NOTE {
                if !pending.is_empty() {
                    pending.push('\n');
                }
                pending.push_str(line);
                if let Some(statement) = pending.strip_suffix(';') {
                    statements.push(statement.to_string());
                    pending.clear();
                }
            }
        }

        Ok(Self {
            capture: Capture::at(table, definition.join("\n"), captured_at, origin),
            statements,
            changed: in_changes,
        })
    }
}

fn parse_header(table: &str, header: &str) -> Result<(NaiveDateTime, String)> {
    let rest = header.strip_prefix(ENTRY_MARKER).unwrap_or(header);
    let (stamp, origin) = rest
        .split_once(ORIGIN_SEPARATOR)
        .ok_or_else(|| LedgerError::corrupt(table, format!("malformed header '{header}'")))?;
    let captured_at = NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| LedgerError::corrupt(table, format!("bad timestamp '{stamp}': {e}")))?;
    Ok((captured_at, origin.trim_end().to_string()))
}

/// Storage medium for history logs: one append-only resource per table.
pub trait LogStore {
    /// Reads the full contents of a table's log, or `None` if it has never
    /// been written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the resource cannot be read.
    fn read_all(&self, table: &str) -> Result<Option<Vec<u8>>>;

    /// Appends one block to a table's log. The block is either fully
    /// persisted or the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the block cannot be written.
    fn append(&self, table: &str, block: &[u8]) -> Result<()>;
}

/// Stores each table's log as `<root>/<table>.sql`.
#[derive(Debug, Clone)]
pub struct FileLogStore {
    root: PathBuf,
}

impl FileLogStore {
    /// Creates a store rooted at `root`. The directory is created on first
    /// append.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a table's log file.
    #[must_use]
    pub fn path_for(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.sql"))
    }
}

impl LogStore for FileLogStore {
    fn read_all(&self, table: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(table);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::persistence(path, e)),
        }
    }

    fn append(&self, table: &str, block: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| LedgerError::persistence(&self.root, e))?;
        let path = self.path_for(table);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| LedgerError::persistence(&path, e))?;
        ends_mid_line(&mut file)
            .and_then(|torn| file.write_all(&on_fresh_line(block, torn)))
            .and_then(|()| file.sync_data())
            .map_err(|e| LedgerError::persistence(&path, e))
    }
}

/// Whether the file's last byte is something other than a newline, which
/// happens when an earlier append was interrupted.
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Prefixes `block` with a newline when the log ends mid-line, so its entry
/// marker starts a line of its own.
fn on_fresh_line(block: &[u8], torn: bool) -> Cow<'_, [u8]> {
    if torn {
        let mut owned = Vec::with_capacity(block.len() + 1);
        owned.push(b'\n');
        owned.extend_from_slice(block);
        Cow::Owned(owned)
    } else {
        Cow::Borrowed(block)
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for MemoryLogStore {
    fn read_all(&self, table: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.logs.borrow().get(table).cloned())
    }

    fn append(&self, table: &str, block: &[u8]) -> Result<()> {
        let mut logs = self.logs.borrow_mut();
        let log = logs.entry(table.to_string()).or_default();
        let torn = log.last().is_some_and(|&b| b != b'\n');
        log.extend_from_slice(&on_fresh_line(block, torn));
        Ok(())
    }
}

/// Manages the per-table definition history.
#[derive(Debug)]
pub struct HistoryLog<S> {
    store: S,
}

impl<S: LogStore> HistoryLog<S> {
    /// Creates a history manager over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Appends an entry to its table's log.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the entry could not be
    /// written; the entry is then not durable.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let table = &entry.capture.table;
        self.store.append(table, entry.encode().as_bytes())?;
        info!(
            table = table.as_str(),
            statements = entry.statements.len(),
            "recorded capture"
        );
        Ok(())
    }

    /// Gets every complete entry of a table's log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the log cannot be read or
    /// [`LedgerError::CorruptLog`] if it cannot be decoded.
    pub fn entries(&self, table: &str) -> Result<Vec<LogEntry>> {
        let Some(bytes) = self.store.read_all(table)? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| LedgerError::corrupt(table, format!("log is not UTF-8: {e}")))?;
        LogEntry::decode_all(table, &text)
    }

    /// Gets the most recently appended capture of a table.
    ///
    /// # Errors
    ///
    /// Same as [`HistoryLog::entries`].
    pub fn most_recent(&self, table: &str) -> Result<Option<Capture>> {
        Ok(self.entries(table)?.pop().map(|entry| entry.capture))
    }
}
