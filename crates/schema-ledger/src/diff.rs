//! Snapshot differ.
//!
//! Compares the element list of a new capture against the previous capture
//! of the same table and classifies each changed element as added, removed,
//! or modified.
//!
//! [`TextualDiffer`] matches elements by substring membership against the
//! other capture's element block: a line that appears verbatim is unchanged,
//! a line whose identifying token appears is modified, anything else is added
//! or removed. Callers only see the [`SnapshotDiffer`] trait.

use serde::Serialize;
use tracing::debug;

use crate::definition::Definition;
use crate::dialect::{MigrationDialect, Synthesis};
use crate::element::{Element, ElementKind};

/// How an element changed between two captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    /// Present only in the new capture.
    Added,
    /// Present only in the old capture.
    Removed,
    /// Same identifier, different line.
    Modified,
}

/// One classified change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    /// Added, removed, or modified.
    pub category: ChangeCategory,
    /// The new element for added and modified entries, the old one for
    /// removed entries.
    pub element: Element,
    /// The old element paired with a modified entry, when one of the old
    /// elements carries the same identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Element>,
}

impl DiffEntry {
    /// Creates an added entry.
    #[must_use]
    pub const fn added(element: Element) -> Self {
        Self {
            category: ChangeCategory::Added,
            element,
            previous: None,
        }
    }

    /// Creates a removed entry.
    #[must_use]
    pub const fn removed(element: Element) -> Self {
        Self {
            category: ChangeCategory::Removed,
            element,
            previous: None,
        }
    }

    /// Creates a modified entry.
    #[must_use]
    pub const fn modified(element: Element, previous: Option<Element>) -> Self {
        Self {
            category: ChangeCategory::Modified,
            element,
            previous,
        }
    }

    /// The kind of the element this entry describes.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.element.kind
    }
}

/// The ordered result of comparing two captures of one table.
///
/// Added and modified entries come first, in the order of the new capture,
/// followed by removed entries in the order of the old capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDiff {
    /// Entries in emission order.
    pub entries: Vec<DiffEntry>,
}

impl TableDiff {
    /// Creates an empty diff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Convenience: synthesizes statements for every entry using the given
    /// dialect.
    #[must_use]
    pub fn to_sql(&self, table: &str, dialect: &impl MigrationDialect) -> Synthesis {
        Synthesis::from_diff(table, self, dialect)
    }
}

/// Compares two parsed captures of the same table.
pub trait SnapshotDiffer {
    /// Returns the changes needed to go from `old` to `new`.
    fn diff(&self, old: &Definition, new: &Definition) -> TableDiff;
}

/// Line-membership differ over the raw element blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualDiffer;

impl TextualDiffer {
    /// Creates a new textual differ.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotDiffer for TextualDiffer {
    fn diff(&self, old: &Definition, new: &Definition) -> TableDiff {
        if old.elements().is_empty() || old.block() == new.block() {
            return TableDiff::new();
        }

        let mut entries = Vec::new();

        // Forward pass: new elements against the old block.
        for element in new.elements() {
            match classify_against(element, old.block()) {
                Membership::Verbatim => {}
                Membership::ByToken => {
                    let previous = paired(element, old.elements());
                    debug!(line = element.text(), "modified {}", element.kind);
                    entries.push(DiffEntry::modified(element.clone(), previous));
                }
                Membership::Absent => {
                    debug!(line = element.text(), "added {}", element.kind);
                    entries.push(DiffEntry::added(element.clone()));
                }
            }
        }

        // Backward pass: old elements against the new block. Token matches
        // were already reported as modified by the forward pass.
        for element in old.elements() {
            if classify_against(element, new.block()) == Membership::Absent {
                debug!(line = element.text(), "removed {}", element.kind);
                entries.push(DiffEntry::removed(element.clone()));
            }
        }

        TableDiff { entries }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Verbatim,
    ByToken,
    Absent,
}

fn classify_against(element: &Element, block: &str) -> Membership {
    if block.contains(element.raw.as_str()) {
        Membership::Verbatim
    } else if element.token().is_some_and(|t| block.contains(t.as_str())) {
        Membership::ByToken
    } else {
        Membership::Absent
    }
}

/// The first old element of the same kind family carrying the same name.
fn paired(element: &Element, old: &[Element]) -> Option<Element> {
    old.iter()
        .find(|o| o.name == element.name && o.kind.is_key() == element.kind.is_key())
        .or_else(|| old.iter().find(|o| o.name == element.name))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::KeyKind;

    fn def(lines: &[&str]) -> Definition {
        let body = lines
            .iter()
            .map(|l| format!("  {l}"))
            .collect::<Vec<_>>()
            .join(",\n");
        Definition::parse(&format!(
            "CREATE TABLE `t` (\n{body}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        ))
        .unwrap()
    }

    fn diff(old: &Definition, new: &Definition) -> TableDiff {
        TextualDiffer::new().diff(old, new)
    }

    #[test]
    fn identical_blocks_produce_empty_diff() {
        let a = def(&["`id` int(11) NOT NULL", "PRIMARY KEY (`id`)"]);
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn no_previous_elements_produce_empty_diff() {
        let old = Definition::parse("CREATE TABLE `t` (\n) ENGINE=InnoDB").unwrap();
        let new = def(&["`id` int(11) NOT NULL"]);
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn added_column() {
        let old = def(&[
            "`id` int(11) NOT NULL",
            "`name` varchar(20) DEFAULT NULL",
            "PRIMARY KEY (`id`)",
        ]);
        let new = def(&[
            "`id` int(11) NOT NULL",
            "`name` varchar(20) DEFAULT NULL",
            "`email` varchar(64) DEFAULT NULL",
            "PRIMARY KEY (`id`)",
        ]);
        let d = diff(&old, &new);
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries[0].category, ChangeCategory::Added);
        assert_eq!(d.entries[0].element.name.as_deref(), Some("email"));
    }

    #[test]
    fn removed_column() {
        let old = def(&[
            "`id` int(11) NOT NULL",
            "`name` varchar(20) DEFAULT NULL",
            "PRIMARY KEY (`id`)",
        ]);
        let new = def(&["`id` int(11) NOT NULL", "PRIMARY KEY (`id`)"]);
        let d = diff(&old, &new);
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries[0].category, ChangeCategory::Removed);
        assert_eq!(d.entries[0].element.name.as_deref(), Some("name"));
    }

    #[test]
    fn modified_column_is_reported_once() {
        let old = def(&["`id` int(11) NOT NULL", "`age` int(10)", "PRIMARY KEY (`id`)"]);
        let new = def(&["`id` int(11) NOT NULL", "`age` int(11)", "PRIMARY KEY (`id`)"]);
        let d = diff(&old, &new);
        assert_eq!(d.len(), 1);
        let entry = &d.entries[0];
        assert_eq!(entry.category, ChangeCategory::Modified);
        assert_eq!(entry.element.text(), "`age` int(11),");
        assert_eq!(entry.previous.as_ref().unwrap().text(), "`age` int(10),");
    }

    #[test]
    fn removed_plain_key() {
        let old = def(&[
            "`id` int(11) NOT NULL",
            "`name` varchar(20)",
            "PRIMARY KEY (`id`)",
            "KEY `idx_name` (`name`)",
        ]);
        let new = def(&["`id` int(11) NOT NULL", "`name` varchar(20)", "PRIMARY KEY (`id`)"]);
        let d = diff(&old, &new);
        // The new `PRIMARY KEY` line lost its comma but is still a substring
        // of the old block; the old line is then matched by token.
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries[0].category, ChangeCategory::Removed);
        assert_eq!(d.entries[0].kind(), ElementKind::Key(KeyKind::Plain));
        assert_eq!(d.entries[0].element.name.as_deref(), Some("idx_name"));
    }

    #[test]
    fn line_without_token_is_added_or_removed() {
        let old = def(&["`id` int(11) NOT NULL", "CONSTRAINT chk CHECK (id > 0)"]);
        let new = def(&["`id` int(11) NOT NULL", "CONSTRAINT chk CHECK (id > 1)"]);
        let d = diff(&old, &new);
        let categories: Vec<_> = d.entries.iter().map(|e| e.category).collect();
        assert_eq!(categories, [ChangeCategory::Added, ChangeCategory::Removed]);
    }

    #[test]
    fn ordering_is_new_order_then_old_order() {
        let old = def(&[
            "`id` int(11) NOT NULL",
            "`a` int(1)",
            "`b` int(1)",
            "`c` int(1)",
            "PRIMARY KEY (`id`)",
        ]);
        let new = def(&[
            "`id` int(11) NOT NULL",
            "`z` int(1)",
            "`c` int(2)",
            "`y` int(1)",
            "PRIMARY KEY (`id`)",
        ]);
        let d = diff(&old, &new);
        let summary: Vec<_> = d
            .entries
            .iter()
            .map(|e| (e.category, e.element.name.clone().unwrap()))
            .collect();
        assert_eq!(
            summary,
            [
                (ChangeCategory::Added, "z".to_string()),
                (ChangeCategory::Modified, "c".to_string()),
                (ChangeCategory::Added, "y".to_string()),
                (ChangeCategory::Removed, "a".to_string()),
                (ChangeCategory::Removed, "b".to_string()),
            ]
        );
    }

    #[test]
    fn modified_key_pairs_with_old_key() {
        let old = def(&["`id` int(11) NOT NULL", "`a` int(1)", "KEY `idx_a` (`a`)"]);
        let new = def(&[
            "`id` int(11) NOT NULL",
            "`a` int(1)",
            "KEY `idx_a` (`a`) USING BTREE",
        ]);
        let d = diff(&old, &new);
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries[0].category, ChangeCategory::Modified);
        assert_eq!(d.entries[0].kind(), ElementKind::Key(KeyKind::Plain));
        assert_eq!(
            d.entries[0].previous.as_ref().unwrap().text(),
            "KEY `idx_a` (`a`)"
        );
    }

    #[test]
    fn added_key_named_after_its_column() {
        let old = def(&["`id` int(11) NOT NULL", "`name` varchar(20)", "PRIMARY KEY (`id`)"]);
        let new = def(&[
            "`id` int(11) NOT NULL",
            "`name` varchar(20)",
            "KEY `name` (`name`)",
            "PRIMARY KEY (`id`)",
        ]);
        let d = diff(&old, &new);
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries[0].category, ChangeCategory::Added);
        assert_eq!(d.entries[0].kind(), ElementKind::Key(KeyKind::Plain));
    }

    #[test]
    fn removed_key_named_after_its_column() {
        let old = def(&[
            "`id` int(11) NOT NULL",
            "`name` varchar(20)",
            "KEY `name` (`name`)",
            "PRIMARY KEY (`id`)",
        ]);
        let new = def(&["`id` int(11) NOT NULL", "`name` varchar(20)", "PRIMARY KEY (`id`)"]);
        let d = diff(&old, &new);
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries[0].category, ChangeCategory::Removed);
        assert_eq!(d.entries[0].element.name.as_deref(), Some("name"));
    }

    #[test]
    fn appending_after_a_comma_less_last_line_modifies_it() {
        // The old last line gains a comma, so it no longer appears verbatim
        // in the old block and is matched by token instead.
        let old = def(&["`id` int(11) NOT NULL", "`name` varchar(20)"]);
        let new = def(&["`id` int(11) NOT NULL", "`name` varchar(20)", "`age` int(3)"]);
        let d = diff(&old, &new);
        let summary: Vec<_> = d
            .entries
            .iter()
            .map(|e| (e.category, e.element.text()))
            .collect();
        assert_eq!(
            summary,
            [
                (ChangeCategory::Modified, "`name` varchar(20),"),
                (ChangeCategory::Added, "`age` int(3)"),
            ]
        );
    }
}
