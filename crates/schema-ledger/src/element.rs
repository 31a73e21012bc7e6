//! Element classification.
//!
//! Each line of a definition's element block is either a column or a key
//! declaration. Keys are recognised by the `KEY` token, which the
//! `SHOW CREATE TABLE` dialect always spells in upper case.

use std::fmt;

use serde::Serialize;

/// Quote character that delimits identifiers in a definition.
pub const QUOTE: char = '`';

/// The subtype of a key element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// `PRIMARY KEY (...)`.
    Primary,
    /// `UNIQUE KEY name (...)`.
    Unique,
    /// `KEY name (...)`.
    Plain,
}

/// What an element line declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A column definition.
    Column,
    /// A key or index definition.
    Key(KeyKind),
}

impl ElementKind {
    /// Classifies a raw element line.
    #[must_use]
    pub fn classify(line: &str) -> Self {
        if !line.contains("KEY") {
            Self::Column
        } else if line.contains("PRIMARY KEY") {
            Self::Key(KeyKind::Primary)
        } else if line.contains("UNIQUE KEY") {
            Self::Key(KeyKind::Unique)
        } else {
            Self::Key(KeyKind::Plain)
        }
    }

    /// Returns true for key elements of any subtype.
    #[must_use]
    pub const fn is_key(self) -> bool {
        matches!(self, Self::Key(_))
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column => f.write_str("column"),
            Self::Key(KeyKind::Primary) => f.write_str("primary key"),
            Self::Key(KeyKind::Unique) => f.write_str("unique key"),
            Self::Key(KeyKind::Plain) => f.write_str("key"),
        }
    }
}

/// One column or key line of a parsed definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    /// The line exactly as it appeared in the element block.
    pub raw: String,
    /// Column or key.
    pub kind: ElementKind,
    /// The first quoted identifier on the line, if there is one. This is the
    /// declared name substituted into statements.
    pub name: Option<String>,
}

impl Element {
    /// Classifies a raw element line.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            kind: ElementKind::classify(raw),
            name: quoted_name(raw).map(str::to_string),
        }
    }

    /// The line without its leading indentation.
    #[must_use]
    pub fn text(&self) -> &str {
        self.raw.trim_start()
    }

    /// The identifying token, as it would appear inside another
    /// definition's text.
    ///
    /// A column is identified by its quoted name. A key is identified by the
    /// text from the first quote up to the last one, so
    /// ``KEY `name` (`name`)`` yields `` `name` (`name `` and never matches
    /// the column it indexes.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        if self.kind.is_key() {
            key_span(&self.raw).map(str::to_string)
        } else {
            self.name.as_ref().map(|n| format!("{QUOTE}{n}{QUOTE}"))
        }
    }

    /// The parenthesized column list of a key line, parentheses included.
    #[must_use]
    pub fn key_columns(&self) -> Option<&str> {
        let text = self.text();
        let start = text.find('(')?;
        let end = text.rfind(')')?;
        (end > start).then(|| &text[start..=end])
    }
}

/// Returns the text between the first two quote characters on a line.
fn quoted_name(line: &str) -> Option<&str> {
    let mut parts = line.split(QUOTE);
    parts.next()?;
    let name = parts.next()?;
    // A single quote with nothing after it is not a name.
    parts.next()?;
    Some(name)
}

/// Returns the text from the first quote character up to, but excluding,
/// the last one.
fn key_span(line: &str) -> Option<&str> {
    let first = line.find(QUOTE)?;
    let last = line.rfind(QUOTE)?;
    (last > first).then(|| &line[first..last])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_line() {
        let el = Element::classify("  `name` varchar(20) DEFAULT NULL,");
        assert_eq!(el.kind, ElementKind::Column);
        assert_eq!(el.name.as_deref(), Some("name"));
        assert_eq!(el.token().as_deref(), Some("`name`"));
        assert_eq!(el.text(), "`name` varchar(20) DEFAULT NULL,");
    }

    #[test]
    fn unique_key_is_not_plain() {
        let el = Element::classify("  UNIQUE KEY `uk_email` (`email`),");
        assert_eq!(el.kind, ElementKind::Key(KeyKind::Unique));
        assert_eq!(el.name.as_deref(), Some("uk_email"));
    }

    #[test]
    fn primary_key_wins_over_key() {
        let el = Element::classify("  PRIMARY KEY (`id`) KEY_BLOCK_SIZE=8");
        assert_eq!(el.kind, ElementKind::Key(KeyKind::Primary));
        assert_eq!(el.name.as_deref(), Some("id"));
    }

    #[test]
    fn plain_key() {
        let el = Element::classify("  KEY `idx_name` (`name`)");
        assert_eq!(el.kind, ElementKind::Key(KeyKind::Plain));
        assert_eq!(el.name.as_deref(), Some("idx_name"));
        assert_eq!(el.key_columns(), Some("(`name`)"));
        assert_eq!(el.token().as_deref(), Some("`idx_name` (`name"));
    }

    #[test]
    fn key_named_after_its_column_has_distinct_token() {
        let key = Element::classify("  KEY `name` (`name`),");
        let column = Element::classify("  `name` varchar(20) DEFAULT NULL,");
        assert_eq!(key.name.as_deref(), Some("name"));
        assert_eq!(key.token().as_deref(), Some("`name` (`name"));
        assert_eq!(column.token().as_deref(), Some("`name`"));
    }

    #[test]
    fn primary_key_token_spans_its_columns() {
        let el = Element::classify("  PRIMARY KEY (`id`,`org`)");
        assert_eq!(el.token().as_deref(), Some("`id`,`org"));
    }

    #[test]
    fn key_token_is_case_sensitive() {
        let el = Element::classify("  `monkey` int(11) NOT NULL,");
        assert_eq!(el.kind, ElementKind::Column);
    }

    #[test]
    fn composite_key_columns() {
        let el = Element::classify("  KEY `idx_a_b` (`a`,`b`) USING BTREE,");
        assert_eq!(el.key_columns(), Some("(`a`,`b`)"));
    }

    #[test]
    fn line_without_two_quotes_has_no_token() {
        assert_eq!(Element::classify("  id int(11),").name, None);
        assert_eq!(Element::classify("  `id int(11),").name, None);
        assert_eq!(Element::classify("  id int(11),").token(), None);
        assert_eq!(Element::classify("  KEY `idx (x)").token(), None);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ElementKind::Column.to_string(), "column");
        assert_eq!(ElementKind::Key(KeyKind::Unique).to_string(), "unique key");
    }
}
