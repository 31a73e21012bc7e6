//! Definition parsing.
//!
//! A captured definition is the text returned by `SHOW CREATE TABLE`:
//!
//! ```text
//! CREATE TABLE `users` (
//!   `id` int(11) NOT NULL AUTO_INCREMENT,
//!   `name` varchar(20) DEFAULT NULL,
//!   PRIMARY KEY (`id`)
//! ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
//! ```
//!
//! The element block is everything strictly between the first `(` and the
//! last occurrence of the trailing clause marker. Each non-blank line of the
//! block, other than the closing parenthesis, is one [`Element`].

use crate::element::Element;
use crate::error::{LedgerError, Result};

/// Marker that starts the trailing storage clause.
pub const TRAILING_CLAUSE_MARKER: &str = "ENGINE";

/// A parsed definition: its element block and the elements in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    block: String,
    elements: Vec<Element>,
}

impl Definition {
    /// Parses a raw definition.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MalformedDefinition`] if the text has no `(`,
    /// no trailing clause marker, or the marker precedes the `(`.
    pub fn parse(text: &str) -> Result<Self> {
        let block = element_block(text)?;
        let elements = block
            .lines()
            .filter(|line| is_element_line(line))
            .map(Element::classify)
            .collect();
        Ok(Self {
            block: block.to_string(),
            elements,
        })
    }

    /// The element block text, used for substring membership tests.
    #[must_use]
    pub fn block(&self) -> &str {
        &self.block
    }

    /// Elements in declaration order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

/// Extracts the text strictly between the first `(` and the start of the
/// trailing clause.
///
/// # Errors
///
/// Returns [`LedgerError::MalformedDefinition`] if either delimiter is missing.
pub fn element_block(text: &str) -> Result<&str> {
    let start = text
        .find('(')
        .ok_or_else(|| LedgerError::malformed("no opening parenthesis"))?;
    let end = text.rfind(TRAILING_CLAUSE_MARKER).ok_or_else(|| {
        LedgerError::malformed(format!("no trailing {TRAILING_CLAUSE_MARKER} clause"))
    })?;
    if end <= start {
        return Err(LedgerError::malformed(format!(
            "{TRAILING_CLAUSE_MARKER} clause precedes the element block"
        )));
    }
    Ok(&text[start + 1..end])
}

/// The definition from its first `(` onward, without a trailing `;`.
///
/// # Errors
///
/// Returns [`LedgerError::MalformedDefinition`] if the text has no `(`.
pub fn table_body(text: &str) -> Result<&str> {
    let start = text
        .find('(')
        .ok_or_else(|| LedgerError::malformed("no opening parenthesis"))?;
    Ok(text[start..].trim_end().trim_end_matches(';').trim_end())
}

fn is_element_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed != ")"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, KeyKind};

    const USERS: &str = "CREATE TABLE `users` (\n  `id` int(11) NOT NULL AUTO_INCREMENT,\n  `name` varchar(20) DEFAULT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

    #[test]
    fn parses_elements_in_order() {
        let def = Definition::parse(USERS).unwrap();
        let names: Vec<_> = def
            .elements()
            .iter()
            .map(|e| e.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, ["id", "name", "id"]);
        assert_eq!(def.elements()[2].kind, ElementKind::Key(KeyKind::Primary));
    }

    #[test]
    fn keeps_raw_indentation() {
        let def = Definition::parse(USERS).unwrap();
        assert_eq!(def.elements()[0].raw, "  `id` int(11) NOT NULL AUTO_INCREMENT,");
    }

    #[test]
    fn block_excludes_delimiters() {
        let def = Definition::parse(USERS).unwrap();
        assert!(def.block().starts_with('\n'));
        assert!(def.block().ends_with(") "));
        assert!(!def.block().contains("ENGINE"));
    }

    #[test]
    fn missing_engine_clause_is_malformed() {
        let err = Definition::parse("CREATE TABLE `t` (\n  `id` int(11)\n)").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedDefinition { .. }));
    }

    #[test]
    fn missing_parenthesis_is_malformed() {
        let err = Definition::parse("CREATE TABLE t ENGINE=InnoDB").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedDefinition { .. }));
    }

    #[test]
    fn engine_before_parenthesis_is_malformed() {
        let err = Definition::parse("ENGINE CREATE TABLE t (").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedDefinition { .. }));
    }

    #[test]
    fn crlf_lines() {
        let def =
            Definition::parse("CREATE TABLE `t` (\r\n  `id` int(11)\r\n) ENGINE=InnoDB").unwrap();
        assert_eq!(def.elements().len(), 1);
        assert_eq!(def.elements()[0].raw, "  `id` int(11)");
    }

    #[test]
    fn body_from_parenthesis() {
        assert_eq!(
            table_body("CREATE TABLE `t` (\n  `id` int\n) ENGINE=InnoDB;\n").unwrap(),
            "(\n  `id` int\n) ENGINE=InnoDB"
        );
    }
}
