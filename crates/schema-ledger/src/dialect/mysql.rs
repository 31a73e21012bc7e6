//! MySQL dialect.
//!
//! Statements are built from the element lines of `SHOW CREATE TABLE`
//! output, so column definitions are substituted verbatim and key column
//! lists keep their original quoting.

use crate::diff::{ChangeCategory, DiffEntry};
use crate::element::{Element, ElementKind, KeyKind};

use super::{DiffWarning, MigrationDialect};

/// Index name MySQL gives to a primary key.
const PRIMARY_INDEX: &str = "PRIMARY";

/// MySQL migration dialect.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn add_column_sql(&self, table: &str, element: &Element) -> String {
        format!(
            "ALTER TABLE {table} ADD COLUMN {}",
            column_definition(element)
        )
    }

    fn modify_column_sql(&self, table: &str, element: &Element) -> String {
        format!(
            "ALTER TABLE {table} MODIFY COLUMN {}",
            column_definition(element)
        )
    }

    fn drop_column_sql(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {table} DROP COLUMN {}",
            self.quote_identifier(name)
        )
    }

    fn create_index_sql(&self, table: &str, name: &str, columns: &str, unique: bool) -> String {
        let mut sql = String::from("CREATE ");
        if unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(name));
        sql.push_str(" ON ");
        sql.push_str(table);
        sql.push(' ');
        sql.push_str(columns);
        sql
    }

    fn add_primary_key_sql(&self, table: &str, columns: &str) -> String {
        format!("ALTER TABLE {table} ADD PRIMARY KEY {columns}")
    }

    fn drop_index_sql(&self, table: &str, name: &str) -> String {
        format!("DROP INDEX {} ON {table}", self.quote_identifier(name))
    }

    fn added_key_sql(
        &self,
        table: &str,
        entry: &DiffEntry,
        key: KeyKind,
    ) -> Result<String, DiffWarning> {
        let element = &entry.element;
        let columns = element.key_columns().ok_or_else(|| {
            DiffWarning::unrepresentable(table, entry, "key has no column list")
        })?;
        if key == KeyKind::Primary {
            return Ok(self.add_primary_key_sql(table, columns));
        }
        let name = element
            .name
            .as_deref()
            .ok_or_else(|| DiffWarning::unrepresentable(table, entry, "key has no quoted name"))?;
        Ok(self.create_index_sql(table, name, columns, key == KeyKind::Unique))
    }
}

impl MigrationDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn generate_sql(&self, table: &str, entry: &DiffEntry) -> Result<String, DiffWarning> {
        let element = &entry.element;
        match (entry.category, element.kind) {
            (ChangeCategory::Added, ElementKind::Column) => Ok(self.add_column_sql(table, element)),

            (ChangeCategory::Added, ElementKind::Key(key)) => self.added_key_sql(table, entry, key),

            (ChangeCategory::Removed, ElementKind::Column) => {
                let name = element.name.as_deref().ok_or_else(|| {
                    DiffWarning::unrepresentable(table, entry, "column has no quoted name")
                })?;
                Ok(self.drop_column_sql(table, name))
            }

            (ChangeCategory::Removed, ElementKind::Key(KeyKind::Primary)) => {
                Ok(self.drop_index_sql(table, PRIMARY_INDEX))
            }

            (ChangeCategory::Removed, ElementKind::Key(_)) => {
                let name = element.name.as_deref().ok_or_else(|| {
                    DiffWarning::unrepresentable(table, entry, "key has no quoted name")
                })?;
                Ok(self.drop_index_sql(table, name))
            }

            (ChangeCategory::Modified, ElementKind::Column) => {
                Ok(self.modify_column_sql(table, element))
            }

            (ChangeCategory::Modified, ElementKind::Key(_)) => Err(DiffWarning::unrepresentable(
                table,
                entry,
                "key redefinition is ambiguous (drop and recreate, or alter)",
            )),
        }
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{name}`")
    }
}

/// The element line without indentation or its trailing separator.
fn column_definition(element: &Element) -> &str {
    element.text().trim_end().trim_end_matches(',').trim_end()
}
