//! Table metadata and column/value maps consumed by the SQL builders.

use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};

use super::Dialect;
use crate::error::DialectError;

/// Column -> value map of a model's attributes.
pub type Attrs = BTreeMap<String, Value>;

/// Mapped table: name, primary key and the column labels it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
  name: String,
  primary_key: String,
  columns: BTreeSet<String>,
}

impl Table {
  pub fn new(name: &str, primary_key: &str) -> Self {
    Self {
      name: name.trim().to_string(),
      primary_key: primary_key.trim().to_string(),
      columns: BTreeSet::new(),
    }
  }

  pub fn with_columns<I, S>(mut self, columns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.columns.extend(columns.into_iter().map(Into::into));
    self
  }

  /// Read the column labels of `name` from a live connection.
  ///
  /// Runs the dialect's probe query, which returns no rows, and keeps the
  /// result-set column names.
  pub fn build(
    conn: &Connection,
    dialect: &dyn Dialect,
    name: &str,
    primary_key: &str,
  ) -> Result<Self, DialectError> {
    let sql = dialect.for_table_builder_do_build(name);
    let stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    tracing::debug!(table = name.trim(), columns = columns.len(), "built table metadata");

    Ok(Self::new(name, primary_key).with_columns(columns))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn primary_key(&self) -> &str {
    &self.primary_key
  }

  pub fn has_column_label(&self, column: &str) -> bool {
    self.columns.contains(column)
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> {
    self.columns.iter().map(String::as_str)
  }
}

/// A loose row: column names mapped to values, no table attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
  columns: BTreeMap<String, Value>,
}

impl Record {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style setter.
  pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(column, value);
    self
  }

  pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
    self.columns.insert(column.into(), value.into());
  }

  pub fn get(&self, column: &str) -> Option<&Value> {
    self.columns.get(column)
  }

  pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.columns.iter()
  }

  pub fn len(&self) -> usize {
    self.columns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }
}

impl FromIterator<(String, Value)> for Record {
  fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
    Self {
      columns: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dialect::DialectKind;

  #[test]
  fn test_names_are_trimmed() {
    let table = Table::new("  users ", " id ");
    assert_eq!(table.name(), "users");
    assert_eq!(table.primary_key(), "id");
  }

  #[test]
  fn test_column_labels() {
    let table = Table::new("users", "id").with_columns(["id", "name"]);
    assert!(table.has_column_label("name"));
    assert!(!table.has_column_label("age"));
    assert_eq!(table.columns().collect::<Vec<_>>(), vec!["id", "name"]);
  }

  #[test]
  fn test_build_reads_columns_from_sqlite() {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER);")
      .unwrap();

    let dialect = DialectKind::Sqlite.dialect();
    let table = Table::build(&conn, dialect.as_ref(), "users", "id").unwrap();
    assert_eq!(table.columns().collect::<Vec<_>>(), vec!["age", "id", "name"]);
  }

  #[test]
  fn test_build_unknown_table_fails() {
    let conn = Connection::open_in_memory().unwrap();
    let dialect = DialectKind::Sqlite.dialect();
    assert!(Table::build(&conn, dialect.as_ref(), "missing", "id").is_err());
  }

  #[test]
  fn test_record_builder() {
    let record = Record::new()
      .set("name", "Alice".to_string())
      .set("age", 30i64);
    assert_eq!(record.len(), 2);
    assert_eq!(record.get("age"), Some(&Value::Integer(30)));
    assert!(record.get("email").is_none());
  }
}
