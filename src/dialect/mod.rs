//! SQL dialects.
//!
//! Each supported database gets one [`Dialect`] implementation. Dialects are
//! stateless: they turn table metadata and values into SQL text plus the
//! ordered parameters to bind. Most statements differ only in identifier
//! quoting, so the trait provides them; pagination is always dialect-specific.

mod mysql;
mod oracle;
mod postgresql;
mod sqlite;
mod sqlserver;
mod table;

use rusqlite::types::Value;
use rusqlite::{Connection, Statement};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::debug;

use crate::error::DialectError;

pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgresql::PostgresqlDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;
pub use table::{Attrs, Record, Table};

/// SQL text with the parameters for its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
  pub sql: String,
  pub params: Vec<Value>,
}

/// What running a [`SqlStatement`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
  Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
  },
  /// Rows changed by an insert, update or delete.
  Affected(usize),
}

impl SqlStatement {
  /// Prepare the statement on `conn`, bind its parameters through `dialect`
  /// and run it. Read-only statements return their rows.
  pub fn execute(
    &self,
    conn: &Connection,
    dialect: &dyn Dialect,
    show_sql: bool,
  ) -> Result<Execution, DialectError> {
    if show_sql {
      debug!("Sql: {}", self.sql);
    }

    let mut stmt = conn.prepare(&self.sql)?;
    dialect.fill_statement(&mut stmt, &self.params, show_sql)?;

    if !stmt.readonly() {
      return Ok(Execution::Affected(stmt.raw_execute()?));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
      let values = (0..columns.len())
        .map(|i| row.get::<_, Value>(i))
        .collect::<rusqlite::Result<Vec<_>>>()?;
      rows.push(values);
    }

    Ok(Execution::Rows { columns, rows })
  }
}

pub trait Dialect: Send + Sync {
  fn kind(&self) -> DialectKind;

  /// Quote an identifier for this database.
  fn quote(&self, identifier: &str) -> String;

  /// Query returning no rows, used to read a table's column labels.
  fn for_table_builder_do_build(&self, table_name: &str) -> String {
    format!("select * from {} where 1 = 2", self.quote(table_name.trim()))
  }

  /// Insert over the attributes whose column belongs to `table`.
  fn for_model_save(&self, table: &Table, attrs: &Attrs) -> SqlStatement {
    let columns = attrs
      .iter()
      .filter(|(column, _)| table.has_column_label(column));
    insert_statement(self, table.name(), columns)
  }

  fn for_model_delete_by_id(&self, table: &Table) -> String {
    delete_by_id_sql(self, table.name(), table.primary_key())
  }

  /// Update the modified, mapped, non-key columns of a model; `id` is bound last.
  fn for_model_update(
    &self,
    table: &Table,
    attrs: &Attrs,
    modified: &BTreeSet<String>,
    primary_key: &str,
    id: &Value,
  ) -> Result<SqlStatement, DialectError> {
    let columns = attrs.iter().filter(|(column, _)| {
      !primary_key.eq_ignore_ascii_case(column)
        && modified.contains(column.as_str())
        && table.has_column_label(column)
    });
    update_statement(self, table.name(), primary_key, id, columns)
  }

  fn for_model_find_by_id(&self, table: &Table, columns: &str) -> String {
    find_by_id_sql(self, table.name(), table.primary_key(), columns)
  }

  fn for_db_find_by_id(&self, table_name: &str, primary_key: &str, columns: &str) -> String {
    find_by_id_sql(self, table_name.trim(), primary_key.trim(), columns)
  }

  fn for_db_delete_by_id(&self, table_name: &str, primary_key: &str) -> String {
    delete_by_id_sql(self, table_name.trim(), primary_key.trim())
  }

  /// Insert over every column of the record.
  fn for_db_save(&self, table_name: &str, record: &Record) -> SqlStatement {
    insert_statement(self, table_name.trim(), record.columns())
  }

  /// Update every non-key column of the record; `id` is bound last.
  fn for_db_update(
    &self,
    table_name: &str,
    primary_key: &str,
    id: &Value,
    record: &Record,
  ) -> Result<SqlStatement, DialectError> {
    let primary_key = primary_key.trim();
    let columns = record
      .columns()
      .filter(|(column, _)| !primary_key.eq_ignore_ascii_case(column));
    update_statement(self, table_name.trim(), primary_key, id, columns)
  }

  /// Wrap `select` + `sql_except_select` so it returns one page.
  /// Pages are numbered from 1.
  fn for_paginate(
    &self,
    page_number: u64,
    page_size: u64,
    select: &str,
    sql_except_select: &str,
  ) -> Result<String, DialectError>;

  /// SQL expression to insert verbatim instead of binding `value`.
  fn inline_value(&self, _value: &Value) -> Option<String> {
    None
  }

  fn is_oracle(&self) -> bool {
    false
  }

  fn default_primary_key(&self) -> &str {
    "id"
  }

  /// Bind `params` (1-based) into a prepared statement.
  fn fill_statement(
    &self,
    stmt: &mut Statement<'_>,
    params: &[Value],
    show_sql: bool,
  ) -> Result<(), DialectError> {
    if show_sql {
      if params.is_empty() {
        debug!("Sql param: empty");
      } else {
        debug!("Sql param: {}", params.len());
      }
    }

    for (i, param) in params.iter().enumerate() {
      let index = i + 1;
      stmt
        .raw_bind_parameter(index, param)
        .map_err(|source| DialectError::Bind { index, source })?;
      if show_sql {
        debug!(index, kind = value_kind(param), value = ?param, "param");
      }
    }

    Ok(())
  }
}

/// Supported databases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
  #[default]
  Mysql,
  #[serde(alias = "postgres")]
  #[value(alias = "postgres")]
  Postgresql,
  Oracle,
  #[serde(alias = "sqlite3")]
  #[value(alias = "sqlite3")]
  Sqlite,
  #[serde(alias = "mssql")]
  #[value(alias = "mssql")]
  Sqlserver,
}

impl DialectKind {
  pub const ALL: [DialectKind; 5] = [
    Self::Mysql,
    Self::Postgresql,
    Self::Oracle,
    Self::Sqlite,
    Self::Sqlserver,
  ];

  pub fn dialect(self) -> Box<dyn Dialect> {
    match self {
      Self::Mysql => Box::new(MysqlDialect),
      Self::Postgresql => Box::new(PostgresqlDialect),
      Self::Oracle => Box::new(OracleDialect),
      Self::Sqlite => Box::new(SqliteDialect),
      Self::Sqlserver => Box::new(SqlServerDialect),
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Mysql => "mysql",
      Self::Postgresql => "postgresql",
      Self::Oracle => "oracle",
      Self::Sqlite => "sqlite",
      Self::Sqlserver => "sqlserver",
    }
  }
}

impl FromStr for DialectKind {
  type Err = DialectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "mysql" => Ok(Self::Mysql),
      "postgresql" | "postgres" => Ok(Self::Postgresql),
      "oracle" => Ok(Self::Oracle),
      "sqlite" | "sqlite3" => Ok(Self::Sqlite),
      "sqlserver" | "mssql" => Ok(Self::Sqlserver),
      _ => Err(DialectError::UnknownDialect(s.to_string())),
    }
  }
}

impl std::fmt::Display for DialectKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// Validate a page request and return the row offset of its first row.
pub(crate) fn page_offset(page_number: u64, page_size: u64) -> Result<u64, DialectError> {
  if page_number < 1 || page_size < 1 {
    return Err(DialectError::InvalidPage {
      page_number,
      page_size,
    });
  }
  Ok((page_number - 1).saturating_mul(page_size))
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "Null",
    Value::Integer(_) => "Integer",
    Value::Real(_) => "Real",
    Value::Text(_) => "Text",
    Value::Blob(_) => "Blob",
  }
}

fn insert_statement<'a, D, I>(dialect: &D, table_name: &str, columns: I) -> SqlStatement
where
  D: Dialect + ?Sized,
  I: IntoIterator<Item = (&'a String, &'a Value)>,
{
  let mut names = Vec::new();
  let mut placeholders = Vec::new();
  let mut params = Vec::new();

  for (column, value) in columns {
    names.push(dialect.quote(column));
    match dialect.inline_value(value) {
      Some(expr) => placeholders.push(expr),
      None => {
        placeholders.push("?".to_string());
        params.push(value.clone());
      }
    }
  }

  SqlStatement {
    sql: format!(
      "insert into {}({}) values({})",
      dialect.quote(table_name),
      names.join(", "),
      placeholders.join(", ")
    ),
    params,
  }
}

fn update_statement<'a, D, I>(
  dialect: &D,
  table_name: &str,
  primary_key: &str,
  id: &Value,
  columns: I,
) -> Result<SqlStatement, DialectError>
where
  D: Dialect + ?Sized,
  I: IntoIterator<Item = (&'a String, &'a Value)>,
{
  let mut assignments = Vec::new();
  let mut params = Vec::new();

  for (column, value) in columns {
    assignments.push(format!("{} = ?", dialect.quote(column)));
    params.push(value.clone());
  }

  if assignments.is_empty() {
    return Err(DialectError::NothingToUpdate(table_name.to_string()));
  }
  params.push(id.clone());

  Ok(SqlStatement {
    sql: format!(
      "update {} set {} where {} = ?",
      dialect.quote(table_name),
      assignments.join(", "),
      dialect.quote(primary_key)
    ),
    params,
  })
}

fn find_by_id_sql<D: Dialect + ?Sized>(
  dialect: &D,
  table_name: &str,
  primary_key: &str,
  columns: &str,
) -> String {
  let columns = if columns.trim() == "*" {
    "*".to_string()
  } else {
    columns
      .split(',')
      .map(|column| dialect.quote(column.trim()))
      .collect::<Vec<_>>()
      .join(", ")
  };

  format!(
    "select {} from {} where {} = ?",
    columns,
    dialect.quote(table_name),
    dialect.quote(primary_key)
  )
}

fn delete_by_id_sql<D: Dialect + ?Sized>(dialect: &D, table_name: &str, primary_key: &str) -> String {
  format!(
    "delete from {} where {} = ?",
    dialect.quote(table_name),
    dialect.quote(primary_key)
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::capture_logs;

  fn users() -> Table {
    Table::new("users", "id").with_columns(["id", "name", "age"])
  }

  fn attrs() -> Attrs {
    Attrs::from([
      ("age".to_string(), Value::Integer(30)),
      ("name".to_string(), Value::Text("Alice".into())),
      ("nickname".to_string(), Value::Text("Al".into())),
    ])
  }

  #[test]
  fn test_parse_kind() {
    assert_eq!("MySQL".parse::<DialectKind>().unwrap(), DialectKind::Mysql);
    assert_eq!("postgres".parse::<DialectKind>().unwrap(), DialectKind::Postgresql);
    assert_eq!("sqlite3".parse::<DialectKind>().unwrap(), DialectKind::Sqlite);
    assert_eq!("mssql".parse::<DialectKind>().unwrap(), DialectKind::Sqlserver);
    assert!(matches!(
      "db2".parse::<DialectKind>(),
      Err(DialectError::UnknownDialect(_))
    ));
  }

  #[test]
  fn test_kind_round_trips_through_dialect() {
    for kind in DialectKind::ALL {
      assert_eq!(kind.dialect().kind(), kind);
      assert_eq!(kind.to_string().parse::<DialectKind>().unwrap(), kind);
    }
  }

  #[test]
  fn test_only_oracle_is_oracle() {
    for kind in DialectKind::ALL {
      assert_eq!(kind.dialect().is_oracle(), kind == DialectKind::Oracle);
      assert_eq!(kind.dialect().default_primary_key(), "id");
    }
  }

  #[test]
  fn test_page_offset() {
    assert_eq!(page_offset(1, 10).unwrap(), 0);
    assert_eq!(page_offset(3, 10).unwrap(), 20);
    assert!(matches!(
      page_offset(0, 10),
      Err(DialectError::InvalidPage { page_number: 0, page_size: 10 })
    ));
    assert!(page_offset(1, 0).is_err());
  }

  #[test]
  fn test_invalid_page_rejected_by_every_dialect() {
    for kind in DialectKind::ALL {
      let result = kind.dialect().for_paginate(0, 10, "select *", "from users");
      assert!(result.is_err(), "{kind} accepted page 0");
    }
  }

  #[test]
  fn test_model_save_skips_unmapped_columns() {
    let stmt = MysqlDialect.for_model_save(&users(), &attrs());
    assert_eq!(stmt.sql, "insert into `users`(`age`, `name`) values(?, ?)");
    assert_eq!(
      stmt.params,
      vec![Value::Integer(30), Value::Text("Alice".into())]
    );
  }

  #[test]
  fn test_model_update_only_modified_columns() {
    let mut attrs = attrs();
    attrs.insert("id".to_string(), Value::Integer(7));
    let modified = BTreeSet::from(["name".to_string(), "id".to_string(), "nickname".to_string()]);

    let stmt = MysqlDialect
      .for_model_update(&users(), &attrs, &modified, "id", &Value::Integer(7))
      .unwrap();
    assert_eq!(stmt.sql, "update `users` set `name` = ? where `id` = ?");
    assert_eq!(
      stmt.params,
      vec![Value::Text("Alice".into()), Value::Integer(7)]
    );
  }

  #[test]
  fn test_model_update_without_changes_fails() {
    let result = MysqlDialect.for_model_update(
      &users(),
      &attrs(),
      &BTreeSet::new(),
      "id",
      &Value::Integer(1),
    );
    assert!(matches!(result, Err(DialectError::NothingToUpdate(t)) if t == "users"));
  }

  #[test]
  fn test_db_update_skips_primary_key_case_insensitively() {
    let record = Record::new()
      .set("ID", 3i64)
      .set("name", "Bob".to_string());
    let stmt = PostgresqlDialect
      .for_db_update(" users ", " id ", &Value::Integer(3), &record)
      .unwrap();
    assert_eq!(stmt.sql, r#"update "users" set "name" = ? where "id" = ?"#);
    assert_eq!(stmt.params, vec![Value::Text("Bob".into()), Value::Integer(3)]);
  }

  #[test]
  fn test_find_by_id_column_lists() {
    let table = users();
    assert_eq!(
      MysqlDialect.for_model_find_by_id(&table, " * "),
      "select * from `users` where `id` = ?"
    );
    assert_eq!(
      MysqlDialect.for_model_find_by_id(&table, "name, age"),
      "select `name`, `age` from `users` where `id` = ?"
    );
    assert_eq!(
      MysqlDialect.for_db_find_by_id(" users ", " id ", "name"),
      "select `name` from `users` where `id` = ?"
    );
  }

  #[test]
  fn test_delete_by_id() {
    assert_eq!(
      MysqlDialect.for_model_delete_by_id(&users()),
      "delete from `users` where `id` = ?"
    );
    assert_eq!(
      SqlServerDialect.for_db_delete_by_id("users", "id"),
      "delete from [users] where [id] = ?"
    );
  }

  #[test]
  fn test_fill_statement_binds_in_order() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn
      .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER);")
      .unwrap();

    let record = Record::new()
      .set("id", 1i64)
      .set("name", "Alice".to_string())
      .set("age", 30i64);
    let insert = SqliteDialect.for_db_save("users", &record);

    let mut stmt = conn.prepare(&insert.sql).unwrap();
    SqliteDialect
      .fill_statement(&mut stmt, &insert.params, true)
      .unwrap();
    assert_eq!(stmt.raw_execute().unwrap(), 1);

    let name: String = conn
      .query_row("SELECT name FROM users WHERE id = 1", [], |row| row.get(0))
      .unwrap();
    assert_eq!(name, "Alice");
  }

  #[test]
  fn test_execute_logs_params_only_with_show_sql() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn
      .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")
      .unwrap();
    let record = Record::new().set("id", 7i64).set("name", "Alice".to_string());
    let insert = SqliteDialect.for_db_save("users", &record);

    let (affected, logs) = capture_logs(|| insert.execute(&conn, &SqliteDialect, true));
    assert_eq!(affected.unwrap(), Execution::Affected(1));
    assert!(logs.contains("Sql: insert into users"), "{logs}");
    assert!(logs.contains("Sql param: 2"), "{logs}");
    assert!(logs.contains("Alice"), "{logs}");

    let find = SqlStatement {
      sql: SqliteDialect.for_db_find_by_id("users", "id", "name"),
      params: vec![Value::Integer(7)],
    };
    let (found, logs) = capture_logs(|| find.execute(&conn, &SqliteDialect, false));
    assert_eq!(
      found.unwrap(),
      Execution::Rows {
        columns: vec!["name".to_string()],
        rows: vec![vec![Value::Text("Alice".into())]],
      }
    );
    assert!(!logs.contains("Sql"), "{logs}");
  }

  #[test]
  fn test_fill_statement_rejects_extra_params() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let mut stmt = conn.prepare("SELECT ?").unwrap();
    let params = vec![Value::Integer(1), Value::Integer(2)];

    let err = SqliteDialect
      .fill_statement(&mut stmt, &params, false)
      .unwrap_err();
    assert!(matches!(err, DialectError::Bind { index: 2, .. }));
  }
}
