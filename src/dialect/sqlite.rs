use super::{page_offset, Dialect, DialectKind};
use crate::error::DialectError;

/// SQLite: bare identifiers, `limit offset, size` paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
  fn kind(&self) -> DialectKind {
    DialectKind::Sqlite
  }

  fn quote(&self, identifier: &str) -> String {
    identifier.to_string()
  }

  fn for_paginate(
    &self,
    page_number: u64,
    page_size: u64,
    select: &str,
    sql_except_select: &str,
  ) -> Result<String, DialectError> {
    let offset = page_offset(page_number, page_size)?;
    Ok(format!(
      "{} {} limit {}, {}",
      select, sql_except_select, offset, page_size
    ))
  }
}
