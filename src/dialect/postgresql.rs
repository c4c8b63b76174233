use super::{page_offset, Dialect, DialectKind};
use crate::error::DialectError;

/// PostgreSQL: double-quote quoting, `limit size offset offset` paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresqlDialect;

impl Dialect for PostgresqlDialect {
  fn kind(&self) -> DialectKind {
    DialectKind::Postgresql
  }

  fn quote(&self, identifier: &str) -> String {
    format!("\"{}\"", identifier)
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
      "{} {} limit {} offset {}",
      select, sql_except_select, page_size, offset
    ))
  }
}
