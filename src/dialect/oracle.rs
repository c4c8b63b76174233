use rusqlite::types::Value;

use super::{page_offset, Dialect, DialectKind};
use crate::error::DialectError;

/// Oracle: bare identifiers, `rownum` windows for paging.
///
/// Text values ending in `.nextval` are sequence references and are written
/// into inserts verbatim rather than bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
  fn kind(&self) -> DialectKind {
    DialectKind::Oracle
  }

  fn quote(&self, identifier: &str) -> String {
    identifier.to_string()
  }

  fn for_table_builder_do_build(&self, table_name: &str) -> String {
    format!("select * from {} where rownum < 1", table_name.trim())
  }

  fn for_paginate(
    &self,
    page_number: u64,
    page_size: u64,
    select: &str,
    sql_except_select: &str,
  ) -> Result<String, DialectError> {
    let start = page_offset(page_number, page_size)? + 1;
    let end = page_number.saturating_mul(page_size);
    Ok(format!(
      "select * from ( select row_.*, rownum rownum_ from (  {} {} ) row_ where rownum <= {}) table_alias where table_alias.rownum_ >= {}",
      select, sql_except_select, end, start
    ))
  }

  fn inline_value(&self, value: &Value) -> Option<String> {
    match value {
      Value::Text(text) if text.ends_with(".nextval") => Some(text.clone()),
      _ => None,
    }
  }

  fn is_oracle(&self) -> bool {
    true
  }
}
