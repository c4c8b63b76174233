use super::{page_offset, Dialect, DialectKind};
use crate::error::DialectError;

/// SQL Server: bracket quoting, `row_number()` windows for paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
  fn kind(&self) -> DialectKind {
    DialectKind::Sqlserver
  }

  fn quote(&self, identifier: &str) -> String {
    format!("[{}]", identifier)
  }

  fn for_paginate(
    &self,
    page_number: u64,
    page_size: u64,
    select: &str,
    sql_except_select: &str,
  ) -> Result<String, DialectError> {
    let begin = page_offset(page_number, page_size)?;
    let end = page_number.saturating_mul(page_size);
    Ok(format!(
      "select * from ( select row_number() over (order by tempcolumn) temprownumber, * from ( select top {} tempcolumn=0,{} {})vip)mvp where temprownumber>{}",
      end,
      strip_select_keyword(select),
      sql_except_select,
      begin
    ))
  }
}

/// Drop the first `select` keyword (any case) so the projection can be
/// spliced after `top n tempcolumn=0,`.
fn strip_select_keyword(select: &str) -> String {
  match select.to_ascii_lowercase().find("select") {
    Some(pos) => format!("{}{}", &select[..pos], &select[pos + "select".len()..]),
    None => select.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_strip_select_keyword() {
    assert_eq!(strip_select_keyword("select *"), " *");
    assert_eq!(strip_select_keyword("SELECT id, name"), " id, name");
    assert_eq!(strip_select_keyword("id"), "id");
  }

  #[test]
  fn test_paginate() {
    let sql = SqlServerDialect
      .for_paginate(3, 10, "Select id, name", "from users")
      .unwrap();
    assert_eq!(
      sql,
      "select * from ( select row_number() over (order by tempcolumn) temprownumber, * from ( select top 30 tempcolumn=0, id, name from users)vip)mvp where temprownumber>20"
    );
  }

  #[test]
  fn test_table_probe() {
    assert_eq!(
      SqlServerDialect.for_table_builder_do_build("users"),
      "select * from [users] where 1 = 2"
    );
  }
}
