use super::{page_offset, Dialect, DialectKind};
use crate::error::DialectError;

/// MySQL: backtick quoting, `limit offset, size` paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
  fn kind(&self) -> DialectKind {
    DialectKind::Mysql
  }

  fn quote(&self, identifier: &str) -> String {
    format!("`{}`", identifier)
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

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dialect::Record;

  #[test]
  fn test_table_probe() {
    assert_eq!(
      MysqlDialect.for_table_builder_do_build(" users "),
      "select * from `users` where 1 = 2"
    );
  }

  #[test]
  fn test_paginate() {
    let sql = MysqlDialect
      .for_paginate(3, 20, "select *", "from users where age > ? order by id")
      .unwrap();
    assert_eq!(sql, "select * from users where age > ? order by id limit 40, 20");
  }

  #[test]
  fn test_db_save() {
    let record = Record::new()
      .set("name", "Alice".to_string())
      .set("age", 30i64);
    let stmt = MysqlDialect.for_db_save("users", &record);
    assert_eq!(stmt.sql, "insert into `users`(`age`, `name`) values(?, ?)");
    assert_eq!(stmt.params.len(), 2);
  }
}
