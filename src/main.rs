use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ormkit::cache::{CacheKit, RegionRegistry};
use ormkit::config::Config;
use ormkit::dialect::{Dialect, DialectKind, Execution, Record, SqlStatement};

#[derive(Parser, Debug)]
#[command(name = "ormkit")]
#[command(about = "SQL dialect and region cache tooling")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ormkit/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log at debug level
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the SQL a dialect generates, or run it against a SQLite database
  Sql {
    /// Dialect to use (defaults to the configured one)
    #[arg(short, long, value_enum)]
    dialect: Option<DialectKind>,

    /// Run the statement against this SQLite database file
    #[arg(short, long, value_name = "DB")]
    execute: Option<PathBuf>,

    /// Extra parameter bound after the generated ones (repeatable)
    #[arg(short, long = "param", value_parser = parse_value)]
    params: Vec<Value>,

    #[command(subcommand)]
    op: SqlOp,
  },

  /// Read and write cache regions
  Cache {
    /// Region name
    #[arg(short, long)]
    region: String,

    #[command(subcommand)]
    op: CacheOp,
  },

  /// List configured regions
  Regions,
}

#[derive(Subcommand, Debug)]
enum SqlOp {
  /// Metadata probe query for a table
  Probe { table: String },
  FindById {
    table: String,
    #[arg(long)]
    primary_key: Option<String>,
    #[arg(long, default_value = "*")]
    columns: String,
  },
  DeleteById {
    table: String,
    #[arg(long)]
    primary_key: Option<String>,
  },
  /// Insert a row built from --column name=value pairs
  Save {
    table: String,
    #[arg(short = 'c', long = "column", value_parser = parse_column)]
    columns: Vec<(String, Value)>,
  },
  /// Update a row by primary key from --column name=value pairs
  Update {
    table: String,
    #[arg(long)]
    primary_key: Option<String>,
    #[arg(long, value_parser = parse_value)]
    id: Value,
    #[arg(short = 'c', long = "column", value_parser = parse_column)]
    columns: Vec<(String, Value)>,
  },
  /// Wrap a query so it returns one page
  Paginate {
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 10)]
    size: u64,
    #[arg(long, default_value = "select *")]
    select: String,
    /// Everything after the select list, e.g. "from users where age > ?"
    sql_except_select: String,
  },
}

#[derive(Subcommand, Debug)]
enum CacheOp {
  Get { key: String },
  /// Store a value; parsed as JSON, stored as a string otherwise
  Put { key: String, value: String },
  Remove { key: String },
  /// Remove every entry in the region
  Clear,
  Keys,
  Stats,
}

fn parse_value(s: &str) -> Result<Value, String> {
  if s.eq_ignore_ascii_case("null") {
    return Ok(Value::Null);
  }
  if let Ok(i) = s.parse::<i64>() {
    return Ok(Value::Integer(i));
  }
  if let Ok(f) = s.parse::<f64>() {
    return Ok(Value::Real(f));
  }
  Ok(Value::Text(s.to_string()))
}

fn parse_column(s: &str) -> Result<(String, Value), String> {
  let (name, value) = s
    .split_once('=')
    .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
  Ok((name.trim().to_string(), parse_value(value)?))
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = ormkit::logging::init(&config.logging, args.verbose)?;

  match args.command {
    Command::Sql {
      dialect,
      execute,
      params,
      op,
    } => {
      let dialect = dialect.unwrap_or(config.dialect).dialect();
      let mut statement = build_statement(dialect.as_ref(), op)?;
      statement.params.extend(params);
      match execute {
        Some(db) => run_statement(&db, dialect.as_ref(), &statement, config.show_sql),
        None => {
          print_statement(&statement);
          Ok(())
        }
      }
    }
    Command::Cache { region, op } => run_cache(&config, &region, op),
    Command::Regions => {
      for (name, region) in &config.cache.regions {
        println!(
          "{}\tstore={} max_entries={} ttl={} tti={}",
          name,
          region.store,
          fmt_opt(region.max_entries),
          fmt_opt(region.time_to_live_secs),
          fmt_opt(region.time_to_idle_secs)
        );
      }
      Ok(())
    }
  }
}

fn build_statement(dialect: &dyn Dialect, op: SqlOp) -> Result<SqlStatement> {
  let primary_key = |pk: Option<String>| pk.unwrap_or_else(|| dialect.default_primary_key().to_string());

  let statement = match op {
    SqlOp::Probe { table } => plain(dialect.for_table_builder_do_build(&table)),
    SqlOp::FindById {
      table,
      primary_key: pk,
      columns,
    } => plain(dialect.for_db_find_by_id(&table, &primary_key(pk), &columns)),
    SqlOp::DeleteById {
      table,
      primary_key: pk,
    } => plain(dialect.for_db_delete_by_id(&table, &primary_key(pk))),
    SqlOp::Save { table, columns } => {
      if columns.is_empty() {
        return Err(eyre!("save needs at least one --column name=value"));
      }
      dialect.for_db_save(&table, &columns.into_iter().collect::<Record>())
    }
    SqlOp::Update {
      table,
      primary_key: pk,
      id,
      columns,
    } => dialect.for_db_update(
      &table,
      &primary_key(pk),
      &id,
      &columns.into_iter().collect::<Record>(),
    )?,
    SqlOp::Paginate {
      page,
      size,
      select,
      sql_except_select,
    } => plain(dialect.for_paginate(page, size, &select, &sql_except_select)?),
  };

  Ok(statement)
}

fn print_statement(statement: &SqlStatement) {
  println!("{}", statement.sql);
  for (i, param) in statement.params.iter().enumerate() {
    println!("  ?{} = {:?}", i + 1, param);
  }
}

fn run_statement(
  db: &Path,
  dialect: &dyn Dialect,
  statement: &SqlStatement,
  show_sql: bool,
) -> Result<()> {
  let conn = Connection::open(db).map_err(|e| eyre!("Failed to open {}: {}", db.display(), e))?;

  match statement.execute(&conn, dialect, show_sql)? {
    Execution::Affected(count) => println!("{} row(s) affected", count),
    Execution::Rows { columns, rows } => {
      println!("{}", columns.join("\t"));
      for row in rows {
        let cells: Vec<String> = row.iter().map(fmt_value).collect();
        println!("{}", cells.join("\t"));
      }
    }
  }
  Ok(())
}

fn run_cache(config: &Config, region: &str, op: CacheOp) -> Result<()> {
  let registry = Arc::new(RegionRegistry::new(config.cache.clone())?);
  let kit = CacheKit::new(Arc::clone(&registry));

  match op {
    CacheOp::Get { key } => match kit.get::<_, serde_json::Value>(region, &key)? {
      Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
      None => println!("(absent)"),
    },
    CacheOp::Put { key, value } => {
      let value = serde_json::from_str::<serde_json::Value>(&value)
        .unwrap_or(serde_json::Value::String(value));
      kit.put(region, &key, &value)?;
    }
    CacheOp::Remove { key } => kit.remove(region, &key)?,
    CacheOp::Clear => kit.remove_all(region)?,
    CacheOp::Keys => {
      for key in kit.keys::<serde_json::Value>(region)? {
        println!("{}", key);
      }
    }
    CacheOp::Stats => {
      let stats = kit.stats(region)?;
      println!(
        "entries={} hits={} misses={} puts={} removals={} hit_ratio={:.2}",
        stats.entries,
        stats.hits,
        stats.misses,
        stats.puts,
        stats.removals,
        stats.hit_ratio()
      );
    }
  }

  registry.shutdown();
  Ok(())
}

fn plain(sql: String) -> SqlStatement {
  SqlStatement {
    sql,
    params: Vec::new(),
  }
}

fn fmt_value(value: &Value) -> String {
  match value {
    Value::Null => "NULL".to_string(),
    Value::Integer(i) => i.to_string(),
    Value::Real(f) => f.to_string(),
    Value::Text(s) => s.clone(),
    Value::Blob(b) => format!("<{} bytes>", b.len()),
  }
}

fn fmt_opt(value: Option<u64>) -> String {
  value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
