//! SQLite connection setup and schema migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::DatabaseError;

/// Open (or create) the database at `path` and run migrations.
/// `:memory:` opens a private in-memory database.
pub fn open_database(path: &str) -> Result<Connection, DatabaseError> {
  let conn = if path == ":memory:" {
    Connection::open_in_memory()?
  } else {
    Connection::open(path)?
  };
  configure_pragmas(&conn)?;
  run_migrations(&conn)?;
  Ok(conn)
}

/// Open an in-memory database (for testing)
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
  open_database(":memory:")
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
  conn.execute_batch(
    "PRAGMA journal_mode=WAL;
     PRAGMA foreign_keys=ON;",
  )?;
  Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
  let current_version = get_current_version(conn);

  let migrations: Vec<(i64, &str)> = vec![
    (1, include_str!("../resources/migrations/001_initial.sql")),
    (2, include_str!("../resources/migrations/002_guide_and_safety_plan.sql")),
  ];

  for (version, sql) in migrations {
    if version > current_version {
      info!(target: "haven_backend", version, "Running migration");
      conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
        version,
        reason: e.to_string(),
      })?;
    }
  }

  Ok(())
}

/// Current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
  conn
    .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get::<_, i64>(0))
    .unwrap_or(0)
}

/// Liveness check used by `/health/`.
pub fn ping(conn: &Connection) -> Result<(), DatabaseError> {
  conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
  Ok(())
}

/// Single `COUNT(*)`-style scalar.
pub fn count(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<i64, rusqlite::Error> {
  conn.query_row(sql, args, |row| row.get(0))
}

/// Decode a JSON text column, naming the column on failure.
pub fn decode_json<T: serde::de::DeserializeOwned>(column: &'static str, raw: &str) -> Result<T, DatabaseError> {
  serde_json::from_str(raw).map_err(|e| DatabaseError::MalformedJson { column, reason: e.to_string() })
}

/// Same as `decode_json` but usable inside a `query_map` row closure.
pub fn json_column<T: serde::de::DeserializeOwned>(
  row: &rusqlite::Row<'_>,
  idx: usize,
  column: &'static str,
) -> rusqlite::Result<T> {
  let raw: String = row.get(idx)?;
  decode_json(column, &raw).map_err(|e| {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
  })
}
