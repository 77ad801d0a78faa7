use rusqlite::{Connection, Result};

/// Current schema version, tracked in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Attempts are deleted explicitly alongside their item, the foreign key
  // only guards against orphans. `study_items.confidence` is a copy of the
  // mean attempt rating for SQL-side reporting; items are always rebuilt
  // from `attempts`.
  conn.execute_batch(
    r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS study_items (
      id TEXT PRIMARY KEY,
      question TEXT NOT NULL,
      solution TEXT NOT NULL,
      difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
      last_reviewed TEXT,
      next_review TEXT NOT NULL,
      confidence REAL NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS attempts (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      item_id TEXT NOT NULL,
      seq INTEGER NOT NULL,
      attempted_at TEXT NOT NULL,
      success INTEGER NOT NULL,
      confidence_rating INTEGER NOT NULL CHECK (confidence_rating BETWEEN 1 AND 5),
      FOREIGN KEY (item_id) REFERENCES study_items(id),
      UNIQUE (item_id, seq)
    );

    CREATE INDEX IF NOT EXISTS idx_study_items_next_review ON study_items(next_review);
    CREATE INDEX IF NOT EXISTS idx_attempts_item_id ON attempts(item_id);
    "#,
  )?;

  let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
  if version < SCHEMA_VERSION {
    conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
  }

  Ok(())
}

/// Check if a column exists in a table
#[cfg(test)]
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}
