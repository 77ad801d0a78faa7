//! SQLite-backed item store

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::schema::run_migrations;
use super::{ItemStore, Result, StorageError};
use crate::domain::{AttemptRecord, ConfidenceRating, Difficulty, ItemId, StudyItem};

pub type DbPool = Arc<Mutex<Connection>>;

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

/// Item columns before attempts are attached
struct ItemRow {
  id: String,
  question: String,
  solution: String,
  difficulty: u8,
  last_reviewed: Option<String>,
  next_review: String,
}

const ITEM_COLUMNS: &str = "id, question, solution, difficulty, last_reviewed, next_review";

impl SqliteStore {
  /// Open (or create) the database at `path` and apply migrations.
  /// An existing file is copied to `<name>.db.backup` first.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    if path.exists() {
      let backup_path = path.with_extension("db.backup");
      if let Err(e) = std::fs::copy(path, &backup_path) {
        tracing::warn!("Could not create database backup: {}", e);
      }
    }

    let conn = Connection::open(path)?;
    Self::from_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    run_migrations(&conn)?;
    Ok(Self {
      pool: Arc::new(Mutex::new(conn)),
    })
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.pool.lock().map_err(|_| {
      tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
      StorageError::LockPoisoned
    })
  }
}

impl ItemStore for SqliteStore {
  fn fetch_all(&self) -> Result<Vec<StudyItem>> {
    let conn = self.lock()?;
    let rows = query_item_rows(
      &conn,
      &format!("SELECT {} FROM study_items ORDER BY rowid ASC", ITEM_COLUMNS),
      [],
    )?;
    attach_all_attempts(&conn, rows)
  }

  fn fetch_by_id(&self, id: ItemId) -> Result<Option<StudyItem>> {
    let conn = self.lock()?;
    let rows = query_item_rows(
      &conn,
      &format!("SELECT {} FROM study_items WHERE id = ?1", ITEM_COLUMNS),
      params![id.to_string()],
    )?;

    match rows.into_iter().next() {
      Some(row) => {
        let attempts = attempts_for(&conn, &row.id)?;
        Ok(Some(build_item(row, attempts)?))
      }
      None => Ok(None),
    }
  }

  fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<StudyItem>> {
    let conn = self.lock()?;
    let rows = query_item_rows(
      &conn,
      &format!(
        "SELECT {} FROM study_items WHERE next_review <= ?1 ORDER BY next_review ASC, rowid ASC",
        ITEM_COLUMNS
      ),
      params![to_db_time(now)],
    )?;
    attach_all_attempts(&conn, rows)
  }

  fn insert(&self, item: &StudyItem) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let id = item.id.to_string();

    let exists: bool = tx.query_row(
      "SELECT EXISTS(SELECT 1 FROM study_items WHERE id = ?1)",
      params![id],
      |row| row.get(0),
    )?;
    if exists {
      return Err(StorageError::Duplicate(item.id));
    }

    tx.execute(
      r#"
      INSERT INTO study_items (id, question, solution, difficulty, last_reviewed, next_review, confidence)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      "#,
      params![
        id,
        item.question,
        item.solution,
        item.difficulty.get(),
        item.last_reviewed().map(to_db_time),
        to_db_time(item.next_review()),
        item.confidence(),
      ],
    )?;
    insert_attempts(&tx, &id, item.attempts(), 0)?;

    tx.commit()?;
    Ok(())
  }

  fn save(&self, item: &StudyItem) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let id = item.id.to_string();

    // Attempts are append-only: the stored history must be a prefix of the
    // item's, and only the remainder is written
    let stored = attempts_for(&tx, &id)?;
    let given = item.attempts();
    let extends_stored = stored.len() <= given.len()
      && stored.iter().zip(given).all(|(s, g)| same_attempt(s, g));
    if !extends_stored {
      return Err(StorageError::StaleItem {
        id: item.id,
        stored: stored.len(),
        given: given.len(),
      });
    }

    let updated = tx.execute(
      r#"
      UPDATE study_items
      SET question = ?2, solution = ?3, difficulty = ?4,
          last_reviewed = ?5, next_review = ?6, confidence = ?7
      WHERE id = ?1
      "#,
      params![
        id,
        item.question,
        item.solution,
        item.difficulty.get(),
        item.last_reviewed().map(to_db_time),
        to_db_time(item.next_review()),
        item.confidence(),
      ],
    )?;
    if updated == 0 {
      return Err(StorageError::NotFound(item.id));
    }
    insert_attempts(&tx, &id, &given[stored.len()..], stored.len())?;

    tx.commit()?;
    Ok(())
  }

  fn delete(&self, id: ItemId) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let key = id.to_string();

    tx.execute("DELETE FROM attempts WHERE item_id = ?1", params![key])?;
    let removed = tx.execute("DELETE FROM study_items WHERE id = ?1", params![key])?;
    if removed == 0 {
      return Err(StorageError::NotFound(id));
    }

    tx.commit()?;
    Ok(())
  }

  fn delete_all(&self) -> Result<usize> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM attempts", [])?;
    let removed = tx.execute("DELETE FROM study_items", [])?;

    tx.commit()?;
    Ok(removed)
  }
}

/// Fixed-width UTC timestamps so string comparison in SQL matches time order
fn to_db_time(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Attempt equality at the precision timestamps are stored with
fn same_attempt(stored: &AttemptRecord, given: &AttemptRecord) -> bool {
  to_db_time(stored.timestamp()) == to_db_time(given.timestamp())
    && stored.success() == given.success()
    && stored.confidence_rating() == given.confidence_rating()
}

fn parse_db_time(value: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| StorageError::Corrupt(format!("bad timestamp {:?}: {}", value, e)))
}

fn query_item_rows<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ItemRow>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, row_to_item_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn row_to_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
  Ok(ItemRow {
    id: row.get(0)?,
    question: row.get(1)?,
    solution: row.get(2)?,
    difficulty: row.get(3)?,
    last_reviewed: row.get(4)?,
    next_review: row.get(5)?,
  })
}

fn build_item(row: ItemRow, attempts: Vec<AttemptRecord>) -> Result<StudyItem> {
  let id = Uuid::parse_str(&row.id)
    .map_err(|e| StorageError::Corrupt(format!("bad item id {:?}: {}", row.id, e)))?;
  let difficulty = Difficulty::new(row.difficulty)
    .map_err(|e| StorageError::Corrupt(format!("item {}: {}", row.id, e)))?;
  let last_reviewed = row.last_reviewed.as_deref().map(parse_db_time).transpose()?;
  let next_review = parse_db_time(&row.next_review)?;

  Ok(StudyItem::from_parts(
    id,
    row.question,
    row.solution,
    difficulty,
    last_reviewed,
    next_review,
    attempts,
  ))
}

fn attach_all_attempts(conn: &Connection, rows: Vec<ItemRow>) -> Result<Vec<StudyItem>> {
  let mut attempts = all_attempts(conn)?;
  rows
    .into_iter()
    .map(|row| {
      let history = attempts.remove(&row.id).unwrap_or_default();
      build_item(row, history)
    })
    .collect()
}

fn attempts_for(conn: &Connection, item_id: &str) -> Result<Vec<AttemptRecord>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT attempted_at, success, confidence_rating
    FROM attempts
    WHERE item_id = ?1
    ORDER BY seq ASC
    "#,
  )?;

  let raw = stmt
    .query_map(params![item_id], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?, row.get::<_, u8>(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raw
    .into_iter()
    .map(|(at, success, rating)| to_attempt(&at, success, rating))
    .collect()
}

/// Every attempt, grouped by item id, each group in submission order
fn all_attempts(conn: &Connection) -> Result<HashMap<String, Vec<AttemptRecord>>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT item_id, attempted_at, success, confidence_rating
    FROM attempts
    ORDER BY item_id ASC, seq ASC
    "#,
  )?;

  let raw = stmt
    .query_map([], |row| {
      Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, bool>(2)?,
        row.get::<_, u8>(3)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut grouped: HashMap<String, Vec<AttemptRecord>> = HashMap::new();
  for (item_id, at, success, rating) in raw {
    grouped
      .entry(item_id)
      .or_default()
      .push(to_attempt(&at, success, rating)?);
  }
  Ok(grouped)
}

fn to_attempt(at: &str, success: bool, rating: u8) -> Result<AttemptRecord> {
  let rating = ConfidenceRating::new(rating).map_err(|e| StorageError::Corrupt(e.to_string()))?;
  Ok(AttemptRecord::new(parse_db_time(at)?, success, rating))
}

fn insert_attempts(
  conn: &Connection,
  item_id: &str,
  attempts: &[AttemptRecord],
  first_seq: usize,
) -> Result<()> {
  let mut stmt = conn.prepare(
    r#"
    INSERT INTO attempts (item_id, seq, attempted_at, success, confidence_rating)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
  )?;

  for (offset, attempt) in attempts.iter().enumerate() {
    stmt.execute(params![
      item_id,
      (first_seq + offset) as i64,
      to_db_time(attempt.timestamp()),
      attempt.success(),
      attempt.confidence_rating().get(),
    ])?;
  }
  Ok(())
}
