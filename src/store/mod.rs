//! Durable storage for study items.
//!
//! The engine talks to storage only through [`ItemStore`], so the SQLite
//! store used by the binary and the in-memory store used in tests are
//! interchangeable.

pub mod memory;
pub mod schema;
pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{ItemId, StudyItem};

pub use memory::MemoryStore;
pub use sqlite::{DbPool, SqliteStore};

#[derive(Error, Debug)]
pub enum StorageError {
  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// Mutex poisoned by a panic while another caller held it
  #[error("Database unavailable")]
  LockPoisoned,

  #[error("study item not found: {0}")]
  NotFound(ItemId),

  #[error("study item already exists: {0}")]
  Duplicate(ItemId),

  /// The stored attempts are not a prefix of the saved ones, so writing it
  /// would drop a review recorded through another copy of the item.
  #[error("stale copy of item {id}: store has {stored} attempts, save has {given}")]
  StaleItem { id: ItemId, stored: usize, given: usize },

  #[error("corrupt record: {0}")]
  Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage collaborator for the review engine.
///
/// `insert`, `save` and `delete` are atomic: an item and its attempts are
/// written or removed together, or not at all.
pub trait ItemStore {
  /// All items in insertion order
  fn fetch_all(&self) -> Result<Vec<StudyItem>>;

  fn fetch_by_id(&self, id: ItemId) -> Result<Option<StudyItem>>;

  /// Items with `next_review <= now`, most overdue first
  fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<StudyItem>>;

  fn insert(&self, item: &StudyItem) -> Result<()>;

  /// Persist content, scheduling fields and any attempts not yet stored.
  fn save(&self, item: &StudyItem) -> Result<()>;

  /// Remove an item together with its attempts.
  fn delete(&self, id: ItemId) -> Result<()>;

  /// Remove everything, returning how many items were deleted.
  fn delete_all(&self) -> Result<usize>;
}
