//! Test utilities for database setup.
//!
//! Reuses the authoritative schema migrations so tests never carry their
//! own copy of the schema.

use std::path::Path;

use tempfile::TempDir;

use crate::store::{SqliteStore, StorageError};

/// A SQLite store in a temporary directory, removed when dropped.
pub struct TestEnv {
  /// Kept alive for the database file's lifetime
  pub temp: TempDir,
  pub store: SqliteStore,
}

impl TestEnv {
  pub fn new() -> Result<Self, StorageError> {
    let temp = TempDir::new()?;
    let store = SqliteStore::open(&temp.path().join("recap.db"))?;
    Ok(Self { temp, store })
  }

  /// Temporary directory path for creating extra test files
  pub fn path(&self) -> &Path {
    self.temp.path()
  }
}
