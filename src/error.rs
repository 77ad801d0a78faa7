//! Error types shared by the scheduling engine and its storage layer.

use thiserror::Error;

use crate::domain::ItemId;
use crate::store::StorageError;

#[derive(Error, Debug)]
pub enum EngineError {
  /// Confidence rating outside 1..=5. Raised before any mutation.
  #[error("invalid confidence rating {0}, expected 1-5")]
  InvalidRating(u8),

  #[error("invalid difficulty {0}, expected 1-5")]
  InvalidDifficulty(u8),

  #[error("{0} must not be empty")]
  EmptyField(&'static str),

  /// Weighted pick over zero candidates
  #[error("cannot sample from an empty weight list")]
  EmptyInput,

  #[error("total weight exceeds u64 range")]
  WeightOverflow,

  #[error("study item not found: {0}")]
  ItemNotFound(ItemId),

  #[error("storage failure: {0}")]
  Storage(StorageError),
}

impl From<StorageError> for EngineError {
  fn from(err: StorageError) -> Self {
    match err {
      StorageError::NotFound(id) => Self::ItemNotFound(id),
      other => Self::Storage(other),
    }
  }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn test_not_found_maps_to_item_not_found() {
    let id = Uuid::new_v4();
    let err: EngineError = StorageError::NotFound(id).into();
    assert!(matches!(err, EngineError::ItemNotFound(got) if got == id));
  }

  #[test]
  fn test_other_storage_errors_wrapped_verbatim() {
    let err: EngineError = StorageError::LockPoisoned.into();
    assert!(matches!(err, EngineError::Storage(StorageError::LockPoisoned)));
  }

  #[test]
  fn test_invalid_rating_message() {
    assert_eq!(
      EngineError::InvalidRating(6).to_string(),
      "invalid confidence rating 6, expected 1-5"
    );
  }
}
