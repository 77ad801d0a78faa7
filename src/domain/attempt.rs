use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Self-reported recall strength for a single attempt, 1 (guessed) to 5 (instant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ConfidenceRating(u8);

impl ConfidenceRating {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: u8) -> Result<Self, EngineError> {
    if (Self::MIN..=Self::MAX).contains(&value) {
      Ok(Self(value))
    } else {
      Err(EngineError::InvalidRating(value))
    }
  }

  pub fn get(self) -> u8 {
    self.0
  }
}

impl TryFrom<u8> for ConfidenceRating {
  type Error = EngineError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<ConfidenceRating> for u8 {
  fn from(rating: ConfidenceRating) -> Self {
    rating.0
  }
}

/// Item difficulty, 1 (easy) to 5 (hard). Never zero, it divides the review interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: u8) -> Result<Self, EngineError> {
    if (Self::MIN..=Self::MAX).contains(&value) {
      Ok(Self(value))
    } else {
      Err(EngineError::InvalidDifficulty(value))
    }
  }

  pub fn get(self) -> u8 {
    self.0
  }
}

impl Default for Difficulty {
  fn default() -> Self {
    Self(2)
  }
}

impl TryFrom<u8> for Difficulty {
  type Error = EngineError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Difficulty> for u8 {
  fn from(difficulty: Difficulty) -> Self {
    difficulty.0
  }
}

/// One submitted review. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
  timestamp: DateTime<Utc>,
  success: bool,
  confidence_rating: ConfidenceRating,
}

impl AttemptRecord {
  pub fn new(timestamp: DateTime<Utc>, success: bool, confidence_rating: ConfidenceRating) -> Self {
    Self {
      timestamp,
      success,
      confidence_rating,
    }
  }

  pub fn timestamp(&self) -> DateTime<Utc> {
    self.timestamp
  }

  pub fn success(&self) -> bool {
    self.success
  }

  pub fn confidence_rating(&self) -> ConfidenceRating {
    self.confidence_rating
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // ConfidenceRating tests

  #[test]
  fn test_rating_accepts_full_range() {
    for value in 1..=5 {
      assert_eq!(ConfidenceRating::new(value).unwrap().get(), value);
    }
  }

  #[test]
  fn test_rating_rejects_zero_and_six() {
    assert!(matches!(ConfidenceRating::new(0), Err(EngineError::InvalidRating(0))));
    assert!(matches!(ConfidenceRating::new(6), Err(EngineError::InvalidRating(6))));
  }

  #[test]
  fn test_rating_serde_as_integer() {
    let rating = ConfidenceRating::new(4).unwrap();
    assert_eq!(serde_json::to_string(&rating).unwrap(), "4");

    let parsed: ConfidenceRating = serde_json::from_str("3").unwrap();
    assert_eq!(parsed.get(), 3);
  }

  #[test]
  fn test_rating_serde_rejects_out_of_range() {
    assert!(serde_json::from_str::<ConfidenceRating>("9").is_err());
  }

  // Difficulty tests

  #[test]
  fn test_difficulty_default_is_two() {
    assert_eq!(Difficulty::default().get(), 2);
  }

  #[test]
  fn test_difficulty_rejects_zero() {
    // Zero would divide the interval by zero
    assert!(matches!(Difficulty::new(0), Err(EngineError::InvalidDifficulty(0))));
    assert!(Difficulty::try_from(6).is_err());
  }

  #[test]
  fn test_difficulty_ordering() {
    assert!(Difficulty::new(1).unwrap() < Difficulty::new(5).unwrap());
  }

  // AttemptRecord tests

  #[test]
  fn test_attempt_accessors() {
    let now = Utc::now();
    let attempt = AttemptRecord::new(now, true, ConfidenceRating::new(5).unwrap());
    assert_eq!(attempt.timestamp(), now);
    assert!(attempt.success());
    assert_eq!(attempt.confidence_rating().get(), 5);
  }
}
