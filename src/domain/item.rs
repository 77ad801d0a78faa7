use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attempt::{AttemptRecord, Difficulty};

pub type ItemId = Uuid;

/// A question/solution pair with its review history.
///
/// `confidence` always equals the mean rating over `attempts` (0 when there
/// are none). Scheduling fields change only through review submission or an
/// explicit [`StudyItem::force_due`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredItem")]
pub struct StudyItem {
  pub id: ItemId,
  pub question: String,
  pub solution: String,
  pub difficulty: Difficulty,
  /// None until the first review
  last_reviewed: Option<DateTime<Utc>>,
  next_review: DateTime<Utc>,
  confidence: f64,
  attempts: Vec<AttemptRecord>,
}

/// Serialized form of [`StudyItem`]. Any `confidence` in the input is
/// ignored and recomputed from the attempts.
#[derive(Deserialize)]
struct StoredItem {
  id: ItemId,
  question: String,
  solution: String,
  difficulty: Difficulty,
  last_reviewed: Option<DateTime<Utc>>,
  next_review: DateTime<Utc>,
  #[serde(default)]
  attempts: Vec<AttemptRecord>,
}

impl From<StoredItem> for StudyItem {
  fn from(raw: StoredItem) -> Self {
    Self::from_parts(
      raw.id,
      raw.question,
      raw.solution,
      raw.difficulty,
      raw.last_reviewed,
      raw.next_review,
      raw.attempts,
    )
  }
}

impl StudyItem {
  /// New item: never reviewed and due immediately.
  pub fn new(question: String, solution: String, difficulty: Difficulty, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      question,
      solution,
      difficulty,
      last_reviewed: None,
      next_review: now,
      confidence: 0.0,
      attempts: Vec::new(),
    }
  }

  /// Rebuild an item from persisted parts. Confidence is derived from
  /// `attempts`, so it cannot disagree with the history.
  pub fn from_parts(
    id: ItemId,
    question: String,
    solution: String,
    difficulty: Difficulty,
    last_reviewed: Option<DateTime<Utc>>,
    next_review: DateTime<Utc>,
    attempts: Vec<AttemptRecord>,
  ) -> Self {
    let mut item = Self {
      id,
      question,
      solution,
      difficulty,
      last_reviewed,
      next_review,
      confidence: 0.0,
      attempts,
    };
    item.recompute_confidence();
    item
  }

  pub fn last_reviewed(&self) -> Option<DateTime<Utc>> {
    self.last_reviewed
  }

  pub fn next_review(&self) -> DateTime<Utc> {
    self.next_review
  }

  pub fn confidence(&self) -> f64 {
    self.confidence
  }

  pub fn attempts(&self) -> &[AttemptRecord] {
    &self.attempts
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    now >= self.next_review
  }

  /// Fraction of successful attempts, None before the first attempt
  pub fn success_rate(&self) -> Option<f64> {
    if self.attempts.is_empty() {
      return None;
    }
    let successes = self.attempts.iter().filter(|a| a.success()).count();
    Some(successes as f64 / self.attempts.len() as f64)
  }

  pub fn has_success(&self) -> bool {
    self.attempts.iter().any(|a| a.success())
  }

  /// Make the item due at `now` without touching its history.
  pub fn force_due(&mut self, now: DateTime<Utc>) {
    self.next_review = now;
  }

  pub(crate) fn record_attempt(&mut self, attempt: AttemptRecord) {
    self.last_reviewed = Some(attempt.timestamp());
    self.attempts.push(attempt);
    self.recompute_confidence();
  }

  pub(crate) fn schedule(&mut self, next_review: DateTime<Utc>) {
    self.next_review = next_review;
  }

  fn recompute_confidence(&mut self) {
    self.confidence = if self.attempts.is_empty() {
      0.0
    } else {
      let total: u32 = self
        .attempts
        .iter()
        .map(|a| u32::from(a.confidence_rating().get()))
        .sum();
      f64::from(total) / self.attempts.len() as f64
    };
  }
}

/// User edit of an item's content. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ItemEdit {
  pub question: Option<String>,
  pub solution: Option<String>,
  pub difficulty: Option<Difficulty>,
}
