//! Selection weight for weighted random practice.
//!
//! Items are favored when they have:
//! - Low average confidence
//! - High difficulty
//! - Gone many days without review (linear recency bonus, then a
//!   forgetting-curve multiplier approaching 2x)

use chrono::{DateTime, Utc};

use crate::domain::StudyItem;

const BASE_WEIGHT: u64 = 100;
const CONFIDENCE_MULTIPLIER: f64 = 20.0;
const DIFFICULTY_MULTIPLIER: u64 = 10;
const RECENCY_MULTIPLIER: u64 = 5;
const MAX_RECENCY_ADJUSTMENT: u64 = 100;

/// Days after which retention has decayed to 1/e
const FORGETTING_SCALE_DAYS: f64 = 5.0;

/// Day count used for items that were never reviewed. Large enough to max out
/// both the recency bonus and the forgetting-curve multiplier.
pub const NEVER_REVIEWED_DAYS: i64 = 10_000;

/// Whole days between the last review and `now`, never negative
pub fn days_since_review(last_reviewed: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
  match last_reviewed {
    Some(at) => (now - at).num_days().max(0),
    None => NEVER_REVIEWED_DAYS,
  }
}

/// Calculate the selection weight for an item at `now`. Always >= 1.
pub fn calculate_weight(item: &StudyItem, now: DateTime<Utc>) -> u64 {
  weight_for(
    item.confidence(),
    item.difficulty.get(),
    days_since_review(item.last_reviewed(), now),
  )
}

/// Weight from raw inputs: confidence in 0..=5, difficulty in 1..=5, elapsed days.
pub fn weight_for(confidence: f64, difficulty: u8, days_since_review: i64) -> u64 {
  let confidence = confidence.clamp(0.0, 5.0);
  let days = days_since_review.max(0) as u64;

  // Lower confidence = higher weight (0..=100)
  let confidence_adjustment = ((5.0 - confidence) * CONFIDENCE_MULTIPLIER).round() as u64;
  // Harder = higher weight (10..=50)
  let difficulty_adjustment = u64::from(difficulty) * DIFFICULTY_MULTIPLIER;
  let recency_adjustment = days
    .saturating_mul(RECENCY_MULTIPLIER)
    .min(MAX_RECENCY_ADJUSTMENT);

  let weight = BASE_WEIGHT + confidence_adjustment + difficulty_adjustment + recency_adjustment;

  apply_forgetting_curve(weight, days).max(1)
}

/// Scale by 1 + (1 - e^(-t/S)): no change on the day of review, 2x in the limit.
fn apply_forgetting_curve(weight: u64, days: u64) -> u64 {
  if days == 0 {
    return weight;
  }
  let factor = days as f64 / FORGETTING_SCALE_DAYS;
  let multiplier = 1.0 + (1.0 - (-factor).exp());
  (weight as f64 * multiplier).floor() as u64
}
