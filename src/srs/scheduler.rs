use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::{AttemptRecord, ConfidenceRating, Difficulty, StudyItem};
use crate::error::Result;

const BASE_INTERVAL_HOURS: f64 = 6.0;

/// Result of applying a review to an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewOutcome {
  pub confidence: f64,
  pub next_review: DateTime<Utc>,
  pub interval_hours: f64,
}

/// Hours until the next review.
///
/// Success doubles the 6h baseline per rating step (1 -> 6h ... 5 -> 96h).
/// Failure retries after `rating / 2` hours (0.5h .. 2.5h). Both are then
/// scaled by `0.5 + 1/difficulty`: 1.5x for the easiest items, down to 0.7x
/// for the hardest.
pub fn interval_hours(success: bool, rating: ConfidenceRating, difficulty: Difficulty) -> f64 {
  let rating = f64::from(rating.get());

  let hours = if success {
    BASE_INTERVAL_HOURS * 2f64.powf(rating - 1.0)
  } else {
    rating / 2.0
  };

  let difficulty_factor = 1.0 / f64::from(difficulty.get());
  hours * (0.5 + difficulty_factor)
}

/// Record a review on `item` and reschedule it.
///
/// The rating is validated before anything changes, so an invalid rating
/// leaves the item untouched. The caller is responsible for persisting the
/// mutated item.
pub fn apply_review(
  item: &mut StudyItem,
  success: bool,
  confidence_rating: u8,
  now: DateTime<Utc>,
) -> Result<ReviewOutcome> {
  let rating = ConfidenceRating::new(confidence_rating)?;

  // The new attempt participates in the average
  item.record_attempt(AttemptRecord::new(now, success, rating));

  let hours = interval_hours(success, rating, item.difficulty);
  let next_review = now + hours_to_duration(hours);
  item.schedule(next_review);

  tracing::debug!(
    item_id = %item.id,
    success,
    rating = rating.get(),
    interval_hours = hours,
    "Scheduled next review"
  );

  Ok(ReviewOutcome {
    confidence: item.confidence(),
    next_review,
    interval_hours: hours,
  })
}

fn hours_to_duration(hours: f64) -> Duration {
  Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::EngineError;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
  }

  fn item(difficulty: u8) -> StudyItem {
    StudyItem::new(
      "Capital of France?".to_string(),
      "Paris".to_string(),
      Difficulty::new(difficulty).unwrap(),
      now() - Duration::days(1),
    )
  }

  fn rating(value: u8) -> ConfidenceRating {
    ConfidenceRating::new(value).unwrap()
  }

  #[test]
  fn test_success_interval_doubles_per_rating() {
    // difficulty 2 -> multiplier 1.0
    let d = Difficulty::new(2).unwrap();
    assert_eq!(interval_hours(true, rating(1), d), 6.0);
    assert_eq!(interval_hours(true, rating(2), d), 12.0);
    assert_eq!(interval_hours(true, rating(3), d), 24.0);
    assert_eq!(interval_hours(true, rating(4), d), 48.0);
    assert_eq!(interval_hours(true, rating(5), d), 96.0);
  }

  #[test]
  fn test_failure_interval_scales_with_rating() {
    let d = Difficulty::new(2).unwrap();
    assert_eq!(interval_hours(false, rating(1), d), 0.5);
    assert_eq!(interval_hours(false, rating(5), d), 2.5);
  }

  #[test]
  fn test_difficulty_multiplier() {
    // Easy items wait longer, hard items come back sooner
    assert_eq!(interval_hours(true, rating(1), Difficulty::new(1).unwrap()), 9.0);
    assert!((interval_hours(true, rating(1), Difficulty::new(5).unwrap()) - 4.2).abs() < 1e-9);
  }

  #[test]
  fn test_apply_review_success_fresh_item() {
    let mut item = item(2);
    let outcome = apply_review(&mut item, true, 3, now()).unwrap();

    // 6 * 2^2 * (0.5 + 0.5) = 24h
    assert_eq!(outcome.interval_hours, 24.0);
    assert_eq!(outcome.next_review, now() + Duration::hours(24));
    assert_eq!(item.next_review(), now() + Duration::hours(24));
    assert_eq!(item.last_reviewed(), Some(now()));
    assert_eq!(outcome.confidence, 3.0);
  }

  #[test]
  fn test_apply_review_failure_easy_item() {
    let mut item = item(1);
    let outcome = apply_review(&mut item, false, 4, now()).unwrap();

    // (4 / 2) * (0.5 + 1.0) = 3h
    assert_eq!(outcome.interval_hours, 3.0);
    assert_eq!(outcome.next_review, now() + Duration::hours(3));
    assert!(!item.attempts()[0].success());
  }

  #[test]
  fn test_confidence_is_running_average() {
    let mut item = item(3);
    apply_review(&mut item, true, 2, now()).unwrap();
    apply_review(&mut item, true, 4, now()).unwrap();
    let outcome = apply_review(&mut item, true, 5, now()).unwrap();

    assert!((outcome.confidence - 11.0 / 3.0).abs() < 1e-9);
    assert_eq!(item.attempts().len(), 3);
  }

  #[test]
  fn test_invalid_rating_leaves_item_untouched() {
    for bad in [0, 6] {
      let mut item = item(2);
      let before = item.clone();

      let err = apply_review(&mut item, true, bad, now()).unwrap_err();

      assert!(matches!(err, EngineError::InvalidRating(r) if r == bad));
      assert_eq!(item, before);
    }
  }

  #[test]
  fn test_fractional_interval_rounds_to_millis() {
    let mut item = item(3);
    let outcome = apply_review(&mut item, false, 1, now()).unwrap();

    // 0.5 * (0.5 + 1/3) hours = 25 minutes
    assert_eq!(outcome.next_review, now() + Duration::minutes(25));
  }
}
