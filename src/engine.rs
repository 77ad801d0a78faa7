//! Review engine: chooses what to study next and records review outcomes.
//!
//! Selection and due filtering are pure functions over item slices; the
//! [`ReviewEngine`] wraps them around an injected [`ItemStore`] and is the
//! only place where scheduling changes are persisted.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::domain::{Difficulty, ItemEdit, ItemId, StudyItem};
use crate::error::{EngineError, Result};
use crate::srs::{apply_review, calculate_weight, ReviewOutcome, WeightedSampler};
use crate::store::ItemStore;

/// Summary counts for a collection of items
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudyStats {
  pub total: usize,
  pub due: usize,
  /// Items with at least one successful attempt
  pub completed: usize,
  pub attempts: usize,
  /// Mean confidence over items that have been attempted
  pub average_confidence: Option<f64>,
}

/// Pick one item at random, weighted by [`calculate_weight`]. `Ok(None)` when `items` is empty.
pub fn pick_weighted_random_item<'a, R: Rng + ?Sized>(
  items: &'a [StudyItem],
  now: DateTime<Utc>,
  rng: &mut R,
) -> Result<Option<&'a StudyItem>> {
  let weights: Vec<u64> = items.iter().map(|item| calculate_weight(item, now)).collect();
  Ok(pick_weighted_index(&weights, rng)?.and_then(|index| items.get(index)))
}

/// Index drawn in proportion to `weights`. None when there is nothing to pick from.
fn pick_weighted_index<R: Rng + ?Sized>(weights: &[u64], rng: &mut R) -> Result<Option<usize>> {
  match WeightedSampler::new(weights) {
    Ok(sampler) => Ok(Some(sampler.pick_index(rng))),
    Err(EngineError::EmptyInput) => Ok(None),
    Err(e) => Err(e),
  }
}

/// Items due at `now`, most overdue first. Ties keep their input order.
pub fn due_items(items: &[StudyItem], now: DateTime<Utc>) -> Vec<StudyItem> {
  let mut due: Vec<StudyItem> = items.iter().filter(|i| i.is_due(now)).cloned().collect();
  due.sort_by_key(|i| i.next_review());
  due
}

pub struct ReviewEngine<S> {
  store: S,
}

impl<S: ItemStore> ReviewEngine<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn get(&self, id: ItemId) -> Result<StudyItem> {
    self.store.fetch_by_id(id)?.ok_or(EngineError::ItemNotFound(id))
  }

  pub fn all_items(&self) -> Result<Vec<StudyItem>> {
    Ok(self.store.fetch_all()?)
  }

  /// Create a new item, due immediately.
  pub fn add_item(
    &self,
    question: &str,
    solution: &str,
    difficulty: u8,
    now: DateTime<Utc>,
  ) -> Result<StudyItem> {
    let question = non_empty(question, "question")?;
    let solution = non_empty(solution, "solution")?;
    let difficulty = Difficulty::new(difficulty)?;

    let item = StudyItem::new(question, solution, difficulty, now);
    self.store.insert(&item)?;

    tracing::info!(item_id = %item.id, difficulty = difficulty.get(), "Added study item");
    Ok(item)
  }

  /// Change an item's content. Scheduling state is left alone.
  pub fn edit_item(&self, id: ItemId, edit: ItemEdit) -> Result<StudyItem> {
    let mut item = self.get(id)?;

    if let Some(question) = edit.question {
      item.question = non_empty(&question, "question")?;
    }
    if let Some(solution) = edit.solution {
      item.solution = non_empty(&solution, "solution")?;
    }
    if let Some(difficulty) = edit.difficulty {
      item.difficulty = difficulty;
    }

    self.store.save(&item)?;
    tracing::info!(item_id = %id, "Edited study item");
    Ok(item)
  }

  /// Apply a review to `item` and persist it.
  ///
  /// `item` is only updated once the store has accepted the change; on any
  /// error it is left exactly as it was and the review counts as not recorded.
  pub fn submit_review(
    &self,
    item: &mut StudyItem,
    success: bool,
    confidence_rating: u8,
    now: DateTime<Utc>,
  ) -> Result<ReviewOutcome> {
    let mut updated = item.clone();
    let outcome = apply_review(&mut updated, success, confidence_rating, now)?;
    self.store.save(&updated)?;
    *item = updated;

    tracing::info!(
      item_id = %item.id,
      success,
      rating = confidence_rating,
      interval_hours = outcome.interval_hours,
      "Recorded review"
    );
    Ok(outcome)
  }

  /// Load an item by id, then [`Self::submit_review`] it.
  pub fn submit_review_by_id(
    &self,
    id: ItemId,
    success: bool,
    confidence_rating: u8,
    now: DateTime<Utc>,
  ) -> Result<(StudyItem, ReviewOutcome)> {
    let mut item = self.get(id)?;
    let outcome = self.submit_review(&mut item, success, confidence_rating, now)?;
    Ok((item, outcome))
  }

  /// Make an item due at `now` without touching its history.
  pub fn force_due(&self, id: ItemId, now: DateTime<Utc>) -> Result<StudyItem> {
    let mut item = self.get(id)?;
    item.force_due(now);
    self.store.save(&item)?;

    tracing::info!(item_id = %id, "Forced item due");
    Ok(item)
  }

  /// Force every item due. Returns how many were updated.
  pub fn make_all_due(&self, now: DateTime<Utc>) -> Result<usize> {
    let items = self.store.fetch_all()?;
    for mut item in items.iter().cloned() {
      item.force_due(now);
      self.store.save(&item)?;
    }

    tracing::info!(count = items.len(), "Forced all items due");
    Ok(items.len())
  }

  /// Delete an item and all of its attempts.
  pub fn delete_item(&self, id: ItemId) -> Result<()> {
    self.store.delete(id)?;
    tracing::info!(item_id = %id, "Deleted study item");
    Ok(())
  }

  /// Delete every item. Returns how many were removed.
  pub fn reset(&self) -> Result<usize> {
    let removed = self.store.delete_all()?;
    tracing::warn!(count = removed, "Deleted all study items");
    Ok(removed)
  }

  /// Weighted random pick over the whole collection ("practice random item").
  pub fn pick_next<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>) -> Result<Option<StudyItem>> {
    let items = self.store.fetch_all()?;
    let picked = pick_weighted_random_item(&items, now, rng)?.cloned();

    if let Some(item) = &picked {
      tracing::debug!(item_id = %item.id, candidates = items.len(), "Picked item");
    }
    Ok(picked)
  }

  /// Due items, most overdue first
  pub fn due_now(&self, now: DateTime<Utc>) -> Result<Vec<StudyItem>> {
    let items = self.store.fetch_due(now)?;
    Ok(due_items(&items, now))
  }

  /// Earliest review time strictly after `now`, for reminder scheduling
  pub fn next_review_time(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    Ok(
      self
        .store
        .fetch_all()?
        .iter()
        .map(|i| i.next_review())
        .filter(|at| *at > now)
        .min(),
    )
  }

  /// Case-insensitive match on question or solution. Empty query matches everything.
  pub fn search(&self, query: &str) -> Result<Vec<StudyItem>> {
    let items = self.store.fetch_all()?;
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
      return Ok(items);
    }

    Ok(
      items
        .into_iter()
        .filter(|i| {
          i.question.to_lowercase().contains(&needle) || i.solution.to_lowercase().contains(&needle)
        })
        .collect(),
    )
  }

  /// Current selection weight of every item, for display
  pub fn weights(&self, now: DateTime<Utc>) -> Result<Vec<(StudyItem, u64)>> {
    Ok(
      self
        .store
        .fetch_all()?
        .into_iter()
        .map(|item| {
          let weight = calculate_weight(&item, now);
          (item, weight)
        })
        .collect(),
    )
  }

  pub fn stats(&self, now: DateTime<Utc>) -> Result<StudyStats> {
    let items = self.store.fetch_all()?;

    let attempted: Vec<f64> = items
      .iter()
      .filter(|i| !i.attempts().is_empty())
      .map(|i| i.confidence())
      .collect();
    let average_confidence = if attempted.is_empty() {
      None
    } else {
      Some(attempted.iter().sum::<f64>() / attempted.len() as f64)
    };

    Ok(StudyStats {
      total: items.len(),
      due: items.iter().filter(|i| i.is_due(now)).count(),
      completed: items.iter().filter(|i| i.has_success()).count(),
      attempts: items.iter().map(|i| i.attempts().len()).sum(),
      average_confidence,
    })
  }
}

fn non_empty(value: &str, field: &'static str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    Err(EngineError::EmptyField(field))
  } else {
    Ok(trimmed.to_string())
  }
}
