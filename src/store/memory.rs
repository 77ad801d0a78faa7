use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{ItemStore, Result, StorageError};
use crate::domain::{ItemId, StudyItem};

/// Non-durable store backed by a vector. Used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
  items: Mutex<Vec<StudyItem>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_items(items: Vec<StudyItem>) -> Self {
    Self {
      items: Mutex::new(items),
    }
  }

  fn lock(&self) -> Result<MutexGuard<'_, Vec<StudyItem>>> {
    self.items.lock().map_err(|_| StorageError::LockPoisoned)
  }
}

impl ItemStore for MemoryStore {
  fn fetch_all(&self) -> Result<Vec<StudyItem>> {
    Ok(self.lock()?.clone())
  }

  fn fetch_by_id(&self, id: ItemId) -> Result<Option<StudyItem>> {
    Ok(self.lock()?.iter().find(|i| i.id == id).cloned())
  }

  fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<StudyItem>> {
    let mut due: Vec<StudyItem> = self
      .lock()?
      .iter()
      .filter(|i| i.is_due(now))
      .cloned()
      .collect();
    due.sort_by_key(|i| i.next_review());
    Ok(due)
  }

  fn insert(&self, item: &StudyItem) -> Result<()> {
    let mut items = self.lock()?;
    if items.iter().any(|i| i.id == item.id) {
      return Err(StorageError::Duplicate(item.id));
    }
    items.push(item.clone());
    Ok(())
  }

  fn save(&self, item: &StudyItem) -> Result<()> {
    let mut items = self.lock()?;
    let stored = items
      .iter_mut()
      .find(|i| i.id == item.id)
      .ok_or(StorageError::NotFound(item.id))?;

    if !item.attempts().starts_with(stored.attempts()) {
      return Err(StorageError::StaleItem {
        id: item.id,
        stored: stored.attempts().len(),
        given: item.attempts().len(),
      });
    }

    *stored = item.clone();
    Ok(())
  }

  fn delete(&self, id: ItemId) -> Result<()> {
    let mut items = self.lock()?;
    let pos = items
      .iter()
      .position(|i| i.id == id)
      .ok_or(StorageError::NotFound(id))?;
    // Attempts are owned by the item and go with it
    items.remove(pos);
    Ok(())
  }

  fn delete_all(&self) -> Result<usize> {
    let mut items = self.lock()?;
    let count = items.len();
    items.clear();
    Ok(count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;
  use crate::srs::apply_review;
  use chrono::{Duration, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
  }

  fn item(question: &str, next_review: DateTime<Utc>) -> StudyItem {
    StudyItem::new(question.to_string(), "answer".to_string(), Difficulty::default(), next_review)
  }

  #[test]
  fn test_insert_and_fetch() {
    let store = MemoryStore::new();
    let a = item("a", now());
    store.insert(&a).unwrap();

    assert_eq!(store.fetch_by_id(a.id).unwrap(), Some(a.clone()));
    assert_eq!(store.fetch_all().unwrap(), vec![a]);
  }

  #[test]
  fn test_insert_duplicate_rejected() {
    let store = MemoryStore::new();
    let a = item("a", now());
    store.insert(&a).unwrap();

    assert!(matches!(store.insert(&a), Err(StorageError::Duplicate(id)) if id == a.id));
  }

  #[test]
  fn test_fetch_due_sorted() {
    let late = item("late", now() - Duration::hours(1));
    let on_time = item("on time", now());
    let early = item("early", now() - Duration::hours(5));
    let future = item("future", now() + Duration::hours(1));
    let store = MemoryStore::with_items(vec![late.clone(), on_time.clone(), early.clone(), future]);

    let due = store.fetch_due(now()).unwrap();
    let questions: Vec<_> = due.iter().map(|i| i.question.as_str()).collect();
    assert_eq!(questions, vec!["early", "late", "on time"]);
  }

  #[test]
  fn test_save_unknown_item() {
    let store = MemoryStore::new();
    let a = item("a", now());
    assert!(matches!(store.save(&a), Err(StorageError::NotFound(_))));
  }

  #[test]
  fn test_save_stale_copy_rejected() {
    let store = MemoryStore::new();
    let stale = item("a", now());
    store.insert(&stale).unwrap();

    let mut fresh = stale.clone();
    apply_review(&mut fresh, true, 3, now()).unwrap();
    store.save(&fresh).unwrap();

    let err = store.save(&stale).unwrap_err();
    assert!(matches!(err, StorageError::StaleItem { stored: 1, given: 0, .. }));
    assert_eq!(store.fetch_by_id(stale.id).unwrap(), Some(fresh));
  }

  #[test]
  fn test_save_divergent_copy_rejected() {
    let store = MemoryStore::new();
    let original = item("a", now());
    store.insert(&original).unwrap();

    let mut first = original.clone();
    let mut second = original.clone();
    apply_review(&mut first, true, 5, now()).unwrap();
    apply_review(&mut second, false, 1, now()).unwrap();
    store.save(&first).unwrap();

    let err = store.save(&second).unwrap_err();
    assert!(matches!(err, StorageError::StaleItem { stored: 1, given: 1, .. }));
    assert_eq!(store.fetch_by_id(original.id).unwrap(), Some(first));
  }

  #[test]
  fn test_delete() {
    let store = MemoryStore::new();
    let a = item("a", now());
    let b = item("b", now());
    store.insert(&a).unwrap();
    store.insert(&b).unwrap();

    store.delete(a.id).unwrap();

    assert_eq!(store.fetch_all().unwrap(), vec![b]);
    assert!(matches!(store.delete(a.id), Err(StorageError::NotFound(_))));
  }

  #[test]
  fn test_delete_all() {
    let store = MemoryStore::with_items(vec![item("a", now()), item("b", now())]);
    assert_eq!(store.delete_all().unwrap(), 2);
    assert!(store.fetch_all().unwrap().is_empty());
  }
}
