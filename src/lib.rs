pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod srs;
pub mod store;

#[cfg(test)]
mod testing;

pub use domain::{AttemptRecord, ConfidenceRating, Difficulty, ItemEdit, ItemId, StudyItem};
pub use engine::{due_items, pick_weighted_random_item, ReviewEngine, StudyStats};
pub use error::{EngineError, Result};
pub use srs::{calculate_weight, ReviewOutcome, WeightedSampler};
pub use store::{ItemStore, MemoryStore, SqliteStore, StorageError};
