pub mod attempt;
pub mod item;

pub use attempt::{AttemptRecord, ConfidenceRating, Difficulty};
pub use item::{ItemEdit, ItemId, StudyItem};
