pub mod sampler;
pub mod scheduler;
pub mod weight;

pub use sampler::WeightedSampler;
pub use scheduler::{apply_review, interval_hours, ReviewOutcome};
pub use weight::{calculate_weight, days_since_review, NEVER_REVIEWED_DAYS};
