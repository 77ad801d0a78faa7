//! Prefix-sum weighted index sampler.
//!
//! Each index `k` owns the half-open range `[P[k-1], P[k])` of `[0, total)`,
//! so a uniform draw lands on `k` with probability `w[k] / total`. Zero-weight
//! indices own an empty range and are never drawn (unless every weight is zero).

use rand::Rng;

use crate::error::{EngineError, Result};

/// Immutable after construction; picks take `&self` and may be repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedSampler {
  prefix_sums: Vec<u64>,
  total: u64,
}

impl WeightedSampler {
  /// Build the prefix sums in one pass. Fails on an empty list.
  pub fn new(weights: &[u64]) -> Result<Self> {
    if weights.is_empty() {
      return Err(EngineError::EmptyInput);
    }

    let mut prefix_sums = Vec::with_capacity(weights.len());
    let mut running: u64 = 0;
    for &weight in weights {
      running = running
        .checked_add(weight)
        .ok_or(EngineError::WeightOverflow)?;
      prefix_sums.push(running);
    }

    Ok(Self {
      total: running,
      prefix_sums,
    })
  }

  pub fn len(&self) -> usize {
    self.prefix_sums.len()
  }

  pub fn is_empty(&self) -> bool {
    self.prefix_sums.is_empty()
  }

  pub fn total(&self) -> u64 {
    self.total
  }

  pub fn prefix_sums(&self) -> &[u64] {
    &self.prefix_sums
  }

  /// Draw an index with probability proportional to its weight.
  /// All-zero weights always yield index 0.
  pub fn pick_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
    if self.total == 0 {
      return 0;
    }
    let target = rng.random_range(0..self.total);
    self.index_for(target)
  }

  /// Smallest index whose prefix sum exceeds `target`.
  fn index_for(&self, target: u64) -> usize {
    self.prefix_sums.partition_point(|&sum| sum <= target)
  }
}
