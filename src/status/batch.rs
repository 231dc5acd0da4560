//! Splits cache misses into upstream-sized batches.

use std::collections::HashSet;

use crate::config::MAX_BATCH_LIMIT;

/// Groups channel names so no upstream call exceeds `limit` logins.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner {
  limit: usize,
}

impl BatchPlanner {
  /// `limit` is clamped to 1..=100; the upstream API rejects anything larger.
  pub fn new(limit: usize) -> Self {
    Self {
      limit: limit.clamp(1, MAX_BATCH_LIMIT),
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  /// Every distinct key appears in exactly one group, in first-seen order.
  pub fn plan(&self, keys: &[String]) -> Vec<Vec<String>> {
    let mut seen = HashSet::with_capacity(keys.len());
    let unique: Vec<String> = keys
      .iter()
      .filter(|key| seen.insert(key.as_str()))
      .cloned()
      .collect();

    unique.chunks(self.limit).map(|chunk| chunk.to_vec()).collect()
  }
}

impl Default for BatchPlanner {
  fn default() -> Self {
    Self::new(MAX_BATCH_LIMIT)
  }
}
