//! Limit/offset pagination.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 14;
pub const MAX_LIMIT: usize = 100;

/// Requested window into an ordered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl PageRequest {
  /// Effective limit: defaulted and clamped to `1..=MAX_LIMIT`.
  pub fn limit(&self) -> usize { self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) }

  pub fn offset(&self) -> usize { self.offset.unwrap_or(0) }
}

/// One page of results plus the size of the whole filtered collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
  pub count:   usize,
  pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn limit_is_defaulted_and_clamped() {
    assert_eq!(PageRequest::default().limit(), DEFAULT_LIMIT);
    assert_eq!(PageRequest { limit: Some(0), offset: None }.limit(), 1);
    assert_eq!(PageRequest { limit: Some(5000), offset: None }.limit(), MAX_LIMIT);
    assert_eq!(PageRequest::default().offset(), 0);
  }
}
