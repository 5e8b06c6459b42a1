//! Collection filters for consultation listings.
//!
//! Filters compose with the caller's [`Visibility`](crate::visibility::Visibility)
//! by logical AND.

use serde::Deserialize;

/// Query-string filters accepted by the consultation list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConsultationFilter {
  /// Exact match on the patient's external identifier. Any UUID spelling
  /// (upper case, unhyphenated, URN) is accepted; a value that is not a UUID
  /// simply matches nothing.
  pub patient:  Option<String>,
  /// Exact match on the consultation's facility id.
  pub facility: Option<i64>,
}

impl ConsultationFilter {
  pub fn is_empty(&self) -> bool { self.patient.is_none() && self.facility.is_none() }
}
