//! Serde support for partial updates.
//!
//! A nullable field in a `PATCH` body has three states: absent (keep),
//! `null` (clear) and a value (replace). Patch types model them as
//! `Option<Option<T>>` with `#[serde(default, deserialize_with = "nullable")]`.

use serde::{Deserialize, Deserializer};

/// Deserialise a present field, mapping `null` to `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  use super::*;

  #[derive(Deserialize)]
  struct Body {
    #[serde(default, deserialize_with = "nullable")]
    bed: Option<Option<String>>,
  }

  fn parse(v: serde_json::Value) -> Option<Option<String>> {
    serde_json::from_value::<Body>(v).unwrap().bed
  }

  #[test]
  fn distinguishes_absent_null_and_value() {
    assert_eq!(parse(serde_json::json!({})), None);
    assert_eq!(parse(serde_json::json!({ "bed": null })), Some(None));
    assert_eq!(parse(serde_json::json!({ "bed": "W-1" })), Some(Some("W-1".into())));
  }
}
