//! Daily rounds — periodic observations recorded against a consultation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, consultation::Category, patch::nullable};

/// Accepted body temperature range, in degrees Fahrenheit.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 95.0..=106.0;

/// Trend of the patient's health since the previous round, `0` meaning no data
/// and `1..=5` ranging from "really worse" to "really better".
pub const CURRENT_HEALTH_RANGE: std::ops::RangeInclusive<i64> = 0..=5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRoundFields {
  #[serde(default)]
  pub temperature:               Option<f64>,
  #[serde(default)]
  pub temperature_measured_at:   Option<DateTime<Utc>>,
  #[serde(default)]
  pub physical_examination_info: Option<String>,
  #[serde(default)]
  pub additional_symptoms:       Vec<String>,
  #[serde(default)]
  pub other_symptoms:            Option<String>,
  #[serde(default)]
  pub patient_category:          Option<Category>,
  #[serde(default)]
  pub current_health:            i64,
  #[serde(default)]
  pub recommend_discharge:       bool,
  #[serde(default)]
  pub other_details:             Option<String>,
}

impl DailyRoundFields {
  pub fn validate(&self) -> Result<()> {
    if let Some(t) = self.temperature
      && !TEMPERATURE_RANGE.contains(&t)
    {
      return Err(Error::Validation {
        field:  "temperature",
        reason: format!(
          "{t} is outside {}..={}",
          TEMPERATURE_RANGE.start(),
          TEMPERATURE_RANGE.end()
        ),
      });
    }
    if !CURRENT_HEALTH_RANGE.contains(&self.current_health) {
      return Err(Error::Validation {
        field:  "current_health",
        reason: format!("{} is not a known health trend", self.current_health),
      });
    }
    Ok(())
  }
}

/// A persisted daily round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRound {
  pub id:            i64,
  /// Internal id of the parent consultation.
  pub consultation:  i64,
  #[serde(flatten)]
  pub fields:        DailyRoundFields,
  pub created_date:  DateTime<Utc>,
  pub modified_date: DateTime<Utc>,
}

/// A full daily-round payload.
///
/// `consultation` is required, but handlers always overwrite it with the id
/// derived from the request path before this type is deserialised.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRoundInput {
  pub consultation: i64,
  #[serde(flatten)]
  pub fields:       DailyRoundFields,
}

/// Partial update accepted by `PATCH`. Absent fields are left unchanged;
/// nullable fields are cleared by an explicit `null`.
///
/// Like [`DailyRoundInput`], `consultation` is always the id derived from the
/// request path.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRoundPatch {
  pub consultation:              i64,
  #[serde(default, deserialize_with = "nullable")]
  pub temperature:               Option<Option<f64>>,
  #[serde(default, deserialize_with = "nullable")]
  pub temperature_measured_at:   Option<Option<DateTime<Utc>>>,
  #[serde(default, deserialize_with = "nullable")]
  pub physical_examination_info: Option<Option<String>>,
  #[serde(default)]
  pub additional_symptoms:       Option<Vec<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub other_symptoms:            Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub patient_category:          Option<Option<Category>>,
  #[serde(default)]
  pub current_health:            Option<i64>,
  #[serde(default)]
  pub recommend_discharge:       Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub other_details:             Option<Option<String>>,
}

impl DailyRoundPatch {
  /// Merge this patch over `current`'s fields.
  pub fn apply(self, current: &DailyRound) -> DailyRoundFields {
    let f = current.fields.clone();
    DailyRoundFields {
      temperature:               self.temperature.unwrap_or(f.temperature),
      temperature_measured_at:   self.temperature_measured_at.unwrap_or(f.temperature_measured_at),
      physical_examination_info: self
        .physical_examination_info
        .unwrap_or(f.physical_examination_info),
      additional_symptoms:       self.additional_symptoms.unwrap_or(f.additional_symptoms),
      other_symptoms:            self.other_symptoms.unwrap_or(f.other_symptoms),
      patient_category:          self.patient_category.unwrap_or(f.patient_category),
      current_health:            self.current_health.unwrap_or(f.current_health),
      recommend_discharge:       self.recommend_discharge.unwrap_or(f.recommend_discharge),
      other_details:             self.other_details.unwrap_or(f.other_details),
    }
  }
}
