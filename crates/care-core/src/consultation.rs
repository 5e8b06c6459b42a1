//! Patient consultations.
//!
//! A consultation records one episode of care for a patient at a facility.
//! Its internal `id` never leaves the server except as the `consultation`
//! reference on daily rounds; clients address consultations by `external_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, patch::nullable};

/// Clinical category of a patient at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Asymptomatic,
  Mild,
  Moderate,
  Severe,
}

/// The outcome suggested at the end of a consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suggestion {
  #[serde(rename = "HI")]
  HomeIsolation,
  #[serde(rename = "A")]
  Admission,
  #[serde(rename = "R")]
  Referral,
}

/// The mutable clinical fields of a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationFields {
  #[serde(default)]
  pub symptoms:              Vec<String>,
  #[serde(default)]
  pub other_symptoms:        Option<String>,
  #[serde(default)]
  pub symptoms_onset_date:   Option<DateTime<Utc>>,
  #[serde(default)]
  pub category:              Option<Category>,
  #[serde(default)]
  pub examination_details:   Option<String>,
  #[serde(default)]
  pub existing_medication:   Option<String>,
  #[serde(default)]
  pub prescribed_medication: Option<String>,
  pub suggestion:            Suggestion,
  /// Facility the patient is referred to; required when `suggestion` is
  /// [`Suggestion::Referral`].
  #[serde(default)]
  pub referred_to:           Option<i64>,
  #[serde(default)]
  pub admitted:              bool,
  #[serde(default)]
  pub admission_date:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub discharge_date:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub bed_number:            Option<String>,
}

impl ConsultationFields {
  /// Check cross-field constraints that serde cannot express.
  pub fn validate(&self) -> Result<()> {
    if self.suggestion == Suggestion::Referral && self.referred_to.is_none() {
      return Err(Error::Validation {
        field:  "referred_to",
        reason: "required when suggestion is a referral".into(),
      });
    }
    if self.admitted && self.admission_date.is_none() {
      return Err(Error::Validation {
        field:  "admission_date",
        reason: "required when the patient is admitted".into(),
      });
    }
    if let (Some(admitted), Some(discharged)) = (self.admission_date, self.discharge_date)
      && discharged < admitted
    {
      return Err(Error::Validation {
        field:  "discharge_date",
        reason: "must not precede admission_date".into(),
      });
    }
    Ok(())
  }
}

/// A persisted consultation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consultation {
  pub id:            i64,
  pub external_id:   Uuid,
  /// External identifier of the patient.
  pub patient:       Uuid,
  pub facility:      i64,
  pub assigned_to:   Option<i64>,
  #[serde(flatten)]
  pub fields:        ConsultationFields,
  pub created_date:  DateTime<Utc>,
  pub modified_date: DateTime<Utc>,
}

/// Input to [`CareStore::create_consultation`](crate::store::CareStore::create_consultation).
#[derive(Debug, Clone)]
pub struct NewConsultation {
  /// Internal patient id.
  pub patient_id:  i64,
  pub facility_id: i64,
  pub assigned_to: Option<i64>,
  pub fields:      ConsultationFields,
}

/// The organisational coordinates of a consultation, as needed to evaluate a
/// visibility predicate against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsultationScope {
  /// Facility the patient is registered at.
  pub patient_facility_id: i64,
  pub district_id:         i64,
  pub state_id:            i64,
  pub assigned_to:         Option<i64>,
}

/// Partial update accepted by `PATCH`. Absent fields are left unchanged;
/// nullable fields are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultationPatch {
  #[serde(default, deserialize_with = "nullable")]
  pub assigned_to:           Option<Option<i64>>,
  pub symptoms:              Option<Vec<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub other_symptoms:        Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub symptoms_onset_date:   Option<Option<DateTime<Utc>>>,
  #[serde(default, deserialize_with = "nullable")]
  pub category:              Option<Option<Category>>,
  #[serde(default, deserialize_with = "nullable")]
  pub examination_details:   Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub existing_medication:   Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub prescribed_medication: Option<Option<String>>,
  pub suggestion:            Option<Suggestion>,
  #[serde(default, deserialize_with = "nullable")]
  pub referred_to:           Option<Option<i64>>,
  pub admitted:              Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub admission_date:        Option<Option<DateTime<Utc>>>,
  #[serde(default, deserialize_with = "nullable")]
  pub discharge_date:        Option<Option<DateTime<Utc>>>,
  #[serde(default, deserialize_with = "nullable")]
  pub bed_number:            Option<Option<String>>,
}

impl ConsultationPatch {
  /// Merge this patch over the current state, returning the new
  /// `(assigned_to, fields)` pair.
  pub fn apply(self, current: &Consultation) -> (Option<i64>, ConsultationFields) {
    let f = current.fields.clone();
    let fields = ConsultationFields {
      symptoms:              self.symptoms.unwrap_or(f.symptoms),
      other_symptoms:        self.other_symptoms.unwrap_or(f.other_symptoms),
      symptoms_onset_date:   self.symptoms_onset_date.unwrap_or(f.symptoms_onset_date),
      category:              self.category.unwrap_or(f.category),
      examination_details:   self.examination_details.unwrap_or(f.examination_details),
      existing_medication:   self.existing_medication.unwrap_or(f.existing_medication),
      prescribed_medication: self.prescribed_medication.unwrap_or(f.prescribed_medication),
      suggestion:            self.suggestion.unwrap_or(f.suggestion),
      referred_to:           self.referred_to.unwrap_or(f.referred_to),
      admitted:              self.admitted.unwrap_or(f.admitted),
      admission_date:        self.admission_date.unwrap_or(f.admission_date),
      discharge_date:        self.discharge_date.unwrap_or(f.discharge_date),
      bed_number:            self.bed_number.unwrap_or(f.bed_number),
    };
    (self.assigned_to.unwrap_or(current.assigned_to), fields)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn fields() -> ConsultationFields {
    serde_json::from_value(serde_json::json!({ "suggestion": "HI" })).unwrap()
  }

  #[test]
  fn minimal_body_uses_defaults() {
    let f = fields();
    assert_eq!(f.suggestion, Suggestion::HomeIsolation);
    assert!(f.symptoms.is_empty());
    assert!(!f.admitted);
    assert!(f.validate().is_ok());
  }

  #[test]
  fn referral_requires_target() {
    let mut f = fields();
    f.suggestion = Suggestion::Referral;
    assert!(matches!(
      f.validate(),
      Err(Error::Validation { field: "referred_to", .. })
    ));
    f.referred_to = Some(3);
    assert!(f.validate().is_ok());
  }

  #[test]
  fn discharge_before_admission_rejected() {
    let now = Utc::now();
    let mut f = fields();
    f.admitted = true;
    f.admission_date = Some(now);
    f.discharge_date = Some(now - Duration::days(1));
    assert!(matches!(
      f.validate(),
      Err(Error::Validation { field: "discharge_date", .. })
    ));
  }

  #[test]
  fn patch_keeps_absent_fields() {
    let now = Utc::now();
    let current = Consultation {
      id:            1,
      external_id:   Uuid::new_v4(),
      patient:       Uuid::new_v4(),
      facility:      1,
      assigned_to:   Some(7),
      fields:        ConsultationFields {
        bed_number: Some("B-12".into()),
        ..fields()
      },
      created_date:  now,
      modified_date: now,
    };

    let patch: ConsultationPatch =
      serde_json::from_value(serde_json::json!({ "category": "mild" })).unwrap();
    let (assigned_to, f) = patch.apply(&current);

    assert_eq!(assigned_to, Some(7));
    assert_eq!(f.category, Some(Category::Mild));
    assert_eq!(f.bed_number.as_deref(), Some("B-12"));
    assert_eq!(f.suggestion, Suggestion::HomeIsolation);
  }

  #[test]
  fn patch_null_clears_nullable_fields() {
    let now = Utc::now();
    let current = Consultation {
      id:            1,
      external_id:   Uuid::new_v4(),
      patient:       Uuid::new_v4(),
      facility:      1,
      assigned_to:   Some(7),
      fields:        ConsultationFields {
        bed_number: Some("B-12".into()),
        category:   Some(Category::Severe),
        ..fields()
      },
      created_date:  now,
      modified_date: now,
    };

    let patch: ConsultationPatch = serde_json::from_value(serde_json::json!({
      "assigned_to": null,
      "bed_number": null,
    }))
    .unwrap();
    let (assigned_to, f) = patch.apply(&current);

    assert_eq!(assigned_to, None);
    assert_eq!(f.bed_number, None);
    assert_eq!(f.category, Some(Category::Severe));
  }
}
