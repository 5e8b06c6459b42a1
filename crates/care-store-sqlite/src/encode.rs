//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! string lists compact JSON arrays.

use chrono::{DateTime, Utc};
use care_core::{
  actor::{Role, UserAccount},
  consultation::{Category, Consultation, ConsultationFields, Suggestion},
  daily_round::{DailyRound, DailyRoundFields},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Category ─────────────────────────────────────────────────────────────────

pub fn encode_category(c: Category) -> &'static str {
  match c {
    Category::Asymptomatic => "asymptomatic",
    Category::Mild => "mild",
    Category::Moderate => "moderate",
    Category::Severe => "severe",
  }
}

pub fn decode_category(s: &str) -> Result<Category> {
  match s {
    "asymptomatic" => Ok(Category::Asymptomatic),
    "mild" => Ok(Category::Mild),
    "moderate" => Ok(Category::Moderate),
    "severe" => Ok(Category::Severe),
    other => Err(Error::UnknownValue { column: "category", value: other.to_owned() }),
  }
}

// ─── Suggestion ───────────────────────────────────────────────────────────────

pub fn encode_suggestion(s: Suggestion) -> &'static str {
  match s {
    Suggestion::HomeIsolation => "HI",
    Suggestion::Admission => "A",
    Suggestion::Referral => "R",
  }
}

pub fn decode_suggestion(s: &str) -> Result<Suggestion> {
  match s {
    "HI" => Ok(Suggestion::HomeIsolation),
    "A" => Ok(Suggestion::Admission),
    "R" => Ok(Suggestion::Referral),
    other => Err(Error::UnknownValue { column: "suggestion", value: other.to_owned() }),
  }
}

// ─── String lists ─────────────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> { Ok(serde_json::to_string(items)?) }

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ────────────────────────────────────────────────────────────────

/// Raw values read from a `consultations` row joined with its patient.
pub struct RawConsultation {
  pub id:                    i64,
  pub external_id:           String,
  pub patient_external_id:   String,
  pub facility_id:           i64,
  pub assigned_to:           Option<i64>,
  pub symptoms:              String,
  pub other_symptoms:        Option<String>,
  pub symptoms_onset_date:   Option<String>,
  pub category:              Option<String>,
  pub examination_details:   Option<String>,
  pub existing_medication:   Option<String>,
  pub prescribed_medication: Option<String>,
  pub suggestion:            String,
  pub referred_to:           Option<i64>,
  pub admitted:              bool,
  pub admission_date:        Option<String>,
  pub discharge_date:        Option<String>,
  pub bed_number:            Option<String>,
  pub created_date:          String,
  pub modified_date:         String,
}

impl RawConsultation {
  /// Column list matching [`RawConsultation::from_row`]; expects the aliases
  /// `c` (consultations) and `p` (patients).
  pub const COLUMNS: &'static str = "c.id, c.external_id, p.external_id, c.facility_id, \
     c.assigned_to, c.symptoms, c.other_symptoms, c.symptoms_onset_date, c.category, \
     c.examination_details, c.existing_medication, c.prescribed_medication, \
     c.suggestion, c.referred_to, c.admitted, c.admission_date, c.discharge_date, \
     c.bed_number, c.created_date, c.modified_date";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawConsultation {
      id:                    row.get(0)?,
      external_id:           row.get(1)?,
      patient_external_id:   row.get(2)?,
      facility_id:           row.get(3)?,
      assigned_to:           row.get(4)?,
      symptoms:              row.get(5)?,
      other_symptoms:        row.get(6)?,
      symptoms_onset_date:   row.get(7)?,
      category:              row.get(8)?,
      examination_details:   row.get(9)?,
      existing_medication:   row.get(10)?,
      prescribed_medication: row.get(11)?,
      suggestion:            row.get(12)?,
      referred_to:           row.get(13)?,
      admitted:              row.get(14)?,
      admission_date:        row.get(15)?,
      discharge_date:        row.get(16)?,
      bed_number:            row.get(17)?,
      created_date:          row.get(18)?,
      modified_date:         row.get(19)?,
    })
  }

  pub fn into_consultation(self) -> Result<Consultation> {
    let fields = ConsultationFields {
      symptoms:              decode_list(&self.symptoms)?,
      other_symptoms:        self.other_symptoms,
      symptoms_onset_date:   decode_opt_dt(self.symptoms_onset_date)?,
      category:              self.category.as_deref().map(decode_category).transpose()?,
      examination_details:   self.examination_details,
      existing_medication:   self.existing_medication,
      prescribed_medication: self.prescribed_medication,
      suggestion:            decode_suggestion(&self.suggestion)?,
      referred_to:           self.referred_to,
      admitted:              self.admitted,
      admission_date:        decode_opt_dt(self.admission_date)?,
      discharge_date:        decode_opt_dt(self.discharge_date)?,
      bed_number:            self.bed_number,
    };

    Ok(Consultation {
      id: self.id,
      external_id: decode_uuid(&self.external_id)?,
      patient: decode_uuid(&self.patient_external_id)?,
      facility: self.facility_id,
      assigned_to: self.assigned_to,
      fields,
      created_date: decode_dt(&self.created_date)?,
      modified_date: decode_dt(&self.modified_date)?,
    })
  }
}

/// Raw values read from a `daily_rounds` row.
pub struct RawDailyRound {
  pub id:                        i64,
  pub consultation_id:           i64,
  pub temperature:               Option<f64>,
  pub temperature_measured_at:   Option<String>,
  pub physical_examination_info: Option<String>,
  pub additional_symptoms:       String,
  pub other_symptoms:            Option<String>,
  pub patient_category:          Option<String>,
  pub current_health:            i64,
  pub recommend_discharge:       bool,
  pub other_details:             Option<String>,
  pub created_date:              String,
  pub modified_date:             String,
}

impl RawDailyRound {
  pub const COLUMNS: &'static str = "id, consultation_id, temperature, \
     temperature_measured_at, physical_examination_info, additional_symptoms, \
     other_symptoms, patient_category, current_health, recommend_discharge, \
     other_details, created_date, modified_date";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawDailyRound {
      id:                        row.get(0)?,
      consultation_id:           row.get(1)?,
      temperature:               row.get(2)?,
      temperature_measured_at:   row.get(3)?,
      physical_examination_info: row.get(4)?,
      additional_symptoms:       row.get(5)?,
      other_symptoms:            row.get(6)?,
      patient_category:          row.get(7)?,
      current_health:            row.get(8)?,
      recommend_discharge:       row.get(9)?,
      other_details:             row.get(10)?,
      created_date:              row.get(11)?,
      modified_date:             row.get(12)?,
    })
  }

  pub fn into_daily_round(self) -> Result<DailyRound> {
    Ok(DailyRound {
      id:            self.id,
      consultation:  self.consultation_id,
      fields:        DailyRoundFields {
        temperature:               self.temperature,
        temperature_measured_at:   decode_opt_dt(self.temperature_measured_at)?,
        physical_examination_info: self.physical_examination_info,
        additional_symptoms:       decode_list(&self.additional_symptoms)?,
        other_symptoms:            self.other_symptoms,
        patient_category:          self
          .patient_category
          .as_deref()
          .map(decode_category)
          .transpose()?,
        current_health:            self.current_health,
        recommend_discharge:       self.recommend_discharge,
        other_details:             self.other_details,
      },
      created_date:  decode_dt(&self.created_date)?,
      modified_date: decode_dt(&self.modified_date)?,
    })
  }
}

/// Raw values read from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub username:      String,
  pub password_hash: String,
  pub user_type:     i64,
  pub is_superuser:  bool,
  pub state_id:      Option<i64>,
  pub district_id:   Option<i64>,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "id, username, password_hash, user_type, is_superuser, state_id, district_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawUser {
      id:            row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      user_type:     row.get(3)?,
      is_superuser:  row.get(4)?,
      state_id:      row.get(5)?,
      district_id:   row.get(6)?,
    })
  }

  pub fn into_account(self) -> Result<UserAccount> {
    Ok(UserAccount {
      id:            self.id,
      username:      self.username,
      password_hash: self.password_hash,
      role:          Role::from_value(self.user_type)?,
      is_superuser:  self.is_superuser,
      state_id:      self.state_id,
      district_id:   self.district_id,
    })
  }
}
