//! Translation of [`Visibility`] and [`ConsultationFilter`] into SQL `WHERE`
//! fragments.
//!
//! Fragments assume the query joins `consultations c`, `patients p` and the
//! patient's facility `pf`, as in [`CONSULTATION_FROM`].

use care_core::{filter::ConsultationFilter, visibility::Visibility};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::encode::encode_uuid;

/// `FROM` clause shared by every consultation query.
pub const CONSULTATION_FROM: &str = "FROM consultations c
   JOIN patients   p  ON p.id  = c.patient_id
   JOIN facilities pf ON pf.id = p.facility_id";

/// A conjunction of SQL conditions with their positional parameters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Clause {
  conds:  Vec<String>,
  params: Vec<Value>,
}

impl Clause {
  pub fn new() -> Self { Self::default() }

  fn push(&mut self, cond: impl Into<String>, params: Vec<Value>) {
    self.conds.push(cond.into());
    self.params.extend(params);
  }

  /// AND in the visibility predicate.
  pub fn visibility(mut self, visibility: &Visibility) -> Self {
    match visibility {
      Visibility::All => {}
      Visibility::Nothing => self.push("0", vec![]),
      Visibility::State(id) => self.push("pf.state_id = ?", vec![Value::Integer(*id)]),
      Visibility::District(id) => self.push("pf.district_id = ?", vec![Value::Integer(*id)]),
      Visibility::Local { user_id, facility_ids } if facility_ids.is_empty() => {
        self.push("c.assigned_to = ?", vec![Value::Integer(*user_id)]);
      }
      Visibility::Local { user_id, facility_ids } => {
        let marks = vec!["?"; facility_ids.len()].join(", ");
        let params = facility_ids
          .iter()
          .map(|id| Value::Integer(*id))
          .chain(std::iter::once(Value::Integer(*user_id)))
          .collect();
        self.push(format!("(pf.id IN ({marks}) OR c.assigned_to = ?)"), params);
      }
    }
    self
  }

  /// AND in the collection filters.
  ///
  /// A `patient` value in any UUID spelling is matched in its stored form;
  /// anything else is compared verbatim and matches nothing.
  pub fn filter(mut self, filter: &ConsultationFilter) -> Self {
    if let Some(patient) = &filter.patient {
      let stored = Uuid::parse_str(patient).map_or_else(|_| patient.clone(), encode_uuid);
      self.push("p.external_id = ?", vec![Value::Text(stored)]);
    }
    if let Some(facility) = filter.facility {
      self.push("c.facility_id = ?", vec![Value::Integer(facility)]);
    }
    self
  }

  /// AND in an arbitrary condition.
  pub fn and(mut self, cond: &str, param: Value) -> Self {
    self.push(cond, vec![param]);
    self
  }

  /// Render as a `WHERE` clause (empty when unconstrained).
  pub fn where_sql(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }

  pub fn into_params(self) -> Vec<Value> { self.params }
}
