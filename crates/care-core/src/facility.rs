//! Organisational hierarchy: states, districts, facilities, and the patients
//! registered at facilities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
  pub id:       i64,
  pub name:     String,
  pub state_id: i64,
}

/// A facility belongs to one district, which belongs to one state. The state
/// is denormalised onto the facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
  pub id:          i64,
  pub name:        String,
  pub district_id: i64,
  pub state_id:    i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
  pub id:          i64,
  pub external_id: Uuid,
  pub name:        String,
  pub facility_id: i64,
}
