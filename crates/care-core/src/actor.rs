//! Actors — the authenticated principals making requests — and their roles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A user's role, totally ordered by privilege.
///
/// Variants are declared in ascending privilege order so the derived `Ord`
/// matches [`Role::value`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Role {
  Transportation,
  Pharmacist,
  Volunteer,
  StaffReadOnly,
  Staff,
  Doctor,
  Reserved,
  DistrictLabAdmin,
  DistrictReadOnlyAdmin,
  DistrictAdmin,
  StateLabAdmin,
  StateReadOnlyAdmin,
  StateAdmin,
}

impl Role {
  pub const ALL: [Role; 13] = [
    Role::Transportation,
    Role::Pharmacist,
    Role::Volunteer,
    Role::StaffReadOnly,
    Role::Staff,
    Role::Doctor,
    Role::Reserved,
    Role::DistrictLabAdmin,
    Role::DistrictReadOnlyAdmin,
    Role::DistrictAdmin,
    Role::StateLabAdmin,
    Role::StateReadOnlyAdmin,
    Role::StateAdmin,
  ];

  /// The persisted numeric privilege value.
  pub fn value(self) -> i64 {
    match self {
      Role::Transportation => 2,
      Role::Pharmacist => 3,
      Role::Volunteer => 5,
      Role::StaffReadOnly => 9,
      Role::Staff => 10,
      Role::Doctor => 15,
      Role::Reserved => 20,
      Role::DistrictLabAdmin => 25,
      Role::DistrictReadOnlyAdmin => 29,
      Role::DistrictAdmin => 30,
      Role::StateLabAdmin => 35,
      Role::StateReadOnlyAdmin => 39,
      Role::StateAdmin => 40,
    }
  }

  pub fn from_value(value: i64) -> Result<Self> {
    Role::ALL
      .into_iter()
      .find(|r| r.value() == value)
      .ok_or(Error::UnknownRole(value))
  }

  pub fn is_read_only(self) -> bool {
    matches!(
      self,
      Role::StaffReadOnly | Role::DistrictReadOnlyAdmin | Role::StateReadOnlyAdmin
    )
  }
}

/// A persisted user account, as loaded by the authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
  pub id:            i64,
  pub username:      String,
  /// PHC string produced by argon2.
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role:          Role,
  pub is_superuser:  bool,
  pub state_id:      Option<i64>,
  pub district_id:   Option<i64>,
}

/// Fields accepted when creating a [`UserAccount`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub password_hash: String,
  pub role:          Role,
  pub is_superuser:  bool,
  pub state_id:      Option<i64>,
  pub district_id:   Option<i64>,
}

/// The principal making a request. Immutable for the request's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id:      i64,
  pub username:     String,
  pub is_superuser: bool,
  pub role:         Role,
  pub state_id:     Option<i64>,
  pub district_id:  Option<i64>,
  /// Facilities the actor is a member of.
  pub facility_ids: BTreeSet<i64>,
}

impl Actor {
  pub fn from_account(account: UserAccount, facility_ids: BTreeSet<i64>) -> Self {
    Actor {
      user_id: account.id,
      username: account.username,
      is_superuser: account.is_superuser,
      role: account.role,
      state_id: account.state_id,
      district_id: account.district_id,
      facility_ids,
    }
  }

  /// Whether the actor may create or modify records at all.
  pub fn can_write(&self) -> bool {
    self.is_superuser || (self.role >= Role::Staff && !self.role.is_read_only())
  }
}
