//! Role-based row visibility for consultations.
//!
//! [`resolve`] turns an [`Actor`] into a [`Visibility`] predicate. Tiers are
//! evaluated top-down and the first match wins:
//!
//! | Tier | Applies when | Visible consultations |
//! |------|--------------|-----------------------|
//! | 1 | `is_superuser` | all |
//! | 2 | role ≥ `StateLabAdmin` | patient's facility in the actor's state |
//! | 3 | role ≥ `DistrictLabAdmin` | patient's facility in the actor's district |
//! | 4 | otherwise | patient's facility is one of the actor's, or assigned to the actor |
//!
//! The predicate can be evaluated in memory with [`Visibility::permits`];
//! storage backends translate it into their own query language.

use std::collections::BTreeSet;

use crate::{
  actor::{Actor, Role},
  consultation::ConsultationScope,
  facility::Facility,
};

/// A predicate over consultations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
  /// Every consultation.
  All,
  /// No consultation at all.
  Nothing,
  /// Consultations whose patient's facility lies in this state.
  State(i64),
  /// Consultations whose patient's facility lies in this district.
  District(i64),
  /// Consultations whose patient's facility is in `facility_ids`, or which are
  /// assigned to `user_id`.
  Local {
    user_id:      i64,
    facility_ids: BTreeSet<i64>,
  },
}

type TierBuilder = fn(&Actor) -> Visibility;

/// Admin tiers in precedence order: `(minimum role, predicate builder)`.
const ADMIN_TIERS: &[(Role, TierBuilder)] = &[
  (Role::StateLabAdmin, state_tier),
  (Role::DistrictLabAdmin, district_tier),
];

fn state_tier(actor: &Actor) -> Visibility {
  actor.state_id.map_or(Visibility::Nothing, Visibility::State)
}

fn district_tier(actor: &Actor) -> Visibility {
  actor.district_id.map_or(Visibility::Nothing, Visibility::District)
}

/// Compute the visibility predicate for `actor`.
///
/// An admin missing the organisational id its tier is keyed on sees nothing;
/// it does not fall through to a lower tier.
pub fn resolve(actor: &Actor) -> Visibility {
  if actor.is_superuser {
    return Visibility::All;
  }
  ADMIN_TIERS
    .iter()
    .find(|(threshold, _)| actor.role >= *threshold)
    .map_or_else(
      || Visibility::Local {
        user_id:      actor.user_id,
        facility_ids: actor.facility_ids.clone(),
      },
      |(_, build)| build(actor),
    )
}

impl Visibility {
  /// Whether a consultation with the given coordinates satisfies the
  /// predicate.
  pub fn permits(&self, scope: &ConsultationScope) -> bool {
    match self {
      Visibility::All => true,
      Visibility::Nothing => false,
      Visibility::State(id) => scope.state_id == *id,
      Visibility::District(id) => scope.district_id == *id,
      Visibility::Local { user_id, facility_ids } => {
        facility_ids.contains(&scope.patient_facility_id)
          || scope.assigned_to == Some(*user_id)
      }
    }
  }

  /// Whether an unassigned consultation for a patient registered at
  /// `facility` would be visible. Used to gate creation.
  pub fn covers_facility(&self, facility: &Facility) -> bool {
    self.permits(&ConsultationScope {
      patient_facility_id: facility.id,
      district_id:         facility.district_id,
      state_id:            facility.state_id,
      assigned_to:         None,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn actor(role: Role) -> Actor {
    Actor {
      user_id:      10,
      username:     "actor".into(),
      is_superuser: false,
      role,
      state_id:     Some(1),
      district_id:  Some(11),
      facility_ids: BTreeSet::from([100]),
    }
  }

  fn scope(facility: i64, district: i64, state: i64, assigned: Option<i64>) -> ConsultationScope {
    ConsultationScope {
      patient_facility_id: facility,
      district_id:         district,
      state_id:            state,
      assigned_to:         assigned,
    }
  }

  #[test]
  fn superuser_wins_over_role() {
    let mut a = actor(Role::Volunteer);
    a.is_superuser = true;
    assert_eq!(resolve(&a), Visibility::All);
  }

  #[test]
  fn state_tier_takes_precedence_over_district() {
    assert_eq!(resolve(&actor(Role::StateLabAdmin)), Visibility::State(1));
    assert_eq!(resolve(&actor(Role::StateAdmin)), Visibility::State(1));
  }

  #[test]
  fn district_admins_are_district_scoped() {
    assert_eq!(resolve(&actor(Role::DistrictLabAdmin)), Visibility::District(11));
    assert_eq!(resolve(&actor(Role::DistrictAdmin)), Visibility::District(11));
  }

  #[test]
  fn below_district_is_local() {
    for role in [Role::Volunteer, Role::Staff, Role::Doctor, Role::Reserved] {
      assert_eq!(
        resolve(&actor(role)),
        Visibility::Local { user_id: 10, facility_ids: BTreeSet::from([100]) }
      );
    }
  }

  #[test]
  fn admin_without_scope_sees_nothing() {
    let mut a = actor(Role::StateLabAdmin);
    a.state_id = None;
    assert_eq!(resolve(&a), Visibility::Nothing);

    let mut a = actor(Role::DistrictLabAdmin);
    a.district_id = None;
    assert_eq!(resolve(&a), Visibility::Nothing);
  }

  #[test]
  fn state_permits_only_same_state() {
    let v = resolve(&actor(Role::StateLabAdmin));
    assert!(v.permits(&scope(200, 22, 1, None)));
    assert!(!v.permits(&scope(100, 11, 2, Some(10))));
  }

  #[test]
  fn district_permits_only_same_district() {
    let v = resolve(&actor(Role::DistrictLabAdmin));
    assert!(v.permits(&scope(200, 11, 1, None)));
    assert!(!v.permits(&scope(100, 12, 1, None)));
  }

  #[test]
  fn local_permits_membership_or_assignment() {
    let v = resolve(&actor(Role::Staff));
    assert!(v.permits(&scope(100, 11, 1, None)));
    assert!(v.permits(&scope(300, 33, 3, Some(10))));
    assert!(!v.permits(&scope(300, 33, 3, Some(11))));
    assert!(!v.permits(&scope(300, 11, 1, None)));
  }

  #[test]
  fn nothing_permits_nothing() {
    assert!(!Visibility::Nothing.permits(&scope(100, 11, 1, Some(10))));
  }

  #[test]
  fn covers_facility_ignores_assignment() {
    let v = resolve(&actor(Role::Staff));
    let own = Facility { id: 100, name: "own".into(), district_id: 11, state_id: 1 };
    let other = Facility { id: 101, name: "other".into(), district_id: 11, state_id: 1 };
    assert!(v.covers_facility(&own));
    assert!(!v.covers_facility(&other));
  }
}
