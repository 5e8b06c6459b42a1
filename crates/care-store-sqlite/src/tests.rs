//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use care_core::{
  actor::{Actor, NewUser, Role},
  consultation::{ConsultationFields, NewConsultation, Suggestion},
  daily_round::DailyRoundFields,
  facility::{Facility, Patient},
  filter::ConsultationFilter,
  page::PageRequest,
  store::CareStore,
  visibility::{Visibility, resolve},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fields() -> ConsultationFields {
  ConsultationFields {
    symptoms:              vec!["fever".into(), "cough".into()],
    other_symptoms:        None,
    symptoms_onset_date:   None,
    category:              None,
    examination_details:   Some("chest clear".into()),
    existing_medication:   None,
    prescribed_medication: None,
    suggestion:            Suggestion::HomeIsolation,
    referred_to:           None,
    admitted:              false,
    admission_date:        None,
    discharge_date:        None,
    bed_number:            None,
  }
}

fn round_fields(temperature: f64) -> DailyRoundFields {
  DailyRoundFields {
    temperature:               Some(temperature),
    temperature_measured_at:   None,
    physical_examination_info: None,
    additional_symptoms:       vec![],
    other_symptoms:            None,
    patient_category:          None,
    current_health:            3,
    recommend_discharge:       false,
    other_details:             None,
  }
}

fn new_user(username: &str, role: Role) -> NewUser {
  NewUser {
    username:      username.into(),
    password_hash: "unused".into(),
    role,
    is_superuser:  false,
    state_id:      None,
    district_id:   None,
  }
}

/// Two states; state 1 has districts D1 and D2, state 2 has D3. One facility
/// per district, one patient per facility.
struct World {
  state_1:    i64,
  district_1: i64,
  facilities: [Facility; 3],
  patients:   [Patient; 3],
}

async fn world(s: &SqliteStore) -> World {
  let s1 = s.add_state("S1".into()).await.unwrap();
  let s2 = s.add_state("S2".into()).await.unwrap();
  let d1 = s.add_district("D1".into(), s1.id).await.unwrap();
  let d2 = s.add_district("D2".into(), s1.id).await.unwrap();
  let d3 = s.add_district("D3".into(), s2.id).await.unwrap();

  let f1 = s.add_facility("F1".into(), d1.id).await.unwrap();
  let f2 = s.add_facility("F2".into(), d2.id).await.unwrap();
  let f3 = s.add_facility("F3".into(), d3.id).await.unwrap();

  let p1 = s.add_patient("P1".into(), f1.id).await.unwrap();
  let p2 = s.add_patient("P2".into(), f2.id).await.unwrap();
  let p3 = s.add_patient("P3".into(), f3.id).await.unwrap();

  World {
    state_1:    s1.id,
    district_1: d1.id,
    facilities: [f1, f2, f3],
    patients:   [p1, p2, p3],
  }
}

async fn consult(s: &SqliteStore, patient: &Patient, assigned_to: Option<i64>) -> Uuid {
  s.create_consultation(NewConsultation {
    patient_id: patient.id,
    facility_id: patient.facility_id,
    assigned_to,
    fields: fields(),
  })
  .await
  .unwrap()
  .external_id
}

async fn visible(s: &SqliteStore, v: &Visibility) -> Vec<Uuid> {
  let page = PageRequest { limit: Some(100), offset: None };
  let page = s
    .list_consultations(v, &ConsultationFilter::default(), page)
    .await
    .unwrap();
  assert_eq!(page.count, page.results.len());
  page.results.into_iter().map(|c| c.external_id).collect()
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn facility_inherits_state_from_district() {
  let s = store().await;
  let w = world(&s).await;

  assert_eq!(w.facilities[0].state_id, w.state_1);
  assert_eq!(w.facilities[1].state_id, w.state_1);
  assert_ne!(w.facilities[2].state_id, w.state_1);

  let fetched = s.get_facility(w.facilities[0].id).await.unwrap().unwrap();
  assert_eq!(fetched, w.facilities[0]);
}

#[tokio::test]
async fn unknown_district_is_rejected() {
  let s = store().await;
  let err = s.add_facility("nowhere".into(), 42).await.unwrap_err();
  assert!(matches!(err, crate::Error::DistrictNotFound(42)));
}

#[tokio::test]
async fn patient_lookup_by_external_id() {
  let s = store().await;
  let w = world(&s).await;

  let p = s.get_patient(w.patients[1].external_id).await.unwrap().unwrap();
  assert_eq!(p, w.patients[1]);
  assert!(s.get_patient(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn users_and_memberships() {
  let s = store().await;
  let w = world(&s).await;

  let mut input = new_user("dr-a", Role::Doctor);
  input.district_id = Some(w.district_1);
  let user = s.add_user(input).await.unwrap();

  let found = s.find_user("dr-a").await.unwrap().unwrap();
  assert_eq!(found.id, user.id);
  assert_eq!(found.role, Role::Doctor);
  assert_eq!(found.district_id, Some(w.district_1));
  assert!(s.find_user("nobody").await.unwrap().is_none());

  s.add_facility_user(w.facilities[0].id, user.id).await.unwrap();
  s.add_facility_user(w.facilities[0].id, user.id).await.unwrap();
  s.add_facility_user(w.facilities[2].id, user.id).await.unwrap();
  assert_eq!(
    s.facility_ids_for_user(user.id).await.unwrap(),
    BTreeSet::from([w.facilities[0].id, w.facilities[2].id])
  );
}

// ─── Visibility ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn superuser_sees_everything() {
  let s = store().await;
  let w = world(&s).await;
  for p in &w.patients {
    consult(&s, p, None).await;
  }
  assert_eq!(visible(&s, &Visibility::All).await.len(), 3);
}

#[tokio::test]
async fn state_admin_sees_only_own_state() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;
  let b = consult(&s, &w.patients[1], None).await;
  consult(&s, &w.patients[2], None).await;

  let seen = visible(&s, &Visibility::State(w.state_1)).await;
  assert_eq!(seen, vec![b, a]);
}

#[tokio::test]
async fn district_admin_sees_only_own_district() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;
  consult(&s, &w.patients[1], None).await;

  let seen = visible(&s, &Visibility::District(w.district_1)).await;
  assert_eq!(seen, vec![a]);
}

#[tokio::test]
async fn staff_sees_membership_or_assignment_without_duplicates() {
  let s = store().await;
  let w = world(&s).await;
  let staff = s.add_user(new_user("nurse", Role::Staff)).await.unwrap();
  s.add_facility_user(w.facilities[0].id, staff.id).await.unwrap();

  // Member facility and assigned: must appear once.
  let both = consult(&s, &w.patients[0], Some(staff.id)).await;
  // Member facility only.
  let member = consult(&s, &w.patients[0], None).await;
  // Assigned only, elsewhere.
  let assigned = consult(&s, &w.patients[2], Some(staff.id)).await;
  // Neither.
  consult(&s, &w.patients[1], None).await;

  let actor = Actor::from_account(
    s.get_user(staff.id).await.unwrap().unwrap(),
    s.facility_ids_for_user(staff.id).await.unwrap(),
  );
  let seen = visible(&s, &resolve(&actor)).await;
  assert_eq!(seen, vec![assigned, member, both]);
}

#[tokio::test]
async fn nothing_sees_nothing() {
  let s = store().await;
  let w = world(&s).await;
  consult(&s, &w.patients[0], None).await;
  assert!(visible(&s, &Visibility::Nothing).await.is_empty());
}

#[tokio::test]
async fn get_consultation_respects_visibility() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;

  let got = s.get_consultation(&Visibility::All, a).await.unwrap().unwrap();
  assert_eq!(got.patient, w.patients[0].external_id);
  assert_eq!(got.fields.symptoms, vec!["fever", "cough"]);

  let other_district = Visibility::District(w.facilities[1].district_id);
  assert!(s.get_consultation(&other_district, a).await.unwrap().is_none());
}

#[tokio::test]
async fn scope_reports_patient_facility_coordinates() {
  let s = store().await;
  let w = world(&s).await;
  let doctor = s.add_user(new_user("dr-b", Role::Doctor)).await.unwrap();
  let a = consult(&s, &w.patients[0], Some(doctor.id)).await;

  let (id, scope) = s.consultation_scope(a).await.unwrap().unwrap();
  assert!(id > 0);
  assert_eq!(scope.patient_facility_id, w.facilities[0].id);
  assert_eq!(scope.district_id, w.district_1);
  assert_eq!(scope.state_id, w.state_1);
  assert_eq!(scope.assigned_to, Some(doctor.id));
  assert!(s.consultation_scope(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Filters & paging ────────────────────────────────────────────────────────

#[tokio::test]
async fn filters_by_patient_and_facility() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;
  let b = consult(&s, &w.patients[1], None).await;

  let by_patient = ConsultationFilter {
    patient:  Some(w.patients[1].external_id.to_string()),
    facility: None,
  };
  let page = s
    .list_consultations(&Visibility::All, &by_patient, PageRequest::default())
    .await
    .unwrap();
  assert_eq!(page.results.iter().map(|c| c.external_id).collect::<Vec<_>>(), vec![b]);

  let by_facility = ConsultationFilter { patient: None, facility: Some(w.facilities[0].id) };
  let page = s
    .list_consultations(&Visibility::All, &by_facility, PageRequest::default())
    .await
    .unwrap();
  assert_eq!(page.results.iter().map(|c| c.external_id).collect::<Vec<_>>(), vec![a]);

  let uppercase = ConsultationFilter {
    patient:  Some(w.patients[1].external_id.to_string().to_uppercase()),
    facility: None,
  };
  let page = s
    .list_consultations(&Visibility::All, &uppercase, PageRequest::default())
    .await
    .unwrap();
  assert_eq!(page.results.iter().map(|c| c.external_id).collect::<Vec<_>>(), vec![b]);

  let unhyphenated = ConsultationFilter {
    patient:  Some(w.patients[1].external_id.simple().to_string()),
    facility: None,
  };
  let page = s
    .list_consultations(&Visibility::All, &unhyphenated, PageRequest::default())
    .await
    .unwrap();
  assert_eq!(page.count, 1);

  let garbage = ConsultationFilter { patient: Some("not-a-uuid".into()), facility: None };
  let page = s
    .list_consultations(&Visibility::All, &garbage, PageRequest::default())
    .await
    .unwrap();
  assert_eq!(page.count, 0);
}

#[tokio::test]
async fn filter_cannot_widen_visibility() {
  let s = store().await;
  let w = world(&s).await;
  consult(&s, &w.patients[1], None).await;

  let filter = ConsultationFilter { patient: None, facility: Some(w.facilities[1].id) };
  let page = s
    .list_consultations(&Visibility::District(w.district_1), &filter, PageRequest::default())
    .await
    .unwrap();
  assert!(page.results.is_empty());
}

#[tokio::test]
async fn pages_are_newest_first_with_total_count() {
  let s = store().await;
  let w = world(&s).await;
  let mut ids = Vec::new();
  for _ in 0..5 {
    ids.push(consult(&s, &w.patients[0], None).await);
  }
  ids.reverse();

  let page = s
    .list_consultations(
      &Visibility::All,
      &ConsultationFilter::default(),
      PageRequest { limit: Some(2), offset: Some(1) },
    )
    .await
    .unwrap();
  assert_eq!(page.count, 5);
  assert_eq!(
    page.results.iter().map(|c| c.external_id).collect::<Vec<_>>(),
    ids[1..3].to_vec()
  );
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_consultation_replaces_fields() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;
  let before = s.get_consultation(&Visibility::All, a).await.unwrap().unwrap();
  let doctor = s.add_user(new_user("dr-c", Role::Doctor)).await.unwrap();

  let mut f = fields();
  f.suggestion = Suggestion::Admission;
  f.bed_number = Some("ICU-2".into());
  let after = s
    .update_consultation(before.id, Some(doctor.id), f)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(after.external_id, a);
  assert_eq!(after.assigned_to, Some(doctor.id));
  assert_eq!(after.fields.suggestion, Suggestion::Admission);
  assert_eq!(after.fields.bed_number.as_deref(), Some("ICU-2"));
  assert_eq!(after.created_date, before.created_date);
  assert!(after.modified_date >= before.modified_date);

  assert!(s.update_consultation(9999, None, fields()).await.unwrap().is_none());
}

// ─── Daily rounds ────────────────────────────────────────────────────────────

#[tokio::test]
async fn daily_rounds_are_scoped_to_their_consultation() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;
  let b = consult(&s, &w.patients[1], None).await;
  let (a_id, _) = s.consultation_scope(a).await.unwrap().unwrap();
  let (b_id, _) = s.consultation_scope(b).await.unwrap().unwrap();

  let r1 = s.create_daily_round(a_id, round_fields(98.0)).await.unwrap();
  let r2 = s.create_daily_round(a_id, round_fields(99.5)).await.unwrap();
  let r3 = s.create_daily_round(b_id, round_fields(101.0)).await.unwrap();
  assert_eq!(r1.consultation, a_id);

  let page = s.list_daily_rounds(a_id, PageRequest::default()).await.unwrap();
  assert_eq!(page.count, 2);
  assert_eq!(page.results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![r2.id, r1.id]);

  assert!(s.get_daily_round(a_id, r3.id).await.unwrap().is_none());
  assert_eq!(s.get_daily_round(b_id, r3.id).await.unwrap().unwrap(), r3);
}

#[tokio::test]
async fn daily_round_requires_existing_consultation() {
  let s = store().await;
  assert!(s.create_daily_round(12345, round_fields(98.0)).await.is_err());
}

#[tokio::test]
async fn update_daily_round_within_parent_only() {
  let s = store().await;
  let w = world(&s).await;
  let a = consult(&s, &w.patients[0], None).await;
  let b = consult(&s, &w.patients[1], None).await;
  let (a_id, _) = s.consultation_scope(a).await.unwrap().unwrap();
  let (b_id, _) = s.consultation_scope(b).await.unwrap().unwrap();
  let r = s.create_daily_round(a_id, round_fields(98.0)).await.unwrap();

  assert!(s.update_daily_round(b_id, r.id, round_fields(100.0)).await.unwrap().is_none());

  let mut f = round_fields(100.0);
  f.recommend_discharge = true;
  let updated = s.update_daily_round(a_id, r.id, f).await.unwrap().unwrap();
  assert_eq!(updated.consultation, a_id);
  assert_eq!(updated.fields.temperature, Some(100.0));
  assert!(updated.fields.recommend_discharge);
}
