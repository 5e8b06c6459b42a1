//! The `CareStore` trait.
//!
//! Implemented by storage backends (e.g. `care-store-sqlite`). The API layer
//! depends on this abstraction, not on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use uuid::Uuid;

use crate::{
  actor::{NewUser, UserAccount},
  consultation::{Consultation, ConsultationFields, ConsultationScope, NewConsultation},
  daily_round::{DailyRound, DailyRoundFields},
  facility::{District, Facility, Patient, State},
  filter::ConsultationFilter,
  page::{Page, PageRequest},
  visibility::Visibility,
};

/// Abstraction over a consultation store backend.
///
/// Every consultation read takes a [`Visibility`]; backends must never return
/// a consultation the predicate rejects, and must never return the same
/// consultation twice in one listing.
pub trait CareStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Directory ─────────────────────────────────────────────────────────

  fn add_state(
    &self,
    name: String,
  ) -> impl Future<Output = Result<State, Self::Error>> + Send + '_;

  fn add_district(
    &self,
    name: String,
    state_id: i64,
  ) -> impl Future<Output = Result<District, Self::Error>> + Send + '_;

  /// Create a facility; its state is taken from the district.
  fn add_facility(
    &self,
    name: String,
    district_id: i64,
  ) -> impl Future<Output = Result<Facility, Self::Error>> + Send + '_;

  fn get_facility(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + '_;

  fn add_patient(
    &self,
    name: String,
    facility_id: i64,
  ) -> impl Future<Output = Result<Patient, Self::Error>> + Send + '_;

  fn get_patient(
    &self,
    external_id: Uuid,
  ) -> impl Future<Output = Result<Option<Patient>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<UserAccount, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + '_;

  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + 'a;

  /// Make `user_id` a staff member of `facility_id`. Idempotent.
  fn add_facility_user(
    &self,
    facility_id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Facilities `user_id` is a staff member of.
  fn facility_ids_for_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<BTreeSet<i64>, Self::Error>> + Send + '_;

  // ── Consultations ─────────────────────────────────────────────────────

  fn create_consultation(
    &self,
    input: NewConsultation,
  ) -> impl Future<Output = Result<Consultation, Self::Error>> + Send + '_;

  /// List consultations satisfying `visibility` and `filter`, newest first.
  fn list_consultations<'a>(
    &'a self,
    visibility: &'a Visibility,
    filter: &'a ConsultationFilter,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Consultation>, Self::Error>> + Send + 'a;

  /// Retrieve one consultation by external id. Returns `None` if it does not
  /// exist or `visibility` rejects it.
  fn get_consultation<'a>(
    &'a self,
    visibility: &'a Visibility,
    external_id: Uuid,
  ) -> impl Future<Output = Result<Option<Consultation>, Self::Error>> + Send + 'a;

  /// Look up a consultation's internal id and organisational coordinates by
  /// external id, ignoring visibility.
  fn consultation_scope(
    &self,
    external_id: Uuid,
  ) -> impl Future<Output = Result<Option<(i64, ConsultationScope)>, Self::Error>> + Send + '_;

  /// Replace the mutable state of consultation `id`. Returns `None` if it
  /// does not exist.
  fn update_consultation(
    &self,
    id: i64,
    assigned_to: Option<i64>,
    fields: ConsultationFields,
  ) -> impl Future<Output = Result<Option<Consultation>, Self::Error>> + Send + '_;

  // ── Daily rounds ──────────────────────────────────────────────────────

  fn create_daily_round(
    &self,
    consultation_id: i64,
    fields: DailyRoundFields,
  ) -> impl Future<Output = Result<DailyRound, Self::Error>> + Send + '_;

  /// List the rounds of consultation `consultation_id`, newest first.
  fn list_daily_rounds(
    &self,
    consultation_id: i64,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<DailyRound>, Self::Error>> + Send + '_;

  /// Retrieve round `id` if it belongs to `consultation_id`.
  fn get_daily_round(
    &self,
    consultation_id: i64,
    id: i64,
  ) -> impl Future<Output = Result<Option<DailyRound>, Self::Error>> + Send + '_;

  /// Replace the fields of round `id` within `consultation_id`. Returns
  /// `None` if no such round exists under that consultation.
  fn update_daily_round(
    &self,
    consultation_id: i64,
    id: i64,
    fields: DailyRoundFields,
  ) -> impl Future<Output = Result<Option<DailyRound>, Self::Error>> + Send + '_;
}
