//! Handlers for `/consultations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`   | `/consultations` | Optional `?patient=<external id>`, `?facility=<id>`, `limit`, `offset` |
//! | `POST`  | `/consultations` | Body: [`CreateBody`]; returns 201 |
//! | `GET`   | `/consultations/:external_id` | 404 if missing or not visible |
//! | `PUT`   | `/consultations/:external_id` | Body: [`UpdateBody`] |
//! | `PATCH` | `/consultations/:external_id` | Body: [`ConsultationPatch`] |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use care_core::{
  actor::Actor,
  consultation::{Consultation, ConsultationFields, ConsultationPatch, NewConsultation},
  filter::ConsultationFilter,
  page::{Page, PageRequest},
  store::CareStore,
  visibility::resolve,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentActor,
  error::ApiError,
  extract::{Json, Path, Query},
  parse_external_id,
};

pub(crate) fn require_write(actor: &Actor) -> Result<(), ApiError> {
  if actor.can_write() {
    Ok(())
  } else {
    Err(ApiError::Forbidden(format!(
      "{} ({:?}) has read-only access",
      actor.username, actor.role
    )))
  }
}

/// Reject references to users or facilities that do not exist, and fields
/// that fail their own validation.
async fn check_references<S>(
  store: &S,
  assigned_to: Option<i64>,
  fields: &ConsultationFields,
) -> Result<(), ApiError>
where
  S: CareStore,
{
  fields.validate()?;

  if let Some(user_id) = assigned_to
    && store.get_user(user_id).await.map_err(ApiError::store)?.is_none()
  {
    return Err(ApiError::BadRequest(format!("user {user_id} does not exist")));
  }
  if let Some(facility_id) = fields.referred_to
    && store.get_facility(facility_id).await.map_err(ApiError::store)?.is_none()
  {
    return Err(ApiError::BadRequest(format!(
      "referral facility {facility_id} does not exist"
    )));
  }
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /consultations[?patient=...][&facility=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(filter): Query<ConsultationFilter>,
  Query(page): Query<PageRequest>,
) -> Result<Json<Page<Consultation>>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let visibility = resolve(&actor);
  tracing::debug!(user = %actor.username, ?visibility, ?filter, "listing consultations");

  let page = state
    .store
    .list_consultations(&visibility, &filter, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /consultations`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// External identifier of the patient.
  pub patient:     Uuid,
  pub facility:    i64,
  #[serde(default)]
  pub assigned_to: Option<i64>,
  #[serde(flatten)]
  pub fields:      ConsultationFields,
}

/// `POST /consultations` — returns 201 + the stored consultation.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_write(&actor)?;
  let store = &*state.store;

  let patient = store
    .get_patient(body.patient)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::BadRequest(format!("patient {} does not exist", body.patient)))?;

  if store
    .get_facility(body.facility)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(ApiError::BadRequest(format!(
      "facility {} does not exist",
      body.facility
    )));
  }

  check_references(store, body.assigned_to, &body.fields).await?;

  let home = store
    .get_facility(patient.facility_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::BadRequest(format!("facility {} does not exist", patient.facility_id)))?;
  if !resolve(&actor).covers_facility(&home) {
    return Err(ApiError::Forbidden(format!(
      "{} cannot access patients of facility {}",
      actor.username, home.id
    )));
  }

  let consultation = store
    .create_consultation(NewConsultation {
      patient_id:  patient.id,
      facility_id: body.facility,
      assigned_to: body.assigned_to,
      fields:      body.fields,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    external_id = %consultation.external_id,
    user = %actor.username,
    "consultation created"
  );
  Ok((StatusCode::CREATED, Json(consultation)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

async fn find_visible<S>(
  store: &S,
  actor: &Actor,
  raw_id: &str,
) -> Result<Consultation, ApiError>
where
  S: CareStore,
{
  let external_id = parse_external_id(raw_id)?;
  store
    .get_consultation(&resolve(actor), external_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("consultation {external_id} not found")))
}

/// `GET /consultations/:external_id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(external_id): Path<String>,
) -> Result<Json<Consultation>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Ok(Json(find_visible(&*state.store, &actor, &external_id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /consultations/:external_id`.
///
/// `patient` and `facility` are fixed at creation; if present they are
/// ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(default)]
  pub assigned_to: Option<i64>,
  #[serde(flatten)]
  pub fields:      ConsultationFields,
}

async fn save<S>(
  store: &S,
  current: Consultation,
  assigned_to: Option<i64>,
  fields: ConsultationFields,
) -> Result<Consultation, ApiError>
where
  S: CareStore,
{
  check_references(store, assigned_to, &fields).await?;
  store
    .update_consultation(current.id, assigned_to, fields)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("consultation {} not found", current.external_id)))
}

/// `PUT /consultations/:external_id` — full replacement of the mutable fields.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(external_id): Path<String>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Consultation>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_write(&actor)?;
  let current = find_visible(&*state.store, &actor, &external_id).await?;
  let saved = save(&*state.store, current, body.assigned_to, body.fields).await?;
  Ok(Json(saved))
}

/// `PATCH /consultations/:external_id` — absent fields are left unchanged.
pub async fn partial_update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(external_id): Path<String>,
  Json(patch): Json<ConsultationPatch>,
) -> Result<Json<Consultation>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_write(&actor)?;
  let current = find_visible(&*state.store, &actor, &external_id).await?;
  let (assigned_to, fields) = patch.apply(&current);
  let saved = save(&*state.store, current, assigned_to, fields).await?;
  Ok(Json(saved))
}
