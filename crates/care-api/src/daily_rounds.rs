//! Handlers for `/consultations/:external_id/daily_rounds` endpoints.
//!
//! Every route is scoped to the parent consultation named in the path. An
//! unknown parent is a 404 on every route, including the listing.
//!
//! Write bodies are taken as raw bytes so the parent can be resolved before
//! the payload is validated: the parent's internal id is written into the
//! payload's `consultation` field, replacing whatever the client sent.

use axum::{
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use care_core::{
  actor::Actor,
  daily_round::{DailyRound, DailyRoundInput, DailyRoundPatch},
  page::{Page, PageRequest},
  store::CareStore,
  visibility::resolve,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
  AppState,
  auth::CurrentActor,
  consultations::require_write,
  error::ApiError,
  extract::{Json, Path, Query},
  parse_external_id,
};

/// Resolve the parent consultation's internal id, checking that `actor` may
/// see it.
async fn parent_id<S>(store: &S, actor: &Actor, raw_id: &str) -> Result<i64, ApiError>
where
  S: CareStore,
{
  let external_id = parse_external_id(raw_id)?;
  let (id, scope) = store
    .consultation_scope(external_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("consultation {external_id} not found")))?;

  if !resolve(actor).permits(&scope) {
    return Err(ApiError::Forbidden(format!(
      "{} cannot access consultation {external_id}",
      actor.username
    )));
  }
  Ok(id)
}

/// Parse `body` as a JSON object, force its `consultation` field to
/// `consultation_id`, then deserialise it as `T`.
pub fn inject_consultation<T>(body: &[u8], consultation_id: i64) -> Result<T, ApiError>
where
  T: DeserializeOwned,
{
  let mut value: Value = serde_json::from_slice(body)
    .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;

  let Value::Object(map) = &mut value else {
    return Err(ApiError::BadRequest("body must be a JSON object".into()));
  };
  if let Some(sent) = map.get("consultation")
    && sent.as_i64() != Some(consultation_id)
  {
    tracing::debug!(%sent, consultation_id, "overriding client-supplied consultation");
  }
  map.insert("consultation".into(), Value::from(consultation_id));

  serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /consultations/:external_id/daily_rounds[?limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(external_id): Path<String>,
  Query(page): Query<PageRequest>,
) -> Result<Json<Page<DailyRound>>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let consultation_id = parent_id(&*state.store, &actor, &external_id).await?;
  let rounds = state
    .store
    .list_daily_rounds(consultation_id, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rounds))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /consultations/:external_id/daily_rounds` — returns 201.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(external_id): Path<String>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_write(&actor)?;
  let consultation_id = parent_id(&*state.store, &actor, &external_id).await?;

  let input: DailyRoundInput = inject_consultation(&body, consultation_id)?;
  input.fields.validate()?;

  let round = state
    .store
    .create_daily_round(input.consultation, input.fields)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(round)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

async fn find_round<S>(store: &S, consultation_id: i64, id: i64) -> Result<DailyRound, ApiError>
where
  S: CareStore,
{
  store
    .get_daily_round(consultation_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("daily round {id} not found")))
}

/// `GET /consultations/:external_id/daily_rounds/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path((external_id, id)): Path<(String, i64)>,
) -> Result<Json<DailyRound>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let consultation_id = parent_id(&*state.store, &actor, &external_id).await?;
  Ok(Json(find_round(&*state.store, consultation_id, id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /consultations/:external_id/daily_rounds/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path((external_id, id)): Path<(String, i64)>,
  body: Bytes,
) -> Result<Json<DailyRound>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_write(&actor)?;
  let consultation_id = parent_id(&*state.store, &actor, &external_id).await?;

  let input: DailyRoundInput = inject_consultation(&body, consultation_id)?;
  input.fields.validate()?;

  let round = state
    .store
    .update_daily_round(input.consultation, id, input.fields)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("daily round {id} not found")))?;
  Ok(Json(round))
}

/// `PATCH /consultations/:external_id/daily_rounds/:id`
pub async fn partial_update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path((external_id, id)): Path<(String, i64)>,
  body: Bytes,
) -> Result<Json<DailyRound>, ApiError>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_write(&actor)?;
  let consultation_id = parent_id(&*state.store, &actor, &external_id).await?;

  let patch: DailyRoundPatch = inject_consultation(&body, consultation_id)?;
  let parent = patch.consultation;
  let current = find_round(&*state.store, parent, id).await?;
  let fields = patch.apply(&current);
  fields.validate()?;

  let round = state
    .store
    .update_daily_round(parent, id, fields)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("daily round {id} not found")))?;
  Ok(Json(round))
}
