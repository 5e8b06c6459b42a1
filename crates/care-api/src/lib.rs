//! JSON REST API for consultations and their daily rounds.
//!
//! Exposes an axum [`Router`] backed by any [`CareStore`]. Every route except
//! `/health` requires HTTP Basic credentials; the resolved [`Actor`] decides
//! which consultations the request can see.
//!
//! [`Actor`]: care_core::actor::Actor

pub mod auth;
pub mod consultations;
pub mod daily_rounds;
pub mod error;
pub mod extract;

use std::sync::Arc;

use axum::{Router, routing::get};
use care_core::store::CareStore;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use error::ApiError;

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CareStore> {
  pub store: Arc<S>,
}

/// Build the application router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api/v1", api_routes::<S>())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn api_routes<S>() -> Router<AppState<S>>
where
  S: CareStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Consultations
    .route(
      "/consultations",
      get(consultations::list::<S>).post(consultations::create::<S>),
    )
    .route(
      "/consultations/{external_id}",
      get(consultations::get_one::<S>)
        .put(consultations::update::<S>)
        .patch(consultations::partial_update::<S>),
    )
    // Daily rounds, nested under their consultation
    .route(
      "/consultations/{external_id}/daily_rounds",
      get(daily_rounds::list::<S>).post(daily_rounds::create::<S>),
    )
    .route(
      "/consultations/{external_id}/daily_rounds/{id}",
      get(daily_rounds::get_one::<S>)
        .put(daily_rounds::update::<S>)
        .patch(daily_rounds::partial_update::<S>),
    )
}

async fn health() -> &'static str { "ok" }

/// Parse an external identifier from a path segment. A malformed value cannot
/// name any record, so it is reported as not found.
fn parse_external_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("consultation {raw} not found")))
}
