//! Request extractors whose rejections render as [`ApiError`].
//!
//! Thin wrappers over axum's `Json`, `Query` and `Path`; a body, query string
//! or path segment that fails to parse becomes a 400 with the usual
//! `{"error": ...}` envelope.

use axum::{
  extract::{FromRequest, FromRequestParts, Request},
  http::request::Parts,
  response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::ApiError;

/// JSON request body, or JSON response.
pub struct Json<T>(pub T);

/// Deserialised query string.
pub struct Query<T>(pub T);

/// Deserialised path parameters.
pub struct Path<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
    Ok(Json(value))
  }
}

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

impl<T, S> FromRequestParts<S> for Query<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let axum::extract::Query(value) =
      axum::extract::Query::<T>::from_request_parts(parts, state).await?;
    Ok(Query(value))
  }
}

impl<T, S> FromRequestParts<S> for Path<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let axum::extract::Path(value) =
      axum::extract::Path::<T>::from_request_parts(parts, state).await?;
    Ok(Path(value))
  }
}
