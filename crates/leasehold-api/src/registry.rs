//! Handlers for reference data: `/properties` and `/parties`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/properties` | Body: [`NewProperty`]; returns 201 |
//! | `GET`  | `/properties/{id}` | 404 if not found |
//! | `PUT`  | `/properties/{id}` | Body: [`NewProperty`] |
//! | `POST` | `/parties` | Body: [`NewParty`]; returns 201 |
//! | `GET`  | `/parties/{id}` | 404 if not found |
//! | `PUT`  | `/parties/{id}` | Body: [`NewParty`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use leasehold_core::{
  reference::{NewParty, NewProperty, Party, Property},
  store::LeaseStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Properties ──────────────────────────────────────────────────────────────

/// `POST /properties`
pub async fn create_property<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewProperty>,
) -> Result<impl IntoResponse, ApiError> {
  let property = state.store.add_property(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(property)))
}

/// `GET /properties/{id}`
pub async fn get_property<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Property>, ApiError> {
  let property = state
    .store
    .get_property(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("property {id} not found")))?;
  Ok(Json(property))
}

/// `PUT /properties/{id}`
pub async fn update_property<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewProperty>,
) -> Result<Json<Property>, ApiError> {
  let property = state.store.update_property(id, body).await.map_err(ApiError::store)?;
  Ok(Json(property))
}

// ─── Parties ─────────────────────────────────────────────────────────────────

/// `POST /parties`
pub async fn create_party<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewParty>,
) -> Result<impl IntoResponse, ApiError> {
  let party = state.store.add_party(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(party)))
}

/// `GET /parties/{id}`
pub async fn get_party<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Party>, ApiError> {
  let party = state
    .store
    .get_party(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("party {id} not found")))?;
  Ok(Json(party))
}

/// `PUT /parties/{id}`
pub async fn update_party<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewParty>,
) -> Result<Json<Party>, ApiError> {
  let party = state.store.update_party(id, body).await.map_err(ApiError::store)?;
  Ok(Json(party))
}
