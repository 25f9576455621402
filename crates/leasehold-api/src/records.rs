//! Handlers for interval records (rent schedules, options, concessions).
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/versions/{id}/records` | Ordered by interval start; optional `kind` |
//! | `POST`   | `/versions/{id}/records` | Body: [`NewIntervalRecord`]; returns 201 |
//! | `GET`    | `/records/{id}` | 404 if not found |
//! | `PUT`    | `/records/{id}` | Body: [`NewIntervalRecord`]; the kind may not change |
//! | `DELETE` | `/records/{id}` | |
//! | `GET`    | `/records/{id}/metrics` | Optional `as_of` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use leasehold_core::{
  RecordKind,
  metrics::RecordMetrics,
  record::{IntervalRecord, NewIntervalRecord},
  store::LeaseStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, leases::AsOfParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<RecordKind>,
}

/// `GET /versions/{id}/records[?kind=RENT_SCHEDULE]`
pub async fn list<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(version_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<IntervalRecord>>, ApiError> {
  let records = state
    .store
    .list_records(version_id, params.kind)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `POST /versions/{id}/records`
pub async fn create<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(version_id): Path<Uuid>,
  Json(body): Json<NewIntervalRecord>,
) -> Result<impl IntoResponse, ApiError> {
  let record = state.store.create_record(version_id, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /records/{id}`
pub async fn get_one<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<IntervalRecord>, ApiError> {
  let record = state
    .store
    .get_record(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(record))
}

/// `PUT /records/{id}`
pub async fn replace<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewIntervalRecord>,
) -> Result<Json<IntervalRecord>, ApiError> {
  let record = state.store.update_record(id, body).await.map_err(ApiError::store)?;
  Ok(Json(record))
}

/// `DELETE /records/{id}`
pub async fn delete<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_record(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /records/{id}/metrics[?as_of=YYYY-MM-DD]`
pub async fn metrics<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<RecordMetrics>, ApiError> {
  let record = state
    .store
    .get_record(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(record.metrics(params.date())))
}
