//! `POST /batch`: all-or-nothing create-or-update of one entity family.
//!
//! A committed unit returns 200 with the report. An aborted one returns 422
//! whose body carries the same report under `report`, with the failing index
//! marked `failed` and every other index `rolled_back` or `not_attempted`.

use axum::{Json, extract::State};
use leasehold_core::{
  batch::{BatchReport, BatchRequest},
  store::LeaseStore,
};

use crate::{ApiState, error::ApiError};

/// `POST /batch`
pub async fn apply<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Json(request): Json<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
  let report = state.store.apply_batch(request).await.map_err(ApiError::store)?;
  Ok(Json(report))
}
