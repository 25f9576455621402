//! Handlers for `/leases` endpoints and critical dates.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/leases` | Body: [`NewLease`] including `initial_version`; returns 201 + lease and version 0 |
//! | `GET`    | `/leases` | Optional `property_id`, `landlord_id`, `tenant_id`, `lease_number`, `limit`, `offset` |
//! | `GET`    | `/leases/{id}` | 404 if not found |
//! | `PATCH`  | `/leases/{id}` | Body: [`LeaseUpdate`]; master fields only |
//! | `DELETE` | `/leases/{id}` | 409 while versions exist |
//! | `GET`    | `/leases/{id}/view` | Optional `as_of` (defaults to today, UTC) |
//! | `GET`    | `/leases/{id}/critical-dates` | |
//! | `POST`   | `/leases/{id}/critical-dates` | Body: [`NewCriticalDate`] |
//! | `DELETE` | `/critical-dates/{id}` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use leasehold_core::{
  critical_date::{CriticalDate, NewCriticalDate},
  lease::{Lease, LeaseUpdate, LeaseVersion, NewLease, Page},
  store::{LeaseQuery, LeaseStore},
  view::LeaseView,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, actor, error::ApiError};

/// `?as_of=YYYY-MM-DD`; absent means today.
#[derive(Debug, Deserialize)]
pub struct AsOfParams {
  pub as_of: Option<NaiveDate>,
}

impl AsOfParams {
  pub fn date(&self) -> NaiveDate { self.as_of.unwrap_or_else(|| Utc::now().date_naive()) }
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreatedLease {
  pub lease:           Lease,
  pub initial_version: LeaseVersion,
}

/// `POST /leases`: creates the lease and its version 0 in one unit.
pub async fn create<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  Json(mut body): Json<NewLease>,
) -> Result<impl IntoResponse, ApiError> {
  if body.created_by.is_none() {
    body.created_by = actor(&headers);
  }
  let (lease, initial_version) = state.store.create_lease(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(CreatedLease { lease, initial_version })))
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub property_id:  Option<Uuid>,
  pub landlord_id:  Option<Uuid>,
  pub tenant_id:    Option<Uuid>,
  pub lease_number: Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

impl From<SearchParams> for LeaseQuery {
  fn from(p: SearchParams) -> Self {
    LeaseQuery {
      property_id:  p.property_id,
      landlord_id:  p.landlord_id,
      tenant_id:    p.tenant_id,
      lease_number: p.lease_number,
      page:         Page { limit: p.limit, offset: p.offset },
    }
  }
}

/// `GET /leases[?property_id=..][&tenant_id=..][&limit=..]`
pub async fn search<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Lease>>, ApiError> {
  let query = LeaseQuery::from(params);
  let leases = state.store.search_leases(&query).await.map_err(ApiError::store)?;
  Ok(Json(leases))
}

// ─── Get / update / delete ───────────────────────────────────────────────────

/// `GET /leases/{id}`
pub async fn get_one<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Lease>, ApiError> {
  let lease = state
    .store
    .get_lease(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lease {id} not found")))?;
  Ok(Json(lease))
}

/// `PATCH /leases/{id}`
pub async fn update<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LeaseUpdate>,
) -> Result<Json<Lease>, ApiError> {
  if body.is_empty() {
    return Err(ApiError::BadRequest("no fields to update".into()));
  }
  let lease = state.store.update_lease(id, body).await.map_err(ApiError::store)?;
  Ok(Json(lease))
}

/// `DELETE /leases/{id}`
pub async fn delete<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_lease(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── View ────────────────────────────────────────────────────────────────────

/// `GET /leases/{id}/view[?as_of=YYYY-MM-DD]`
pub async fn view<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<LeaseView>, ApiError> {
  let view = state
    .store
    .materialize_lease(id, params.date())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lease {id} not found")))?;
  Ok(Json(view))
}

// ─── Critical dates ──────────────────────────────────────────────────────────

/// `GET /leases/{id}/critical-dates`
pub async fn list_critical_dates<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CriticalDate>>, ApiError> {
  let dates = state.store.list_critical_dates(id).await.map_err(ApiError::store)?;
  Ok(Json(dates))
}

/// `POST /leases/{id}/critical-dates`
pub async fn add_critical_date<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewCriticalDate>,
) -> Result<impl IntoResponse, ApiError> {
  let date = state.store.add_critical_date(id, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(date)))
}

/// `DELETE /critical-dates/{id}`
pub async fn delete_critical_date<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_critical_date(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
