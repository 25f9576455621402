//! Handlers for lease versions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/leases/{id}/versions` | Ascending `version_num`; optional `limit`, `offset` |
//! | `POST` | `/leases/{id}/versions` | Body: [`NewLeaseVersion`]; appends and promotes an amendment |
//! | `GET`  | `/leases/{id}/versions/current` | 404 if the lease has no versions |
//! | `GET`  | `/versions/{id}` | |
//! | `GET`  | `/versions/{id}/metrics` | Optional `as_of` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use leasehold_core::{
  lease::{LeaseVersion, NewLeaseVersion, Page},
  metrics::VersionMetrics,
  retry::retry_concurrent,
  store::LeaseStore,
};
use uuid::Uuid;

use crate::{ApiState, actor, error::ApiError, leases::AsOfParams};

/// `GET /leases/{id}/versions[?limit=..&offset=..]`
pub async fn history<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(lease_id): Path<Uuid>,
  Query(page): Query<Page>,
) -> Result<Json<Vec<LeaseVersion>>, ApiError> {
  let versions = state
    .store
    .list_version_history(lease_id, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(versions))
}

/// `POST /leases/{id}/versions`: the amendment transition.
///
/// Re-runs the whole transition on a concurrent-amendment conflict, up to
/// the configured number of attempts. Overlaps are returned at once.
pub async fn amend<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(lease_id): Path<Uuid>,
  headers: HeaderMap,
  Json(mut candidate): Json<NewLeaseVersion>,
) -> Result<impl IntoResponse, ApiError> {
  if candidate.created_by.is_none() {
    candidate.created_by = actor(&headers);
  }
  let store = &state.store;
  let version = retry_concurrent(state.settings.amendment_attempts, |attempt| {
    let candidate = candidate.clone();
    async move {
      if attempt > 1 {
        tracing::warn!(%lease_id, attempt, "retrying amendment after concurrent conflict");
      }
      store.create_amendment(lease_id, candidate).await.map_err(Into::into)
    }
  })
  .await?;
  Ok((StatusCode::CREATED, Json(version)))
}

/// `GET /leases/{id}/versions/current`
pub async fn current<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(lease_id): Path<Uuid>,
) -> Result<Json<LeaseVersion>, ApiError> {
  let version = state
    .store
    .get_current_version(lease_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lease {lease_id} has no current version")))?;
  Ok(Json(version))
}

/// `GET /versions/{id}`
pub async fn get_one<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LeaseVersion>, ApiError> {
  let version = state
    .store
    .get_version(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("version {id} not found")))?;
  Ok(Json(version))
}

/// `GET /versions/{id}/metrics[?as_of=YYYY-MM-DD]`
pub async fn metrics<S: LeaseStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<VersionMetrics>, ApiError> {
  let version = state
    .store
    .get_version(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("version {id} not found")))?;
  Ok(Json(version.metrics(params.date())))
}
