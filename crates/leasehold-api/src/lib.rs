//! JSON REST API for Leasehold.
//!
//! Exposes an axum [`Router`] backed by any
//! [`leasehold_core::store::LeaseStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility; an optional `X-Actor` header is recorded
//! as `created_by` for audit only.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", leasehold_api::api_router(store.clone(), ApiSettings::default()))
//! ```

pub mod batch;
pub mod error;
pub mod leases;
pub mod records;
pub mod registry;
pub mod versions;

use std::sync::Arc;

use axum::{
  Json, Router,
  http::HeaderMap,
  routing::{get, post},
};
use leasehold_core::store::LeaseStore;
use serde_json::{Value, json};

pub use error::ApiError;

/// Request header whose value is recorded as `created_by`.
pub const ACTOR_HEADER: &str = "x-actor";

/// Knobs the handlers need beyond the store itself.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  /// Attempts per amendment before a concurrent-amendment conflict is
  /// returned to the client.
  pub amendment_attempts: u32,
}

impl Default for ApiSettings {
  fn default() -> Self { Self { amendment_attempts: 3 } }
}

/// Shared handler state.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub settings: ApiSettings,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), settings: self.settings.clone() }
  }
}

/// The caller-supplied actor, if any.
pub(crate) fn actor(headers: &HeaderMap) -> Option<String> {
  headers
    .get(ACTOR_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, settings: ApiSettings) -> Router<()>
where
  S: LeaseStore + 'static,
{
  Router::new()
    // Reference data
    .route("/properties", post(registry::create_property::<S>))
    .route(
      "/properties/{id}",
      get(registry::get_property::<S>).put(registry::update_property::<S>),
    )
    .route("/parties", post(registry::create_party::<S>))
    .route(
      "/parties/{id}",
      get(registry::get_party::<S>).put(registry::update_party::<S>),
    )
    // Leases
    .route("/leases", get(leases::search::<S>).post(leases::create::<S>))
    .route(
      "/leases/{id}",
      get(leases::get_one::<S>)
        .patch(leases::update::<S>)
        .delete(leases::delete::<S>),
    )
    .route("/leases/{id}/view", get(leases::view::<S>))
    .route(
      "/leases/{id}/critical-dates",
      get(leases::list_critical_dates::<S>).post(leases::add_critical_date::<S>),
    )
    .route(
      "/critical-dates/{id}",
      axum::routing::delete(leases::delete_critical_date::<S>),
    )
    // Versions
    .route(
      "/leases/{id}/versions",
      get(versions::history::<S>).post(versions::amend::<S>),
    )
    .route("/leases/{id}/versions/current", get(versions::current::<S>))
    .route("/versions/{id}", get(versions::get_one::<S>))
    .route("/versions/{id}/metrics", get(versions::metrics::<S>))
    // Interval records
    .route(
      "/versions/{id}/records",
      get(records::list::<S>).post(records::create::<S>),
    )
    .route(
      "/records/{id}",
      get(records::get_one::<S>)
        .put(records::replace::<S>)
        .delete(records::delete::<S>),
    )
    .route("/records/{id}/metrics", get(records::metrics::<S>))
    // Batches
    .route("/batch", post(batch::apply::<S>))
    .route("/health", get(health))
    .with_state(ApiState { store, settings })
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
