//! Wiring for the Leasehold HTTP server: runtime configuration and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use leasehold_api::ApiSettings;
use leasehold_store_sqlite::{SqliteStore, StoreConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `leasehold.toml` and
/// `LEASEHOLD_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// How long a writer waits on a locked database before failing.
  pub busy_timeout_ms:    u64,
  pub max_batch_size:     usize,
  /// Attempts per amendment before a concurrent conflict reaches the client.
  pub amendment_attempts: u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let store = StoreConfig::default();
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      store_path:         PathBuf::from("leasehold.db"),
      busy_timeout_ms:    store.busy_timeout.as_millis() as u64,
      max_batch_size:     store.max_batch_size,
      amendment_attempts: ApiSettings::default().amendment_attempts,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_config(&self) -> StoreConfig {
    StoreConfig {
      busy_timeout:   Duration::from_millis(self.busy_timeout_ms),
      max_batch_size: self.max_batch_size,
    }
  }

  pub fn api_settings(&self) -> ApiSettings {
    ApiSettings { amendment_attempts: self.amendment_attempts }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn app(store: Arc<SqliteStore>, settings: ApiSettings) -> Router {
  Router::new()
    .nest("/api", leasehold_api::api_router(store, settings))
    .layer(TraceLayer::new_for_http())
}
