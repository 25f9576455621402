//! Error type for `leasehold-store-sqlite`.
//!
//! Raw SQLite failures are classified on the way in: busy and locked
//! conditions become [`Error::Busy`], constraint failures are inspected by
//! the caller through [`violation`] so they can be reported in domain terms.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::schema::{IMMUTABLE_TRIGGER, OVERLAP_TRIGGER};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] leasehold_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),

  /// The database stayed locked past the busy timeout.
  #[error("database busy: {0}")]
  Busy(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  /// A stored column did not decode into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    match &err {
      rusqlite::Error::SqliteFailure(e, msg)
        if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
      {
        Self::Busy(msg.clone().unwrap_or_else(|| e.to_string()))
      }
      _ => Self::Sqlite(err),
    }
  }
}

impl From<leasehold_core::ValidationError> for Error {
  fn from(err: leasehold_core::ValidationError) -> Self { Self::Core(err.into()) }
}

impl Error {
  /// Whether this is a domain failure a caller could have avoided, as
  /// opposed to a storage or connection fault.
  pub fn is_domain(&self) -> bool { matches!(self, Self::Core(_)) }
}

impl From<Error> for leasehold_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Busy(msg) => Self::Unavailable(msg),
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => Error::from(e).into(),
      Error::Database(e) => Self::Unavailable(e.to_string()),
      Error::Json(e) => Self::Serialization(e),
      Error::Sqlite(e) if violation(&e) == Some(Violation::Immutable) => Self::VersionImmutable,
      other => Self::Storage(other.to_string()),
    }
  }
}

// ─── Constraint classification ───────────────────────────────────────────────

/// A constraint failure reported by SQLite, by origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Violation {
  /// One of the `*_no_overlap` triggers fired.
  Overlap,
  /// A superseded version was about to be modified.
  Immutable,
  /// A UNIQUE constraint or unique index; carries the column list.
  Unique(String),
  ForeignKey,
  Other(String),
}

/// Classify a constraint failure. `None` for every other kind of error.
pub(crate) fn violation(err: &rusqlite::Error) -> Option<Violation> {
  let rusqlite::Error::SqliteFailure(e, msg) = err else { return None };
  if e.code != ErrorCode::ConstraintViolation {
    return None;
  }
  let msg = msg.as_deref().unwrap_or_default();
  let violation = if msg.contains(OVERLAP_TRIGGER) {
    Violation::Overlap
  } else if msg.contains(IMMUTABLE_TRIGGER) {
    Violation::Immutable
  } else if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
    Violation::Unique(columns.to_owned())
  } else if msg.starts_with("FOREIGN KEY constraint failed") {
    Violation::ForeignKey
  } else {
    Violation::Other(msg.to_owned())
  };
  Some(violation)
}
