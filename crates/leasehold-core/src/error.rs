//! Error types for `leasehold-core`.
//!
//! [`Error`] is the taxonomy every backend maps its failures onto. Storage
//! backends keep their own error type but must convert into this one, so
//! higher layers can tell a retryable conflict from a rejected candidate
//! without inspecting raw storage errors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  batch::BatchReport,
  interval::DateInterval,
  kinds::{Entity, RecordKind},
};

// ─── Validation ──────────────────────────────────────────────────────────────

/// A candidate rejected before any storage work begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("interval is empty: start {start} is not before end {end}")]
  EmptyInterval { start: NaiveDate, end: NaiveDate },

  #[error("malformed interval: {0}")]
  MalformedInterval(String),

  #[error("date {0} is outside the supported range 0000-01-01 to 9999-12-31")]
  DateOutOfRange(NaiveDate),

  #[error("{field} must be positive, got {value}")]
  NonPositive { field: &'static str, value: String },

  #[error("unknown {field} value {value:?}")]
  UnknownVariant { field: &'static str, value: String },

  #[error("{field} must not be blank")]
  Blank { field: &'static str },

  #[error("invalid currency code {0:?}; expected three upper-case letters")]
  InvalidCurrency(String),

  #[error("record kind cannot change from {from} to {to}")]
  KindChange { from: RecordKind, to: RecordKind },

  #[error("lease creation requires an initial version")]
  MissingInitialVersion,

  #[error("an initial version may only be supplied when creating a lease")]
  UnexpectedInitialVersion,

  #[error("batch contains no operations")]
  EmptyBatch,

  #[error("batch of {size} operations exceeds the limit of {max}")]
  BatchTooLarge { size: usize, max: usize },
}

// ─── Conflicts ───────────────────────────────────────────────────────────────

/// The partition an interval conflict was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum OverlapScope {
  /// Effective intervals of the versions of one lease.
  LeaseVersions { lease_id: Uuid },
  /// Intervals of one record kind attached to one lease version.
  Records { version_id: Uuid, kind: RecordKind },
}

impl std::fmt::Display for OverlapScope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::LeaseVersions { lease_id } => write!(f, "versions of lease {lease_id}"),
      Self::Records { version_id, kind } => {
        write!(f, "{kind} records of version {version_id}")
      }
    }
  }
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error(
    "interval {candidate} overlaps {conflicting_id} {conflicting_interval} \
     among {scope}"
  )]
  Overlap {
    scope:                OverlapScope,
    candidate:            DateInterval,
    conflicting_id:       Uuid,
    conflicting_interval: DateInterval,
  },

  #[error("lease {lease_id} was amended concurrently; retry the amendment")]
  ConcurrentAmendment { lease_id: Uuid },

  #[error("lease number {lease_number:?} already exists for property {property_id}")]
  DuplicateLease {
    property_id:  Uuid,
    lease_number: String,
  },

  #[error("lease {0} still owns versions and cannot be deleted")]
  LeaseHasVersions(Uuid),

  /// A write reached a superseded version; only demotion of the current
  /// version is permitted.
  #[error("superseded lease versions cannot be modified")]
  VersionImmutable,

  #[error("batch aborted: {0}")]
  BatchAborted(Box<BatchReport>),

  #[error("storage unavailable: {0}")]
  Unavailable(String),

  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  /// Coarse classification used in batch reports and transport mapping.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::NotFound { .. } => ErrorKind::Reference,
      Self::Overlap { .. }
      | Self::DuplicateLease { .. }
      | Self::LeaseHasVersions(_)
      | Self::VersionImmutable => ErrorKind::Conflict,
      Self::ConcurrentAmendment { .. } => ErrorKind::ConcurrentAmendment,
      Self::BatchAborted(_) => ErrorKind::BatchAborted,
      Self::Unavailable(_) => ErrorKind::Unavailable,
      Self::Storage(_) | Self::Serialization(_) => ErrorKind::Internal,
    }
  }

  /// Whether re-running the whole operation may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::ConcurrentAmendment { .. } | Self::Unavailable(_))
  }
}

/// Coarse error classes, stable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  Reference,
  Conflict,
  ConcurrentAmendment,
  BatchAborted,
  Unavailable,
  Internal,
}
