//! Interval records: rent schedules, options and concessions.
//!
//! All three families share one shape: they belong to a single lease
//! version, carry one half-open interval (the rent period, the option's
//! notice window, or the period a concession applies to) and a typed payload.
//! Within one version, intervals of the same kind must not overlap; records
//! of different kinds are independent.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::ValidationError,
  interval::{DateInterval, Partitioned},
  kinds::{ConcessionBasis, ConcessionKind, OptionType, RecordKind, RentBasis},
  metrics::{self, RecordMetrics},
};

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentTerms {
  pub amount: Decimal,
  pub basis:  RentBasis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTerms {
  pub option_type: OptionType,
  #[serde(default)]
  pub terms:       Option<String>,
  #[serde(default)]
  pub exercised:   bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcessionTerms {
  pub kind:  ConcessionKind,
  pub value: Decimal,
  pub basis: ConcessionBasis,
}

/// The typed payload of an interval record. The variant doubles as the
/// record kind, which is the second half of the overlap partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "terms", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordPayload {
  RentSchedule(RentTerms),
  Option(OptionTerms),
  Concession(ConcessionTerms),
}

impl RecordPayload {
  pub fn kind(&self) -> RecordKind {
    match self {
      Self::RentSchedule(_) => RecordKind::RentSchedule,
      Self::Option(_) => RecordKind::Option,
      Self::Concession(_) => RecordKind::Concession,
    }
  }

  /// Serialise the inner terms (without the kind tag) for storage.
  pub fn to_json(&self) -> crate::Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("terms").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild a payload from its stored kind and terms.
  pub fn from_parts(kind: RecordKind, terms: serde_json::Value) -> crate::Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_str(), "terms": terms });
    Ok(serde_json::from_value(wrapped)?)
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    match self {
      Self::RentSchedule(rent) => positive("amount", rent.amount),
      Self::Concession(concession) => positive("value", concession.value),
      Self::Option(_) => Ok(()),
    }
  }
}

fn positive(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
  if value > Decimal::ZERO {
    Ok(())
  } else {
    Err(ValidationError::NonPositive { field, value: value.to_string() })
  }
}

// ─── IntervalRecord ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRecord {
  pub record_id:  Uuid,
  pub version_id: Uuid,
  /// Rent period, notice window, or concession applicability, by kind.
  pub interval:   DateInterval,
  pub payload:    RecordPayload,
  pub created_at: DateTime<Utc>,
}

impl IntervalRecord {
  pub fn kind(&self) -> RecordKind { self.payload.kind() }

  /// Derived metrics as of `now`. Pure; nothing is written.
  pub fn metrics(&self, now: NaiveDate) -> RecordMetrics {
    metrics::record_metrics(&self.interval, &self.payload, now)
  }
}

impl Partitioned for IntervalRecord {
  type Key = (Uuid, RecordKind);

  fn id(&self) -> Uuid { self.record_id }
  fn partition_key(&self) -> (Uuid, RecordKind) { (self.version_id, self.kind()) }
  fn interval(&self) -> &DateInterval { &self.interval }
}

/// Input to `create_record` and `update_record`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIntervalRecord {
  pub interval: DateInterval,
  #[serde(flatten)]
  pub payload:  RecordPayload,
}

impl NewIntervalRecord {
  pub fn new(interval: DateInterval, payload: RecordPayload) -> Self {
    Self { interval, payload }
  }

  pub fn kind(&self) -> RecordKind { self.payload.kind() }

  pub fn validate(&self) -> Result<(), ValidationError> { self.payload.validate() }
}
