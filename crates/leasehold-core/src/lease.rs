//! Leases and their append-only version history.
//!
//! A lease is a stable identity tying one property to a landlord-side party
//! and a tenant. Its economic terms live in [`LeaseVersion`]s: version 0 is
//! the original lease and every amendment appends version N+1. Exactly one
//! version is current at a time, and versions are never edited once
//! superseded.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::ValidationError,
  interval::{DateInterval, Partitioned},
  kinds::EscalationMethod,
};

/// The single currency leases are recorded in unless stated otherwise.
pub const DEFAULT_CURRENCY: &str = "USD";

// ─── Lease ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
  pub lease_id:       Uuid,
  pub property_id:    Uuid,
  pub landlord_id:    Uuid,
  pub tenant_id:      Uuid,
  /// The landlord's own reference; unique per property.
  pub lease_number:   String,
  pub execution_date: Option<NaiveDate>,
  /// Caller identity passed through for audit only.
  pub created_by:     Option<String>,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::LeaseStore::create_lease`]: the master record
/// plus the terms of version 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLease {
  pub property_id:     Uuid,
  pub landlord_id:     Uuid,
  pub tenant_id:       Uuid,
  pub lease_number:    String,
  #[serde(default)]
  pub execution_date:  Option<NaiveDate>,
  pub initial_version: NewLeaseVersion,
  #[serde(default)]
  pub created_by:      Option<String>,
}

impl NewLease {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.lease_number.trim().is_empty() {
      return Err(ValidationError::Blank { field: "lease_number" });
    }
    self.initial_version.validate()
  }
}

/// A partial edit of the lease master record. Absent fields are left alone;
/// version state is never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseUpdate {
  #[serde(default)]
  pub property_id:    Option<Uuid>,
  #[serde(default)]
  pub landlord_id:    Option<Uuid>,
  #[serde(default)]
  pub tenant_id:      Option<Uuid>,
  #[serde(default)]
  pub lease_number:   Option<String>,
  #[serde(default)]
  pub execution_date: Option<NaiveDate>,
}

impl LeaseUpdate {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn validate(&self) -> Result<(), ValidationError> {
    match &self.lease_number {
      Some(number) if number.trim().is_empty() => {
        Err(ValidationError::Blank { field: "lease_number" })
      }
      _ => Ok(()),
    }
  }
}

// ─── LeaseVersion ────────────────────────────────────────────────────────────

/// A snapshot of lease terms valid over `effective`. Immutable once
/// superseded; only `is_current` ever changes, and only from `true` to
/// `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseVersion {
  pub version_id:    Uuid,
  pub lease_id:      Uuid,
  /// 0 for the original lease; strictly increasing per lease.
  pub version_num:   u32,
  pub is_current:    bool,
  pub effective:     DateInterval,
  pub premises_sqft: Option<Decimal>,
  pub term_months:   Option<u32>,
  pub escalation:    EscalationMethod,
  pub currency:      String,
  pub notes:         Option<String>,
  pub created_by:    Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl Partitioned for LeaseVersion {
  type Key = Uuid;

  fn id(&self) -> Uuid { self.version_id }
  fn partition_key(&self) -> Uuid { self.lease_id }
  fn interval(&self) -> &DateInterval { &self.effective }
}

/// Candidate terms for version 0 or for an amendment.
/// `version_num` and `is_current` are always assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeaseVersion {
  pub effective:     DateInterval,
  #[serde(default)]
  pub premises_sqft: Option<Decimal>,
  #[serde(default)]
  pub term_months:   Option<u32>,
  #[serde(default)]
  pub escalation:    EscalationMethod,
  #[serde(default = "default_currency")]
  pub currency:      String,
  #[serde(default)]
  pub notes:         Option<String>,
  #[serde(default)]
  pub created_by:    Option<String>,
}

fn default_currency() -> String { DEFAULT_CURRENCY.to_owned() }

impl NewLeaseVersion {
  /// Convenience constructor with all optional terms left at their defaults.
  pub fn new(effective: DateInterval) -> Self {
    Self {
      effective,
      premises_sqft: None,
      term_months: None,
      escalation: EscalationMethod::default(),
      currency: default_currency(),
      notes: None,
      created_by: None,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if let Some(sqft) = self.premises_sqft
      && sqft <= Decimal::ZERO
    {
      return Err(ValidationError::NonPositive {
        field: "premises_sqft",
        value: sqft.to_string(),
      });
    }
    if self.term_months == Some(0) {
      return Err(ValidationError::NonPositive {
        field: "term_months",
        value: "0".into(),
      });
    }
    let valid_currency =
      self.currency.len() == 3 && self.currency.bytes().all(|b| b.is_ascii_uppercase());
    if !valid_currency {
      return Err(ValidationError::InvalidCurrency(self.currency.clone()));
    }
    Ok(())
  }
}

/// Pagination for [`crate::store::LeaseStore::list_version_history`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}
