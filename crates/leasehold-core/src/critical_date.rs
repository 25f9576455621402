//! Dated events recorded against a lease (not against a version).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ValidationError, interval::check_storable, kinds::CriticalDateKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalDate {
  pub critical_date_id: Uuid,
  pub lease_id:         Uuid,
  pub kind:             CriticalDateKind,
  pub date:             NaiveDate,
  pub description:      Option<String>,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::store::LeaseStore::add_critical_date`].
///
/// Several EXPIRATION rows may coexist for one lease; expiration resolution
/// picks the latest of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCriticalDate {
  pub kind:        CriticalDateKind,
  pub date:        NaiveDate,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewCriticalDate {
  pub fn validate(&self) -> Result<(), ValidationError> { check_storable(self.date) }
}
