//! Batch requests and reports.
//!
//! A batch is an ordered list of create-or-update operations for one entity
//! family, applied as a single all-or-nothing unit. An operation with an `id`
//! updates that row; one without creates a new row. When any operation fails
//! the whole unit is rolled back and the report says so for every index.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::{Error, ErrorKind, ValidationError},
  kinds::EntityKind,
  lease::{LeaseUpdate, NewLease, NewLeaseVersion},
  reference::{NewParty, NewProperty},
};

/// Hard cap applied when a backend is not configured otherwise.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

// ─── Request ─────────────────────────────────────────────────────────────────

/// One operation: update when `id` is present, create otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOperation<T> {
  #[serde(default)]
  pub id:     Option<Uuid>,
  #[serde(flatten)]
  pub fields: T,
}

impl<T> BatchOperation<T> {
  pub fn create(fields: T) -> Self { Self { id: None, fields } }

  pub fn update(id: Uuid, fields: T) -> Self { Self { id: Some(id), fields } }
}

/// Fields of a lease batch operation. Creation must carry the initial
/// version; updates edit master fields only and must not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseInput {
  pub property_id:     Uuid,
  pub landlord_id:     Uuid,
  pub tenant_id:       Uuid,
  pub lease_number:    String,
  #[serde(default)]
  pub execution_date:  Option<NaiveDate>,
  #[serde(default)]
  pub initial_version: Option<NewLeaseVersion>,
  #[serde(default)]
  pub created_by:      Option<String>,
}

impl LeaseInput {
  pub fn to_new_lease(&self) -> Result<NewLease, ValidationError> {
    let initial_version = self
      .initial_version
      .clone()
      .ok_or(ValidationError::MissingInitialVersion)?;
    let lease = NewLease {
      property_id: self.property_id,
      landlord_id: self.landlord_id,
      tenant_id: self.tenant_id,
      lease_number: self.lease_number.clone(),
      execution_date: self.execution_date,
      initial_version,
      created_by: self.created_by.clone(),
    };
    lease.validate()?;
    Ok(lease)
  }

  pub fn to_update(&self) -> Result<LeaseUpdate, ValidationError> {
    if self.initial_version.is_some() {
      return Err(ValidationError::UnexpectedInitialVersion);
    }
    let update = LeaseUpdate {
      property_id:    Some(self.property_id),
      landlord_id:    Some(self.landlord_id),
      tenant_id:      Some(self.tenant_id),
      lease_number:   Some(self.lease_number.clone()),
      execution_date: self.execution_date,
    };
    update.validate()?;
    Ok(update)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entity", content = "operations", rename_all = "snake_case")]
pub enum BatchRequest {
  Properties(Vec<BatchOperation<NewProperty>>),
  Parties(Vec<BatchOperation<NewParty>>),
  Leases(Vec<BatchOperation<LeaseInput>>),
}

impl BatchRequest {
  pub fn entity(&self) -> EntityKind {
    match self {
      Self::Properties(_) => EntityKind::Properties,
      Self::Parties(_) => EntityKind::Parties,
      Self::Leases(_) => EntityKind::Leases,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Self::Properties(ops) => ops.len(),
      Self::Parties(ops) => ops.len(),
      Self::Leases(ops) => ops.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Reject empty or oversized submissions. Runs before any transaction.
  pub fn check_size(&self, max: usize) -> Result<(), ValidationError> {
    if self.is_empty() {
      return Err(ValidationError::EmptyBatch);
    }
    match self.len() {
      size if size > max => Err(ValidationError::BatchTooLarge { size, max }),
      _ => Ok(()),
    }
  }

  /// Field-level validation of every operation, in order. Returns the index
  /// of the first invalid operation.
  pub fn validate(&self) -> Result<(), (usize, ValidationError)> {
    let first_error = |results: Vec<Result<(), ValidationError>>| {
      results
        .into_iter()
        .enumerate()
        .find_map(|(index, result)| result.err().map(|e| (index, e)))
        .map_or(Ok(()), Err)
    };
    match self {
      Self::Properties(ops) => first_error(ops.iter().map(|op| op.fields.validate()).collect()),
      Self::Parties(ops) => first_error(ops.iter().map(|op| op.fields.validate()).collect()),
      Self::Leases(ops) => first_error(
        ops
          .iter()
          .map(|op| match op.id {
            Some(_) => op.fields.to_update().map(drop),
            None => op.fields.to_new_lease().map(drop),
          })
          .collect(),
      ),
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// What happened to one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
  Created { id: Uuid },
  Updated { id: Uuid },
  /// The operation that aborted the unit.
  Failed { error: ErrorKind, message: String },
  /// Applied, then undone because a later operation failed.
  RolledBack,
  /// Never reached because an earlier operation failed.
  NotAttempted,
}

impl Outcome {
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Created { .. } | Self::Updated { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
  pub index:   usize,
  #[serde(flatten)]
  pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  pub entity:     EntityKind,
  pub total:      usize,
  pub successful: usize,
  pub failed:     usize,
  pub results:    Vec<OperationResult>,
}

impl BatchReport {
  /// Report for a unit that committed: every operation succeeded.
  pub fn committed(entity: EntityKind, outcomes: Vec<Outcome>) -> Self {
    let total = outcomes.len();
    let successful = outcomes.iter().filter(|o| o.is_success()).count();
    Self {
      entity,
      total,
      successful,
      failed: total - successful,
      results: outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| OperationResult { index, outcome })
        .collect(),
    }
  }

  /// Report for an aborted unit. Nothing was persisted, so every operation
  /// counts as failed: earlier ones were rolled back, later ones never ran.
  pub fn aborted(entity: EntityKind, total: usize, failed_index: usize, error: &Error) -> Self {
    let results = (0..total)
      .map(|index| {
        let outcome = match index.cmp(&failed_index) {
          std::cmp::Ordering::Less => Outcome::RolledBack,
          std::cmp::Ordering::Equal => Outcome::Failed {
            error:   error.kind(),
            message: error.to_string(),
          },
          std::cmp::Ordering::Greater => Outcome::NotAttempted,
        };
        OperationResult { index, outcome }
      })
      .collect();
    Self { entity, total, successful: 0, failed: total, results }
  }

  /// The operation that aborted the unit, if any.
  pub fn failure(&self) -> Option<&OperationResult> {
    self
      .results
      .iter()
      .find(|r| matches!(r.outcome, Outcome::Failed { .. }))
  }
}

impl fmt::Display for BatchReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} of {} {} operations failed", self.failed, self.total, self.entity)?;
    if let Some(failure) = self.failure() {
      write!(f, " (operation {} was rejected)", failure.index)?;
    }
    Ok(())
  }
}
