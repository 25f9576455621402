//! Reference data that leases point at: properties and parties.
//!
//! These carry no temporal invariant. They exist so that lease creation and
//! batches have something to check references against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ValidationError, kinds::PartyType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
  pub property_id: Uuid,
  pub name:        String,
  pub address:     Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input for creating a property, or the full replacement when updating one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProperty {
  pub name:    String,
  #[serde(default)]
  pub address: Option<String>,
}

impl NewProperty {
  pub fn validate(&self) -> Result<(), ValidationError> {
    not_blank("name", &self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
  pub party_id:   Uuid,
  pub name:       String,
  pub party_type: PartyType,
  pub created_at: DateTime<Utc>,
}

/// Input for creating a party, or the full replacement when updating one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParty {
  pub name:       String,
  pub party_type: PartyType,
}

impl NewParty {
  pub fn validate(&self) -> Result<(), ValidationError> {
    not_blank("name", &self.name)
  }
}

fn not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    Err(ValidationError::Blank { field })
  } else {
    Ok(())
  }
}
