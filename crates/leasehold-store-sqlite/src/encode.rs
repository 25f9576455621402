//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD` (so text
//! comparison is date comparison), money and areas are decimal strings and
//! UUIDs are hyphenated lowercase strings. Interval upper bounds are NULL
//! when open.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use leasehold_core::{
  DateInterval, ValidationError,
  critical_date::CriticalDate,
  lease::{Lease, LeaseVersion},
  record::{IntervalRecord, RecordPayload},
  reference::{Party, Property},
};
use rusqlite::Row;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

/// Decode one of the closed vocabularies stored as its wire token.
pub fn decode_token<T>(s: &str) -> Result<T>
where
  T: FromStr<Err = ValidationError>,
{
  s.parse()
    .map_err(|e: ValidationError| Error::Decode(e.to_string()))
}

/// `(start, end)` column values of an interval.
pub fn encode_interval(interval: &DateInterval) -> (String, Option<String>) {
  (encode_date(interval.start()), interval.end().map(encode_date))
}

pub fn decode_interval(start: &str, end: Option<&str>) -> Result<DateInterval> {
  let start = decode_date(start)?;
  match end {
    None => Ok(DateInterval::starting(start)),
    Some(end) => DateInterval::new(start, decode_date(end)?)
      .map_err(|e| Error::Decode(e.to_string())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `Raw*` struct holds the column strings of one row in the order of its
// `*_COLUMNS` constant; `from_row` reads them and `into_*` decodes them.

pub const PROPERTY_COLUMNS: &str = "property_id, name, address, created_at";

pub struct RawProperty {
  pub property_id: String,
  pub name:        String,
  pub address:     Option<String>,
  pub created_at:  String,
}

impl RawProperty {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      property_id: row.get(0)?,
      name:        row.get(1)?,
      address:     row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_property(self) -> Result<Property> {
    Ok(Property {
      property_id: decode_uuid(&self.property_id)?,
      name:        self.name,
      address:     self.address,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const PARTY_COLUMNS: &str = "party_id, name, party_type, created_at";

pub struct RawParty {
  pub party_id:   String,
  pub name:       String,
  pub party_type: String,
  pub created_at: String,
}

impl RawParty {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      party_id:   row.get(0)?,
      name:       row.get(1)?,
      party_type: row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_party(self) -> Result<Party> {
    Ok(Party {
      party_id:   decode_uuid(&self.party_id)?,
      name:       self.name,
      party_type: decode_token(&self.party_type)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const LEASE_COLUMNS: &str = "lease_id, property_id, landlord_id, tenant_id, lease_number, \
                                 execution_date, created_by, created_at";

pub struct RawLease {
  pub lease_id:       String,
  pub property_id:    String,
  pub landlord_id:    String,
  pub tenant_id:      String,
  pub lease_number:   String,
  pub execution_date: Option<String>,
  pub created_by:     Option<String>,
  pub created_at:     String,
}

impl RawLease {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      lease_id:       row.get(0)?,
      property_id:    row.get(1)?,
      landlord_id:    row.get(2)?,
      tenant_id:      row.get(3)?,
      lease_number:   row.get(4)?,
      execution_date: row.get(5)?,
      created_by:     row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_lease(self) -> Result<Lease> {
    Ok(Lease {
      lease_id:       decode_uuid(&self.lease_id)?,
      property_id:    decode_uuid(&self.property_id)?,
      landlord_id:    decode_uuid(&self.landlord_id)?,
      tenant_id:      decode_uuid(&self.tenant_id)?,
      lease_number:   self.lease_number,
      execution_date: self.execution_date.as_deref().map(decode_date).transpose()?,
      created_by:     self.created_by,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const VERSION_COLUMNS: &str = "version_id, lease_id, version_num, is_current, \
                                   effective_start, effective_end, premises_sqft, term_months, \
                                   escalation, currency, notes, created_by, created_at";

pub struct RawVersion {
  pub version_id:      String,
  pub lease_id:        String,
  pub version_num:     u32,
  pub is_current:      bool,
  pub effective_start: String,
  pub effective_end:   Option<String>,
  pub premises_sqft:   Option<String>,
  pub term_months:     Option<u32>,
  pub escalation:      String,
  pub currency:        String,
  pub notes:           Option<String>,
  pub created_by:      Option<String>,
  pub created_at:      String,
}

impl RawVersion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:      row.get(0)?,
      lease_id:        row.get(1)?,
      version_num:     row.get(2)?,
      is_current:      row.get(3)?,
      effective_start: row.get(4)?,
      effective_end:   row.get(5)?,
      premises_sqft:   row.get(6)?,
      term_months:     row.get(7)?,
      escalation:      row.get(8)?,
      currency:        row.get(9)?,
      notes:           row.get(10)?,
      created_by:      row.get(11)?,
      created_at:      row.get(12)?,
    })
  }

  pub fn into_version(self) -> Result<LeaseVersion> {
    Ok(LeaseVersion {
      version_id:    decode_uuid(&self.version_id)?,
      lease_id:      decode_uuid(&self.lease_id)?,
      version_num:   self.version_num,
      is_current:    self.is_current,
      effective:     decode_interval(&self.effective_start, self.effective_end.as_deref())?,
      premises_sqft: self.premises_sqft.as_deref().map(decode_decimal).transpose()?,
      term_months:   self.term_months,
      escalation:    decode_token(&self.escalation)?,
      currency:      self.currency,
      notes:         self.notes,
      created_by:    self.created_by,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const RECORD_COLUMNS: &str =
  "record_id, version_id, kind, interval_start, interval_end, terms_json, created_at";

pub struct RawRecord {
  pub record_id:      String,
  pub version_id:     String,
  pub kind:           String,
  pub interval_start: String,
  pub interval_end:   Option<String>,
  pub terms_json:     String,
  pub created_at:     String,
}

impl RawRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:      row.get(0)?,
      version_id:     row.get(1)?,
      kind:           row.get(2)?,
      interval_start: row.get(3)?,
      interval_end:   row.get(4)?,
      terms_json:     row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<IntervalRecord> {
    let terms: serde_json::Value = serde_json::from_str(&self.terms_json)?;
    Ok(IntervalRecord {
      record_id:  decode_uuid(&self.record_id)?,
      version_id: decode_uuid(&self.version_id)?,
      interval:   decode_interval(&self.interval_start, self.interval_end.as_deref())?,
      payload:    RecordPayload::from_parts(decode_token(&self.kind)?, terms)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const CRITICAL_DATE_COLUMNS: &str =
  "critical_date_id, lease_id, kind, date, description, created_at";

pub struct RawCriticalDate {
  pub critical_date_id: String,
  pub lease_id:         String,
  pub kind:             String,
  pub date:             String,
  pub description:      Option<String>,
  pub created_at:       String,
}

impl RawCriticalDate {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      critical_date_id: row.get(0)?,
      lease_id:         row.get(1)?,
      kind:             row.get(2)?,
      date:             row.get(3)?,
      description:      row.get(4)?,
      created_at:       row.get(5)?,
    })
  }

  pub fn into_critical_date(self) -> Result<CriticalDate> {
    Ok(CriticalDate {
      critical_date_id: decode_uuid(&self.critical_date_id)?,
      lease_id:         decode_uuid(&self.lease_id)?,
      kind:             decode_token(&self.kind)?,
      date:             decode_date(&self.date)?,
      description:      self.description,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}
