//! The materialised read model of a lease.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  critical_date::CriticalDate,
  lease::{Lease, LeaseVersion},
  metrics::{self, RecordMetrics, ResolvedExpiration, VersionMetrics},
  record::IntervalRecord,
};

/// A record bundled with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
  #[serde(flatten)]
  pub record:  IntervalRecord,
  pub metrics: RecordMetrics,
}

/// The current version with its metrics and records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionView {
  #[serde(flatten)]
  pub version: LeaseVersion,
  pub metrics: VersionMetrics,
  pub records: Vec<RecordView>,
}

/// The computed view of a lease as of one date. Never stored, always
/// derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseView {
  pub lease:                Lease,
  /// The date every metric in this view was computed against.
  pub as_of:                NaiveDate,
  pub current_version:      Option<VersionView>,
  pub critical_dates:       Vec<CriticalDate>,
  pub expiration:           Option<ResolvedExpiration>,
  pub months_to_expiration: Option<f64>,
}

impl LeaseView {
  /// Assemble the view from already-loaded rows. `records` should be those of
  /// `current`; records of other versions are ignored.
  pub fn assemble(
    lease: Lease,
    current: Option<LeaseVersion>,
    records: Vec<IntervalRecord>,
    critical_dates: Vec<CriticalDate>,
    as_of: NaiveDate,
  ) -> Self {
    let expiration = metrics::resolve_expiration_date(&critical_dates, current.as_ref());
    let months_to_expiration =
      expiration.map(|e| metrics::months_to_expiration(e.date, as_of));

    let current_version = current.map(|version| {
      let records = records
        .into_iter()
        .filter(|r| r.version_id == version.version_id)
        .map(|record| RecordView { metrics: record.metrics(as_of), record })
        .collect();
      VersionView { metrics: version.metrics(as_of), version, records }
    });

    Self {
      lease,
      as_of,
      current_version,
      critical_dates,
      expiration,
      months_to_expiration,
    }
  }
}
