//! Derived metrics, computed at read time and never persisted.
//!
//! Every function here is pure and parameterised by `now`, so repeated calls
//! with the same inputs yield the same output. Month counts use a flat
//! 30-day month rather than calendar-month arithmetic.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  critical_date::CriticalDate,
  interval::DateInterval,
  kinds::{ConcessionKind, CriticalDateKind, RentBasis},
  lease::LeaseVersion,
  record::RecordPayload,
};

/// Length of the approximate month used by every month count.
pub const DAYS_PER_MONTH: f64 = 30.0;

const MONTHS_PER_YEAR: u32 = 12;

/// Decimal places kept on converted money amounts.
const MONEY_SCALE: u32 = 2;

// ─── Rent conversion ─────────────────────────────────────────────────────────

/// Rent per month. Yearly amounts are divided by twelve and rounded to cents.
pub fn monthly_equivalent(amount: Decimal, basis: RentBasis) -> Decimal {
  match basis {
    RentBasis::Month => amount,
    RentBasis::Year => (amount / Decimal::from(MONTHS_PER_YEAR)).round_dp(MONEY_SCALE),
  }
}

/// Rent per year.
pub fn annual_equivalent(amount: Decimal, basis: RentBasis) -> Decimal {
  match basis {
    RentBasis::Month => amount * Decimal::from(MONTHS_PER_YEAR),
    RentBasis::Year => amount,
  }
}

// ─── Windows ─────────────────────────────────────────────────────────────────

/// Whether an option's notice window is open on `now`.
pub fn notice_window_open(window: &DateInterval, now: NaiveDate) -> bool {
  window.contains(now)
}

/// Months of free rent still to come.
///
/// Only defined for [`ConcessionKind::FreeRent`] with a bounded interval that
/// ends after `now`; `None` otherwise.
pub fn months_remaining(
  applies: &DateInterval,
  now: NaiveDate,
  kind: ConcessionKind,
) -> Option<f64> {
  if kind != ConcessionKind::FreeRent {
    return None;
  }
  let end = applies.end()?;
  if end <= now {
    return None;
  }
  Some(approx_months(end, now))
}

// ─── Expiration ──────────────────────────────────────────────────────────────

/// Where a resolved expiration date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ExpirationSource {
  /// An EXPIRATION-kind critical date recorded against the lease.
  CriticalDate { critical_date_id: Uuid },
  /// The upper bound of the current version's effective interval.
  CurrentVersion { version_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedExpiration {
  pub date:   NaiveDate,
  #[serde(flatten)]
  pub source: ExpirationSource,
}

/// Resolve a lease's expiration date.
///
/// An EXPIRATION critical date wins over the current version's interval. When
/// several exist the latest date is used, ties broken by id, so the choice
/// never depends on row order. `None` means no expiration is known.
pub fn resolve_expiration_date(
  critical_dates: &[CriticalDate],
  current: Option<&LeaseVersion>,
) -> Option<ResolvedExpiration> {
  let recorded = critical_dates
    .iter()
    .filter(|cd| cd.kind == CriticalDateKind::Expiration)
    .max_by_key(|cd| (cd.date, cd.critical_date_id));

  if let Some(cd) = recorded {
    return Some(ResolvedExpiration {
      date:   cd.date,
      source: ExpirationSource::CriticalDate { critical_date_id: cd.critical_date_id },
    });
  }

  let version = current.filter(|v| v.is_current)?;
  Some(ResolvedExpiration {
    date:   version.effective.end()?,
    source: ExpirationSource::CurrentVersion { version_id: version.version_id },
  })
}

/// Approximate months from `now` until `expiration`; negative once expired.
pub fn months_to_expiration(expiration: NaiveDate, now: NaiveDate) -> f64 {
  approx_months(expiration, now)
}

fn approx_months(until: NaiveDate, now: NaiveDate) -> f64 {
  let days = (until - now).num_days() as f64;
  round_tenths(days / DAYS_PER_MONTH)
}

fn round_tenths(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

// ─── Per-record and per-version metrics ──────────────────────────────────────

/// Metrics attached to an interval record, keyed by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordMetrics {
  RentSchedule {
    monthly_equivalent: Decimal,
    annual_equivalent:  Decimal,
  },
  Option {
    notice_window_open: bool,
  },
  Concession {
    months_remaining: Option<f64>,
  },
}

pub fn record_metrics(
  interval: &DateInterval,
  payload: &RecordPayload,
  now: NaiveDate,
) -> RecordMetrics {
  match payload {
    RecordPayload::RentSchedule(rent) => RecordMetrics::RentSchedule {
      monthly_equivalent: monthly_equivalent(rent.amount, rent.basis),
      annual_equivalent:  annual_equivalent(rent.amount, rent.basis),
    },
    RecordPayload::Option(_) => RecordMetrics::Option {
      notice_window_open: notice_window_open(interval, now),
    },
    RecordPayload::Concession(concession) => RecordMetrics::Concession {
      months_remaining: months_remaining(interval, now, concession.kind),
    },
  }
}

/// Metrics attached to a lease version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetrics {
  /// Whether the effective interval contains `now`.
  pub in_effect:     bool,
  /// Approximate months until the effective interval ends; `None` when
  /// open-ended.
  pub months_to_end: Option<f64>,
}

impl LeaseVersion {
  /// Derived metrics as of `now`. Pure; nothing is written.
  pub fn metrics(&self, now: NaiveDate) -> VersionMetrics {
    VersionMetrics {
      in_effect:     self.effective.contains(now),
      months_to_end: self.effective.end().map(|end| months_to_expiration(end, now)),
    }
  }
}
