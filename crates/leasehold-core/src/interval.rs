//! Half-open date intervals and the interval-consistency validator.
//!
//! Every dated range in the model is `[start, end)`: the start day is
//! included, the end day is not. Two intervals that touch (`a.end ==
//! b.start`) therefore do not overlap. An absent end means the interval is
//! open-ended.
//!
//! Intervals arriving from outside may carry any combination of `[`/`(` and
//! `]`/`)` boundary markers; they are normalised to the half-open form on
//! construction so that only one representation exists internally.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// The only boundary form stored and emitted.
pub const CANONICAL_BOUNDS: &str = "[)";

// ─── DateInterval ────────────────────────────────────────────────────────────

/// A non-empty half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "RawInterval")]
pub struct DateInterval {
  start: NaiveDate,
  end:   Option<NaiveDate>,
}

impl DateInterval {
  /// A bounded interval. Fails unless `start < end` and both bounds are
  /// storable (see [`check_storable`]).
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
    check_storable(start)?;
    check_storable(end)?;
    if start >= end {
      return Err(ValidationError::EmptyInterval { start, end });
    }
    Ok(Self { start, end: Some(end) })
  }

  /// An open-ended interval beginning on `start`.
  pub fn starting(start: NaiveDate) -> Self { Self { start, end: None } }

  /// Build from an optional upper bound.
  pub fn from_bounds(
    start: NaiveDate,
    end: Option<NaiveDate>,
  ) -> Result<Self, ValidationError> {
    match end {
      Some(end) => Self::new(start, end),
      None => {
        check_storable(start)?;
        Ok(Self::starting(start))
      }
    }
  }

  /// First day inside the interval.
  pub fn start(&self) -> NaiveDate { self.start }

  /// First day after the interval, if bounded.
  pub fn end(&self) -> Option<NaiveDate> { self.end }

  /// Whether `date` falls inside `[start, end)`.
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && before_end(date, self.end)
  }

  /// Half-open overlap: `a.start < b.end && b.start < a.end`.
  pub fn overlaps(&self, other: &Self) -> bool {
    before_end(self.start, other.end) && before_end(other.start, self.end)
  }

}

/// Reject dates outside years 0000..=9999.
///
/// Dates are stored and compared as `YYYY-MM-DD` text; chrono renders other
/// years with a sign (`+10000-01-01`, `-0001-12-31`), which would sort out
/// of date order.
pub fn check_storable(date: NaiveDate) -> Result<(), ValidationError> {
  if (0..=9999).contains(&date.year()) {
    Ok(())
  } else {
    Err(ValidationError::DateOutOfRange(date))
  }
}

/// `true` when `date` lies strictly before `end` (an absent end is infinity).
fn before_end(date: NaiveDate, end: Option<NaiveDate>) -> bool {
  end.is_none_or(|end| date < end)
}

/// Free-function form of [`DateInterval::overlaps`].
pub fn overlaps(a: &DateInterval, b: &DateInterval) -> bool { a.overlaps(b) }

// ─── Text form ───────────────────────────────────────────────────────────────

impl fmt::Display for DateInterval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.end {
      Some(end) => write!(f, "[{},{})", self.start, end),
      None => write!(f, "[{},)", self.start),
    }
  }
}

impl FromStr for DateInterval {
  type Err = ValidationError;

  /// Parses range literals such as `[2024-01-01,2029-01-01)`,
  /// `[2024-01-01,2024-12-31]` or `[2024-01-01,)`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let malformed = || ValidationError::MalformedInterval(s.to_owned());
    let s = s.trim();
    if s.len() < 3 || !s.is_char_boundary(1) || !s.is_char_boundary(s.len() - 1) {
      return Err(malformed());
    }
    let (lower, rest) = s.split_at(1);
    let (body, upper) = rest.split_at(rest.len() - 1);
    let (start, end) = body.split_once(',').ok_or_else(malformed)?;

    let start = parse_date(start.trim()).ok_or_else(malformed)?;
    let end = match end.trim() {
      "" => None,
      text => Some(parse_date(text).ok_or_else(malformed)?),
    };
    normalise(start, end, &format!("{lower}{upper}"))
  }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Convert arbitrary boundary markers into the canonical `[)` form.
fn normalise(
  start: NaiveDate,
  end: Option<NaiveDate>,
  bounds: &str,
) -> Result<DateInterval, ValidationError> {
  let overflow =
    || ValidationError::MalformedInterval(format!("date out of range near {start}"));
  let (lower, upper) = match bounds.as_bytes() {
    [lower, upper] => (*lower, *upper),
    _ => {
      return Err(ValidationError::MalformedInterval(format!(
        "unknown boundary markers {bounds:?}"
      )));
    }
  };

  let start = match lower {
    b'[' => start,
    b'(' => start.checked_add_days(Days::new(1)).ok_or_else(overflow)?,
    _ => {
      return Err(ValidationError::MalformedInterval(format!(
        "unknown lower bound marker in {bounds:?}"
      )));
    }
  };
  let end = match (upper, end) {
    (b')', end) => end,
    (b']', Some(end)) => Some(end.checked_add_days(Days::new(1)).ok_or_else(overflow)?),
    (b']', None) => None,
    _ => {
      return Err(ValidationError::MalformedInterval(format!(
        "unknown upper bound marker in {bounds:?}"
      )));
    }
  };
  DateInterval::from_bounds(start, end)
}

// ─── Serde form ──────────────────────────────────────────────────────────────

/// JSON shape: `{"start": "...", "end": "..." | null, "bounds": "[)"}`.
/// `bounds` is optional on input and always emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawInterval {
  start:  NaiveDate,
  #[serde(default)]
  end:    Option<NaiveDate>,
  #[serde(default = "canonical_bounds")]
  bounds: String,
}

fn canonical_bounds() -> String { CANONICAL_BOUNDS.to_owned() }

impl TryFrom<RawInterval> for DateInterval {
  type Error = ValidationError;

  fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
    normalise(raw.start, raw.end, &raw.bounds)
  }
}

impl From<DateInterval> for RawInterval {
  fn from(interval: DateInterval) -> Self {
    Self {
      start:  interval.start,
      end:    interval.end,
      bounds: canonical_bounds(),
    }
  }
}

// ─── Interval-consistency validator ──────────────────────────────────────────

/// A stored row that carries an interval within a partition.
pub trait Partitioned {
  type Key: PartialEq;

  fn id(&self) -> Uuid;
  fn partition_key(&self) -> Self::Key;
  fn interval(&self) -> &DateInterval;
}

/// Return the first row in `existing` that shares `key` with the candidate,
/// is not `exclude`, and overlaps `candidate`.
///
/// Pure and side-effect free. Backends run it inside their write transaction
/// as a pre-check and back it with a storage-level exclusion guarantee.
pub fn find_conflict<'a, T, I>(
  candidate: &DateInterval,
  key: &T::Key,
  existing: I,
  exclude: Option<Uuid>,
) -> Option<&'a T>
where
  T: Partitioned + 'a,
  I: IntoIterator<Item = &'a T>,
{
  existing.into_iter().find(|row| {
    row.partition_key() == *key
      && Some(row.id()) != exclude
      && row.interval().overlaps(candidate)
  })
}
