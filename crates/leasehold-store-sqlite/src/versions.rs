//! The version store: append-only lease versions and the amendment
//! protocol.
//!
//! An amendment runs in one IMMEDIATE transaction:
//!
//! 1. take the write lock and load every version of the lease;
//! 2. reject the candidate if its effective interval overlaps any of them;
//! 3. demote the current version and insert the candidate as `max + 1`,
//!    marked current.
//!
//! The overlap trigger and the single-current unique index back steps 2 and
//! 3 at the storage level, so a writer that bypasses this module still
//! cannot break either invariant.

use chrono::Utc;
use leasehold_core::{
  Entity,
  error::{Error as CoreError, OverlapScope},
  interval::{DateInterval, find_conflict},
  lease::{LeaseVersion, NewLeaseVersion, Page},
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{VERSION_COLUMNS, RawVersion, encode_decimal, encode_dt, encode_interval, encode_uuid},
  error::{Violation, violation},
  registry::require,
  tx::with_transaction,
};

fn overlap(lease_id: Uuid, candidate: DateInterval, conflicting: &LeaseVersion) -> Error {
  CoreError::Overlap {
    scope: OverlapScope::LeaseVersions { lease_id },
    candidate,
    conflicting_id: conflicting.version_id,
    conflicting_interval: conflicting.effective,
  }
  .into()
}

/// Translate a failed version insert into domain terms.
fn insert_error(conn: &Connection, err: rusqlite::Error, lease_id: Uuid, candidate: DateInterval) -> Error {
  match violation(&err) {
    Some(Violation::Overlap) => match versions_of(conn, lease_id) {
      Ok(existing) => match find_conflict(&candidate, &lease_id, &existing, None) {
        Some(conflicting) => overlap(lease_id, candidate, conflicting),
        None => err.into(),
      },
      Err(lookup) => lookup,
    },
    // Another writer claimed this version number or the current slot.
    Some(Violation::Unique(_)) => CoreError::ConcurrentAmendment { lease_id }.into(),
    Some(Violation::ForeignKey) => CoreError::not_found(Entity::Lease, lease_id).into(),
    _ => err.into(),
  }
}

/// Insert a version row marked current. The caller owns the transaction and
/// must already have demoted any previous current version.
pub(crate) fn insert_version(
  conn: &Connection,
  lease_id: Uuid,
  version_num: u32,
  input: &NewLeaseVersion,
) -> Result<LeaseVersion> {
  input.validate()?;
  let version = LeaseVersion {
    version_id: Uuid::new_v4(),
    lease_id,
    version_num,
    is_current: true,
    effective: input.effective,
    premises_sqft: input.premises_sqft,
    term_months: input.term_months,
    escalation: input.escalation,
    currency: input.currency.clone(),
    notes: input.notes.clone(),
    created_by: input.created_by.clone(),
    created_at: Utc::now(),
  };
  let (start, end) = encode_interval(&version.effective);

  conn
    .execute(
      "INSERT INTO lease_versions (
         version_id, lease_id, version_num, is_current,
         effective_start, effective_end, premises_sqft, term_months,
         escalation, currency, notes, created_by, created_at
       ) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
      params![
        encode_uuid(version.version_id),
        encode_uuid(lease_id),
        version.version_num,
        start,
        end,
        version.premises_sqft.map(encode_decimal),
        version.term_months,
        version.escalation.as_str(),
        version.currency,
        version.notes,
        version.created_by,
        encode_dt(version.created_at),
      ],
    )
    .map_err(|e| insert_error(conn, e, lease_id, version.effective))?;
  Ok(version)
}

/// Append version N+1 to `lease_id` and make it current.
pub(crate) fn create_amendment(
  conn: &mut Connection,
  lease_id: Uuid,
  candidate: &NewLeaseVersion,
) -> Result<LeaseVersion> {
  candidate.validate()?;
  let result = with_transaction(conn, TransactionBehavior::Immediate, |tx| {
    require(tx, Entity::Lease, lease_id)?;

    let existing = versions_of(tx, lease_id)?;
    if let Some(conflicting) = find_conflict(&candidate.effective, &lease_id, &existing, None) {
      return Err(overlap(lease_id, candidate.effective, conflicting));
    }
    let next = existing.iter().map(|v| v.version_num).max().map_or(0, |n| n + 1);

    tx.execute(
      "UPDATE lease_versions SET is_current = 0 WHERE lease_id = ?1 AND is_current = 1",
      params![encode_uuid(lease_id)],
    )?;
    insert_version(tx, lease_id, next, candidate)
  });

  // Losing the write lock race past the busy timeout means another writer
  // was amending; the caller may retry the whole transition.
  result.map_err(|err| match err {
    Error::Busy(_) => CoreError::ConcurrentAmendment { lease_id }.into(),
    other => other,
  })
}

/// Every version of a lease, ordered by `version_num`.
pub(crate) fn versions_of(conn: &Connection, lease_id: Uuid) -> Result<Vec<LeaseVersion>> {
  history(conn, lease_id, Page::default())
}

pub(crate) fn history(conn: &Connection, lease_id: Uuid, page: Page) -> Result<Vec<LeaseVersion>> {
  let limit = page.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
  let offset = page.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
  let sql = format!(
    "SELECT {VERSION_COLUMNS} FROM lease_versions WHERE lease_id = ?1 \
     ORDER BY version_num LIMIT ?2 OFFSET ?3"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(lease_id), limit, offset], RawVersion::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawVersion::into_version).collect()
}

pub(crate) fn current_version(conn: &Connection, lease_id: Uuid) -> Result<Option<LeaseVersion>> {
  let sql = format!(
    "SELECT {VERSION_COLUMNS} FROM lease_versions WHERE lease_id = ?1 AND is_current = 1"
  );
  conn
    .query_row(&sql, params![encode_uuid(lease_id)], RawVersion::from_row)
    .optional()?
    .map(RawVersion::into_version)
    .transpose()
}

pub(crate) fn get_version(conn: &Connection, version_id: Uuid) -> Result<Option<LeaseVersion>> {
  let sql = format!("SELECT {VERSION_COLUMNS} FROM lease_versions WHERE version_id = ?1");
  conn
    .query_row(&sql, params![encode_uuid(version_id)], RawVersion::from_row)
    .optional()?
    .map(RawVersion::into_version)
    .transpose()
}
