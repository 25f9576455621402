//! Interval records attached to lease versions.
//!
//! Records are partitioned by `(version_id, kind)`; within a partition no
//! two intervals may overlap. Every write runs the validator inside an
//! IMMEDIATE transaction and the `interval_records_no_overlap_*` triggers
//! enforce the same rule underneath.

use chrono::Utc;
use leasehold_core::{
  Entity, RecordKind, ValidationError,
  error::{Error as CoreError, OverlapScope},
  interval::find_conflict,
  record::{IntervalRecord, NewIntervalRecord},
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RECORD_COLUMNS, RawRecord, encode_dt, encode_interval, encode_uuid},
  error::{Violation, violation},
  query::{RecordField, Select},
  registry::require,
  tx::with_transaction,
};

/// Reject `input` if it overlaps a record of the same kind on `version_id`,
/// other than `exclude`.
fn check_partition(
  conn: &Connection,
  version_id: Uuid,
  input: &NewIntervalRecord,
  exclude: Option<Uuid>,
) -> Result<()> {
  let kind = input.kind();
  let existing = list_records(conn, version_id, Some(kind))?;
  match find_conflict(&input.interval, &(version_id, kind), &existing, exclude) {
    Some(conflicting) => Err(
      CoreError::Overlap {
        scope: OverlapScope::Records { version_id, kind },
        candidate: input.interval,
        conflicting_id: conflicting.record_id,
        conflicting_interval: conflicting.interval,
      }
      .into(),
    ),
    None => Ok(()),
  }
}

/// Translate a failed write into domain terms.
fn write_error(
  conn: &Connection,
  err: rusqlite::Error,
  version_id: Uuid,
  input: &NewIntervalRecord,
  exclude: Option<Uuid>,
) -> Error {
  match violation(&err) {
    Some(Violation::Overlap) => match check_partition(conn, version_id, input, exclude) {
      Err(overlap) => overlap,
      Ok(()) => err.into(),
    },
    Some(Violation::ForeignKey) => CoreError::not_found(Entity::LeaseVersion, version_id).into(),
    _ => err.into(),
  }
}

pub(crate) fn create_record(
  conn: &mut Connection,
  version_id: Uuid,
  input: &NewIntervalRecord,
) -> Result<IntervalRecord> {
  input.validate()?;
  with_transaction(conn, TransactionBehavior::Immediate, |tx| {
    require(tx, Entity::LeaseVersion, version_id)?;
    check_partition(tx, version_id, input, None)?;
    insert_record(tx, version_id, input)
  })
}

/// Insert a record without the partition pre-check; the storage trigger
/// still rejects overlaps.
pub(crate) fn insert_record(
  conn: &Connection,
  version_id: Uuid,
  input: &NewIntervalRecord,
) -> Result<IntervalRecord> {
  let terms = input.payload.to_json()?.to_string();
  let record = IntervalRecord {
    record_id: Uuid::new_v4(),
    version_id,
    interval: input.interval,
    payload: input.payload.clone(),
    created_at: Utc::now(),
  };
  let (start, end) = encode_interval(&record.interval);
  conn
    .execute(
      "INSERT INTO interval_records (
         record_id, version_id, kind, interval_start, interval_end, terms_json, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      params![
        encode_uuid(record.record_id),
        encode_uuid(version_id),
        record.kind().as_str(),
        start,
        end,
        terms,
        encode_dt(record.created_at),
      ],
    )
    .map_err(|e| write_error(conn, e, version_id, input, None))?;
  Ok(record)
}

/// Replace a record's interval and payload in place. The record itself is
/// excluded from the overlap check.
pub(crate) fn update_record(
  conn: &mut Connection,
  record_id: Uuid,
  input: &NewIntervalRecord,
) -> Result<IntervalRecord> {
  input.validate()?;
  let terms = input.payload.to_json()?.to_string();
  with_transaction(conn, TransactionBehavior::Immediate, |tx| {
    let existing = get_record(tx, record_id)?
      .ok_or_else(|| Error::from(CoreError::not_found(Entity::Record, record_id)))?;
    if existing.kind() != input.kind() {
      return Err(ValidationError::KindChange { from: existing.kind(), to: input.kind() }.into());
    }
    check_partition(tx, existing.version_id, input, Some(record_id))?;

    let (start, end) = encode_interval(&input.interval);
    tx.execute(
      "UPDATE interval_records
         SET interval_start = ?1, interval_end = ?2, terms_json = ?3
       WHERE record_id = ?4",
      params![start, end, terms, encode_uuid(record_id)],
    )
    .map_err(|e| write_error(tx, e, existing.version_id, input, Some(record_id)))?;

    Ok(IntervalRecord {
      interval: input.interval,
      payload: input.payload.clone(),
      ..existing
    })
  })
}

pub(crate) fn delete_record(conn: &Connection, record_id: Uuid) -> Result<()> {
  let deleted = conn.execute(
    "DELETE FROM interval_records WHERE record_id = ?1",
    params![encode_uuid(record_id)],
  )?;
  if deleted == 0 {
    return Err(CoreError::not_found(Entity::Record, record_id).into());
  }
  Ok(())
}

pub(crate) fn get_record(conn: &Connection, record_id: Uuid) -> Result<Option<IntervalRecord>> {
  let sql = format!("SELECT {RECORD_COLUMNS} FROM interval_records WHERE record_id = ?1");
  conn
    .query_row(&sql, params![encode_uuid(record_id)], RawRecord::from_row)
    .optional()?
    .map(RawRecord::into_record)
    .transpose()
}

/// Records of a version ordered by interval start, optionally of one kind.
pub(crate) fn list_records(
  conn: &Connection,
  version_id: Uuid,
  kind: Option<RecordKind>,
) -> Result<Vec<IntervalRecord>> {
  let (sql, values) = Select::<RecordField>::new(RECORD_COLUMNS)
    .filter(RecordField::VersionId, encode_uuid(version_id))
    .filter_opt(RecordField::Kind, kind.map(|k| k.as_str().to_owned()))
    .order_by(RecordField::IntervalStart)
    .order_by(RecordField::RecordId)
    .build();

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params_from_iter(values.iter()), RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRecord::into_record).collect()
}
