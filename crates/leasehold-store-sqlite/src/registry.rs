//! Reference data, the lease master record and critical dates.
//!
//! Functions taking `&Connection` run inside whatever transaction the caller
//! holds (a `Transaction` derefs to `Connection`); those taking
//! `&mut Connection` open their own.

use chrono::Utc;
use leasehold_core::{
  Entity,
  critical_date::{CriticalDate, NewCriticalDate},
  error::Error as CoreError,
  lease::{Lease, LeaseUpdate, LeaseVersion, NewLease},
  reference::{NewParty, NewProperty, Party, Property},
  store::LeaseQuery,
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CRITICAL_DATE_COLUMNS, LEASE_COLUMNS, PARTY_COLUMNS, PROPERTY_COLUMNS, RawCriticalDate,
    RawLease, RawParty, RawProperty, encode_date, encode_dt, encode_uuid,
  },
  error::{Violation, violation},
  query::{LeaseField, Select, Update},
  tx::with_transaction,
  versions,
};

fn not_found(entity: Entity, id: Uuid) -> Error { CoreError::not_found(entity, id).into() }

/// Whether a row with primary key `id` exists in `table`.
fn exists(conn: &Connection, table: &str, key: &str, id: Uuid) -> Result<bool> {
  let sql = format!("SELECT 1 FROM {table} WHERE {key} = ?1");
  Ok(conn
    .query_row(&sql, params![encode_uuid(id)], |_| Ok(()))
    .optional()?
    .is_some())
}

pub(crate) fn require(conn: &Connection, entity: Entity, id: Uuid) -> Result<()> {
  let (table, key) = match entity {
    Entity::Property => ("properties", "property_id"),
    Entity::Party => ("parties", "party_id"),
    Entity::Lease => ("leases", "lease_id"),
    Entity::LeaseVersion => ("lease_versions", "version_id"),
    Entity::Record => ("interval_records", "record_id"),
    Entity::CriticalDate => ("critical_dates", "critical_date_id"),
  };
  if exists(conn, table, key, id)? { Ok(()) } else { Err(not_found(entity, id)) }
}

// ─── Properties ──────────────────────────────────────────────────────────────

pub(crate) fn insert_property(conn: &Connection, input: &NewProperty) -> Result<Property> {
  input.validate()?;
  let property = Property {
    property_id: Uuid::new_v4(),
    name:        input.name.clone(),
    address:     input.address.clone(),
    created_at:  Utc::now(),
  };
  conn.execute(
    "INSERT INTO properties (property_id, name, address, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(property.property_id),
      property.name,
      property.address,
      encode_dt(property.created_at),
    ],
  )?;
  Ok(property)
}

pub(crate) fn update_property(conn: &Connection, id: Uuid, input: &NewProperty) -> Result<Property> {
  input.validate()?;
  let changed = conn.execute(
    "UPDATE properties SET name = ?1, address = ?2 WHERE property_id = ?3",
    params![input.name, input.address, encode_uuid(id)],
  )?;
  if changed == 0 {
    return Err(not_found(Entity::Property, id));
  }
  get_property(conn, id)?.ok_or_else(|| not_found(Entity::Property, id))
}

pub(crate) fn get_property(conn: &Connection, id: Uuid) -> Result<Option<Property>> {
  let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE property_id = ?1");
  conn
    .query_row(&sql, params![encode_uuid(id)], RawProperty::from_row)
    .optional()?
    .map(RawProperty::into_property)
    .transpose()
}

// ─── Parties ─────────────────────────────────────────────────────────────────

pub(crate) fn insert_party(conn: &Connection, input: &NewParty) -> Result<Party> {
  input.validate()?;
  let party = Party {
    party_id:   Uuid::new_v4(),
    name:       input.name.clone(),
    party_type: input.party_type,
    created_at: Utc::now(),
  };
  conn.execute(
    "INSERT INTO parties (party_id, name, party_type, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(party.party_id),
      party.name,
      party.party_type.as_str(),
      encode_dt(party.created_at),
    ],
  )?;
  Ok(party)
}

pub(crate) fn update_party(conn: &Connection, id: Uuid, input: &NewParty) -> Result<Party> {
  input.validate()?;
  let changed = conn.execute(
    "UPDATE parties SET name = ?1, party_type = ?2 WHERE party_id = ?3",
    params![input.name, input.party_type.as_str(), encode_uuid(id)],
  )?;
  if changed == 0 {
    return Err(not_found(Entity::Party, id));
  }
  get_party(conn, id)?.ok_or_else(|| not_found(Entity::Party, id))
}

pub(crate) fn get_party(conn: &Connection, id: Uuid) -> Result<Option<Party>> {
  let sql = format!("SELECT {PARTY_COLUMNS} FROM parties WHERE party_id = ?1");
  conn
    .query_row(&sql, params![encode_uuid(id)], RawParty::from_row)
    .optional()?
    .map(RawParty::into_party)
    .transpose()
}

// ─── Leases ──────────────────────────────────────────────────────────────────

/// Map a UNIQUE failure on `(property_id, lease_number)` to a domain error.
fn duplicate_lease(err: rusqlite::Error, property_id: Uuid, lease_number: &str) -> Error {
  match violation(&err) {
    Some(Violation::Unique(columns)) if columns.contains("leases.lease_number") => {
      CoreError::DuplicateLease { property_id, lease_number: lease_number.to_owned() }.into()
    }
    _ => err.into(),
  }
}

fn require_refs(
  conn: &Connection,
  property_id: Option<Uuid>,
  landlord_id: Option<Uuid>,
  tenant_id: Option<Uuid>,
) -> Result<()> {
  if let Some(id) = property_id {
    require(conn, Entity::Property, id)?;
  }
  for id in [landlord_id, tenant_id].into_iter().flatten() {
    require(conn, Entity::Party, id)?;
  }
  Ok(())
}

/// Insert the lease master row and its version 0. The caller owns the
/// transaction.
pub(crate) fn insert_lease(conn: &Connection, input: &NewLease) -> Result<(Lease, LeaseVersion)> {
  input.validate()?;
  require_refs(conn, Some(input.property_id), Some(input.landlord_id), Some(input.tenant_id))?;

  let lease = Lease {
    lease_id:       Uuid::new_v4(),
    property_id:    input.property_id,
    landlord_id:    input.landlord_id,
    tenant_id:      input.tenant_id,
    lease_number:   input.lease_number.trim().to_owned(),
    execution_date: input.execution_date,
    created_by:     input.created_by.clone(),
    created_at:     Utc::now(),
  };

  conn
    .execute(
      "INSERT INTO leases (
         lease_id, property_id, landlord_id, tenant_id, lease_number,
         execution_date, created_by, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        encode_uuid(lease.lease_id),
        encode_uuid(lease.property_id),
        encode_uuid(lease.landlord_id),
        encode_uuid(lease.tenant_id),
        lease.lease_number,
        lease.execution_date.map(encode_date),
        lease.created_by,
        encode_dt(lease.created_at),
      ],
    )
    .map_err(|e| duplicate_lease(e, lease.property_id, &lease.lease_number))?;

  let mut initial = input.initial_version.clone();
  if initial.created_by.is_none() {
    initial.created_by = input.created_by.clone();
  }
  let version = versions::insert_version(conn, lease.lease_id, 0, &initial)?;
  Ok((lease, version))
}

pub(crate) fn create_lease(conn: &mut Connection, input: &NewLease) -> Result<(Lease, LeaseVersion)> {
  input.validate()?;
  with_transaction(conn, TransactionBehavior::Immediate, |tx| insert_lease(tx, input))
}

/// Apply a master-field edit. Version rows are never touched.
pub(crate) fn apply_lease_update(conn: &Connection, id: Uuid, update: &LeaseUpdate) -> Result<Lease> {
  update.validate()?;
  let existing = get_lease(conn, id)?.ok_or_else(|| not_found(Entity::Lease, id))?;
  require_refs(conn, update.property_id, update.landlord_id, update.tenant_id)?;

  let lease_number = update.lease_number.as_deref().map(str::trim).map(str::to_owned);
  let statement = Update::new(LeaseField::LeaseId, encode_uuid(id))
    .set_opt(LeaseField::PropertyId, update.property_id.map(encode_uuid))
    .set_opt(LeaseField::LandlordId, update.landlord_id.map(encode_uuid))
    .set_opt(LeaseField::TenantId, update.tenant_id.map(encode_uuid))
    .set_opt(LeaseField::LeaseNumber, lease_number.clone())
    .set_opt(LeaseField::ExecutionDate, update.execution_date.map(encode_date));

  if let Some((sql, values)) = statement.build() {
    conn
      .execute(&sql, rusqlite::params_from_iter(values.iter()))
      .map_err(|e| {
        duplicate_lease(
          e,
          update.property_id.unwrap_or(existing.property_id),
          lease_number.as_deref().unwrap_or(&existing.lease_number),
        )
      })?;
  }
  get_lease(conn, id)?.ok_or_else(|| not_found(Entity::Lease, id))
}

pub(crate) fn update_lease(conn: &mut Connection, id: Uuid, update: &LeaseUpdate) -> Result<Lease> {
  update.validate()?;
  with_transaction(conn, TransactionBehavior::Immediate, |tx| apply_lease_update(tx, id, update))
}

pub(crate) fn get_lease(conn: &Connection, id: Uuid) -> Result<Option<Lease>> {
  let sql = format!("SELECT {LEASE_COLUMNS} FROM leases WHERE lease_id = ?1");
  conn
    .query_row(&sql, params![encode_uuid(id)], RawLease::from_row)
    .optional()?
    .map(RawLease::into_lease)
    .transpose()
}

/// Delete a lease that has no versions. Its critical dates go with it.
pub(crate) fn delete_lease(conn: &mut Connection, id: Uuid) -> Result<()> {
  with_transaction(conn, TransactionBehavior::Immediate, |tx| {
    require(tx, Entity::Lease, id)?;
    let versions: i64 = tx.query_row(
      "SELECT COUNT(*) FROM lease_versions WHERE lease_id = ?1",
      params![encode_uuid(id)],
      |r| r.get(0),
    )?;
    if versions > 0 {
      return Err(CoreError::LeaseHasVersions(id).into());
    }
    tx.execute("DELETE FROM leases WHERE lease_id = ?1", params![encode_uuid(id)])?;
    Ok(())
  })
}

pub(crate) fn search_leases(conn: &Connection, query: &LeaseQuery) -> Result<Vec<Lease>> {
  let select = Select::<LeaseField>::new(LEASE_COLUMNS)
    .filter_opt(LeaseField::PropertyId, query.property_id.map(encode_uuid))
    .filter_opt(LeaseField::LandlordId, query.landlord_id.map(encode_uuid))
    .filter_opt(LeaseField::TenantId, query.tenant_id.map(encode_uuid))
    .filter_opt(LeaseField::LeaseNumber, query.lease_number.as_deref().map(str::trim).map(str::to_owned))
    .order_by(LeaseField::CreatedAt)
    .order_by(LeaseField::LeaseId)
    .page(query.page);
  let (sql, values) = select.build();

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params_from_iter(values.iter()), RawLease::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawLease::into_lease).collect()
}

// ─── Critical dates ──────────────────────────────────────────────────────────

pub(crate) fn add_critical_date(
  conn: &mut Connection,
  lease_id: Uuid,
  input: &NewCriticalDate,
) -> Result<CriticalDate> {
  input.validate()?;
  with_transaction(conn, TransactionBehavior::Immediate, |tx| {
    require(tx, Entity::Lease, lease_id)?;
    let critical_date = CriticalDate {
      critical_date_id: Uuid::new_v4(),
      lease_id,
      kind: input.kind,
      date: input.date,
      description: input.description.clone(),
      created_at: Utc::now(),
    };
    tx.execute(
      "INSERT INTO critical_dates (
         critical_date_id, lease_id, kind, date, description, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        encode_uuid(critical_date.critical_date_id),
        encode_uuid(lease_id),
        critical_date.kind.as_str(),
        encode_date(critical_date.date),
        critical_date.description,
        encode_dt(critical_date.created_at),
      ],
    )?;
    Ok(critical_date)
  })
}

/// Critical dates of a lease ordered by date, then id.
pub(crate) fn list_critical_dates(conn: &Connection, lease_id: Uuid) -> Result<Vec<CriticalDate>> {
  let sql = format!(
    "SELECT {CRITICAL_DATE_COLUMNS} FROM critical_dates WHERE lease_id = ?1 \
     ORDER BY date, critical_date_id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(lease_id)], RawCriticalDate::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCriticalDate::into_critical_date).collect()
}

pub(crate) fn delete_critical_date(conn: &Connection, id: Uuid) -> Result<()> {
  let deleted = conn.execute(
    "DELETE FROM critical_dates WHERE critical_date_id = ?1",
    params![encode_uuid(id)],
  )?;
  if deleted == 0 {
    return Err(not_found(Entity::CriticalDate, id));
  }
  Ok(())
}
