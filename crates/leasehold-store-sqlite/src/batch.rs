//! All-or-nothing application of a batch.
//!
//! Size and field validation run before the transaction opens. Operations
//! are then applied in order inside one IMMEDIATE transaction; the first
//! domain failure rolls the whole unit back and is reported as
//! [`leasehold_core::Error::BatchAborted`]. Storage faults (busy, I/O)
//! propagate unchanged since the report would say nothing useful about them.

use leasehold_core::{
  EntityKind,
  batch::{BatchReport, BatchRequest, Outcome},
  error::Error as CoreError,
};
use rusqlite::{Connection, TransactionBehavior};

use crate::{Error, Result, registry, tx::with_transaction};

fn aborted(entity: EntityKind, total: usize, index: usize, cause: CoreError) -> Error {
  tracing::warn!(%entity, total, index, error = %cause, "batch aborted");
  CoreError::BatchAborted(Box::new(BatchReport::aborted(entity, total, index, &cause))).into()
}

pub(crate) fn apply_batch(
  conn: &mut Connection,
  request: &BatchRequest,
  max_batch_size: usize,
) -> Result<BatchReport> {
  request.check_size(max_batch_size)?;
  let entity = request.entity();
  let total = request.len();

  if let Err((index, err)) = request.validate() {
    return Err(aborted(entity, total, index, err.into()));
  }

  let outcomes = with_transaction(conn, TransactionBehavior::Immediate, |tx| {
    let mut outcomes = Vec::with_capacity(total);
    for index in 0..total {
      match apply_one(tx, request, index) {
        Ok(outcome) => outcomes.push(outcome),
        Err(err) if err.is_domain() => return Err(aborted(entity, total, index, err.into())),
        Err(err) => return Err(err),
      }
    }
    Ok(outcomes)
  })?;

  tracing::info!(%entity, total, "batch committed");
  Ok(BatchReport::committed(entity, outcomes))
}

fn apply_one(conn: &Connection, request: &BatchRequest, index: usize) -> Result<Outcome> {
  match request {
    BatchRequest::Properties(ops) => {
      let op = &ops[index];
      match op.id {
        Some(id) => registry::update_property(conn, id, &op.fields)
          .map(|p| Outcome::Updated { id: p.property_id }),
        None => registry::insert_property(conn, &op.fields)
          .map(|p| Outcome::Created { id: p.property_id }),
      }
    }
    BatchRequest::Parties(ops) => {
      let op = &ops[index];
      match op.id {
        Some(id) => registry::update_party(conn, id, &op.fields)
          .map(|p| Outcome::Updated { id: p.party_id }),
        None => registry::insert_party(conn, &op.fields)
          .map(|p| Outcome::Created { id: p.party_id }),
      }
    }
    BatchRequest::Leases(ops) => {
      let op = &ops[index];
      match op.id {
        Some(id) => {
          let update = op.fields.to_update()?;
          registry::apply_lease_update(conn, id, &update)
            .map(|l| Outcome::Updated { id: l.lease_id })
        }
        None => {
          let lease = op.fields.to_new_lease()?;
          registry::insert_lease(conn, &lease).map(|(l, _)| Outcome::Created { id: l.lease_id })
        }
      }
    }
  }
}
