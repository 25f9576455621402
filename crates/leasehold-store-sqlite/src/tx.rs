//! Scoped transactions.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::Result;

/// Run `f` inside a transaction that commits when `f` returns `Ok` and rolls
/// back otherwise. A panic inside `f` also rolls back, since the transaction
/// is dropped uncommitted.
///
/// Writers pass [`TransactionBehavior::Immediate`] so the write lock is taken
/// up front: a competing writer then waits out the busy timeout at `BEGIN`
/// instead of failing halfway through.
pub fn with_transaction<T, F>(
  conn: &mut Connection,
  behavior: TransactionBehavior,
  f: F,
) -> Result<T>
where
  F: FnOnce(&Transaction<'_>) -> Result<T>,
{
  let tx = conn.transaction_with_behavior(behavior)?;
  match f(&tx) {
    Ok(value) => {
      tx.commit()?;
      Ok(value)
    }
    Err(err) => {
      if let Err(rollback) = tx.rollback() {
        tracing::warn!(error = %rollback, "rollback failed");
      }
      Err(err)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
    conn
  }

  fn count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap()
  }

  #[test]
  fn commits_on_success() {
    let mut conn = conn();
    with_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
      tx.execute("INSERT INTO t VALUES (1)", [])?;
      Ok(())
    })
    .unwrap();
    assert_eq!(count(&conn), 1);
  }

  #[test]
  fn rolls_back_on_error() {
    let mut conn = conn();
    let result: Result<()> = with_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
      tx.execute("INSERT INTO t VALUES (1)", [])?;
      Err(Error::Decode("boom".into()))
    });
    assert!(result.is_err());
    assert_eq!(count(&conn), 0);
  }
}
