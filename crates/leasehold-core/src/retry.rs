//! Bounded retry of amendment transitions that lost a race.
//!
//! A concurrent-amendment conflict means another writer amended the same
//! lease first; re-running the whole transition re-validates against the new
//! history. Overlap conflicts are never retried since they would fail again.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Error, Result,
  lease::{LeaseVersion, NewLeaseVersion},
  store::LeaseStore,
};

/// Run `op` up to `attempts` times (at least once), repeating only while it
/// fails with [`Error::ConcurrentAmendment`].
pub async fn retry_concurrent<T, F, Fut>(attempts: u32, mut op: F) -> Result<T>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let attempts = attempts.max(1);
  let mut attempt = 1;
  loop {
    match op(attempt).await {
      Err(Error::ConcurrentAmendment { .. }) if attempt < attempts => attempt += 1,
      result => return result,
    }
  }
}

/// [`LeaseStore::create_amendment`] with bounded retry on
/// concurrent-amendment conflicts.
pub async fn create_amendment_with_retry<S>(
  store: &S,
  lease_id: Uuid,
  candidate: NewLeaseVersion,
  attempts: u32,
) -> Result<LeaseVersion>
where
  S: LeaseStore,
{
  retry_concurrent(attempts, |_| {
    let candidate = candidate.clone();
    async move { store.create_amendment(lease_id, candidate).await.map_err(Into::into) }
  })
  .await
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;
  use crate::kinds::Entity;

  #[tokio::test]
  async fn retries_concurrent_conflicts_until_success() {
    let calls = AtomicU32::new(0);
    let result = retry_concurrent(3, |attempt| {
      calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if attempt < 3 {
          Err(Error::ConcurrentAmendment { lease_id: Uuid::nil() })
        } else {
          Ok(attempt)
        }
      }
    })
    .await;
    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_the_last_attempt() {
    let calls = AtomicU32::new(0);
    let result: Result<()> = retry_concurrent(2, |_| {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(Error::ConcurrentAmendment { lease_id: Uuid::nil() }) }
    })
    .await;
    assert!(matches!(result, Err(Error::ConcurrentAmendment { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn other_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let result: Result<()> = retry_concurrent(5, |_| {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(Error::not_found(Entity::Lease, Uuid::nil())) }
    })
    .await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
