//! [`SqliteStore`]: the SQLite implementation of [`LeaseStore`].

use std::{path::Path, time::Duration};

use chrono::NaiveDate;
use leasehold_core::{
  RecordKind,
  batch::{BatchReport, BatchRequest, DEFAULT_MAX_BATCH_SIZE},
  critical_date::{CriticalDate, NewCriticalDate},
  lease::{Lease, LeaseUpdate, LeaseVersion, NewLease, NewLeaseVersion, Page},
  record::{IntervalRecord, NewIntervalRecord},
  reference::{NewParty, NewProperty, Party, Property},
  store::{LeaseQuery, LeaseStore},
  view::LeaseView,
};
use uuid::Uuid;

use crate::{Error, Result, batch, records, registry, schema::SCHEMA, versions};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Tuning for a [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
  /// How long a writer waits for the database lock before giving up.
  pub busy_timeout:   Duration,
  /// Largest batch accepted by [`LeaseStore::apply_batch`].
  pub max_batch_size: usize,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      busy_timeout:   Duration::from_secs(5),
      max_batch_size: DEFAULT_MAX_BATCH_SIZE,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Leasehold store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Several
/// stores (or processes) may open the same file; writers serialise on the
/// database lock.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  config:          StoreConfig,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default settings.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreConfig::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, config };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, config: StoreConfig::default() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.config.busy_timeout;
    self
      .run(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── LeaseStore impl ─────────────────────────────────────────────────────────

impl LeaseStore for SqliteStore {
  type Error = Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_property(&self, input: NewProperty) -> Result<Property> {
    self.run(move |conn| registry::insert_property(conn, &input)).await
  }

  async fn update_property(&self, id: Uuid, input: NewProperty) -> Result<Property> {
    self.run(move |conn| registry::update_property(conn, id, &input)).await
  }

  async fn get_property(&self, id: Uuid) -> Result<Option<Property>> {
    self.run(move |conn| registry::get_property(conn, id)).await
  }

  async fn add_party(&self, input: NewParty) -> Result<Party> {
    self.run(move |conn| registry::insert_party(conn, &input)).await
  }

  async fn update_party(&self, id: Uuid, input: NewParty) -> Result<Party> {
    self.run(move |conn| registry::update_party(conn, id, &input)).await
  }

  async fn get_party(&self, id: Uuid) -> Result<Option<Party>> {
    self.run(move |conn| registry::get_party(conn, id)).await
  }

  // ── Leases ────────────────────────────────────────────────────────────────

  async fn create_lease(&self, input: NewLease) -> Result<(Lease, LeaseVersion)> {
    let (lease, version) = self.run(move |conn| registry::create_lease(conn, &input)).await?;
    tracing::info!(
      lease_id = %lease.lease_id,
      lease_number = %lease.lease_number,
      effective = %version.effective,
      "lease created"
    );
    Ok((lease, version))
  }

  async fn update_lease(&self, id: Uuid, update: LeaseUpdate) -> Result<Lease> {
    self.run(move |conn| registry::update_lease(conn, id, &update)).await
  }

  async fn get_lease(&self, id: Uuid) -> Result<Option<Lease>> {
    self.run(move |conn| registry::get_lease(conn, id)).await
  }

  async fn delete_lease(&self, id: Uuid) -> Result<()> {
    self.run(move |conn| registry::delete_lease(conn, id)).await?;
    tracing::info!(lease_id = %id, "lease deleted");
    Ok(())
  }

  async fn search_leases<'a>(&'a self, query: &'a LeaseQuery) -> Result<Vec<Lease>> {
    let query = query.clone();
    self.run(move |conn| registry::search_leases(conn, &query)).await
  }

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn create_amendment(
    &self,
    lease_id: Uuid,
    candidate: NewLeaseVersion,
  ) -> Result<LeaseVersion> {
    let result = self
      .run(move |conn| versions::create_amendment(conn, lease_id, &candidate))
      .await;
    match &result {
      Ok(version) => tracing::info!(
        %lease_id,
        version_num = version.version_num,
        effective = %version.effective,
        "amendment applied"
      ),
      Err(err) => tracing::debug!(%lease_id, error = %err, "amendment rejected"),
    }
    result
  }

  async fn get_current_version(&self, lease_id: Uuid) -> Result<Option<LeaseVersion>> {
    self.run(move |conn| versions::current_version(conn, lease_id)).await
  }

  async fn list_version_history(&self, lease_id: Uuid, page: Page) -> Result<Vec<LeaseVersion>> {
    self.run(move |conn| versions::history(conn, lease_id, page)).await
  }

  async fn get_version(&self, version_id: Uuid) -> Result<Option<LeaseVersion>> {
    self.run(move |conn| versions::get_version(conn, version_id)).await
  }

  // ── Interval records ──────────────────────────────────────────────────────

  async fn create_record(
    &self,
    version_id: Uuid,
    input: NewIntervalRecord,
  ) -> Result<IntervalRecord> {
    self.run(move |conn| records::create_record(conn, version_id, &input)).await
  }

  async fn update_record(
    &self,
    record_id: Uuid,
    input: NewIntervalRecord,
  ) -> Result<IntervalRecord> {
    self.run(move |conn| records::update_record(conn, record_id, &input)).await
  }

  async fn delete_record(&self, record_id: Uuid) -> Result<()> {
    self.run(move |conn| records::delete_record(conn, record_id)).await
  }

  async fn get_record(&self, record_id: Uuid) -> Result<Option<IntervalRecord>> {
    self.run(move |conn| records::get_record(conn, record_id)).await
  }

  async fn list_records(
    &self,
    version_id: Uuid,
    kind: Option<RecordKind>,
  ) -> Result<Vec<IntervalRecord>> {
    self.run(move |conn| records::list_records(conn, version_id, kind)).await
  }

  // ── Critical dates ────────────────────────────────────────────────────────

  async fn add_critical_date(
    &self,
    lease_id: Uuid,
    input: NewCriticalDate,
  ) -> Result<CriticalDate> {
    self.run(move |conn| registry::add_critical_date(conn, lease_id, &input)).await
  }

  async fn list_critical_dates(&self, lease_id: Uuid) -> Result<Vec<CriticalDate>> {
    self.run(move |conn| registry::list_critical_dates(conn, lease_id)).await
  }

  async fn delete_critical_date(&self, critical_date_id: Uuid) -> Result<()> {
    self.run(move |conn| registry::delete_critical_date(conn, critical_date_id)).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn materialize_lease(&self, lease_id: Uuid, as_of: NaiveDate) -> Result<Option<LeaseView>> {
    self
      .run(move |conn| {
        // One read transaction so the view is a consistent snapshot.
        let tx = conn.transaction()?;
        let Some(lease) = registry::get_lease(&tx, lease_id)? else {
          return Ok(None);
        };
        let current = versions::current_version(&tx, lease_id)?;
        let records = match &current {
          Some(version) => records::list_records(&tx, version.version_id, None)?,
          None => Vec::new(),
        };
        let critical_dates = registry::list_critical_dates(&tx, lease_id)?;
        tx.commit()?;
        Ok(Some(LeaseView::assemble(lease, current, records, critical_dates, as_of)))
      })
      .await
  }

  // ── Batches ───────────────────────────────────────────────────────────────

  async fn apply_batch(&self, request: BatchRequest) -> Result<BatchReport> {
    let max = self.config.max_batch_size;
    self.run(move |conn| batch::apply_batch(conn, &request, max)).await
  }
}
