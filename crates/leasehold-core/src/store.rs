//! The `LeaseStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `leasehold-store-sqlite`). Higher layers (`leasehold-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  batch::{BatchReport, BatchRequest},
  critical_date::{CriticalDate, NewCriticalDate},
  kinds::RecordKind,
  lease::{Lease, LeaseUpdate, LeaseVersion, NewLease, NewLeaseVersion, Page},
  record::{IntervalRecord, NewIntervalRecord},
  reference::{NewParty, NewProperty, Party, Property},
  view::LeaseView,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`LeaseStore::search_leases`]. Every filter is optional and
/// combined with AND.
#[derive(Debug, Clone, Default)]
pub struct LeaseQuery {
  pub property_id:  Option<Uuid>,
  pub landlord_id:  Option<Uuid>,
  pub tenant_id:    Option<Uuid>,
  pub lease_number: Option<String>,
  pub page:         Page,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Leasehold storage backend.
///
/// Version history is append-only: an amendment adds a version and demotes
/// the previous current one in a single atomic unit. Interval records are
/// mutable, but no two records of the same kind on the same version may ever
/// overlap, and the backend must guarantee that under concurrent writers.
///
/// Backends convert their errors into [`crate::Error`] so callers can
/// classify failures (conflict, reference, retryable) uniformly.
pub trait LeaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_property(
    &self,
    input: NewProperty,
  ) -> impl Future<Output = Result<Property, Self::Error>> + Send + '_;

  fn update_property(
    &self,
    id: Uuid,
    input: NewProperty,
  ) -> impl Future<Output = Result<Property, Self::Error>> + Send + '_;

  fn get_property(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Property>, Self::Error>> + Send + '_;

  fn add_party(
    &self,
    input: NewParty,
  ) -> impl Future<Output = Result<Party, Self::Error>> + Send + '_;

  fn update_party(
    &self,
    id: Uuid,
    input: NewParty,
  ) -> impl Future<Output = Result<Party, Self::Error>> + Send + '_;

  fn get_party(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Party>, Self::Error>> + Send + '_;

  // ── Leases ────────────────────────────────────────────────────────────

  /// Create a lease together with its version 0, which becomes current.
  fn create_lease(
    &self,
    input: NewLease,
  ) -> impl Future<Output = Result<(Lease, LeaseVersion), Self::Error>> + Send + '_;

  /// Edit master fields. Never touches version state.
  fn update_lease(
    &self,
    id: Uuid,
    update: LeaseUpdate,
  ) -> impl Future<Output = Result<Lease, Self::Error>> + Send + '_;

  fn get_lease(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Lease>, Self::Error>> + Send + '_;

  /// Delete a lease. Refused while any version exists.
  fn delete_lease(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn search_leases<'a>(
    &'a self,
    query: &'a LeaseQuery,
  ) -> impl Future<Output = Result<Vec<Lease>, Self::Error>> + Send + 'a;

  // ── Versions ──────────────────────────────────────────────────────────

  /// Append version N+1 and make it current.
  ///
  /// Fails without mutating anything if the candidate's effective interval
  /// overlaps any existing version of the lease.
  fn create_amendment(
    &self,
    lease_id: Uuid,
    candidate: NewLeaseVersion,
  ) -> impl Future<Output = Result<LeaseVersion, Self::Error>> + Send + '_;

  fn get_current_version(
    &self,
    lease_id: Uuid,
  ) -> impl Future<Output = Result<Option<LeaseVersion>, Self::Error>> + Send + '_;

  /// Versions ordered by `version_num` ascending.
  fn list_version_history(
    &self,
    lease_id: Uuid,
    page: Page,
  ) -> impl Future<Output = Result<Vec<LeaseVersion>, Self::Error>> + Send + '_;

  fn get_version(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<LeaseVersion>, Self::Error>> + Send + '_;

  // ── Interval records ──────────────────────────────────────────────────

  fn create_record(
    &self,
    version_id: Uuid,
    input: NewIntervalRecord,
  ) -> impl Future<Output = Result<IntervalRecord, Self::Error>> + Send + '_;

  /// Replace a record's interval and payload. The kind may not change.
  fn update_record(
    &self,
    record_id: Uuid,
    input: NewIntervalRecord,
  ) -> impl Future<Output = Result<IntervalRecord, Self::Error>> + Send + '_;

  fn delete_record(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_record(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Option<IntervalRecord>, Self::Error>> + Send + '_;

  /// Records of one version ordered by interval start, optionally of one kind.
  fn list_records(
    &self,
    version_id: Uuid,
    kind: Option<RecordKind>,
  ) -> impl Future<Output = Result<Vec<IntervalRecord>, Self::Error>> + Send + '_;

  // ── Critical dates ────────────────────────────────────────────────────

  fn add_critical_date(
    &self,
    lease_id: Uuid,
    input: NewCriticalDate,
  ) -> impl Future<Output = Result<CriticalDate, Self::Error>> + Send + '_;

  fn list_critical_dates(
    &self,
    lease_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CriticalDate>, Self::Error>> + Send + '_;

  fn delete_critical_date(
    &self,
    critical_date_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Materialise a [`LeaseView`] as of `as_of`. Returns `None` if the lease
  /// does not exist.
  fn materialize_lease(
    &self,
    lease_id: Uuid,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<Option<LeaseView>, Self::Error>> + Send + '_;

  // ── Batches ───────────────────────────────────────────────────────────

  /// Apply every operation or none. A failing operation aborts the unit with
  /// [`crate::Error::BatchAborted`] carrying the full report.
  fn apply_batch(
    &self,
    request: BatchRequest,
  ) -> impl Future<Output = Result<BatchReport, Self::Error>> + Send + '_;
}
