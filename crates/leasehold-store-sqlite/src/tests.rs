//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use leasehold_core::{
  ConcessionBasis, ConcessionKind, CriticalDateKind, DateInterval, EntityKind, ErrorKind,
  OptionType, PartyType, RecordKind, RentBasis,
  batch::{BatchOperation, BatchRequest, LeaseInput, Outcome},
  critical_date::NewCriticalDate,
  error::{Error as CoreError, OverlapScope},
  lease::{LeaseUpdate, NewLease, NewLeaseVersion, Page},
  metrics::{ExpirationSource, RecordMetrics},
  record::{ConcessionTerms, NewIntervalRecord, OptionTerms, RecordPayload, RentTerms},
  reference::{NewParty, NewProperty},
  retry::create_amendment_with_retry,
  store::{LeaseQuery, LeaseStore},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  Error, SqliteStore, StoreConfig,
  encode::encode_uuid,
  error::{Violation, violation},
  records, versions,
};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn d(s: &str) -> NaiveDate { s.parse().unwrap() }

fn iv(s: &str) -> DateInterval { s.parse().unwrap() }

fn into_core(err: Error) -> CoreError { err.into() }

struct Fixture {
  property_id: Uuid,
  landlord_id: Uuid,
  tenant_id:   Uuid,
}

async fn fixture(s: &SqliteStore) -> Fixture {
  let property = s
    .add_property(NewProperty { name: "Harbour Tower".into(), address: Some("1 Quay St".into()) })
    .await
    .unwrap();
  let landlord = s
    .add_party(NewParty { name: "Harbour Holdings".into(), party_type: PartyType::Landlord })
    .await
    .unwrap();
  let tenant = s
    .add_party(NewParty { name: "Acme Ltd".into(), party_type: PartyType::Tenant })
    .await
    .unwrap();
  Fixture {
    property_id: property.property_id,
    landlord_id: landlord.party_id,
    tenant_id:   tenant.party_id,
  }
}

fn new_lease(f: &Fixture, number: &str, effective: &str) -> NewLease {
  NewLease {
    property_id:     f.property_id,
    landlord_id:     f.landlord_id,
    tenant_id:       f.tenant_id,
    lease_number:    number.into(),
    execution_date:  Some(d("2023-11-15")),
    initial_version: NewLeaseVersion::new(iv(effective)),
    created_by:      Some("alice".into()),
  }
}

fn rent(interval: &str, amount: i64, basis: RentBasis) -> NewIntervalRecord {
  NewIntervalRecord::new(
    iv(interval),
    RecordPayload::RentSchedule(RentTerms { amount: Decimal::from(amount), basis }),
  )
}

fn free_rent(interval: &str) -> NewIntervalRecord {
  NewIntervalRecord::new(
    iv(interval),
    RecordPayload::Concession(ConcessionTerms {
      kind:  ConcessionKind::FreeRent,
      value: Decimal::from(3),
      basis: ConcessionBasis::Month,
    }),
  )
}

fn renewal(interval: &str) -> NewIntervalRecord {
  NewIntervalRecord::new(
    iv(interval),
    RecordPayload::Option(OptionTerms {
      option_type: OptionType::Renewal,
      terms:       Some("one further term of five years".into()),
      exercised:   false,
    }),
  )
}

// ─── Reference data ──────────────────────────────────────────────────────────

#[tokio::test]
async fn add_update_and_get_reference_data() {
  let s = store().await;
  let f = fixture(&s).await;

  let property = s.get_property(f.property_id).await.unwrap().unwrap();
  assert_eq!(property.name, "Harbour Tower");

  let renamed = s
    .update_property(f.property_id, NewProperty { name: "Harbour Point".into(), address: None })
    .await
    .unwrap();
  assert_eq!(renamed.name, "Harbour Point");
  assert_eq!(renamed.address, None);

  let tenant = s.get_party(f.tenant_id).await.unwrap().unwrap();
  assert_eq!(tenant.party_type, PartyType::Tenant);

  assert!(s.get_party(Uuid::new_v4()).await.unwrap().is_none());
  let missing = s
    .update_party(Uuid::new_v4(), NewParty { name: "X".into(), party_type: PartyType::Other })
    .await
    .unwrap_err();
  assert_eq!(into_core(missing).kind(), ErrorKind::Reference);
}

#[tokio::test]
async fn blank_names_are_rejected() {
  let s = store().await;
  let err = s
    .add_property(NewProperty { name: "  ".into(), address: None })
    .await
    .unwrap_err();
  assert!(matches!(into_core(err), CoreError::Validation(_)));
}

// ─── Leases ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_lease_makes_version_zero_current() {
  let s = store().await;
  let f = fixture(&s).await;

  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();
  assert_eq!(v0.version_num, 0);
  assert!(v0.is_current);
  assert_eq!(v0.lease_id, lease.lease_id);
  assert_eq!(v0.created_by.as_deref(), Some("alice"));

  let fetched = s.get_lease(lease.lease_id).await.unwrap().unwrap();
  assert_eq!(fetched, lease);
  let current = s.get_current_version(lease.lease_id).await.unwrap().unwrap();
  assert_eq!(current, v0);
}

#[tokio::test]
async fn create_lease_with_unknown_party_is_a_reference_error() {
  let s = store().await;
  let f = fixture(&s).await;
  let mut input = new_lease(&f, "L-100", "[2024-01-01,2029-01-01)");
  input.tenant_id = Uuid::new_v4();

  let err = into_core(s.create_lease(input).await.unwrap_err());
  assert!(matches!(err, CoreError::NotFound { .. }));
  assert!(s.search_leases(&LeaseQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn lease_number_is_unique_per_property() {
  let s = store().await;
  let f = fixture(&s).await;
  s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let err = into_core(s.create_lease(new_lease(&f, "L-100", "[2030-01-01,2031-01-01)")).await.unwrap_err());
  assert!(matches!(err, CoreError::DuplicateLease { .. }));

  let other = s
    .add_property(NewProperty { name: "Annex".into(), address: None })
    .await
    .unwrap();
  let mut elsewhere = new_lease(&f, "L-100", "[2024-01-01,2029-01-01)");
  elsewhere.property_id = other.property_id;
  assert!(s.create_lease(elsewhere).await.is_ok());
}

#[tokio::test]
async fn update_lease_edits_master_fields_only() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let updated = s
    .update_lease(lease.lease_id, LeaseUpdate {
      lease_number: Some("L-100A".into()),
      execution_date: Some(d("2023-12-01")),
      ..LeaseUpdate::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.lease_number, "L-100A");
  assert_eq!(updated.execution_date, Some(d("2023-12-01")));
  assert_eq!(updated.tenant_id, lease.tenant_id);

  let history = s.list_version_history(lease.lease_id, Page::default()).await.unwrap();
  assert_eq!(history, vec![v0]);

  let err = s
    .update_lease(lease.lease_id, LeaseUpdate { tenant_id: Some(Uuid::new_v4()), ..Default::default() })
    .await
    .unwrap_err();
  assert_eq!(into_core(err).kind(), ErrorKind::Reference);
}

#[tokio::test]
async fn delete_lease_is_refused_while_versions_exist() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let err = into_core(s.delete_lease(lease.lease_id).await.unwrap_err());
  assert!(matches!(err, CoreError::LeaseHasVersions(id) if id == lease.lease_id));
  assert!(s.get_lease(lease.lease_id).await.unwrap().is_some());

  let err = into_core(s.delete_lease(Uuid::new_v4()).await.unwrap_err());
  assert_eq!(err.kind(), ErrorKind::Reference);
}

#[tokio::test]
async fn search_filters_and_pages() {
  let s = store().await;
  let f = fixture(&s).await;
  for n in 0..5 {
    s.create_lease(new_lease(&f, &format!("L-{n}"), "[2024-01-01,2029-01-01)")).await.unwrap();
  }

  let all = s
    .search_leases(&LeaseQuery { property_id: Some(f.property_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 5);

  let one = s
    .search_leases(&LeaseQuery { lease_number: Some("L-3".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(one.len(), 1);
  assert_eq!(one[0].lease_number, "L-3");

  let page = s
    .search_leases(&LeaseQuery {
      tenant_id: Some(f.tenant_id),
      page: Page { limit: Some(2), offset: Some(4) },
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);

  let none = s
    .search_leases(&LeaseQuery { landlord_id: Some(Uuid::new_v4()), ..Default::default() })
    .await
    .unwrap();
  assert!(none.is_empty());
}

// ─── Amendments ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn amendment_supersedes_current_version() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2026-01-01)")).await.unwrap();

  let v1 = s
    .create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2026-01-01,2031-01-01)")))
    .await
    .unwrap();
  assert_eq!(v1.version_num, 1);
  assert!(v1.is_current);

  let history = s.list_version_history(lease.lease_id, Page::default()).await.unwrap();
  assert_eq!(history.len(), 2);
  assert!(!history[0].is_current);
  assert_eq!(history[0].version_id, v0.version_id);
  assert_eq!(history[0].effective, v0.effective);
  assert_eq!(history[1], v1);
}

#[tokio::test]
async fn overlapping_amendment_is_rejected_without_mutation() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let err = into_core(
    s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2025-06-01,2030-01-01)")))
      .await
      .unwrap_err(),
  );
  match err {
    CoreError::Overlap { scope, conflicting_id, conflicting_interval, candidate } => {
      assert_eq!(scope, OverlapScope::LeaseVersions { lease_id: lease.lease_id });
      assert_eq!(conflicting_id, v0.version_id);
      assert_eq!(conflicting_interval, iv("[2024-01-01,2029-01-01)"));
      assert_eq!(candidate, iv("[2025-06-01,2030-01-01)"));
    }
    other => panic!("expected overlap, got {other:?}"),
  }

  let history = s.list_version_history(lease.lease_id, Page::default()).await.unwrap();
  assert_eq!(history, vec![v0]);
}

#[tokio::test]
async fn touching_intervals_do_not_conflict() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let v1 = s
    .create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2029-01-01,2034-01-01)")))
    .await
    .unwrap();
  assert_eq!(v1.version_num, 1);

  // Closed upper bound normalises to the next day, which now overlaps.
  let err = into_core(
    s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2023-01-01,2024-01-01]")))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::Overlap { .. }));
}

#[tokio::test]
async fn open_ended_version_blocks_later_amendments() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,)")).await.unwrap();

  let err = into_core(
    s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2040-01-01,2041-01-01)")))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::Overlap { conflicting_id, .. } if conflicting_id == v0.version_id));

  let earlier = s
    .create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2020-01-01,2024-01-01)")))
    .await
    .unwrap();
  assert!(earlier.is_current);
  assert_eq!(earlier.version_num, 1);
}

#[tokio::test]
async fn amendment_of_unknown_lease_is_a_reference_error() {
  let s = store().await;
  let err = into_core(
    s.create_amendment(Uuid::new_v4(), NewLeaseVersion::new(iv("[2024-01-01,2025-01-01)")))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn invalid_candidate_is_rejected_before_storage() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let mut candidate = NewLeaseVersion::new(iv("[2030-01-01,2031-01-01)"));
  candidate.currency = "usd".into();
  let err = into_core(s.create_amendment(lease.lease_id, candidate).await.unwrap_err());
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn history_pages_in_version_order() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2020-01-01,2021-01-01)")).await.unwrap();
  for year in 2021..2025 {
    let interval = format!("[{year}-01-01,{}-01-01)", year + 1);
    s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv(&interval))).await.unwrap();
  }

  let page = s
    .list_version_history(lease.lease_id, Page { limit: Some(2), offset: Some(1) })
    .await
    .unwrap();
  let nums: Vec<u32> = page.iter().map(|v| v.version_num).collect();
  assert_eq!(nums, vec![1, 2]);
}

#[tokio::test]
async fn retry_helper_passes_through_success() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2026-01-01)")).await.unwrap();

  let v1 = create_amendment_with_retry(
    &s,
    lease.lease_id,
    NewLeaseVersion::new(iv("[2026-01-01,2028-01-01)")),
    3,
  )
  .await
  .unwrap();
  assert_eq!(v1.version_num, 1);

  let err = create_amendment_with_retry(
    &s,
    lease.lease_id,
    NewLeaseVersion::new(iv("[2027-01-01,2028-01-01)")),
    3,
  )
  .await
  .unwrap_err();
  assert!(matches!(err, CoreError::Overlap { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_keep_a_single_current_version() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("leases.db");
  let config = StoreConfig { busy_timeout: std::time::Duration::from_secs(30), ..Default::default() };
  let a = SqliteStore::open_with(&path, config.clone()).await.unwrap();
  let b = SqliteStore::open_with(&path, config).await.unwrap();

  let f = fixture(&a).await;
  let (lease, _) = a.create_lease(new_lease(&f, "L-100", "[2000-01-01,2001-01-01)")).await.unwrap();

  let mut tasks = Vec::new();
  for year in 2001..2021 {
    let store = if year % 2 == 0 { a.clone() } else { b.clone() };
    let lease_id = lease.lease_id;
    tasks.push(tokio::spawn(async move {
      let interval = format!("[{year}-01-01,{}-01-01)", year + 1);
      create_amendment_with_retry(&store, lease_id, NewLeaseVersion::new(iv(&interval)), 5).await
    }));
  }
  for task in tasks {
    task.await.unwrap().unwrap();
  }

  let history = a.list_version_history(lease.lease_id, Page::default()).await.unwrap();
  assert_eq!(history.len(), 21);
  assert_eq!(history.iter().filter(|v| v.is_current).count(), 1);
  let nums: Vec<u32> = history.iter().map(|v| v.version_num).collect();
  assert_eq!(nums, (0..21).collect::<Vec<u32>>());
}

// ─── Interval records ────────────────────────────────────────────────────────

#[tokio::test]
async fn records_overlap_only_within_a_kind() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let first = s
    .create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 6000, RentBasis::Month))
    .await
    .unwrap();
  s.create_record(v0.version_id, rent("[2025-01-01,2026-01-01)", 6200, RentBasis::Month))
    .await
    .unwrap();
  // A concession over the same dates lives in a different partition.
  s.create_record(v0.version_id, free_rent("[2024-01-01,2024-04-01)")).await.unwrap();

  let err = into_core(
    s.create_record(v0.version_id, rent("[2024-06-01,2024-09-01)", 7000, RentBasis::Month))
      .await
      .unwrap_err(),
  );
  match err {
    CoreError::Overlap { scope, conflicting_id, .. } => {
      assert_eq!(scope, OverlapScope::Records {
        version_id: v0.version_id,
        kind:       RecordKind::RentSchedule,
      });
      assert_eq!(conflicting_id, first.record_id);
    }
    other => panic!("expected overlap, got {other:?}"),
  }

  let rents = s.list_records(v0.version_id, Some(RecordKind::RentSchedule)).await.unwrap();
  assert_eq!(rents.len(), 2);
  assert!(rents[0].interval.start() < rents[1].interval.start());
  assert_eq!(s.list_records(v0.version_id, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn records_on_different_versions_do_not_conflict() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2026-01-01)")).await.unwrap();
  let v1 = s
    .create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2026-01-01,2031-01-01)")))
    .await
    .unwrap();

  s.create_record(v0.version_id, renewal("[2025-01-01,2025-07-01)")).await.unwrap();
  s.create_record(v1.version_id, renewal("[2025-01-01,2025-07-01)")).await.unwrap();
}

#[tokio::test]
async fn update_record_excludes_itself_and_keeps_kind() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let a = s
    .create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 6000, RentBasis::Month))
    .await
    .unwrap();
  s.create_record(v0.version_id, rent("[2026-01-01,2027-01-01)", 6400, RentBasis::Month))
    .await
    .unwrap();

  // Growing into its own former range is fine.
  let grown = s
    .update_record(a.record_id, rent("[2024-01-01,2026-01-01)", 6100, RentBasis::Month))
    .await
    .unwrap();
  assert_eq!(grown.interval, iv("[2024-01-01,2026-01-01)"));
  assert_eq!(grown.created_at, a.created_at);

  // Reaching into the neighbour is not.
  let err = into_core(
    s.update_record(a.record_id, rent("[2024-01-01,2026-06-01)", 6100, RentBasis::Month))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::Overlap { .. }));
  let unchanged = s.get_record(a.record_id).await.unwrap().unwrap();
  assert_eq!(unchanged.interval, iv("[2024-01-01,2026-01-01)"));

  let err = into_core(s.update_record(a.record_id, free_rent("[2024-01-01,2024-02-01)")).await.unwrap_err());
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn delete_record_and_missing_version() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let r = s.create_record(v0.version_id, renewal("[2028-01-01,2028-07-01)")).await.unwrap();
  s.delete_record(r.record_id).await.unwrap();
  assert!(s.get_record(r.record_id).await.unwrap().is_none());
  assert_eq!(into_core(s.delete_record(r.record_id).await.unwrap_err()).kind(), ErrorKind::Reference);

  let err = into_core(s.create_record(Uuid::new_v4(), renewal("[2028-01-01,2028-07-01)")).await.unwrap_err());
  assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn non_positive_rent_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();
  let err = into_core(
    s.create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 0, RentBasis::Month))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn versions_cannot_be_edited_at_the_storage_level() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2026-01-01)")).await.unwrap();
  s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[2026-01-01,2031-01-01)")))
    .await
    .unwrap();

  let version_id = encode_uuid(v0.version_id);
  let result: Result<usize, tokio_rusqlite::Error> = s
    .conn
    .call(move |conn| {
      Ok(conn.execute(
        "UPDATE lease_versions SET effective_end = '2030-01-01' WHERE version_id = ?1",
        [version_id],
      )?)
    })
    .await;
  let err = into_core(Error::from(result.unwrap_err()));
  assert!(matches!(err, CoreError::VersionImmutable));
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let stored = s.get_version(v0.version_id).await.unwrap().unwrap();
  assert_eq!(stored.effective, v0.effective);
}

// ─── Storage triggers ────────────────────────────────────────────────────────

fn is_overlap(result: Result<usize, tokio_rusqlite::Error>) -> bool {
  match result {
    Err(tokio_rusqlite::Error::Rusqlite(e)) => violation(&e) == Some(Violation::Overlap),
    _ => false,
  }
}

async fn raw_record(
  s: &SqliteStore,
  version_id: Uuid,
  kind: RecordKind,
  start: &'static str,
  end: Option<&'static str>,
) -> Result<usize, tokio_rusqlite::Error> {
  let (record_id, version_id) = (encode_uuid(Uuid::new_v4()), encode_uuid(version_id));
  let kind = kind.as_str();
  s.conn
    .call(move |conn| {
      Ok(conn.execute(
        "INSERT INTO interval_records (
           record_id, version_id, kind, interval_start, interval_end, terms_json, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, '{}', '2024-01-01T00:00:00Z')",
        rusqlite::params![record_id, version_id, kind, start, end],
      )?)
    })
    .await
}

#[tokio::test]
async fn record_insert_trigger_rejects_overlap_in_partition() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();
  s.create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 6000, RentBasis::Month))
    .await
    .unwrap();

  let id = v0.version_id;
  assert!(is_overlap(raw_record(&s, id, RecordKind::RentSchedule, "2024-06-01", Some("2024-09-01")).await));
  assert!(is_overlap(raw_record(&s, id, RecordKind::RentSchedule, "2023-01-01", None).await));
  // Touching rows and other kinds are admitted.
  assert_eq!(raw_record(&s, id, RecordKind::RentSchedule, "2025-01-01", Some("2026-01-01")).await.unwrap(), 1);
  assert_eq!(raw_record(&s, id, RecordKind::Concession, "2024-06-01", None).await.unwrap(), 1);
  // An open end reaches past every dated row.
  assert!(is_overlap(raw_record(&s, id, RecordKind::Concession, "9999-01-01", Some("9999-12-31")).await));
}

#[tokio::test]
async fn record_update_trigger_rejects_overlap_but_ignores_the_row_itself() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();
  let a = s
    .create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 6000, RentBasis::Month))
    .await
    .unwrap();
  let b = s
    .create_record(v0.version_id, rent("[2025-01-01,2026-01-01)", 6200, RentBasis::Month))
    .await
    .unwrap();

  let (a_id, b_id) = (encode_uuid(a.record_id), encode_uuid(b.record_id));
  let result = s
    .conn
    .call(move |conn| {
      Ok(conn.execute(
        "UPDATE interval_records SET interval_start = '2024-06-01' WHERE record_id = ?1",
        [b_id],
      )?)
    })
    .await;
  assert!(is_overlap(result));

  let shrunk = s
    .conn
    .call(move |conn| {
      Ok(conn.execute(
        "UPDATE interval_records SET interval_start = '2024-02-01' WHERE record_id = ?1",
        [a_id],
      )?)
    })
    .await
    .unwrap();
  assert_eq!(shrunk, 1);
  assert_eq!(s.get_record(b.record_id).await.unwrap().unwrap().interval, b.interval);
}

/// Insert an open-ended, non-current version row directly.
async fn raw_version(
  s: &SqliteStore,
  lease_id: Uuid,
  start: &'static str,
) -> Result<usize, tokio_rusqlite::Error> {
  let (version_id, lease_id) = (encode_uuid(Uuid::new_v4()), encode_uuid(lease_id));
  s.conn
    .call(move |conn| {
      Ok(conn.execute(
        "INSERT INTO lease_versions (
           version_id, lease_id, version_num, is_current, effective_start, effective_end,
           escalation, currency, created_at
         ) VALUES (?1, ?2, 7, 0, ?3, NULL, 'NONE', 'USD', '2024-01-01T00:00:00Z')",
        rusqlite::params![version_id, lease_id, start],
      )?)
    })
    .await
}

#[tokio::test]
async fn version_insert_trigger_rejects_overlap_within_lease() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();
  let (other, _) = s.create_lease(new_lease(&f, "L-200", "[2024-01-01,2029-01-01)")).await.unwrap();

  assert!(is_overlap(raw_version(&s, lease.lease_id, "2028-06-01").await));
  assert_eq!(raw_version(&s, lease.lease_id, "2029-01-01").await.unwrap(), 1);
  // Each lease is its own partition.
  assert_eq!(raw_version(&s, other.lease_id, "2029-06-01").await.unwrap(), 1);
  assert!(is_overlap(raw_version(&s, other.lease_id, "2020-01-01").await));
}

#[tokio::test]
async fn version_insert_without_precheck_reports_conflicting_version() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let lease_id = lease.lease_id;
  let candidate = NewLeaseVersion::new(iv("[2028-01-01,2033-01-01)"));
  let result = s
    .conn
    .call(move |conn| {
      conn.execute(
        "UPDATE lease_versions SET is_current = 0 WHERE lease_id = ?1",
        [encode_uuid(lease_id)],
      )?;
      Ok(versions::insert_version(conn, lease_id, 1, &candidate))
    })
    .await
    .unwrap();

  match into_core(result.unwrap_err()) {
    CoreError::Overlap { scope, candidate, conflicting_id, conflicting_interval } => {
      assert_eq!(scope, OverlapScope::LeaseVersions { lease_id });
      assert_eq!(candidate, iv("[2028-01-01,2033-01-01)"));
      assert_eq!(conflicting_id, v0.version_id);
      assert_eq!(conflicting_interval, v0.effective);
    }
    other => panic!("expected overlap, got {other:?}"),
  }
}

#[tokio::test]
async fn record_insert_without_precheck_reports_conflicting_record() {
  let s = store().await;
  let f = fixture(&s).await;
  let (_, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();
  let first = s
    .create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 6000, RentBasis::Month))
    .await
    .unwrap();

  let version_id = v0.version_id;
  let candidate = rent("[2024-06-01,2025-06-01)", 6500, RentBasis::Month);
  let (overlapping, orphan) = s
    .conn
    .call(move |conn| {
      let overlapping = records::insert_record(conn, version_id, &candidate);
      let orphan = records::insert_record(conn, Uuid::new_v4(), &candidate);
      Ok((overlapping, orphan))
    })
    .await
    .unwrap();

  match into_core(overlapping.unwrap_err()) {
    CoreError::Overlap { scope, conflicting_id, conflicting_interval, .. } => {
      assert_eq!(scope, OverlapScope::Records { version_id, kind: RecordKind::RentSchedule });
      assert_eq!(conflicting_id, first.record_id);
      assert_eq!(conflicting_interval, first.interval);
    }
    other => panic!("expected overlap, got {other:?}"),
  }
  let orphan = into_core(orphan.unwrap_err());
  assert_eq!(orphan.kind(), ErrorKind::Reference);
  assert_eq!(s.list_records(version_id, None).await.unwrap().len(), 1);
}

// ─── Date range ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn last_storable_day_is_a_valid_bound() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,9999-12-31)")).await.unwrap();
  let stored = s.get_version(v0.version_id).await.unwrap().unwrap();
  assert_eq!(stored.effective.end(), Some(d("9999-12-31")));

  // The stored far bound still compares in date order.
  let err = into_core(
    s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[9000-01-01,9999-12-31)")))
      .await
      .unwrap_err(),
  );
  assert!(matches!(err, CoreError::Overlap { .. }));
  s.create_amendment(lease.lease_id, NewLeaseVersion::new(iv("[9999-12-31,)")))
    .await
    .unwrap();

  // A closed bound on the last day normalises past it and never reaches storage.
  let closed: Result<DateInterval, _> = "[2024-01-01,9999-12-31]".parse();
  assert!(matches!(closed, Err(leasehold_core::ValidationError::DateOutOfRange(_))));
}

#[tokio::test]
async fn critical_dates_outside_storable_years_are_rejected() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let far = NewCriticalDate {
    kind:        CriticalDateKind::Expiration,
    date:        NaiveDate::from_ymd_opt(10000, 1, 1).unwrap(),
    description: None,
  };
  let err = into_core(s.add_critical_date(lease.lease_id, far).await.unwrap_err());
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(s.list_critical_dates(lease.lease_id).await.unwrap().is_empty());
}

// ─── Critical dates and the materialised view ────────────────────────────────

#[tokio::test]
async fn materialized_view_carries_metrics() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, v0) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  s.create_record(v0.version_id, rent("[2024-01-01,2025-01-01)", 6000, RentBasis::Month))
    .await
    .unwrap();
  s.create_record(v0.version_id, free_rent("[2024-01-01,2024-04-01)")).await.unwrap();
  s.create_record(v0.version_id, renewal("[2028-01-01,2028-07-01)")).await.unwrap();

  let view = s.materialize_lease(lease.lease_id, d("2024-02-15")).await.unwrap().unwrap();
  let current = view.current_version.as_ref().unwrap();
  assert_eq!(current.version.version_id, v0.version_id);
  assert!(current.metrics.in_effect);
  assert_eq!(current.records.len(), 3);

  let metrics: Vec<&RecordMetrics> = current.records.iter().map(|r| &r.metrics).collect();
  assert!(metrics.contains(&&RecordMetrics::RentSchedule {
    monthly_equivalent: Decimal::from(6000),
    annual_equivalent:  Decimal::from(72000),
  }));
  assert!(metrics.contains(&&RecordMetrics::Concession { months_remaining: Some(1.5) }));
  assert!(metrics.contains(&&RecordMetrics::Option { notice_window_open: false }));

  let expiration = view.expiration.unwrap();
  assert_eq!(expiration.date, d("2029-01-01"));
  assert_eq!(expiration.source, ExpirationSource::CurrentVersion { version_id: v0.version_id });

  // Reading twice changes nothing.
  let again = s.materialize_lease(lease.lease_id, d("2024-02-15")).await.unwrap().unwrap();
  assert_eq!(again, view);
  assert!(s.materialize_lease(Uuid::new_v4(), d("2024-02-15")).await.unwrap().is_none());
}

#[tokio::test]
async fn expiration_critical_date_overrides_version_end() {
  let s = store().await;
  let f = fixture(&s).await;
  let (lease, _) = s.create_lease(new_lease(&f, "L-100", "[2024-01-01,2029-01-01)")).await.unwrap();

  let early = s
    .add_critical_date(lease.lease_id, NewCriticalDate {
      kind:        CriticalDateKind::Expiration,
      date:        d("2028-06-30"),
      description: None,
    })
    .await
    .unwrap();
  let late = s
    .add_critical_date(lease.lease_id, NewCriticalDate {
      kind:        CriticalDateKind::Expiration,
      date:        d("2028-12-31"),
      description: Some("per side letter".into()),
    })
    .await
    .unwrap();

  let dates = s.list_critical_dates(lease.lease_id).await.unwrap();
  assert_eq!(dates.len(), 2);
  assert_eq!(dates[0].critical_date_id, early.critical_date_id);

  let view = s.materialize_lease(lease.lease_id, d("2028-12-01")).await.unwrap().unwrap();
  let expiration = view.expiration.unwrap();
  assert_eq!(expiration.date, d("2028-12-31"));
  assert_eq!(expiration.source, ExpirationSource::CriticalDate {
    critical_date_id: late.critical_date_id,
  });
  assert_eq!(view.months_to_expiration, Some(1.0));

  s.delete_critical_date(late.critical_date_id).await.unwrap();
  let view = s.materialize_lease(lease.lease_id, d("2028-12-01")).await.unwrap().unwrap();
  assert_eq!(view.expiration.unwrap().date, d("2028-06-30"));

  let err = into_core(
    s.add_critical_date(Uuid::new_v4(), NewCriticalDate {
      kind:        CriticalDateKind::Notice,
      date:        d("2028-01-01"),
      description: None,
    })
    .await
    .unwrap_err(),
  );
  assert_eq!(err.kind(), ErrorKind::Reference);
}

// ─── Batches ─────────────────────────────────────────────────────────────────

fn lease_op(f: &Fixture, number: &str, tenant_id: Uuid) -> BatchOperation<LeaseInput> {
  BatchOperation::create(LeaseInput {
    property_id:     f.property_id,
    landlord_id:     f.landlord_id,
    tenant_id,
    lease_number:    number.into(),
    execution_date:  None,
    initial_version: Some(NewLeaseVersion::new(iv("[2024-01-01,2029-01-01)"))),
    created_by:      None,
  })
}

#[tokio::test]
async fn batch_with_a_bad_reference_persists_nothing() {
  let s = store().await;
  let f = fixture(&s).await;

  let request = BatchRequest::Leases(vec![
    lease_op(&f, "B-1", f.tenant_id),
    lease_op(&f, "B-2", Uuid::new_v4()),
    lease_op(&f, "B-3", f.tenant_id),
  ]);
  let err = into_core(s.apply_batch(request).await.unwrap_err());
  let CoreError::BatchAborted(report) = err else { panic!("expected batch abort") };
  assert_eq!(report.entity, EntityKind::Leases);
  assert_eq!(report.successful, 0);
  assert_eq!(report.failed, 3);
  assert_eq!(report.results[0].outcome, Outcome::RolledBack);
  assert!(matches!(
    report.results[1].outcome,
    Outcome::Failed { error: ErrorKind::Reference, .. }
  ));
  assert_eq!(report.results[2].outcome, Outcome::NotAttempted);

  assert!(s.search_leases(&LeaseQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_commits_creates_and_updates_together() {
  let s = store().await;
  let f = fixture(&s).await;

  let report = s
    .apply_batch(BatchRequest::Properties(vec![
      BatchOperation::create(NewProperty { name: "North Wing".into(), address: None }),
      BatchOperation::update(f.property_id, NewProperty {
        name:    "Harbour Tower East".into(),
        address: Some("3 Quay St".into()),
      }),
    ]))
    .await
    .unwrap();
  assert_eq!(report.total, 2);
  assert_eq!(report.successful, 2);
  assert_eq!(report.failed, 0);
  assert!(matches!(report.results[0].outcome, Outcome::Created { .. }));
  assert_eq!(report.results[1].outcome, Outcome::Updated { id: f.property_id });

  let property = s.get_property(f.property_id).await.unwrap().unwrap();
  assert_eq!(property.name, "Harbour Tower East");
}

#[tokio::test]
async fn batch_duplicate_within_the_unit_rolls_back() {
  let s = store().await;
  let f = fixture(&s).await;
  let request = BatchRequest::Leases(vec![
    lease_op(&f, "B-1", f.tenant_id),
    lease_op(&f, "B-1", f.tenant_id),
  ]);
  let err = into_core(s.apply_batch(request).await.unwrap_err());
  let CoreError::BatchAborted(report) = err else { panic!("expected batch abort") };
  assert!(matches!(
    report.results[1].outcome,
    Outcome::Failed { error: ErrorKind::Conflict, .. }
  ));
  assert!(s.search_leases(&LeaseQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_size_is_capped_before_any_work() {
  let dir = tempfile::tempdir().unwrap();
  let config = StoreConfig { max_batch_size: 2, ..Default::default() };
  let s = SqliteStore::open_with(dir.path().join("cap.db"), config).await.unwrap();

  let ops = vec![BatchOperation::create(NewParty { name: "P".into(), party_type: PartyType::Broker }); 3];
  let err = into_core(s.apply_batch(BatchRequest::Parties(ops)).await.unwrap_err());
  assert!(matches!(err, CoreError::Validation(_)));

  let err = into_core(s.apply_batch(BatchRequest::Parties(vec![])).await.unwrap_err());
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn batch_field_validation_reports_the_offending_index() {
  let s = store().await;
  let request = BatchRequest::Parties(vec![
    BatchOperation::create(NewParty { name: "Good".into(), party_type: PartyType::Tenant }),
    BatchOperation::create(NewParty { name: "".into(), party_type: PartyType::Tenant }),
  ]);
  let err = into_core(s.apply_batch(request).await.unwrap_err());
  let CoreError::BatchAborted(report) = err else { panic!("expected batch abort") };
  assert_eq!(report.failure().map(|r| r.index), Some(1));
  assert!(matches!(
    report.results[1].outcome,
    Outcome::Failed { error: ErrorKind::Validation, .. }
  ));
}

// ─── Query builder against the live schema ───────────────────────────────────

#[tokio::test]
async fn enumerated_fields_exist_in_the_schema() {
  use crate::query::{Field, LeaseField, RecordField};

  let s = store().await;
  let columns = |table: &'static str| {
    let conn = s.conn.clone();
    async move {
      conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
          let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(names)
        })
        .await
        .unwrap()
    }
  };

  let lease_columns = columns(LeaseField::TABLE).await;
  for field in LeaseField::ALL {
    assert!(lease_columns.iter().any(|c| c == field.column()), "{field:?}");
  }
  let record_columns = columns(RecordField::TABLE).await;
  for field in RecordField::ALL {
    assert!(record_columns.iter().any(|c| c == field.column()), "{field:?}");
  }
}

// ─── Properties ──────────────────────────────────────────────────────────────

mod properties {
  use proptest::prelude::*;
  use rusqlite::Connection;

  use super::*;
  use crate::{records, registry, schema::SCHEMA, versions};

  fn conn_with_lease(effective: DateInterval) -> (Connection, Uuid, Uuid) {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    let property = registry::insert_property(&conn, &NewProperty {
      name:    "P".into(),
      address: None,
    })
    .unwrap();
    let landlord = registry::insert_party(&conn, &NewParty {
      name:       "LL".into(),
      party_type: PartyType::Landlord,
    })
    .unwrap();
    let tenant = registry::insert_party(&conn, &NewParty {
      name:       "T".into(),
      party_type: PartyType::Tenant,
    })
    .unwrap();
    let (lease, v0) = registry::create_lease(&mut conn, &NewLease {
      property_id:     property.property_id,
      landlord_id:     landlord.party_id,
      tenant_id:       tenant.party_id,
      lease_number:    "L".into(),
      execution_date:  None,
      initial_version: NewLeaseVersion::new(effective),
      created_by:      None,
    })
    .unwrap();
    (conn, lease.lease_id, v0.version_id)
  }

  fn interval() -> impl Strategy<Value = DateInterval> {
    let base = d("2020-01-01");
    (0i64..400, prop::option::weighted(0.9, 1i64..60)).prop_map(move |(offset, len)| {
      let start = base + chrono::Duration::days(offset);
      match len {
        Some(len) => DateInterval::new(start, start + chrono::Duration::days(len)).unwrap(),
        None => DateInterval::starting(start),
      }
    })
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn stored_records_never_overlap(candidates in prop::collection::vec(interval(), 1..25)) {
      let (mut conn, _, version_id) = conn_with_lease(iv("[2020-01-01,2030-01-01)"));
      let mut admitted: Vec<DateInterval> = Vec::new();

      for candidate in candidates {
        let expected_ok = admitted.iter().all(|a| !a.overlaps(&candidate));
        let result = records::create_record(&mut conn, version_id, &NewIntervalRecord::new(
          candidate,
          RecordPayload::RentSchedule(RentTerms { amount: Decimal::ONE, basis: RentBasis::Month }),
        ));
        prop_assert_eq!(result.is_ok(), expected_ok);
        if expected_ok {
          admitted.push(candidate);
        }
      }

      let stored = records::list_records(&conn, version_id, Some(RecordKind::RentSchedule)).unwrap();
      prop_assert_eq!(stored.len(), admitted.len());
      for (i, a) in stored.iter().enumerate() {
        for b in &stored[i + 1..] {
          prop_assert!(!a.interval.overlaps(&b.interval));
        }
      }
    }

    #[test]
    fn amendments_keep_one_current_and_increasing_numbers(
      candidates in prop::collection::vec(interval(), 1..20),
    ) {
      let (mut conn, lease_id, _) = conn_with_lease(iv("[2019-01-01,2020-01-01)"));
      let mut accepted = 1u32;

      for candidate in candidates {
        if versions::create_amendment(&mut conn, lease_id, &NewLeaseVersion::new(candidate)).is_ok() {
          accepted += 1;
        }
        let history = versions::history(&conn, lease_id, Page::default()).unwrap();
        prop_assert_eq!(history.iter().filter(|v| v.is_current).count(), 1);
        let nums: Vec<u32> = history.iter().map(|v| v.version_num).collect();
        prop_assert_eq!(nums, (0..accepted).collect::<Vec<u32>>());
        prop_assert!(history.last().is_some_and(|v| v.is_current));
      }
    }
  }
}
