//! SQL schema for the Leasehold SQLite store.
//!
//! Executed at connection startup. `PRAGMA user_version` records the schema
//! revision so later migrations can be gated on it.
//!
//! The interval invariants are enforced here as well as in the store code:
//! the `*_no_overlap` triggers reject any insert or update that would make
//! two intervals in one partition share a day, whichever writer issues it.
//! Open upper bounds are stored as NULL and compared as `'infinity'`, which
//! sorts after every `YYYY-MM-DD` string.

/// Message raised by the overlap triggers; matched when classifying errors.
pub const OVERLAP_TRIGGER: &str = "interval_overlap";

/// Message raised when a superseded version is modified.
pub const IMMUTABLE_TRIGGER: &str = "version_immutable";

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS properties (
    property_id  TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    address      TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parties (
    party_id     TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    party_type   TEXT NOT NULL,   -- LANDLORD | TENANT | GUARANTOR | BROKER | OTHER
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leases (
    lease_id        TEXT PRIMARY KEY,
    property_id     TEXT NOT NULL REFERENCES properties(property_id) ON DELETE RESTRICT,
    landlord_id     TEXT NOT NULL REFERENCES parties(party_id) ON DELETE RESTRICT,
    tenant_id       TEXT NOT NULL REFERENCES parties(party_id) ON DELETE RESTRICT,
    lease_number    TEXT NOT NULL,
    execution_date  TEXT,
    created_by      TEXT,
    created_at      TEXT NOT NULL,
    UNIQUE (property_id, lease_number)
);

-- Versions are append-only. The only permitted UPDATE is demoting the
-- current version (is_current 1 -> 0) during an amendment.
CREATE TABLE IF NOT EXISTS lease_versions (
    version_id        TEXT PRIMARY KEY,
    lease_id          TEXT NOT NULL REFERENCES leases(lease_id) ON DELETE RESTRICT,
    version_num       INTEGER NOT NULL CHECK (version_num >= 0),
    is_current        INTEGER NOT NULL CHECK (is_current IN (0, 1)),
    effective_start   TEXT NOT NULL,
    effective_end     TEXT,            -- NULL = open-ended
    effective_bounds  TEXT NOT NULL DEFAULT '[)' CHECK (effective_bounds = '[)'),
    premises_sqft     TEXT,            -- decimal as text
    term_months       INTEGER CHECK (term_months IS NULL OR term_months > 0),
    escalation        TEXT NOT NULL,
    currency          TEXT NOT NULL,
    notes             TEXT,
    created_by        TEXT,
    created_at        TEXT NOT NULL,
    UNIQUE (lease_id, version_num),
    CHECK (effective_end IS NULL OR effective_start < effective_end)
);

CREATE UNIQUE INDEX IF NOT EXISTS lease_versions_single_current
    ON lease_versions(lease_id) WHERE is_current = 1;

CREATE TRIGGER IF NOT EXISTS lease_versions_no_overlap
BEFORE INSERT ON lease_versions
WHEN EXISTS (
    SELECT 1 FROM lease_versions v
    WHERE v.lease_id = NEW.lease_id
      AND v.effective_start < COALESCE(NEW.effective_end, 'infinity')
      AND NEW.effective_start < COALESCE(v.effective_end, 'infinity')
)
BEGIN
    SELECT RAISE(ABORT, 'interval_overlap');
END;

CREATE TRIGGER IF NOT EXISTS lease_versions_immutable
BEFORE UPDATE ON lease_versions
WHEN NOT (OLD.is_current = 1 AND NEW.is_current = 0)
  OR NEW.version_id      IS NOT OLD.version_id
  OR NEW.lease_id        IS NOT OLD.lease_id
  OR NEW.version_num     IS NOT OLD.version_num
  OR NEW.effective_start IS NOT OLD.effective_start
  OR NEW.effective_end   IS NOT OLD.effective_end
  OR NEW.premises_sqft   IS NOT OLD.premises_sqft
  OR NEW.term_months     IS NOT OLD.term_months
  OR NEW.escalation      IS NOT OLD.escalation
  OR NEW.currency        IS NOT OLD.currency
  OR NEW.notes           IS NOT OLD.notes
BEGIN
    SELECT RAISE(ABORT, 'version_immutable');
END;

CREATE TABLE IF NOT EXISTS interval_records (
    record_id        TEXT PRIMARY KEY,
    version_id       TEXT NOT NULL REFERENCES lease_versions(version_id) ON DELETE RESTRICT,
    kind             TEXT NOT NULL,   -- RENT_SCHEDULE | OPTION | CONCESSION
    interval_start   TEXT NOT NULL,
    interval_end     TEXT,
    interval_bounds  TEXT NOT NULL DEFAULT '[)' CHECK (interval_bounds = '[)'),
    terms_json       TEXT NOT NULL,   -- kind-specific payload
    created_at       TEXT NOT NULL,
    CHECK (interval_end IS NULL OR interval_start < interval_end)
);

CREATE INDEX IF NOT EXISTS interval_records_partition_idx
    ON interval_records(version_id, kind, interval_start);

CREATE TRIGGER IF NOT EXISTS interval_records_no_overlap_insert
BEFORE INSERT ON interval_records
WHEN EXISTS (
    SELECT 1 FROM interval_records r
    WHERE r.version_id = NEW.version_id
      AND r.kind = NEW.kind
      AND r.interval_start < COALESCE(NEW.interval_end, 'infinity')
      AND NEW.interval_start < COALESCE(r.interval_end, 'infinity')
)
BEGIN
    SELECT RAISE(ABORT, 'interval_overlap');
END;

CREATE TRIGGER IF NOT EXISTS interval_records_no_overlap_update
BEFORE UPDATE ON interval_records
WHEN EXISTS (
    SELECT 1 FROM interval_records r
    WHERE r.version_id = NEW.version_id
      AND r.kind = NEW.kind
      AND r.record_id <> NEW.record_id
      AND r.interval_start < COALESCE(NEW.interval_end, 'infinity')
      AND NEW.interval_start < COALESCE(r.interval_end, 'infinity')
)
BEGIN
    SELECT RAISE(ABORT, 'interval_overlap');
END;

CREATE TABLE IF NOT EXISTS critical_dates (
    critical_date_id  TEXT PRIMARY KEY,
    lease_id          TEXT NOT NULL REFERENCES leases(lease_id) ON DELETE CASCADE,
    kind              TEXT NOT NULL,
    date              TEXT NOT NULL,
    description       TEXT,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS critical_dates_lease_idx ON critical_dates(lease_id, date);
CREATE INDEX IF NOT EXISTS leases_parties_idx ON leases(landlord_id, tenant_id);

PRAGMA user_version = 1;
";
