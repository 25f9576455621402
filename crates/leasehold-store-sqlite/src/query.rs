//! Structured SELECT and UPDATE statements.
//!
//! Filterable and updatable columns are enumerated per table, so a statement
//! is assembled only from `&'static str` column names and every caller value
//! travels as a bound parameter.

use leasehold_core::lease::Page;
use rusqlite::types::Value;

/// A column that may appear in a filter, an ordering or an assignment.
pub trait Field: Copy {
  const TABLE: &'static str;

  fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseField {
  LeaseId,
  PropertyId,
  LandlordId,
  TenantId,
  LeaseNumber,
  ExecutionDate,
  CreatedAt,
}

impl LeaseField {
  pub const ALL: [Self; 7] = [
    Self::LeaseId,
    Self::PropertyId,
    Self::LandlordId,
    Self::TenantId,
    Self::LeaseNumber,
    Self::ExecutionDate,
    Self::CreatedAt,
  ];
}

impl Field for LeaseField {
  const TABLE: &'static str = "leases";

  fn column(self) -> &'static str {
    match self {
      Self::LeaseId => "lease_id",
      Self::PropertyId => "property_id",
      Self::LandlordId => "landlord_id",
      Self::TenantId => "tenant_id",
      Self::LeaseNumber => "lease_number",
      Self::ExecutionDate => "execution_date",
      Self::CreatedAt => "created_at",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
  RecordId,
  VersionId,
  Kind,
  IntervalStart,
}

impl RecordField {
  pub const ALL: [Self; 4] = [Self::RecordId, Self::VersionId, Self::Kind, Self::IntervalStart];
}

impl Field for RecordField {
  const TABLE: &'static str = "interval_records";

  fn column(self) -> &'static str {
    match self {
      Self::RecordId => "record_id",
      Self::VersionId => "version_id",
      Self::Kind => "kind",
      Self::IntervalStart => "interval_start",
    }
  }
}

// ─── SELECT ──────────────────────────────────────────────────────────────────

/// `SELECT <columns> FROM <table> WHERE f1 = ? AND ... ORDER BY ... LIMIT ...`
#[derive(Debug, Clone)]
pub struct Select<F> {
  columns:  &'static str,
  filters:  Vec<(F, Value)>,
  order_by: Vec<F>,
  page:     Page,
}

impl<F: Field> Select<F> {
  pub fn new(columns: &'static str) -> Self {
    Self { columns, filters: Vec::new(), order_by: Vec::new(), page: Page::default() }
  }

  pub fn filter(mut self, field: F, value: impl Into<Value>) -> Self {
    self.filters.push((field, value.into()));
    self
  }

  /// Add an equality filter only when `value` is present.
  pub fn filter_opt<V: Into<Value>>(self, field: F, value: Option<V>) -> Self {
    match value {
      Some(value) => self.filter(field, value),
      None => self,
    }
  }

  pub fn order_by(mut self, field: F) -> Self {
    self.order_by.push(field);
    self
  }

  pub fn page(mut self, page: Page) -> Self {
    self.page = page;
    self
  }

  pub fn build(&self) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {} FROM {}", self.columns, F::TABLE);
    let mut params: Vec<Value> = Vec::with_capacity(self.filters.len() + 2);

    for (i, (field, value)) in self.filters.iter().enumerate() {
      sql.push_str(if i == 0 { " WHERE " } else { " AND " });
      params.push(value.clone());
      sql.push_str(&format!("{} = ?{}", field.column(), params.len()));
    }

    if !self.order_by.is_empty() {
      let order: Vec<&str> = self.order_by.iter().map(|f| f.column()).collect();
      sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
    }

    if self.page.limit.is_some() || self.page.offset.is_some() {
      // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
      let limit = self.page.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
      params.push(Value::Integer(limit));
      sql.push_str(&format!(" LIMIT ?{}", params.len()));
      if let Some(offset) = self.page.offset {
        params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" OFFSET ?{}", params.len()));
      }
    }

    (sql, params)
  }
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

/// `UPDATE <table> SET f1 = ?, ... WHERE <key> = ?`
#[derive(Debug, Clone)]
pub struct Update<F> {
  key:  (F, Value),
  sets: Vec<(F, Value)>,
}

impl<F: Field> Update<F> {
  pub fn new(key: F, id: impl Into<Value>) -> Self {
    Self { key: (key, id.into()), sets: Vec::new() }
  }

  pub fn set(mut self, field: F, value: impl Into<Value>) -> Self {
    self.sets.push((field, value.into()));
    self
  }

  /// Assign only when `value` is present; absent fields are left untouched.
  pub fn set_opt<V: Into<Value>>(self, field: F, value: Option<V>) -> Self {
    match value {
      Some(value) => self.set(field, value),
      None => self,
    }
  }

  /// `None` when there is nothing to assign.
  pub fn build(&self) -> Option<(String, Vec<Value>)> {
    if self.sets.is_empty() {
      return None;
    }
    let mut params: Vec<Value> = Vec::with_capacity(self.sets.len() + 1);
    let mut assignments = Vec::with_capacity(self.sets.len());
    for (field, value) in &self.sets {
      params.push(value.clone());
      assignments.push(format!("{} = ?{}", field.column(), params.len()));
    }
    params.push(self.key.1.clone());
    let sql = format!(
      "UPDATE {} SET {} WHERE {} = ?{}",
      F::TABLE,
      assignments.join(", "),
      self.key.0.column(),
      params.len()
    );
    Some((sql, params))
  }
}
