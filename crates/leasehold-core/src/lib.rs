//! Core types and trait definitions for the Leasehold lease store.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the interval model, the interval-consistency validator, the derived
//! metrics calculator and the [`store::LeaseStore`] trait that storage
//! backends implement.

mod kinds;

pub mod batch;
pub mod critical_date;
pub mod error;
pub mod interval;
pub mod lease;
pub mod metrics;
pub mod record;
pub mod reference;
pub mod retry;
pub mod store;
pub mod view;

pub use error::{Error, ErrorKind, Result, ValidationError};
pub use interval::DateInterval;
pub use kinds::{
  ConcessionBasis, ConcessionKind, CriticalDateKind, Entity, EntityKind,
  EscalationMethod, OptionType, PartyType, RecordKind, RentBasis,
};
