//! Closed vocabularies used across the lease model.
//!
//! Each vocabulary is a plain Rust enum whose wire form is an upper-case
//! token (`"FREE_RENT"`, `"MONTH"`, ...). Text is parsed exactly once, at the
//! boundary, through serde or [`std::str::FromStr`]; an unknown token is a
//! [`ValidationError::UnknownVariant`].

use crate::error::ValidationError;

/// Declares a closed enum together with its wire token, `Display`, and a
/// `FromStr` that rejects unknown tokens.
macro_rules! closed_enum {
  (
    $(#[$meta:meta])*
    pub enum $name:ident as $field:literal {
      $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
      serde::Serialize, serde::Deserialize,
    )]
    pub enum $name {
      $( $(#[$vmeta])* #[serde(rename = $token)] $variant, )+
    }

    impl $name {
      /// Every variant, in declaration order.
      pub const ALL: &'static [Self] = &[$(Self::$variant),+];

      /// The wire and storage token for this variant.
      pub fn as_str(self) -> &'static str {
        match self {
          $(Self::$variant => $token,)+
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl std::str::FromStr for $name {
      type Err = ValidationError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($token => Ok(Self::$variant),)+
          other => Err(ValidationError::UnknownVariant {
            field: $field,
            value: other.to_owned(),
          }),
        }
      }
    }
  };
}

// ─── Parties ─────────────────────────────────────────────────────────────────

closed_enum! {
  /// The role a party plays in the lease portfolio.
  pub enum PartyType as "party_type" {
    Landlord => "LANDLORD",
    Tenant => "TENANT",
    Guarantor => "GUARANTOR",
    Broker => "BROKER",
    Other => "OTHER",
  }
}

// ─── Lease versions ──────────────────────────────────────────────────────────

closed_enum! {
  /// How base rent escalates over the term of a version. Recorded only; the
  /// escalation itself is never computed.
  pub enum EscalationMethod as "escalation_method" {
    None => "NONE",
    FixedAmount => "FIXED_AMOUNT",
    FixedPercent => "FIXED_PERCENT",
    Cpi => "CPI",
    MarketReset => "MARKET_RESET",
  }
}

impl Default for EscalationMethod {
  fn default() -> Self { Self::None }
}

// ─── Interval records ────────────────────────────────────────────────────────

closed_enum! {
  /// The period a rent amount is quoted for.
  pub enum RentBasis as "basis" {
    Month => "MONTH",
    Year => "YEAR",
  }
}

closed_enum! {
  pub enum OptionType as "option_type" {
    Renewal => "RENEWAL",
    Expansion => "EXPANSION",
    Contraction => "CONTRACTION",
    Termination => "TERMINATION",
    RightOfFirstOffer => "ROFO",
    RightOfFirstRefusal => "ROFR",
    Purchase => "PURCHASE",
  }
}

closed_enum! {
  pub enum ConcessionKind as "concession_kind" {
    FreeRent => "FREE_RENT",
    RentAbatement => "RENT_ABATEMENT",
    TenantImprovement => "TI_ALLOWANCE",
    MovingAllowance => "MOVING_ALLOWANCE",
    Other => "OTHER",
  }
}

closed_enum! {
  /// What a concession's value is measured against.
  pub enum ConcessionBasis as "concession_basis" {
    Total => "TOTAL",
    Month => "MONTH",
    Year => "YEAR",
    PerSquareFoot => "PER_SQFT",
  }
}

closed_enum! {
  /// Discriminates the three interval-bearing record families. Records of
  /// different kinds never conflict with one another.
  pub enum RecordKind as "record_kind" {
    RentSchedule => "RENT_SCHEDULE",
    Option => "OPTION",
    Concession => "CONCESSION",
  }
}

// ─── Critical dates ──────────────────────────────────────────────────────────

closed_enum! {
  pub enum CriticalDateKind as "critical_date_kind" {
    Commencement => "COMMENCEMENT",
    RentStart => "RENT_START",
    Expiration => "EXPIRATION",
    Notice => "NOTICE",
    Other => "OTHER",
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

closed_enum! {
  /// Every stored entity, used to name the target of a missing reference.
  pub enum Entity as "entity" {
    Property => "property",
    Party => "party",
    Lease => "lease",
    LeaseVersion => "lease_version",
    Record => "record",
    CriticalDate => "critical_date",
  }
}

closed_enum! {
  /// The entity families a batch may carry.
  pub enum EntityKind as "entity_kind" {
    Properties => "properties",
    Parties => "parties",
    Leases => "leases",
  }
}
