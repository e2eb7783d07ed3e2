//! # Estate Core - Domain Module
//!
//! Domain entities, their input payloads and the ledger arithmetic.

use chrono::Utc;
use estate_shared::AuditFields;
use uuid::Uuid;

/// Declares a snake_case string enum with `as_str`/`parse` helpers, used for
/// every status/type column (stored as TEXT).
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
        default = $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Implements [`Entity`] for a struct with `id` and `audit` fields.
macro_rules! impl_entity {
    ($ty:ty, $kind:literal) => {
        impl $crate::domain::Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn audit(&self) -> &::estate_shared::AuditFields {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut ::estate_shared::AuditFields {
                &mut self.audit
            }
        }
    };
}

pub mod money;
pub mod validation;

pub mod building;
pub mod floor;
pub mod unit;
pub mod owner;
pub mod tenant;
pub mod charge;
pub mod cost;
pub mod fund;
pub mod transaction;

// Re-export all entities and enums
pub use building::{Building, BuildingCreate, BuildingUpdate};
pub use floor::{Floor, FloorCreate, FloorUpdate};
pub use unit::{Unit, UnitCreate, UnitUpdate, UnitStatus, UnitType};
pub use owner::{Owner, OwnerCreate, OwnerUpdate, OwnerStatus, OwnerType};
pub use tenant::{Tenant, TenantCreate, TenantUpdate, TenantStatus, TenantType};
pub use charge::{
    Charge, ChargeCreate, ChargeFrequency, ChargeStatus, ChargeType, ChargeUpdate, ChargeView,
    Payment, PaymentCreate,
};
pub use cost::{
    Cost, CostCompletion, CostCreate, CostPriority, CostStatus, CostType, CostUpdate, CostView,
};
pub use fund::{
    Fund, FundCreate, FundStatus, FundTransaction, FundTransactionCreate, FundTransactionStatus,
    FundTransactionType, FundType, FundUpdate, FundView,
};
pub use transaction::{
    PaymentMethod, Transaction, TransactionCreate, TransactionStatus, TransactionType,
    TransactionUpdate,
};

/// A persisted record with an id and the audit/soft-delete block.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable resource name used in error messages.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn audit(&self) -> &AuditFields;
    fn audit_mut(&mut self) -> &mut AuditFields;

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted
    }
}

/// Query filter for a list endpoint. `matches` mirrors the SQL the
/// PostgreSQL adapter generates for the same filter.
pub trait EntityFilter<T>: Default + Send + Sync + 'static {
    fn matches(&self, entity: &T) -> bool;
}

/// `<PREFIX>-<yyyymmddHHMMSS>-<4 hex>` reference for ledger rows created
/// without one.
pub fn generate_reference(prefix: &str) -> String {
    format!(
        "{}-{}-{:04X}",
        prefix,
        Utc::now().format("%Y%m%d%H%M%S"),
        rand::random::<u16>()
    )
}

/// Trim a free-text field and drop it when empty.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Case-insensitive substring match used by `search`/`name` filters.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reference_shape() {
        let reference = generate_reference("TXN");
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1].len(), 14);
        assert!(u16::from_str_radix(parts[2], 16).is_ok());
    }

    #[test]
    fn test_clean_drops_blank_values() {
        assert_eq!(clean(Some("  x ".into())), Some("x".into()));
        assert_eq!(clean(Some("   ".into())), None);
        assert_eq!(clean(None), None);
        assert!(contains_ci("Tower Alpha", "ALP"));
    }
}
