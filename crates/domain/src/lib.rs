//! Medicine Delivery Domain Models

/// Account table and profile operations
pub mod accounts;

/// Roles and capabilities
pub mod auth;

/// Domain errors
pub mod errors;

/// Domain events wrapper
pub mod event;

/// Locales and message bundles
pub mod i18n;

/// Identity provider adapter
pub mod identity;

/// Pharmacy reference data
pub mod pharmacies;

/// Delivery request aggregate
pub mod requests;

/// Client settings store
pub mod settings;

/// Object store adapter
pub mod storage;

/// Tracking poll policy
pub mod tracking;

/// In-memory adapters
#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use auth::{Actor, Capability, Role};
pub use errors::Error;
pub use event::DomainEvent;
