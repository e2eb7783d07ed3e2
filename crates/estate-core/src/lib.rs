//! # Estate Core
//! 
//! Domain entities, ledger rules, repository traits and services for the
//! building-management backend.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

// Re-export domain entities
pub use domain::*;
pub use error::DomainError;
pub use repositories::Repositories;
pub use services::Services;
