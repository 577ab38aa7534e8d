//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Each repository call runs in its own transaction on a migrated connection.
//! - Repository APIs return semantic errors (`NotFound`, `ConstraintViolation`)
//!   in addition to engine errors.

pub mod client_repo;
