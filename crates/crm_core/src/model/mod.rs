//! Domain model for the contact store.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned `ClientId`.
//! - Deletion is a hard delete; ids are still never reused.

pub mod client;
