//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into asynchronous use-case level APIs.
//! - Model the caller-side add/edit workflow explicitly.

pub mod client_service;
pub mod edit_session;
