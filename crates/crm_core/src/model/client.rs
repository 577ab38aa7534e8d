//! Client domain model.
//!
//! # Responsibility
//! - Define the persisted contact record and the caller-supplied draft.
//! - Provide the field-shape checks run upstream of storage.
//!
//! # Invariants
//! - `id` is assigned by the store and never changes for a record.
//! - Storage never re-validates field shape; only email uniqueness is enforced
//!   there (see `repo::client_repo`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned surrogate key. Starts at 1, never reused.
pub type ClientId = i64;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-zÀ-ÖØ-öø-ÿ\s]{2,60}$").expect("valid name regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+0-9]?[0-9\s\-().]{7,20}$").expect("valid phone regex"));

/// Persisted contact record.
///
/// Serializes as `{ "id", "name", "email", "phone" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Unique across live records.
    pub email: String,
    pub phone: String,
}

impl Client {
    /// Combines a store-assigned id with draft fields.
    pub fn from_draft(id: ClientId, draft: ClientDraft) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
        }
    }

    /// Copies the editable fields back into a draft.
    pub fn to_draft(&self) -> ClientDraft {
        ClientDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Caller-supplied fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ClientDraft {
    /// Builds a draft from raw form input, trimming surrounding whitespace.
    pub fn new(name: impl AsRef<str>, email: impl AsRef<str>, phone: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            email: email.as_ref().trim().to_string(),
            phone: phone.as_ref().trim().to_string(),
        }
    }

    /// Checks every field shape, reporting the first failure in
    /// `name`, `email`, `phone` order.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        check_field(ClientField::Name, &self.name, &NAME_RE)?;
        check_field(ClientField::Email, &self.email, &EMAIL_RE)?;
        check_field(ClientField::Phone, &self.phone, &PHONE_RE)?;
        Ok(())
    }
}

/// Editable client field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientField {
    Name,
    Email,
    Phone,
}

impl ClientField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Empty,
    InvalidFormat,
}

/// Field-shape failure reported before any storage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientValidationError {
    pub field: ClientField,
    pub reason: ValidationReason,
}

impl Display for ClientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            ValidationReason::Empty => write!(f, "{} must not be empty", self.field.as_str()),
            ValidationReason::InvalidFormat => {
                write!(f, "{} has an invalid format", self.field.as_str())
            }
        }
    }
}

impl Error for ClientValidationError {}

fn check_field(
    field: ClientField,
    value: &str,
    pattern: &Regex,
) -> Result<(), ClientValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientValidationError {
            field,
            reason: ValidationReason::Empty,
        });
    }
    if !pattern.is_match(trimmed) {
        return Err(ClientValidationError {
            field,
            reason: ValidationReason::InvalidFormat,
        });
    }
    Ok(())
}
