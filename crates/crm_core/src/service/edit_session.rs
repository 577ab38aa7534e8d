//! Caller-side editing workflow.
//!
//! # Responsibility
//! - Decide whether a submitted draft becomes a create or an update.
//! - Run field-shape validation before any storage call.
//!
//! # Invariants
//! - `Idle --submit--> create`, `Editing(id) --submit--> update(id)`.
//! - Every successful create/update/delete returns the session to `Idle`.
//! - A failed submit leaves the mode unchanged, except `NotFound` on update,
//!   which drops back to `Idle` because the target no longer exists.

use crate::model::client::{Client, ClientDraft, ClientId, ClientValidationError};
use crate::repo::client_repo::{RepoError, RepoResult};
use crate::service::client_service::ClientService;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Whether the next submit adds a new client or edits an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    Idle,
    Editing(ClientId),
}

/// What a successful submit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(ClientId),
    Updated(ClientId),
}

impl SubmitOutcome {
    pub fn id(self) -> ClientId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

/// Submit failure: rejected input or a repository error.
#[derive(Debug)]
pub enum SubmitError {
    Invalid(ClientValidationError),
    Repo(RepoError),
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SubmitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ClientValidationError> for SubmitError {
    fn from(value: ClientValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for SubmitError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Explicit add/edit state owned by the caller and passed to each submit.
#[derive(Debug, Default)]
pub struct EditSession {
    mode: EditMode,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Loads `id` for editing. The mode only changes when the load succeeds.
    pub async fn begin_edit(
        &mut self,
        service: &ClientService,
        id: ClientId,
    ) -> RepoResult<Client> {
        let client = service.get_by_id(id).await?;
        self.mode = EditMode::Editing(id);
        Ok(client)
    }

    /// Abandons an edit in progress.
    pub fn cancel(&mut self) {
        self.mode = EditMode::Idle;
    }

    /// Validates `draft`, then creates or updates depending on the mode.
    pub async fn submit(
        &mut self,
        service: &ClientService,
        draft: ClientDraft,
    ) -> Result<SubmitOutcome, SubmitError> {
        draft.validate()?;

        let result = match self.mode {
            EditMode::Idle => service.create(draft).await.map(SubmitOutcome::Created),
            EditMode::Editing(id) => service
                .update(id, draft)
                .await
                .map(|()| SubmitOutcome::Updated(id)),
        };

        match result {
            Ok(outcome) => {
                self.mode = EditMode::Idle;
                Ok(outcome)
            }
            Err(err @ RepoError::NotFound(_)) => {
                self.mode = EditMode::Idle;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes `id` and returns to `Idle`.
    pub async fn delete(&mut self, service: &ClientService, id: ClientId) -> RepoResult<()> {
        service.delete(id).await?;
        self.mode = EditMode::Idle;
        Ok(())
    }
}
