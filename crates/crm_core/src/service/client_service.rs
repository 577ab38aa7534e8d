//! Client use-case service.
//!
//! # Responsibility
//! - Expose the asynchronous create/read/update/delete/list entry points.
//! - Run every repository call on the handle's worker, one transaction each.
//! - Emit metadata-only log events for each operation.
//!
//! # Invariants
//! - Service APIs never bypass repository transactions or the uniqueness guard.
//! - Field values (name/email/phone) never appear in log events.
//! - No automatic retries; every failure is returned to the caller.

use crate::db::{Handle, OpenOptions};
use crate::model::client::{Client, ClientDraft, ClientId};
use crate::repo::client_repo::{
    ensure_client_connection_ready, ClientRepository, ClientSnapshot, RepoError, RepoResult,
    SqliteClientRepository,
};
use log::{debug, error, info, warn};
use std::time::Instant;

/// Async entry points over one storage [`Handle`].
///
/// Cheap to clone; clones share the same connection and worker.
#[derive(Debug, Clone)]
pub struct ClientService {
    handle: Handle,
}

impl ClientService {
    /// Wraps `handle` after checking that its schema is ready.
    pub async fn connect(handle: Handle) -> RepoResult<Self> {
        handle
            .call(|conn| ensure_client_connection_ready(conn))
            .await??;
        Ok(Self { handle })
    }

    /// Opens the database and connects in one step.
    ///
    /// Any open failure surfaces as [`RepoError::Connection`].
    pub async fn open(options: OpenOptions) -> RepoResult<Self> {
        let handle = Handle::open(options).await?;
        Self::connect(handle).await
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Creates a client and returns its store-assigned id.
    ///
    /// Fails with `ConstraintViolation` when the email is already used.
    pub async fn create(&self, draft: ClientDraft) -> RepoResult<ClientId> {
        let started_at = Instant::now();
        let result = self.run(move |repo| repo.create_client(&draft)).await;
        match &result {
            Ok(id) => info!(
                "event=client_create module=service status=ok client_id={} duration_ms={}",
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("client_create", None, err, started_at),
        }
        result
    }

    /// Replaces the editable fields of `id`.
    ///
    /// The uniqueness check only runs when the email changes.
    pub async fn update(&self, id: ClientId, draft: ClientDraft) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.run(move |repo| repo.update_client(id, &draft)).await;
        match &result {
            Ok(()) => info!(
                "event=client_update module=service status=ok client_id={} duration_ms={}",
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("client_update", Some(id), err, started_at),
        }
        result
    }

    /// Deletes `id`. Deleting a missing id succeeds.
    pub async fn delete(&self, id: ClientId) -> RepoResult<()> {
        let started_at = Instant::now();
        match self.run(move |repo| repo.delete_client(id)).await {
            Ok(removed) => {
                info!(
                    "event=client_delete module=service status=ok client_id={} duration_ms={}",
                    id,
                    started_at.elapsed().as_millis()
                );
                debug!(
                    "event=client_delete module=service status=ok client_id={} removed={}",
                    id, removed
                );
                Ok(())
            }
            Err(err) => {
                log_failure("client_delete", Some(id), &err, started_at);
                Err(err)
            }
        }
    }

    pub async fn get_by_id(&self, id: ClientId) -> RepoResult<Client> {
        let started_at = Instant::now();
        let result = self.run(move |repo| repo.get_client(id)).await;
        match &result {
            Ok(_) => debug!(
                "event=client_get module=service status=ok client_id={} duration_ms={}",
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("client_get", Some(id), err, started_at),
        }
        result
    }

    /// Snapshot of every client in ascending id order.
    ///
    /// Each call opens a fresh read transaction and sees the latest commit.
    pub async fn list_all(&self) -> RepoResult<ClientSnapshot> {
        let started_at = Instant::now();
        let result = self.run(|repo| repo.list_clients()).await;
        match &result {
            Ok(snapshot) => debug!(
                "event=client_list module=service status=ok count={} duration_ms={}",
                snapshot.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("client_list", None, err, started_at),
        }
        result
    }

    pub async fn find_by_email(&self, email: impl Into<String>) -> RepoResult<Option<Client>> {
        let started_at = Instant::now();
        let email = email.into();
        let result = self.run(move |repo| repo.find_by_email(&email)).await;
        match &result {
            Ok(found) => debug!(
                "event=client_find_by_email module=service status=ok found={} duration_ms={}",
                found.is_some(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("client_find_by_email", None, err, started_at),
        }
        result
    }

    pub async fn count(&self) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = self.run(|repo| repo.count_clients()).await;
        match &result {
            Ok(count) => debug!(
                "event=client_count module=service status=ok count={} duration_ms={}",
                count,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("client_count", None, err, started_at),
        }
        result
    }

    async fn run<T, F>(&self, op: F) -> RepoResult<T>
    where
        F: FnOnce(&SqliteClientRepository<'_>) -> RepoResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle
            .call(move |conn| op(&SqliteClientRepository::new(conn)))
            .await?
    }
}

fn log_failure(event: &str, id: Option<ClientId>, err: &RepoError, started_at: Instant) {
    let client_id = id.map_or_else(|| "-".to_string(), |id| id.to_string());
    if err.is_recoverable() {
        warn!(
            "event={} module=service status=rejected client_id={} duration_ms={} error_code={}",
            event,
            client_id,
            started_at.elapsed().as_millis(),
            err.code()
        );
    } else {
        error!(
            "event={} module=service status=error client_id={} duration_ms={} error_code={} error={}",
            event,
            client_id,
            started_at.elapsed().as_millis(),
            err.code(),
            err
        );
    }
}
