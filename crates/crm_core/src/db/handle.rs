//! Async handle over the single long-lived SQLite connection.
//!
//! # Responsibility
//! - Own the only `rusqlite::Connection` on a dedicated worker thread.
//! - Run submitted jobs one at a time, in submission order.
//! - Signal each job's completion to the awaiting caller.
//!
//! # Invariants
//! - A `Handle` exists only after open + migrations succeeded.
//! - Jobs never interleave: a transaction opened by one job is committed or
//!   rolled back before the next job starts.
//! - Dropping a caller future does not cancel its job; the result is discarded.

use super::open::open_with_options;
use super::options::OpenOptions;
use super::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use tokio::sync::oneshot;

const WORKER_THREAD_NAME: &str = "crm-sqlite-worker";

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Cloneable reference to the storage worker.
///
/// The worker and its connection live until the last clone is dropped.
#[derive(Clone)]
pub struct Handle {
    jobs: mpsc::Sender<Job>,
}

impl Debug for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").finish_non_exhaustive()
    }
}

impl Handle {
    /// Opens the database described by `options` on a fresh worker thread.
    ///
    /// Resolves once the connection is open and migrated, or with the error
    /// that stopped it. Open failures are terminal for the worker.
    pub async fn open(options: OpenOptions) -> DbResult<Self> {
        let (jobs, receiver) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel::<DbResult<()>>();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut conn = match open_with_options(&options) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                worker_loop(&mut conn, &receiver);
            })
            .map_err(DbError::WorkerSpawn)?;

        ready_rx.await.map_err(|_| DbError::ConnectionClosed)??;
        Ok(Self { jobs })
    }

    /// Opens a file-backed database at the latest schema version.
    pub async fn open_file(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open(OpenOptions::file(path)).await
    }

    /// Opens a private in-memory database at the latest schema version.
    pub async fn open_in_memory() -> DbResult<Self> {
        Self::open(OpenOptions::memory()).await
    }

    /// Queues `op` to run against the connection on the worker thread.
    ///
    /// The job is submitted when `call` returns, not when the future is first
    /// polled, so jobs run in the order `call` was invoked.
    ///
    /// # Errors
    /// - `ConnectionClosed` when the worker has exited.
    pub fn call<T, F>(&self, op: F) -> impl Future<Output = DbResult<T>> + Send + 'static
    where
        F: FnOnce(&mut Connection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            let _ = reply_tx.send(op(conn));
        });
        let submitted = self.jobs.send(job).map_err(|_| DbError::ConnectionClosed);

        async move {
            submitted?;
            reply_rx.await.map_err(|_| DbError::ConnectionClosed)
        }
    }
}

fn worker_loop(conn: &mut Connection, receiver: &mpsc::Receiver<Job>) {
    info!("event=db_worker module=db status=start");
    let mut processed: u64 = 0;
    while let Ok(job) = receiver.recv() {
        job(conn);
        processed += 1;
    }
    info!(
        "event=db_worker module=db status=stop jobs_processed={}",
        processed
    );
}
