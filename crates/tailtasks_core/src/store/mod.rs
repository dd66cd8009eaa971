//! Entity store worker: serialized access to the SQLite connection.
//!
//! # Responsibility
//! - Own the one connection on a blocking worker task.
//! - Run read/write jobs in submission order and hand results back through
//!   [`Pending`] handles.
//! - Re-publish live queries after every committed write.
//!
//! # Invariants
//! - Jobs execute strictly FIFO; writes from one caller apply in issuance order.
//! - Every write job runs in exactly one transaction; failures roll back and
//!   publish nothing.
//! - Dropping a `Pending` never cancels the job behind it.

pub mod live;

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::repo::{RepoError, RepoResult};
use live::{LiveQuery, LiveQueryId, LiveRegistry};
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

pub type StoreResult<T> = Result<T, StoreError>;

/// Tables whose changes drive live query refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Todos,
    Dogs,
    Tags,
    TodoTags,
}

/// Errors surfaced by store jobs.
#[derive(Debug)]
pub enum StoreError {
    /// Repository or database failure inside the job.
    Repo(RepoError),
    /// No tokio runtime was available to host the worker.
    NoRuntime,
    /// The worker has stopped; the job did not run or its result was lost.
    WorkerStopped,
    /// Refresh requested for a live query the worker does not know.
    UnknownLiveQuery(u64),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::NoRuntime => write!(f, "store worker requires a tokio runtime"),
            Self::WorkerStopped => write!(f, "store worker has stopped"),
            Self::UnknownLiveQuery(id) => write!(f, "live query {id} is not registered"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(value.into())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// State owned by the worker task.
pub(crate) struct Worker {
    conn: Connection,
    /// Count of committed write jobs.
    version: u64,
    live: LiveRegistry,
}

impl Worker {
    fn write<T>(
        &mut self,
        tables: &[Table],
        job: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let tx = self.conn.transaction()?;
        let value = job(&*tx)?;
        tx.commit()?;

        self.version += 1;
        self.live.publish(tables, &self.conn, self.version);
        Ok(value)
    }
}

pub(crate) type Job = Box<dyn FnOnce(&mut Worker) + Send + 'static>;

/// Result of a job that has been enqueued on the store worker.
#[must_use = "a dropped Pending still runs its job, but its outcome is lost"]
pub struct Pending<T> {
    rx: oneshot::Receiver<StoreResult<T>>,
}

impl<T> Pending<T> {
    /// Waits for the job outcome.
    pub async fn wait(self) -> StoreResult<T> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(StoreError::WorkerStopped))
    }

    /// Blocking variant of [`Pending::wait`] for sync callers.
    ///
    /// Must not be called from inside an async context.
    pub fn blocking_wait(self) -> StoreResult<T> {
        self.rx
            .blocking_recv()
            .unwrap_or_else(|_| Err(StoreError::WorkerStopped))
    }
}

/// Cloneable handle to the store worker.
#[derive(Clone)]
pub struct Store {
    jobs: mpsc::UnboundedSender<Job>,
    next_live_query_id: Arc<AtomicU64>,
}

impl Store {
    /// Opens (or creates) a database file and starts the worker on the
    /// current tokio runtime.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let handle = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        Ok(Self::start_on(open_db(path)?, &handle))
    }

    /// Starts a worker over a fresh in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let handle = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        Ok(Self::start_on(open_db_in_memory()?, &handle))
    }

    /// Starts the worker over an already migrated connection.
    pub fn start_on(conn: Connection, handle: &Handle) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        handle.spawn_blocking(move || run_worker(conn, rx));
        Self {
            jobs,
            next_live_query_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Enqueues a read-only job.
    pub fn read<T, F>(&self, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
    {
        self.submit(move |worker| job(&worker.conn).map_err(StoreError::from))
    }

    /// Enqueues a write job touching `tables`.
    ///
    /// The job runs in one transaction; on commit every live query reading
    /// one of `tables` publishes a fresh snapshot before the next job starts.
    pub fn write<T, F>(&self, tables: &'static [Table], job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
    {
        self.submit(move |worker| {
            let result = worker.write(tables, job);
            if let Err(err) = &result {
                warn!("event=store_write module=store status=error error={err}");
            }
            result
        })
    }

    /// Registers a live query over `tables`.
    pub fn live<T, Q>(&self, tables: &'static [Table], query: Q) -> LiveQuery<T>
    where
        T: Send + Sync + 'static,
        Q: FnMut(&Connection) -> RepoResult<Vec<T>> + Send + 'static,
    {
        LiveQuery::register(self, tables, query)
    }

    /// Resolves once every job enqueued before this call has run.
    pub fn barrier(&self) -> Pending<u64> {
        self.submit(|worker| Ok(worker.version))
    }

    pub(crate) fn submit<T, F>(&self, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Worker) -> StoreResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Box::new(move |worker: &mut Worker| {
            // Receiver may be gone; the job still ran.
            let _ = tx.send(job(worker));
        }));
        Pending { rx }
    }

    pub(crate) fn enqueue(&self, job: Job) {
        // A rejected job drops its reply sender, so waiters see WorkerStopped.
        if self.jobs.send(job).is_err() {
            warn!("event=store_enqueue module=store status=error error_code=worker_stopped");
        }
    }

    pub(crate) fn next_live_query_id(&self) -> LiveQueryId {
        self.next_live_query_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn run_worker(conn: Connection, mut jobs: mpsc::UnboundedReceiver<Job>) {
    info!("event=store_worker module=store status=start");
    let mut worker = Worker {
        conn,
        version: 0,
        live: LiveRegistry::default(),
    };

    while let Some(job) = jobs.blocking_recv() {
        job(&mut worker);
    }

    info!(
        "event=store_worker module=store status=stop committed_writes={}",
        worker.version
    );
}
