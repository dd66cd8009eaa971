//! Live queries: query results re-published after every relevant write.
//!
//! # Responsibility
//! - Keep one registered query per observable sequence on the worker.
//! - Fan each fresh snapshot out to every open subscription.
//!
//! # Invariants
//! - A subscription first receives the latest snapshot, then one snapshot per
//!   committed write touching a table the query depends on.
//! - Dropping a subscription only stops delivery; queued writes are unaffected.
//! - An entry is pruned once its handle and all subscriptions are gone.

use super::{Pending, Store, StoreError, Table, Worker};
use crate::repo::RepoResult;
use log::warn;
use rusqlite::Connection;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Query result at one point of the store's commit history.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Number of writes committed when the query ran.
    pub version: u64,
    pub items: Vec<T>,
}

pub(crate) type LiveQueryId = u64;

type QueryFn<T> = Box<dyn FnMut(&Connection) -> RepoResult<Vec<T>> + Send>;
type Latest<T> = Option<Arc<Snapshot<T>>>;

/// Handle to a registered live query.
///
/// Holding the handle keeps the query registered; [`LiveQuery::latest`] then
/// always reflects the most recent publish.
pub struct LiveQuery<T> {
    id: LiveQueryId,
    store: Store,
    latest: watch::Receiver<Latest<T>>,
}

impl<T: Send + Sync + 'static> LiveQuery<T> {
    pub(crate) fn register<Q>(store: &Store, tables: &'static [Table], query: Q) -> Self
    where
        Q: FnMut(&Connection) -> RepoResult<Vec<T>> + Send + 'static,
    {
        let id = store.next_live_query_id();
        let (latest_tx, latest_rx) = watch::channel(None);
        let entry = LiveEntry {
            tables,
            query: Box::new(query),
            latest: latest_tx,
            subscribers: Vec::new(),
        };
        store.enqueue(Box::new(move |worker: &mut Worker| {
            worker.live.register(id, entry, &worker.conn, worker.version);
        }));

        Self {
            id,
            store: store.clone(),
            latest: latest_rx,
        }
    }

    /// Most recently published snapshot, if the first query already ran.
    pub fn latest(&self) -> Option<Arc<Snapshot<T>>> {
        self.latest.borrow().clone()
    }

    /// Opens a new subscription that starts with the latest snapshot.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.id;
        self.store.enqueue(Box::new(move |worker: &mut Worker| {
            worker.live.add_subscriber(id, tx);
        }));
        Subscription { rx }
    }

    /// Re-runs the query now and publishes the result to every subscriber.
    ///
    /// Resolves with the published snapshot version, which covers every
    /// write enqueued before this call.
    pub fn refresh(&self) -> Pending<u64> {
        let id = self.id;
        self.store.submit(move |worker| {
            worker
                .live
                .refresh_one(id, &worker.conn, worker.version)
                .map(|()| worker.version)
        })
    }
}

/// Receiving side of a live query.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<Arc<Snapshot<T>>>,
}

impl<T> Subscription<T> {
    /// Waits for the next snapshot. `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Arc<Snapshot<T>>> {
        self.rx.recv().await
    }

    /// Returns an already delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Arc<Snapshot<T>>> {
        self.rx.try_recv().ok()
    }

    /// Blocking variant of [`Subscription::next`] for sync callers.
    ///
    /// Must not be called from inside an async context.
    pub fn blocking_next(&mut self) -> Option<Arc<Snapshot<T>>> {
        self.rx.blocking_recv()
    }

    /// Drains queued snapshots and returns the newest one.
    pub fn latest_pending(&mut self) -> Option<Arc<Snapshot<T>>> {
        let mut newest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            newest = Some(snapshot);
        }
        newest
    }
}

struct LiveEntry<T> {
    tables: &'static [Table],
    query: QueryFn<T>,
    latest: watch::Sender<Latest<T>>,
    subscribers: Vec<mpsc::UnboundedSender<Arc<Snapshot<T>>>>,
}

/// Type-erased view of a live entry used by the registry.
trait ErasedEntry: Send {
    fn depends_on(&self, table: Table) -> bool;
    fn refresh(&mut self, conn: &Connection, version: u64) -> RepoResult<()>;
    fn is_abandoned(&self) -> bool;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Send + Sync + 'static> ErasedEntry for LiveEntry<T> {
    fn depends_on(&self, table: Table) -> bool {
        self.tables.contains(&table)
    }

    fn refresh(&mut self, conn: &Connection, version: u64) -> RepoResult<()> {
        let items = (self.query)(conn)?;
        let snapshot = Arc::new(Snapshot { version, items });
        self.subscribers
            .retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
        self.latest.send_replace(Some(snapshot));
        Ok(())
    }

    fn is_abandoned(&self) -> bool {
        self.latest.is_closed() && self.subscribers.iter().all(|tx| tx.is_closed())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Worker-owned registry of live queries.
#[derive(Default)]
pub(crate) struct LiveRegistry {
    entries: BTreeMap<LiveQueryId, Box<dyn ErasedEntry>>,
}

impl LiveRegistry {
    fn register<T: Send + Sync + 'static>(
        &mut self,
        id: LiveQueryId,
        mut entry: LiveEntry<T>,
        conn: &Connection,
        version: u64,
    ) {
        if let Err(err) = entry.refresh(conn, version) {
            warn!(
                "event=live_query_register module=store status=error live_query_id={id} error={err}"
            );
        }
        self.entries.insert(id, Box::new(entry));
    }

    fn add_subscriber<T: Send + Sync + 'static>(
        &mut self,
        id: LiveQueryId,
        subscriber: mpsc::UnboundedSender<Arc<Snapshot<T>>>,
    ) {
        let Some(entry) = self
            .entries
            .get_mut(&id)
            .and_then(|entry| entry.as_any_mut().downcast_mut::<LiveEntry<T>>())
        else {
            warn!("event=live_query_subscribe module=store status=error live_query_id={id} error_code=unknown_live_query");
            return;
        };

        if let Some(snapshot) = entry.latest.borrow().clone() {
            if subscriber.send(snapshot).is_err() {
                return;
            }
        }
        entry.subscribers.push(subscriber);
    }

    fn refresh_one(
        &mut self,
        id: LiveQueryId,
        conn: &Connection,
        version: u64,
    ) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(StoreError::UnknownLiveQuery(id))?;
        entry.refresh(conn, version)?;
        Ok(())
    }

    /// Re-runs every live query that reads one of `tables`.
    pub(crate) fn publish(&mut self, tables: &[Table], conn: &Connection, version: u64) {
        self.entries.retain(|id, entry| {
            if entry.is_abandoned() {
                return false;
            }
            if tables.iter().any(|table| entry.depends_on(*table)) {
                if let Err(err) = entry.refresh(conn, version) {
                    warn!(
                        "event=live_query_refresh module=store status=error live_query_id={id} version={version} error={err}"
                    );
                }
            }
            true
        });
    }
}
