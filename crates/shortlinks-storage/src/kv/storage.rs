use crate::kv::delete::DeleteProcedure;
use crate::kv::item::{marshal, unmarshal, HistoryItem, Item, LinkItem};
use crate::kv::key::Partition;
use crate::kv::table::{KvTable, QueryPaginator};
use crate::with_context;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use shortlinks_core::error::ensure_key;
use shortlinks_core::{
    Clock, DeletedLinks, History, MonotonicClock, ReadStorage, Result, Shortlink, Storage,
    StorageError, Tombstone,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// How many taken sort keys a history write steps past before giving up.
const HISTORY_WRITE_ATTEMPTS: usize = 64;

/// Appends a history item without replacing an existing one.
///
/// History sort keys are timestamps, so two writers can pick the same one.
/// On a collision `when` moves forward by one nanosecond and the write is
/// retried. Returns the timestamp actually stored.
pub(crate) async fn insert_history<T: KvTable + ?Sized>(
    table: &T,
    entry: &History,
    when: Timestamp,
) -> Result<Timestamp> {
    let mut when = when;
    for _ in 0..HISTORY_WRITE_ATTEMPTS {
        let item = marshal(&HistoryItem::new(entry, when))?;
        if table.put_item_if_absent(item).await? {
            return Ok(when);
        }

        trace!(from = %entry.from, when = %when, "history sort key taken");
        when = when
            .checked_add(SignedDuration::from_nanos(1))
            .map_err(|e| StorageError::Query(format!("history timestamp overflow: {e}")))?;
    }

    Err(StorageError::Query(format!(
        "no free history slot for '{}' after {HISTORY_WRITE_ATTEMPTS} attempts",
        entry.from
    )))
}

/// Storage contract over a single [`KvTable`].
///
/// Live links, tombstones and history share the table, told apart by their
/// partition key (see [`Partition`]). Listing is a paginated partition query
/// that is followed to the end before returning.
///
/// Unlike [`SqliteStorage`](crate::SqliteStorage):
/// - deletes are not atomic, see [`crate::kv::delete`];
/// - `put_link` only writes the live partition, so recreating a deleted link
///   leaves its old tombstone listed by `list_deleted`.
pub struct KvStorage<T> {
    table: T,
    clock: Arc<dyn Clock>,
}

impl<T: KvTable> KvStorage<T> {
    pub fn new(table: T) -> Self {
        Self::with_clock(table, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(table: T, clock: Arc<dyn Clock>) -> Self {
        Self { table, clock }
    }

    /// Returns a reference to the underlying table.
    pub fn table(&self) -> &T {
        &self.table
    }

    async fn read_live(&self, from: &str) -> Result<Option<Shortlink>> {
        match self.table.get_item(&Partition::Live.key(), from).await? {
            Some(item) => Ok(Some(
                unmarshal::<LinkItem>(item)?.into_link(&Partition::Live)?,
            )),
            None => Ok(None),
        }
    }

    async fn write<S: Serialize + Sync>(&self, record: &S) -> Result<()> {
        let item = marshal(record)?;
        self.table.put_item(item).await
    }

    async fn query_all(&self, partition: &Partition) -> Result<Vec<Item>> {
        let pk = partition.key();
        QueryPaginator::new(&self.table, &pk).collect_all().await
    }

    async fn links_in(&self, partition: Partition, operation: &str) -> Result<Vec<Shortlink>> {
        trace!(partition = %partition, "listing links");

        let items = self
            .query_all(&partition)
            .await
            .map_err(|e| with_context(e, operation, ""))?;

        items
            .into_iter()
            .map(|item| unmarshal::<LinkItem>(item)?.into_link(&partition))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| with_context(e, operation, ""))
    }
}

#[async_trait]
impl<T: KvTable> ReadStorage for KvStorage<T> {
    async fn get_link(&self, from: &str) -> Result<Option<Shortlink>> {
        trace!(from = %from, "loading shortlink");

        self.read_live(from)
            .await
            .map_err(|e| with_context(e, "get_link", from))
    }

    async fn list_links(&self) -> Result<Vec<Shortlink>> {
        self.links_in(Partition::Live, "list_links").await
    }
}

#[async_trait]
impl<T: KvTable> Storage for KvStorage<T> {
    async fn put_link(&self, link: Shortlink) -> Result<()> {
        ensure_key("put_link", &link.from)?;
        debug!(from = %link.from, "writing live item");

        self.write(&LinkItem::new(&Partition::Live, &link))
            .await
            .map_err(|e| with_context(e, "put_link", &link.from))
    }

    async fn delete_link(&self, from: &str, who: &str) -> Result<()> {
        ensure_key("delete_link", from)?;
        debug!(from = %from, who = %who, "soft-deleting shortlink");

        DeleteProcedure::new(&self.table, self.clock.as_ref(), from, who)
            .run()
            .await
            .map(|_| ())
            .map_err(|e| with_context(e, "delete_link", from))
    }

    async fn list_history(&self, from: &str) -> Result<Vec<History>> {
        trace!(from = %from, "loading history");

        let items = self
            .query_all(&Partition::history(from))
            .await
            .map_err(|e| with_context(e, "list_history", from))?;

        items
            .into_iter()
            .map(|item| unmarshal::<HistoryItem>(item)?.into_history())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| with_context(e, "list_history", from))
    }

    async fn append_history(&self, entry: History) -> Result<()> {
        ensure_key("append_history", &entry.from)?;
        let when = entry.when.unwrap_or_else(|| self.clock.now());
        debug!(from = %entry.from, when = %when, "writing history item");

        insert_history(&self.table, &entry, when)
            .await
            .map(|_| ())
            .map_err(|e| with_context(e, "append_history", &entry.from))
    }

    fn deleted_links(&self) -> Option<&dyn DeletedLinks> {
        Some(self)
    }
}

#[async_trait]
impl<T: KvTable> DeletedLinks for KvStorage<T> {
    async fn list_deleted(&self) -> Result<Vec<Tombstone>> {
        self.links_in(Partition::Tombstone, "list_deleted").await
    }
}
