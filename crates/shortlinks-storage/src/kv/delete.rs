//! Soft delete for tables without multi-item transactions.
//!
//! A delete touches three items (live link, history entry, tombstone) and
//! the table can only write one at a time, so the steps run in a fixed order:
//!
//! 1. [`DeleteStep::ReadLive`]: read the live item.
//! 2. [`DeleteStep::WriteHistory`]: write the sentinel history item.
//! 3. [`DeleteStep::WriteTombstone`]: copy the link into the tombstone
//!    partition.
//! 4. [`DeleteStep::RemoveLive`]: remove the live item.
//!
//! The tombstone is written before the live item is removed. If the
//! procedure stops part way (error, or the future is dropped), the link is
//! still live, or live and tombstoned at once; it is never gone from both
//! partitions. Readers running concurrently may observe that duplicate.
//!
//! When step 1 finds nothing live the history entry is still recorded (a
//! delete is always audited) but no tombstone is written, so a repeated or
//! concurrent delete cannot replace a tombstone with an empty copy.

use crate::kv::item::{marshal, unmarshal, LinkItem};
use crate::kv::key::Partition;
use crate::kv::storage::insert_history;
use crate::kv::table::KvTable;
use shortlinks_core::{Clock, DeleteStep, History, Result, Shortlink, StorageError};
use tracing::{debug, trace, warn};

/// What a completed delete found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The live link was moved to the tombstone partition.
    Tombstoned(Shortlink),
    /// Nothing was live; only the history entry was written.
    NotLive,
}

/// One run of the four-step delete against a table.
pub struct DeleteProcedure<'a, T: ?Sized> {
    table: &'a T,
    clock: &'a dyn Clock,
    from: &'a str,
    who: &'a str,
}

impl<'a, T: KvTable + ?Sized> DeleteProcedure<'a, T> {
    /// The steps in the order they run.
    pub const STEPS: [DeleteStep; 4] = [
        DeleteStep::ReadLive,
        DeleteStep::WriteHistory,
        DeleteStep::WriteTombstone,
        DeleteStep::RemoveLive,
    ];

    pub fn new(table: &'a T, clock: &'a dyn Clock, from: &'a str, who: &'a str) -> Self {
        Self {
            table,
            clock,
            from,
            who,
        }
    }

    pub async fn run(self) -> Result<DeleteOutcome> {
        let live_pk = Partition::Live.key();

        // Step 1 has not changed anything yet, so its failure is a plain error.
        let live = self.read_live(&live_pk).await?;
        trace!(from = %self.from, live = live.is_some(), "delete: read live item");

        self.write_history()
            .await
            .map_err(|e| self.partial(DeleteStep::ReadLive, e))?;
        trace!(from = %self.from, "delete: wrote history");

        let Some(link) = live else {
            debug!(from = %self.from, "delete: nothing live, history recorded only");
            return Ok(DeleteOutcome::NotLive);
        };

        self.write_tombstone(&link)
            .await
            .map_err(|e| self.partial(DeleteStep::WriteHistory, e))?;
        trace!(from = %self.from, "delete: wrote tombstone");

        self.table
            .delete_item(&live_pk, self.from)
            .await
            .map_err(|e| self.partial(DeleteStep::WriteTombstone, e))?;
        debug!(from = %self.from, "delete: removed live item");

        Ok(DeleteOutcome::Tombstoned(link))
    }

    async fn read_live(&self, live_pk: &str) -> Result<Option<Shortlink>> {
        match self.table.get_item(live_pk, self.from).await? {
            Some(item) => Ok(Some(unmarshal::<LinkItem>(item)?.into_link(&Partition::Live)?)),
            None => Ok(None),
        }
    }

    async fn write_history(&self) -> Result<()> {
        let entry = History::deleted(self.from, self.who);
        insert_history(self.table, &entry, self.clock.now())
            .await
            .map(|_| ())
    }

    async fn write_tombstone(&self, link: &Shortlink) -> Result<()> {
        let item = marshal(&LinkItem::new(&Partition::Tombstone, link))?;
        self.table.put_item(item).await
    }

    fn partial(&self, completed: DeleteStep, source: StorageError) -> StorageError {
        warn!(
            from = %self.from,
            completed = %completed,
            error = %source,
            "delete stopped part way"
        );
        StorageError::PartialDelete {
            from: self.from.to_string(),
            completed,
            source: Box::new(source),
        }
    }
}
