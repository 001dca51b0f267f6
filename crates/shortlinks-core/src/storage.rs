use crate::error::Result;
use crate::model::{History, Shortlink, Tombstone};
use async_trait::async_trait;

/// A read-only view of a storage backend.
///
/// This is everything the public redirect server needs: resolving a single
/// name and listing the index.
#[async_trait]
pub trait ReadStorage: Send + Sync + 'static {
    /// Loads the live shortlink for `from`.
    /// Returns `None` if the name was never created or is deleted.
    async fn get_link(&self, from: &str) -> Result<Option<Shortlink>>;

    /// Lists all live shortlinks ordered by `from`.
    async fn list_links(&self) -> Result<Vec<Shortlink>>;
}

/// The full storage contract shared by every backend.
#[async_trait]
pub trait Storage: ReadStorage {
    /// Inserts or overwrites the live shortlink for `link.from`.
    ///
    /// Does not record history; see [`Storage::save_link`].
    async fn put_link(&self, link: Shortlink) -> Result<()>;

    /// Soft-deletes `from`, recording one sentinel history entry for `who`.
    async fn delete_link(&self, from: &str, who: &str) -> Result<()>;

    /// Loads every history entry for `from`, oldest first.
    async fn list_history(&self, from: &str) -> Result<Vec<History>>;

    /// Appends a history entry. The backend assigns `when` if it is unset.
    async fn append_history(&self, entry: History) -> Result<()>;

    /// Returns the deleted-links capability if this backend has one.
    ///
    /// Absence is a normal configuration: callers hide the feature.
    fn deleted_links(&self) -> Option<&dyn DeletedLinks> {
        None
    }

    /// Records a create/update by `who`: appends the history entry, then
    /// upserts the link.
    async fn save_link(&self, link: Shortlink, who: &str) -> Result<()> {
        self.append_history(History::for_link(&link, who)).await?;
        self.put_link(link).await
    }
}

/// Optional capability: enumerate tombstones.
#[async_trait]
pub trait DeletedLinks: Send + Sync {
    /// Lists all tombstones ordered by `from`.
    async fn list_deleted(&self) -> Result<Vec<Tombstone>>;
}
