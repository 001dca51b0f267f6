use crate::error::Result;
use crate::model::{History, Shortlink, Tombstone};
use crate::path;
use crate::storage::{ReadStorage, Storage};
use crate::suggest::{self, DEFAULT_SUGGESTIONS};
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The name is live; redirect to this URL.
    Redirect(String),
    /// Nothing is registered under the name.
    NotFound {
        name: String,
        suggestions: Vec<Shortlink>,
    },
}

/// The operations the HTTP handlers perform, expressed against the storage
/// contract only.
///
/// The service never knows which backend it talks to; optional features
/// such as the deleted-links page are discovered through
/// [`Storage::deleted_links`].
#[derive(Clone)]
pub struct LinkService {
    storage: Arc<dyn Storage>,
    suggestions: usize,
}

impl LinkService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            suggestions: DEFAULT_SUGGESTIONS,
        }
    }

    /// Overrides how many suggestions a miss returns.
    pub fn with_suggestions(mut self, suggestions: usize) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Resolves `/name/suffix...` to a redirect target, or to a ranked list
    /// of similar names when `name` is not live.
    pub async fn resolve(&self, request_path: &str) -> Result<Resolution> {
        let (name, suffix) = path::split(request_path);
        trace!(name = %name, suffix = %suffix, "resolving path");

        if let Some(link) = self.storage.get_link(name).await? {
            return Ok(Resolution::Redirect(link.expand(suffix)));
        }

        debug!(name = %name, "no live link, ranking suggestions");
        let links = self.storage.list_links().await?;
        Ok(Resolution::NotFound {
            name: name.to_string(),
            suggestions: suggest::rank(links, name, self.suggestions),
        })
    }

    pub async fn link(&self, from: &str) -> Result<Option<Shortlink>> {
        self.storage.get_link(from).await
    }

    pub async fn links(&self) -> Result<Vec<Shortlink>> {
        self.storage.list_links().await
    }

    /// Creates or updates a link on behalf of `who`.
    pub async fn save(&self, link: Shortlink, who: &str) -> Result<()> {
        debug!(from = %link.from, who = %who, "saving link");
        self.storage.save_link(link, who).await
    }

    pub async fn delete(&self, from: &str, who: &str) -> Result<()> {
        debug!(from = %from, who = %who, "deleting link");
        self.storage.delete_link(from, who).await
    }

    pub async fn history(&self, from: &str) -> Result<Vec<History>> {
        self.storage.list_history(from).await
    }

    /// Whether the backend can enumerate deleted links.
    pub fn supports_deleted(&self) -> bool {
        self.storage.deleted_links().is_some()
    }

    /// Lists tombstones, or `None` when the backend has no such capability.
    pub async fn deleted(&self) -> Result<Option<Vec<Tombstone>>> {
        match self.storage.deleted_links() {
            Some(deleted) => Ok(Some(deleted.list_deleted().await?)),
            None => Ok(None),
        }
    }
}
