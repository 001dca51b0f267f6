use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The four ordered steps of a key-value soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeleteStep {
    ReadLive,
    WriteHistory,
    WriteTombstone,
    RemoveLive,
}

impl Display for DeleteStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeleteStep::ReadLive => "read-live",
            DeleteStep::WriteHistory => "write-history",
            DeleteStep::WriteTombstone => "write-tombstone",
            DeleteStep::RemoveLive => "remove-live",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid storage configuration: {0}")]
    Configuration(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored item is malformed: {0}")]
    Marshaling(String),
    #[error("delete of '{from}' stopped after step {completed}: {source}")]
    PartialDelete {
        from: String,
        completed: DeleteStep,
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Prefixes the error message with the operation (and key) that failed.
    ///
    /// `PartialDelete` already names its key and step, so it is returned as is.
    pub fn context(self, ctx: impl Display) -> Self {
        match self {
            Self::InvalidKey(msg) => Self::InvalidKey(format!("{ctx}: {msg}")),
            Self::Configuration(msg) => Self::Configuration(format!("{ctx}: {msg}")),
            Self::Unavailable(msg) => Self::Unavailable(format!("{ctx}: {msg}")),
            Self::Timeout(msg) => Self::Timeout(format!("{ctx}: {msg}")),
            Self::Query(msg) => Self::Query(format!("{ctx}: {msg}")),
            Self::Marshaling(msg) => Self::Marshaling(format!("{ctx}: {msg}")),
            partial @ Self::PartialDelete { .. } => partial,
        }
    }

    /// Whether the error signals a broken storage invariant rather than a
    /// transient or caller-side failure.
    ///
    /// A malformed item means something wrote outside the key scheme; callers
    /// should stop serving instead of retrying.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Marshaling(_) => true,
            Self::PartialDelete { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Rejects an empty `from` before a write reaches the engine.
pub fn ensure_key(operation: &str, from: &str) -> Result<()> {
    if from.is_empty() {
        return Err(StorageError::InvalidKey(format!(
            "{operation}: `from` must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message() {
        let err = StorageError::Unavailable("connection refused".to_string())
            .context("get_link(from=frew)");
        assert_eq!(
            err.to_string(),
            "storage backend unavailable: get_link(from=frew): connection refused"
        );
    }

    #[test]
    fn partial_delete_keeps_its_own_context() {
        let err = StorageError::PartialDelete {
            from: "frew".to_string(),
            completed: DeleteStep::WriteTombstone,
            source: Box::new(StorageError::Unavailable("reset".to_string())),
        };
        let wrapped = err.context("delete_link(from=frew)");
        assert_eq!(
            wrapped.to_string(),
            "delete of 'frew' stopped after step write-tombstone: storage backend unavailable: reset"
        );
    }

    #[test]
    fn marshaling_is_fatal() {
        assert!(StorageError::Marshaling("missing sk".into()).is_fatal());
        assert!(!StorageError::Query("syntax".into()).is_fatal());

        let partial = StorageError::PartialDelete {
            from: "x".to_string(),
            completed: DeleteStep::ReadLive,
            source: Box::new(StorageError::Marshaling("bad".into())),
        };
        assert!(partial.is_fatal());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(ensure_key("put_link", "").is_err());
        assert!(ensure_key("put_link", "go").is_ok());
    }
}
