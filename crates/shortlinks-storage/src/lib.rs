//! Storage backends for shortlinks.
//!
//! Two engines implement the [`Storage`] contract from `shortlinks_core`:
//!
//! - [`SqliteStorage`]: relational tables with a nullable `deleted` marker;
//!   deletes run in one transaction.
//! - [`KvStorage`]: a single partition/sort-key table holding live links,
//!   tombstones and history side by side; deletes are a non-atomic
//!   four-step procedure (see [`kv::delete`]).
//!
//! [`open`] picks one of them from [`StorageArgs`].

pub mod config;
pub mod kv;
pub mod sqlite;

pub use config::{open, StorageArgs, StorageBackendArg};
pub use kv::{KvStorage, KvTable, MemoryTable, RedisTable};
pub use shortlinks_core::{
    DeletedLinks, History, ReadStorage, Shortlink, Storage, StorageError, Tombstone,
};
pub use sqlite::SqliteStorage;

use tracing::{error, warn};

/// Adds operation context to an engine error and logs it.
///
/// Fatal errors (malformed stored data) are logged at `error` level since
/// they mean something wrote outside the expected schema or key scheme.
pub(crate) fn with_context(err: StorageError, operation: &str, from: &str) -> StorageError {
    let ctx = if from.is_empty() {
        operation.to_string()
    } else {
        format!("{operation}(from={from})")
    };
    let err = err.context(ctx);

    if err.is_fatal() {
        error!(operation, from = %from, error = %err, "stored data violates the storage layout");
    } else {
        warn!(operation, from = %from, error = %err, "storage operation failed");
    }
    err
}
