use crate::kv::{KvStorage, MemoryTable, RedisTable};
use crate::sqlite::SqliteStorage;
use clap::{Args, ValueEnum};
use shortlinks_core::{Result, Storage, StorageError};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::info;

pub const STORAGE_BACKEND_ENV: &str = "SHORTLINKS_STORAGE_BACKEND";
pub const SQLITE_DSN_ENV: &str = "SHORTLINKS_SQLITE_DSN";
pub const REDIS_URL_ENV: &str = "SHORTLINKS_REDIS_URL";
pub const KV_PREFIX_ENV: &str = "SHORTLINKS_KV_PREFIX";
pub const KV_PAGE_SIZE_ENV: &str = "SHORTLINKS_KV_PAGE_SIZE";

pub const DEFAULT_SQLITE_DSN: &str = "sqlite://shortlinks.db?mode=rwc";
pub const DEFAULT_KV_PREFIX: &str = crate::kv::redis::DEFAULT_KEY_PREFIX;
pub const DEFAULT_KV_PAGE_SIZE: usize = crate::kv::memory::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "sqlite")]
    Sqlite,
    #[value(name = "redis")]
    Redis,
    #[value(name = "in-memory")]
    InMemory,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
            StorageBackendArg::Redis => write!(f, "redis"),
            StorageBackendArg::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Storage selection, meant to be `#[command(flatten)]`ed into a binary's
/// parser.
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = SQLITE_DSN_ENV, default_value = DEFAULT_SQLITE_DSN)]
    pub sqlite_dsn: String,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    /// Prefix of every Redis key the KV engine writes.
    #[arg(long, env = KV_PREFIX_ENV, default_value = DEFAULT_KV_PREFIX)]
    pub kv_prefix: String,

    /// Items per page when listing a KV partition.
    #[arg(
        long,
        env = KV_PAGE_SIZE_ENV,
        default_value_t = DEFAULT_KV_PAGE_SIZE,
        value_parser = clap::value_parser!(usize)
    )]
    pub kv_page_size: usize,
}

/// Builds the backend selected by `args`.
pub async fn open(args: &StorageArgs) -> Result<Arc<dyn Storage>> {
    info!(
        storage_backend = %args.storage,
        kv_page_size = args.kv_page_size,
        "opening storage backend"
    );

    let storage: Arc<dyn Storage> = match args.storage {
        StorageBackendArg::Sqlite => Arc::new(SqliteStorage::connect(&args.sqlite_dsn).await?),
        StorageBackendArg::Redis => {
            let redis_url = args.redis_url.as_deref().ok_or_else(|| {
                StorageError::Configuration(
                    "redis url is required when storage backend is redis".to_string(),
                )
            })?;
            let table = RedisTable::connect(redis_url, args.kv_prefix.as_str())
                .await?
                .page_size(args.kv_page_size);
            Arc::new(KvStorage::new(table))
        }
        StorageBackendArg::InMemory => Arc::new(KvStorage::new(MemoryTable::with_page_size(
            args.kv_page_size.max(1),
        ))),
    };

    Ok(storage)
}
