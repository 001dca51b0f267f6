use crate::kv::item::{item_key, Item};
use crate::kv::memory::DEFAULT_PAGE_SIZE;
use crate::kv::table::{KvTable, Page};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use shortlinks_core::{Result, StorageError};
use tracing::{debug, trace, warn};

pub const DEFAULT_KEY_PREFIX: &str = "shortlinks:";

/// A Redis-backed [`KvTable`].
///
/// Each partition `pk` maps to two Redis keys:
/// - `{prefix}idx:{pk}`: a sorted set of sort keys, all with score 0, so
///   `ZRANGEBYLEX` walks them in byte order;
/// - `{prefix}item:{pk}`: a hash from sort key to the JSON-encoded item.
///
/// Writes to one item update both keys inside a `MULTI` block. Nothing spans
/// more than one item.
#[derive(Clone)]
pub struct RedisTable {
    conn: MultiplexedConnection,
    key_prefix: String,
    page_size: usize,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        StorageError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Query(message)
    }
}

impl RedisTable {
    /// Creates a table on an existing connection with the default prefix and
    /// page size.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a table whose Redis keys all start with `key_prefix`.
    pub fn with_prefix(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many items a query page holds.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Opens a multiplexed connection to `redis_url`.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| map_redis_error("failed to open Redis client", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn index_key(&self, pk: &str) -> String {
        format!("{}idx:{}", self.key_prefix, pk)
    }

    fn items_key(&self, pk: &str) -> String {
        format!("{}item:{}", self.key_prefix, pk)
    }
}

fn decode(raw: &str) -> Result<Item> {
    serde_json::from_str::<Item>(raw)
        .map_err(|e| StorageError::Marshaling(format!("invalid stored item: {e}")))
}

#[async_trait]
impl KvTable for RedisTable {
    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>> {
        trace!(pk = %pk, sk = %sk, "fetching item from Redis");

        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("HGET")
            .arg(self.items_key(pk))
            .arg(sk)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to fetch item", e))?;

        raw.as_deref().map(decode).transpose()
    }

    async fn put_item(&self, item: Item) -> Result<()> {
        let (pk, sk) = item_key(&item)?;
        let json = serde_json::to_string(&item)
            .map_err(|e| StorageError::Marshaling(format!("failed to encode item: {e}")))?;
        trace!(pk = %pk, sk = %sk, "writing item to Redis");

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("ZADD")
            .arg(self.index_key(pk))
            .arg(0)
            .arg(sk)
            .ignore()
            .cmd("HSET")
            .arg(self.items_key(pk))
            .arg(sk)
            .arg(json)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| {
                warn!(pk = %pk, sk = %sk, error = %e, "Redis error on put");
                map_redis_error("failed to write item", e)
            })?;

        debug!(pk = %pk, sk = %sk, "stored item in Redis");
        Ok(())
    }

    async fn put_item_if_absent(&self, item: Item) -> Result<bool> {
        let (pk, sk) = item_key(&item)?;
        let json = serde_json::to_string(&item)
            .map_err(|e| StorageError::Marshaling(format!("failed to encode item: {e}")))?;
        trace!(pk = %pk, sk = %sk, "conditionally writing item to Redis");

        // HSETNX decides; ZADD NX never touches an indexed member.
        let mut conn = self.conn.clone();
        let (inserted,): (i64,) = redis::pipe()
            .atomic()
            .cmd("HSETNX")
            .arg(self.items_key(pk))
            .arg(sk)
            .arg(json)
            .cmd("ZADD")
            .arg(self.index_key(pk))
            .arg("NX")
            .arg(0)
            .arg(sk)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(pk = %pk, sk = %sk, error = %e, "Redis error on conditional put");
                map_redis_error("failed to write item", e)
            })?;

        debug!(pk = %pk, sk = %sk, inserted = inserted == 1, "conditional put in Redis");
        Ok(inserted == 1)
    }

    async fn delete_item(&self, pk: &str, sk: &str) -> Result<()> {
        trace!(pk = %pk, sk = %sk, "removing item from Redis");

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("ZREM")
            .arg(self.index_key(pk))
            .arg(sk)
            .ignore()
            .cmd("HDEL")
            .arg(self.items_key(pk))
            .arg(sk)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| {
                warn!(pk = %pk, sk = %sk, error = %e, "Redis error on delete");
                map_redis_error("failed to delete item", e)
            })
    }

    async fn query(&self, pk: &str, exclusive_start: Option<&str>) -> Result<Page> {
        let min = match exclusive_start {
            Some(start) => format!("({start}"),
            None => "-".to_string(),
        };

        let mut conn = self.conn.clone();
        let sort_keys: Vec<String> = redis::cmd("ZRANGEBYLEX")
            .arg(self.index_key(pk))
            .arg(min)
            .arg("+")
            .arg("LIMIT")
            .arg(0)
            .arg(self.page_size)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to scan partition index", e))?;

        if sort_keys.is_empty() {
            return Ok(Page::default());
        }

        let raw: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(self.items_key(pk))
            .arg(&sort_keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to load partition items", e))?;

        let mut items = Vec::with_capacity(raw.len());
        for (sk, value) in sort_keys.iter().zip(raw) {
            match value {
                Some(json) => items.push(decode(&json)?),
                // removed between the two reads
                None => trace!(pk = %pk, sk = %sk, "index entry without item"),
            }
        }

        let last_evaluated_key = if sort_keys.len() == self.page_size {
            sort_keys.last().cloned()
        } else {
            None
        };

        Ok(Page {
            items,
            last_evaluated_key,
        })
    }
}
