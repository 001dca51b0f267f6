use crate::with_context;
use async_trait::async_trait;
use jiff::Timestamp;
use shortlinks_core::error::{ensure_key, Result, StorageError};
use shortlinks_core::model::{decode_timestamp, encode_timestamp};
use shortlinks_core::{
    Clock, DeletedLinks, History, MonotonicClock, ReadStorage, Shortlink, Storage, Tombstone,
};
use sqlx::migrate::Migrator;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Database, Row};
use std::sync::Arc;
use tracing::{debug, trace};

static MIGRATOR: Migrator = sqlx::migrate!();

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;

/// SQLite implementation of the storage contract.
///
/// Links live in `shortlinks`; a non-null `deleted` column marks a tombstone,
/// so a name is always either live or deleted, never both. Recreating a
/// deleted name clears the marker in the same upsert. History rows are only
/// ever inserted.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    /// Creates a storage from an existing pool whose schema is already
    /// migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(MonotonicClock::new()))
    }

    /// Like [`SqliteStorage::new`] but with an explicit history clock.
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Opens a pool for `database_url` and applies pending migrations.
    ///
    /// In-memory databases are per connection, so they get a single
    /// connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| with_context(map_sqlx_error(e), "connect", ""))?;

        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(pool: &SqlitePool) -> Result<()> {
        MIGRATOR.run(pool).await.map_err(|e| {
            with_context(StorageError::Query(e.to_string()), "migrate", "")
        })
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StorageError::Marshaling(message),
        _ => StorageError::Query(message),
    }
}

fn link_from_row(row: &SqliteRow) -> Result<Shortlink> {
    Ok(Shortlink {
        from: row.try_get("from").map_err(map_sqlx_error)?,
        to: row.try_get("to").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<History> {
    let when: String = row.try_get("when").map_err(map_sqlx_error)?;

    Ok(History {
        from: row.try_get("from").map_err(map_sqlx_error)?,
        to: row.try_get("to").map_err(map_sqlx_error)?,
        when: Some(decode_timestamp(&when)?),
        who: row.try_get("who").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
    })
}

fn insert_history(entry: &History, when: Timestamp) -> SqliteQuery<'_> {
    sqlx::query(
        r#"
        INSERT INTO history ("from", "to", "when", "who", "description")
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.from.as_str())
    .bind(entry.to.as_str())
    .bind(encode_timestamp(when))
    .bind(entry.who.as_str())
    .bind(entry.description.as_str())
}

impl SqliteStorage {
    async fn links_where(&self, operation: &str, deleted: bool) -> Result<Vec<Shortlink>> {
        let sql = if deleted {
            r#"
            SELECT "from", "to", "description"
            FROM shortlinks
            WHERE "deleted" IS NOT NULL
            ORDER BY "from"
            "#
        } else {
            r#"
            SELECT "from", "to", "description"
            FROM shortlinks
            WHERE "deleted" IS NULL
            ORDER BY "from"
            "#
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| with_context(map_sqlx_error(e), operation, ""))?;

        rows.iter()
            .map(link_from_row)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| with_context(e, operation, ""))
    }
}

#[async_trait]
impl ReadStorage for SqliteStorage {
    async fn get_link(&self, from: &str) -> Result<Option<Shortlink>> {
        trace!(from = %from, "loading shortlink");

        let row = sqlx::query(
            r#"
            SELECT "from", "to", "description"
            FROM shortlinks
            WHERE "from" = ?
              AND "deleted" IS NULL
            "#,
        )
        .bind(from)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| with_context(map_sqlx_error(e), "get_link", from))?;

        let Some(row) = row else {
            return Ok(None);
        };

        link_from_row(&row)
            .map(Some)
            .map_err(|e| with_context(e, "get_link", from))
    }

    async fn list_links(&self) -> Result<Vec<Shortlink>> {
        self.links_where("list_links", false).await
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn put_link(&self, link: Shortlink) -> Result<()> {
        ensure_key("put_link", &link.from)?;
        debug!(from = %link.from, "upserting shortlink");

        sqlx::query(
            r#"
            INSERT INTO shortlinks ("from", "to", "description")
            VALUES (?, ?, ?)
            ON CONFLICT ("from") DO UPDATE SET
                "to"          = excluded."to",
                "deleted"     = NULL,
                "description" = excluded."description"
            "#,
        )
        .bind(link.from.as_str())
        .bind(link.to.as_str())
        .bind(link.description.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| with_context(map_sqlx_error(e), "put_link", &link.from))?;

        Ok(())
    }

    async fn delete_link(&self, from: &str, who: &str) -> Result<()> {
        ensure_key("delete_link", from)?;
        debug!(from = %from, who = %who, "soft-deleting shortlink");

        let now = self.clock.now();
        let fail = |e: sqlx::Error| with_context(map_sqlx_error(e), "delete_link", from);

        let mut tx = self.pool.begin().await.map_err(fail)?;

        let entry = History::deleted(from, who);
        insert_history(&entry, now)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        sqlx::query(
            r#"
            UPDATE shortlinks
            SET "deleted" = ?
            WHERE "from" = ?
              AND "deleted" IS NULL
            "#,
        )
        .bind(encode_timestamp(now))
        .bind(from)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;

        tx.commit().await.map_err(fail)
    }

    async fn list_history(&self, from: &str) -> Result<Vec<History>> {
        trace!(from = %from, "loading history");

        let rows = sqlx::query(
            r#"
            SELECT "from", "to", "when", "who", "description"
            FROM history
            WHERE "from" = ?
            ORDER BY "when", rowid
            "#,
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| with_context(map_sqlx_error(e), "list_history", from))?;

        rows.iter()
            .map(history_from_row)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| with_context(e, "list_history", from))
    }

    async fn append_history(&self, entry: History) -> Result<()> {
        ensure_key("append_history", &entry.from)?;
        let when = entry.when.unwrap_or_else(|| self.clock.now());
        debug!(from = %entry.from, when = %when, "appending history");

        insert_history(&entry, when)
            .execute(&self.pool)
            .await
            .map_err(|e| with_context(map_sqlx_error(e), "append_history", &entry.from))?;

        Ok(())
    }

    fn deleted_links(&self) -> Option<&dyn DeletedLinks> {
        Some(self)
    }
}

#[async_trait]
impl DeletedLinks for SqliteStorage {
    async fn list_deleted(&self) -> Result<Vec<Tombstone>> {
        self.links_where("list_deleted", true).await
    }
}
