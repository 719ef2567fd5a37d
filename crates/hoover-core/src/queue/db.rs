//! SQLite-backed queue handle: connection and migrations.
//!
//! Item operations live in `write` and `read`.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::HooverConfig;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Durable at-least-once work queue stored in one SQLite file.
///
/// Producer (`hoover crawl`) and consumers (`hoover work`) may be separate
/// processes; SQLite serializes their writes.
#[derive(Clone)]
pub struct WorkQueue {
    pub(crate) pool: Pool<Sqlite>,
}

impl WorkQueue {
    /// Open the queue configured in `cfg` (or the XDG state default).
    pub async fn open(cfg: &HooverConfig) -> Result<Self> {
        Self::open_at(cfg.queue_path()?).await
    }

    /// Open (or create) the queue at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let queue = WorkQueue { pool };
        queue.migrate().await?;
        Ok(queue)
    }

    async fn migrate(&self) -> Result<()> {
        // - `payload` is the JSON-encoded ImageWorkItem.
        // - `available_at` (unix millis) delays redelivery for backoff.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS work_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                state TEXT NOT NULL,
                deliveries INTEGER NOT NULL DEFAULT 0,
                available_at INTEGER NOT NULL,
                last_error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS work_items_ready
            ON work_items (state, available_at, id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current time as Unix milliseconds (for queue timestamps).
pub(crate) fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
/// Open an in-memory queue for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<WorkQueue> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let queue = WorkQueue { pool };
    queue.migrate().await?;
    Ok(queue)
}
