//! Queue read operations: counts and dead-letter listing.

use anyhow::Result;
use sqlx::Row;

use super::db::WorkQueue;
use super::types::{DeadItem, ItemState, QueueStats};

impl WorkQueue {
    /// Count items per state.
    pub async fn stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            r#"
            SELECT state, COUNT(*) AS n
            FROM work_items
            GROUP BY state
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = QueueStats::default();
        for row in rows {
            let state: String = row.get("state");
            let n = row.get::<i64, _>("n").max(0) as u64;
            match ItemState::from_str(&state) {
                ItemState::Ready => stats.ready += n,
                ItemState::InFlight => stats.in_flight += n,
                ItemState::Dead => stats.dead += n,
            }
        }
        Ok(stats)
    }

    /// Dead-lettered items, oldest first.
    pub async fn list_dead(&self) -> Result<Vec<DeadItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, payload, deliveries, last_error, updated_at
            FROM work_items
            WHERE state = 'dead'
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DeadItem {
                id: row.get("id"),
                payload: row.get("payload"),
                deliveries: row.get::<i64, _>("deliveries").max(0) as u32,
                last_error: row.get("last_error"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    /// State of one row, `None` once it has been acked.
    pub async fn item_state(&self, id: super::ItemId) -> Result<Option<ItemState>> {
        let row = sqlx::query("SELECT state FROM work_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| ItemState::from_str(&row.get::<String, _>("state"))))
    }
}
