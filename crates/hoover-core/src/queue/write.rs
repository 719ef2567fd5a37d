//! Queue write operations: publish, claim, ack, requeue, reject, recovery.

use anyhow::Result;
use sqlx::Row;

use super::db::{unix_millis, WorkQueue};
use super::types::{Delivery, ItemId, RequeueOutcome};
use crate::item::ImageWorkItem;
use crate::retry::{ErrorKind, RetryDecision, RetryPolicy};

impl WorkQueue {
    /// Append a ready item. Returns its row id.
    pub async fn publish_item(&self, item: &ImageWorkItem) -> Result<ItemId> {
        self.publish_payload(&item.to_json()?).await
    }

    /// Append a raw payload. Exposed so malformed-message handling can be exercised.
    pub async fn publish_payload(&self, payload: &str) -> Result<ItemId> {
        let now = unix_millis();
        let id = sqlx::query(
            r#"
            INSERT INTO work_items (
                payload, state, deliveries, available_at, last_error, created_at, updated_at
            ) VALUES (?1, 'ready', 0, ?2, NULL, ?2, ?2)
            "#,
        )
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Atomically claim the oldest ready item whose delay has passed.
    ///
    /// A single UPDATE ... RETURNING, so concurrent workers (or processes)
    /// never claim the same row.
    pub async fn claim_next(&self) -> Result<Option<Delivery>> {
        let now = unix_millis();
        let row = sqlx::query(
            r#"
            UPDATE work_items
            SET state = 'in_flight',
                deliveries = deliveries + 1,
                updated_at = ?1
            WHERE id = (
                SELECT id FROM work_items
                WHERE state = 'ready' AND available_at <= ?1
                ORDER BY available_at ASC, id ASC
                LIMIT 1
            )
            RETURNING id, payload, deliveries
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Delivery {
            id: row.get("id"),
            payload: row.get("payload"),
            deliveries: row.get::<i64, _>("deliveries").max(0) as u32,
        }))
    }

    /// Acknowledge: the item is done and leaves the queue.
    pub async fn ack(&self, id: ItemId) -> Result<()> {
        sqlx::query("DELETE FROM work_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Return a failed delivery to the queue, delayed by the policy's backoff,
    /// or dead-letter it once its deliveries reach `policy.max_attempts`.
    pub async fn requeue(
        &self,
        id: ItemId,
        error: &str,
        kind: ErrorKind,
        policy: &RetryPolicy,
    ) -> Result<RequeueOutcome> {
        let now = unix_millis();
        // The row is in flight and owned by the caller until this update lands.
        let row = sqlx::query("SELECT deliveries FROM work_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            anyhow::bail!("work item {} not found", id);
        };
        let deliveries = row.get::<i64, _>("deliveries").max(0) as u32;

        let outcome = match policy.decide(deliveries, kind) {
            RetryDecision::NoRetry => {
                sqlx::query(
                    r#"
                    UPDATE work_items
                    SET state = 'dead',
                        last_error = ?1,
                        updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(error)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
                RequeueOutcome::DeadLettered
            }
            RetryDecision::RetryAfter(delay) => {
                sqlx::query(
                    r#"
                    UPDATE work_items
                    SET state = 'ready',
                        available_at = ?1,
                        last_error = ?2,
                        updated_at = ?3
                    WHERE id = ?4
                    "#,
                )
                .bind(now + delay.as_millis() as i64)
                .bind(error)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
                RequeueOutcome::Scheduled(delay)
            }
        };
        Ok(outcome)
    }

    /// Dead-letter without redelivery (payload can never be processed).
    pub async fn reject(&self, id: ItemId, error: &str) -> Result<()> {
        let now = unix_millis();
        sqlx::query(
            r#"
            UPDATE work_items
            SET state = 'dead',
                last_error = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset items left `in_flight` (e.g. by a crashed worker) to ready.
    /// Only call when no other worker process is running on this queue.
    /// Returns the number of items reset.
    pub async fn recover_in_flight(&self) -> Result<u64> {
        let now = unix_millis();
        let r = sqlx::query(
            r#"
            UPDATE work_items
            SET state = 'ready',
                available_at = ?1,
                updated_at = ?1
            WHERE state = 'in_flight'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Move every dead item back to ready with a fresh delivery budget.
    pub async fn revive_dead(&self) -> Result<u64> {
        let now = unix_millis();
        let r = sqlx::query(
            r#"
            UPDATE work_items
            SET state = 'ready',
                deliveries = 0,
                available_at = ?1,
                updated_at = ?1
            WHERE state = 'dead'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
