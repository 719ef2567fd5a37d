//! Durable image work queue (SQLite via sqlx).
//!
//! At-least-once delivery: a claimed item stays in the table until it is
//! acked. Failed deliveries come back after an exponential delay, and items
//! that keep failing (or cannot be decoded) end up dead-lettered.

pub mod db;
pub mod read;
pub mod types;
pub mod write;

pub use db::WorkQueue;
pub use types::*;

use std::future::Future;

use crate::item::ImageWorkItem;

/// Publish side of the work queue, as seen by the crawler.
pub trait WorkPublisher {
    fn publish(&self, item: &ImageWorkItem) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl WorkPublisher for WorkQueue {
    async fn publish(&self, item: &ImageWorkItem) -> anyhow::Result<()> {
        let id = self.publish_item(item).await?;
        tracing::debug!(id, url = %item.url, "published image work item");
        Ok(())
    }
}
