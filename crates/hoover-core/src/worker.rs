//! Consumer runtime: claim deliveries and run the materializer on each.
//!
//! Keeps up to `workers` deliveries in flight at once; when one finishes
//! the next ready item is claimed. Every delivery resolves to ack, requeue
//! (with backoff, dead-letter once out of deliveries) or reject, so a bad
//! message never stops the loop.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HooverConfig;
use crate::item::ImageWorkItem;
use crate::materializer::{Decision, ImageMaterializer};
use crate::queue::{Delivery, RequeueOutcome, WorkQueue};
use crate::retry::{ErrorKind, RetryPolicy};

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub workers: usize,
    /// Sleep between polls when nothing is ready.
    pub poll_interval: Duration,
    /// Return once no ready items remain instead of polling forever.
    pub drain: bool,
    pub redelivery: RetryPolicy,
}

impl WorkerOptions {
    pub fn from_config(cfg: &HooverConfig) -> Self {
        Self {
            workers: cfg.workers.max(1),
            poll_interval: cfg.poll_interval(),
            drain: false,
            redelivery: cfg.queue.redelivery_policy(),
        }
    }
}

/// How one delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Acked,
    Requeued,
    DeadLettered,
    /// Payload could not be decoded; dead-lettered without redelivery.
    Rejected,
}

/// Totals for one `run_workers` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub acked: u32,
    pub requeued: u32,
    pub dead_lettered: u32,
    pub rejected: u32,
    /// Tasks that panicked; their items stay in flight until recovered.
    pub crashed: u32,
    /// Queue operations that failed (claim, ack, requeue, reject). A delivery
    /// whose settlement failed stays in flight until recovered.
    pub queue_errors: u32,
}

impl WorkerReport {
    fn record(&mut self, settled: Settled) {
        match settled {
            Settled::Acked => self.acked += 1,
            Settled::Requeued => self.requeued += 1,
            Settled::DeadLettered => self.dead_lettered += 1,
            Settled::Rejected => self.rejected += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.acked + self.requeued + self.dead_lettered + self.rejected + self.crashed + self.queue_errors
    }
}

/// Decode, process and settle one delivery.
///
/// Errors are queue (database) failures only; everything the materializer
/// reports is turned into a queue decision.
pub async fn handle_delivery(
    queue: &WorkQueue,
    materializer: &ImageMaterializer,
    delivery: Delivery,
    policy: &RetryPolicy,
) -> Result<Settled> {
    let item = match ImageWorkItem::from_json(&delivery.payload) {
        Ok(item) => item,
        Err(e) => {
            tracing::error!(id = delivery.id, error = %e, "malformed work item rejected");
            queue.reject(delivery.id, &e.to_string()).await?;
            return Ok(Settled::Rejected);
        }
    };

    tracing::debug!(id = delivery.id, delivery = delivery.deliveries, url = %item.url, "processing work item");
    let (reason, kind) = match materializer.process(&item).await {
        Ok(Decision::Ack) => {
            queue.ack(delivery.id).await?;
            return Ok(Settled::Acked);
        }
        Ok(Decision::Requeue { reason, kind }) => (reason, kind),
        Err(e) => {
            tracing::warn!(id = delivery.id, url = %item.url, error = %format!("{:#}", e), "work item failed");
            (format!("{:#}", e), ErrorKind::Other)
        }
    };

    match queue.requeue(delivery.id, &reason, kind, policy).await? {
        RequeueOutcome::Scheduled(delay) => {
            tracing::info!(
                id = delivery.id,
                url = %item.url,
                delivery = delivery.deliveries,
                delay_ms = delay.as_millis() as u64,
                "work item requeued"
            );
            Ok(Settled::Requeued)
        }
        RequeueOutcome::DeadLettered => {
            tracing::error!(
                id = delivery.id,
                url = %item.url,
                deliveries = delivery.deliveries,
                reason = %reason,
                "work item dead-lettered"
            );
            Ok(Settled::DeadLettered)
        }
    }
}

/// Run consumers until `stop` is set (or, in drain mode, until nothing is ready).
///
/// On stop no new items are claimed; deliveries already in flight finish.
/// Queue failures are logged and counted, then the loop carries on after a
/// poll interval; they never abort sibling deliveries.
pub async fn run_workers(
    queue: &WorkQueue,
    materializer: Arc<ImageMaterializer>,
    opts: WorkerOptions,
    stop: Arc<AtomicBool>,
) -> Result<WorkerReport> {
    let workers = opts.workers.max(1);
    let mut report = WorkerReport::default();
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        let stopping = stop.load(Ordering::Relaxed);
        let mut claim_failed = false;
        if !stopping {
            while join_set.len() < workers {
                let delivery = match queue.claim_next().await {
                    Ok(Some(delivery)) => delivery,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %format!("{:#}", e), "claim failed");
                        report.queue_errors += 1;
                        claim_failed = true;
                        break;
                    }
                };
                let queue = queue.clone();
                let materializer = Arc::clone(&materializer);
                let policy = opts.redelivery;
                join_set.spawn(async move {
                    handle_delivery(&queue, &materializer, delivery, &policy).await
                });
            }
        }

        if join_set.is_empty() {
            if stopping {
                break;
            }
            if opts.drain && !claim_failed {
                match queue.stats().await {
                    Ok(stats) if stats.ready == 0 => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %format!("{:#}", e), "queue stats failed");
                        report.queue_errors += 1;
                    }
                }
            }
            tokio::time::sleep(opts.poll_interval).await;
            continue;
        }

        // Wake on a finished task, or after a poll interval to pick up items
        // whose backoff expired while every slot was busy.
        tokio::select! {
            res = join_set.join_next() => {
                match res {
                    Some(Ok(Ok(settled))) => report.record(settled),
                    Some(Ok(Err(e))) => {
                        tracing::error!(error = %format!("{:#}", e), "settling delivery failed");
                        report.queue_errors += 1;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "worker task crashed");
                        report.crashed += 1;
                    }
                    None => {}
                }
            }
            _ = tokio::time::sleep(opts.poll_interval) => {}
        }
    }

    tracing::info!(
        acked = report.acked,
        requeued = report.requeued,
        dead = report.dead_lettered,
        rejected = report.rejected,
        crashed = report.crashed,
        queue_errors = report.queue_errors,
        "workers stopped"
    );
    Ok(report)
}
