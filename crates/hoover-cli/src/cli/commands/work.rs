//! `hoover work` – run image workers against the queue.

use anyhow::Result;
use hoover_core::config::HooverConfig;
use hoover_core::fetcher::CurlFetcher;
use hoover_core::materializer::ImageMaterializer;
use hoover_core::queue::WorkQueue;
use hoover_core::worker::{self, WorkerOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub async fn run_work(queue: &WorkQueue, cfg: &HooverConfig, drain: bool) -> Result<()> {
    let recovered = queue.recover_in_flight().await?;
    if recovered > 0 {
        tracing::info!("recovered {} in-flight item(s) from previous run", recovered);
    }

    let mut opts = WorkerOptions::from_config(cfg);
    opts.drain = drain;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing in-flight items");
            stop_signal.store(true, Ordering::Relaxed);
        }
    });

    let fetcher = Arc::new(CurlFetcher::new(&cfg.http));
    let materializer = Arc::new(ImageMaterializer::new(fetcher, cfg.create_folder_mode));
    let report = worker::run_workers(queue, materializer, opts, stop).await?;

    if report.total() == 0 {
        println!("No work items.");
    } else {
        println!(
            "acked {}  requeued {}  dead-lettered {}  rejected {}  crashed {}  queue errors {}",
            report.acked,
            report.requeued,
            report.dead_lettered,
            report.rejected,
            report.crashed,
            report.queue_errors
        );
    }
    Ok(())
}
