//! `hoover status` – queue counts per state.

use anyhow::Result;
use hoover_core::queue::WorkQueue;

pub async fn run_status(queue: &WorkQueue) -> Result<()> {
    let stats = queue.stats().await?;
    println!("{:<10} {}", "STATE", "ITEMS");
    println!("{:<10} {}", "ready", stats.ready);
    println!("{:<10} {}", "in_flight", stats.in_flight);
    println!("{:<10} {}", "dead", stats.dead);
    Ok(())
}
