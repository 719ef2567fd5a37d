//! `hoover revive` – put dead-lettered items back in the queue.

use anyhow::Result;
use hoover_core::queue::WorkQueue;

pub async fn run_revive(queue: &WorkQueue) -> Result<()> {
    let n = queue.revive_dead().await?;
    if n == 0 {
        println!("No dead-lettered items.");
    } else {
        println!("Revived {} item(s).", n);
    }
    Ok(())
}
