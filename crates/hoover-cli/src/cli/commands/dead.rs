//! `hoover dead` – list dead-lettered items.

use anyhow::Result;
use hoover_core::item::ImageWorkItem;
use hoover_core::queue::WorkQueue;

pub async fn run_dead(queue: &WorkQueue) -> Result<()> {
    let items = queue.list_dead().await?;
    if items.is_empty() {
        println!("No dead-lettered items.");
        return Ok(());
    }
    println!("{:<6} {:<10} {:<24} {}", "ID", "DELIVERIES", "ERROR", "URL");
    for d in items {
        // Malformed payloads are listed raw.
        let target = ImageWorkItem::from_json(&d.payload)
            .map(|item| item.url)
            .unwrap_or(d.payload);
        println!(
            "{:<6} {:<10} {:<24} {}",
            d.id,
            d.deliveries,
            d.last_error.as_deref().unwrap_or("-"),
            target
        );
    }
    Ok(())
}
