//! `hoover crawl` – save a page and queue its images.

use anyhow::Result;
use hoover_core::config::HooverConfig;
use hoover_core::crawler::{self, CrawlOptions, PageCrawler};
use hoover_core::fetcher::CurlFetcher;
use hoover_core::queue::WorkQueue;
use std::sync::Arc;

pub async fn run_crawl(queue: &WorkQueue, cfg: &HooverConfig, url: &str) -> Result<()> {
    let options = CrawlOptions::from_config(cfg)?;
    let crawler = PageCrawler::new(Arc::new(CurlFetcher::new(&cfg.http)), queue.clone(), options);

    if crawler::start_crawl(&crawler, url).await {
        println!("Page \"{}\" is downloaded !", url);
        let stats = queue.stats().await?;
        println!("{} work item(s) pending. Run `hoover work` to fetch images.", stats.pending());
        Ok(())
    } else {
        anyhow::bail!("Page \"{}\" not downloaded (see log for details)", url)
    }
}
