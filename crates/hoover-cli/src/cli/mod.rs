//! CLI for pagehoover.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hoover_core::config;
use hoover_core::queue::WorkQueue;
use std::path::PathBuf;

use commands::{run_crawl, run_dead, run_revive, run_status, run_work};

/// Top-level CLI: crawl pages and materialize their images.
#[derive(Debug, Parser)]
#[command(name = "hoover")]
#[command(about = "pagehoover: save web pages and fetch their images through a work queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch a page, save it and queue one work item per image.
    Crawl {
        /// HTTP/HTTPS page URL.
        url: String,
        /// Save the page and images here instead of the configured folder.
        #[arg(long, value_name = "DIR")]
        download_folder: Option<PathBuf>,
    },

    /// Consume queued work items: download images and patch saved pages.
    Work {
        /// Concurrent deliveries (default from config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Exit once the queue has no ready items instead of waiting for more.
        #[arg(long)]
        drain: bool,
    },

    /// Show queue counts.
    Status,

    /// List dead-lettered work items.
    Dead,

    /// Move dead-lettered items back to ready with a fresh delivery budget.
    Revive,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let queue = WorkQueue::open(&cfg).await?;

        match cli.command {
            CliCommand::Crawl { url, download_folder } => {
                if download_folder.is_some() {
                    cfg.download_folder = download_folder;
                }
                run_crawl(&queue, &cfg, &url).await?;
            }
            CliCommand::Work { workers, drain } => {
                if let Some(n) = workers {
                    cfg.workers = n;
                }
                run_work(&queue, &cfg, drain).await?;
            }
            CliCommand::Status => run_status(&queue).await?,
            CliCommand::Dead => run_dead(&queue).await?,
            CliCommand::Revive => run_revive(&queue).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
