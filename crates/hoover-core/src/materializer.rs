//! Image materializer: the queue consumer's per-item work.
//!
//! Download the image (unless it is already on disk), then patch the saved
//! page so it points at the local copy. Safe to run any number of times for
//! the same item: the download short-circuits on an existing file and a
//! patch that finds nothing to replace is a no-op.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fetcher::{FetchError, HttpFetcher};
use crate::item::ImageWorkItem;
use crate::patch::{self, PatchLocks};
use crate::retry::ErrorKind;
use crate::storage::{self, ImageWrite};

/// What the queue runtime must do with the delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Done; acknowledge and drop the message.
    Ack,
    /// Image could not be fetched; redeliver later.
    Requeue { reason: String, kind: ErrorKind },
}

/// Outcome of the download step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// File was already at the save path; nothing fetched.
    AlreadyPresent,
    /// Fetched and written (byte count).
    Downloaded(u64),
    /// Fetch failed or returned nothing usable.
    Failed { reason: String, kind: ErrorKind },
}

impl DownloadStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, DownloadStatus::Failed { .. })
    }
}

pub struct ImageMaterializer {
    fetcher: Arc<dyn HttpFetcher>,
    create_folder_mode: u32,
    locks: PatchLocks,
}

impl ImageMaterializer {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, create_folder_mode: u32) -> Self {
        Self {
            fetcher,
            create_folder_mode,
            locks: PatchLocks::new(),
        }
    }

    /// Process one delivered item.
    ///
    /// `Ok(Requeue)` when the image could not be fetched. `Err` for
    /// filesystem failures (directory, image write, page patch); the runtime
    /// requeues those too.
    pub async fn process(&self, item: &ImageWorkItem) -> Result<Decision> {
        let save_path = PathBuf::from(&item.save_path);
        if let DownloadStatus::Failed { reason, kind } =
            self.download_image_to(&item.url, &save_path).await?
        {
            return Ok(Decision::Requeue { reason, kind });
        }

        let html_path = PathBuf::from(&item.saved_html_file);
        let _guard = self.locks.lock(&html_path).await;
        let url = item.url.clone();
        let save = item.save_path.clone();
        let src_ref = item.src_ref.clone();
        let page = html_path.clone();
        let replaced = tokio::task::spawn_blocking(move || {
            patch::patch_saved_page(&page, &url, &save, src_ref.as_deref())
        })
        .await
        .map_err(|e| anyhow::anyhow!("patch task join: {}", e))??;

        if replaced == 0 {
            tracing::debug!(page = %html_path.display(), url = %item.url, "nothing to patch (already patched?)");
        } else {
            tracing::info!(page = %html_path.display(), url = %item.url, replaced, "saved page patched");
        }
        Ok(Decision::Ack)
    }

    /// Download `url` to `save_path`, skipping the fetch when the file exists.
    pub async fn download_image_to(&self, url: &str, save_path: &Path) -> Result<DownloadStatus> {
        if tokio::fs::try_exists(save_path).await.unwrap_or(false) {
            tracing::info!(path = %save_path.display(), "image already exists");
            return Ok(DownloadStatus::AlreadyPresent);
        }

        let folder = save_path
            .parent()
            .with_context(|| format!("no parent directory for {}", save_path.display()))?
            .to_path_buf();
        let mode = self.create_folder_mode;
        tokio::task::spawn_blocking(move || storage::ensure_dir(&folder, mode))
            .await
            .map_err(|e| anyhow::anyhow!("mkdir task join: {}", e))??;

        tracing::info!(url, "image download started");
        let fetcher = Arc::clone(&self.fetcher);
        let fetch_url = url.to_string();
        let fetched = tokio::task::spawn_blocking(move || {
            let resp = fetcher.get(&fetch_url)?;
            if resp.status == 404 || !resp.is_success() {
                return Err(FetchError::Status(resp.status));
            }
            if resp.body.is_empty() {
                return Err(FetchError::EmptyBody);
            }
            Ok(resp.body)
        })
        .await
        .map_err(|e| anyhow::anyhow!("image fetch task join: {}", e))?;

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url, error = %e, kind = ?e.kind(), "image not downloaded");
                return Ok(DownloadStatus::Failed {
                    reason: e.to_string(),
                    kind: e.kind(),
                });
            }
        };

        let target = save_path.to_path_buf();
        let written = tokio::task::spawn_blocking(move || storage::write_image(&target, &body))
            .await
            .map_err(|e| anyhow::anyhow!("image write task join: {}", e))??;
        match written {
            ImageWrite::Written(n) => {
                tracing::info!(path = %save_path.display(), bytes = n, "image downloaded");
                Ok(DownloadStatus::Downloaded(n))
            }
            ImageWrite::AlreadyPresent => {
                tracing::info!(path = %save_path.display(), "image written concurrently, keeping existing file");
                Ok(DownloadStatus::AlreadyPresent)
            }
        }
    }
}
