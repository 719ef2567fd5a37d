use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// XDG prefix shared by config, state and data directories.
pub const APP_PREFIX: &str = "pagehoover";

/// What the crawler does when publishing one image item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishFailurePolicy {
    /// Log the failure and keep publishing the remaining images.
    #[default]
    Continue,
    /// Stop the crawl and return the publish error.
    Abort,
}

/// Outbound HTTP settings (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Upper bound for a whole transfer (page or image).
    pub timeout_secs: u64,
    pub max_redirections: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 60,
            max_redirections: 10,
            user_agent: format!("pagehoover/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Work queue settings (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// SQLite file backing the queue. Defaults to `~/.local/state/pagehoover/queue.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Deliveries allowed per item before it is moved to the dead-letter state.
    pub max_deliveries: u32,
    /// Base delay in seconds for redelivery backoff.
    pub base_delay_secs: f64,
    /// Maximum redelivery delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_deliveries: 10,
            base_delay_secs: 1.0,
            max_delay_secs: 300,
        }
    }
}

impl QueueConfig {
    pub fn redelivery_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_deliveries.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/pagehoover/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooverConfig {
    /// Download root for saved pages and images. Defaults to `~/.local/share/pagehoover/downloads`.
    #[serde(default)]
    pub download_folder: Option<PathBuf>,
    /// Permission bits for directories created under the download root.
    pub create_folder_mode: u32,
    #[serde(default)]
    pub on_publish_failure: PublishFailurePolicy,
    /// Number of concurrent materializer workers.
    pub workers: usize,
    /// Sleep between queue polls when nothing is ready.
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

impl Default for HooverConfig {
    fn default() -> Self {
        Self {
            download_folder: None,
            create_folder_mode: 0o755,
            on_publish_failure: PublishFailurePolicy::Continue,
            workers: 4,
            poll_interval_ms: 500,
            http: HttpConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl HooverConfig {
    /// Configured download root, or the XDG data default.
    pub fn download_folder(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_folder {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
        Ok(xdg_dirs.get_data_home().join("downloads"))
    }

    /// Configured queue database path, or the XDG state default.
    pub fn queue_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.queue.path {
            return Ok(path.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
        Ok(xdg_dirs.get_state_home().join("queue.db"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX)?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HooverConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HooverConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HooverConfig = toml::from_str(&data)?;
    Ok(cfg)
}
