//! Page crawler: fetch a page, save it, and enqueue one work item per image.
//!
//! The saved page is on disk before the first item is published, so a fast
//! consumer can never look for a page that does not exist yet.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::config::{HooverConfig, PublishFailurePolicy};
use crate::extract;
use crate::fetcher::HttpFetcher;
use crate::item::ImageWorkItem;
use crate::queue::WorkPublisher;
use crate::storage;
use crate::url_model;

/// Crawl settings taken from [`HooverConfig`].
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub download_folder: PathBuf,
    pub create_folder_mode: u32,
    pub on_publish_failure: PublishFailurePolicy,
}

impl CrawlOptions {
    pub fn from_config(cfg: &HooverConfig) -> Result<Self> {
        Ok(Self {
            download_folder: cfg.download_folder()?,
            create_folder_mode: cfg.create_folder_mode,
            on_publish_failure: cfg.on_publish_failure,
        })
    }
}

/// Counts for a crawl that saved its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub saved_page: PathBuf,
    /// `img src` values found in the page.
    pub images_found: usize,
    pub published: usize,
    /// References that could not be resolved to an http(s) URL.
    pub skipped: usize,
    /// Publish errors tolerated under [`PublishFailurePolicy::Continue`].
    pub publish_failures: usize,
}

/// Result of a crawl that did not hit a local error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Page unavailable (transport error or non-200). Nothing was written.
    NotFetched { reason: String },
    Crawled(CrawlReport),
}

impl CrawlOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CrawlOutcome::Crawled(_))
    }
}

pub struct PageCrawler<P> {
    fetcher: Arc<dyn HttpFetcher>,
    publisher: P,
    options: CrawlOptions,
}

impl<P: WorkPublisher> PageCrawler<P> {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, publisher: P, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            publisher,
            options,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Crawl one page.
    ///
    /// `Ok(NotFetched)` when the page could not be fetched; `Err` when saving
    /// the page fails, or when publishing fails under the `abort` policy.
    pub async fn crawl(&self, page_url: &str) -> Result<CrawlOutcome> {
        let page = match Url::parse(page_url.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            Ok(u) => {
                return Ok(CrawlOutcome::NotFetched {
                    reason: format!("unsupported scheme {}", u.scheme()),
                })
            }
            Err(e) => {
                return Ok(CrawlOutcome::NotFetched {
                    reason: format!("invalid URL: {}", e),
                })
            }
        };

        tracing::info!(page = %page, "crawl started");
        let fetcher = Arc::clone(&self.fetcher);
        let fetch_url = page.to_string();
        let fetched = tokio::task::spawn_blocking(move || fetcher.get(&fetch_url))
            .await
            .map_err(|e| anyhow::anyhow!("page fetch task join: {}", e))?;
        let body = match fetched {
            Ok(resp) if resp.status == 200 => resp.body,
            Ok(resp) => {
                tracing::warn!(page = %page, status = resp.status, "page not downloaded");
                return Ok(CrawlOutcome::NotFetched {
                    reason: format!("HTTP {}", resp.status),
                });
            }
            Err(e) => {
                tracing::warn!(page = %page, error = %e, "page not downloaded");
                return Ok(CrawlOutcome::NotFetched {
                    reason: e.to_string(),
                });
            }
        };

        // Items are consumed by other processes, possibly from another
        // working directory, so every published path is absolute.
        let folder = std::path::absolute(&self.options.download_folder).with_context(|| {
            format!("resolve download folder {}", self.options.download_folder.display())
        })?;
        let saved_page = self.save(&page, &folder, body.clone()).await?;
        tracing::info!(page = %page, saved = %saved_page.display(), bytes = body.len(), "page saved");

        let sources = extract::image_sources_from_bytes(&body);
        let mut report = CrawlReport {
            saved_page,
            images_found: sources.len(),
            published: 0,
            skipped: 0,
            publish_failures: 0,
        };

        for raw in &sources {
            let Some(item) = work_item(&page, raw, &folder, &report.saved_page) else {
                tracing::warn!(page = %page, src = %raw, "image reference skipped");
                report.skipped += 1;
                continue;
            };
            match self.publisher.publish(&item).await {
                Ok(()) => report.published += 1,
                Err(e) => match self.options.on_publish_failure {
                    PublishFailurePolicy::Continue => {
                        tracing::warn!(url = %item.url, error = %e, "publish failed, continuing");
                        report.publish_failures += 1;
                    }
                    PublishFailurePolicy::Abort => {
                        return Err(e.context(format!("publish {}", item.url)));
                    }
                },
            }
        }

        tracing::info!(
            page = %page,
            found = report.images_found,
            published = report.published,
            skipped = report.skipped,
            failures = report.publish_failures,
            "crawl finished"
        );
        Ok(CrawlOutcome::Crawled(report))
    }

    async fn save(&self, page: &Url, folder: &Path, body: Vec<u8>) -> Result<PathBuf> {
        let folder = folder.to_path_buf();
        let mode = self.options.create_folder_mode;
        let base = url_model::page_base_name(page);
        let now = chrono::Local::now().naive_local();
        tokio::task::spawn_blocking(move || {
            storage::ensure_dir(&folder, mode)?;
            storage::save_page(&folder, now, &base, &body)
        })
        .await
        .map_err(|e| anyhow::anyhow!("page save task join: {}", e))?
        .context("save page")
    }

}

fn work_item(page: &Url, raw: &str, folder: &Path, saved_page: &Path) -> Option<ImageWorkItem> {
    let url = url_model::resolve_image_url(page, raw)?;
    let save_path = url_model::image_save_path(folder, &url);
    let url = url.to_string();
    let src_ref = (raw != url).then(|| raw.to_string());
    Some(ImageWorkItem {
        url,
        save_path: save_path.to_string_lossy().into_owned(),
        saved_html_file: saved_page.to_string_lossy().into_owned(),
        src_ref,
    })
}

/// Trigger entry point: crawl `page_url` and report success as a boolean.
///
/// Every failure (unfetchable page, local error) is logged and folded into
/// `false`.
pub async fn start_crawl<P: WorkPublisher>(crawler: &PageCrawler<P>, page_url: &str) -> bool {
    match crawler.crawl(page_url).await {
        Ok(outcome) => outcome.is_ok(),
        Err(e) => {
            tracing::error!(page = page_url, error = %format!("{:#}", e), "crawl failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchError, FetchResponse};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StaticFetcher(HashMap<String, FetchResponse>);

    impl HttpFetcher for StaticFetcher {
        fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
            self.0.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }

    fn fetcher(pages: &[(&str, u32, &str)]) -> Arc<dyn HttpFetcher> {
        let map = pages
            .iter()
            .map(|(url, status, body)| {
                (
                    url.to_string(),
                    FetchResponse {
                        status: *status,
                        body: body.as_bytes().to_vec(),
                    },
                )
            })
            .collect();
        Arc::new(StaticFetcher(map))
    }

    /// Records published items; fails for URLs listed in `fail`.
    #[derive(Default)]
    struct Recorder {
        items: Mutex<Vec<ImageWorkItem>>,
        fail: Vec<String>,
        // Saved page must exist at publish time.
        page_existed: Mutex<Vec<bool>>,
    }

    impl WorkPublisher for Recorder {
        async fn publish(&self, item: &ImageWorkItem) -> anyhow::Result<()> {
            self.page_existed
                .lock()
                .unwrap()
                .push(std::path::Path::new(&item.saved_html_file).exists());
            if self.fail.contains(&item.url) {
                anyhow::bail!("broker unavailable");
            }
            self.items.lock().unwrap().push(item.clone());
            Ok(())
        }
    }

    fn options(dir: &std::path::Path, policy: PublishFailurePolicy) -> CrawlOptions {
        CrawlOptions {
            download_folder: dir.to_path_buf(),
            create_folder_mode: 0o755,
            on_publish_failure: policy,
        }
    }

    #[tokio::test]
    async fn afsy_scenario_publishes_one_item() {
        let dir = tempfile::tempdir().unwrap();
        let crawler = PageCrawler::new(
            fetcher(&[("http://afsy.fr/", 200, r#"<html><img src="logo.png"></html>"#)]),
            Recorder::default(),
            options(dir.path(), PublishFailurePolicy::Continue),
        );

        let outcome = crawler.crawl("http://afsy.fr/").await.unwrap();
        let CrawlOutcome::Crawled(report) = outcome else {
            panic!("expected crawl to succeed");
        };
        assert_eq!(report.published, 1);

        let name = report.saved_page.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-afsy.htm"), "{name}");
        assert_eq!(name.len(), "YYYYMMDD-HHMMSS-afsy.htm".len());
        let saved = std::fs::read(&report.saved_page).unwrap();
        assert!(saved.starts_with(storage::UTF8_BOM));

        let items = crawler.publisher().items.lock().unwrap().clone();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "http://afsy.fr/logo.png");
        assert_eq!(items[0].save_path, dir.path().join("logo.png").to_string_lossy());
        assert_eq!(items[0].saved_html_file, report.saved_page.to_string_lossy());
        assert_eq!(items[0].src_ref.as_deref(), Some("logo.png"));
        assert_eq!(*crawler.publisher().page_existed.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn non_200_page_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("downloads");
        let crawler = PageCrawler::new(
            fetcher(&[("http://e.com/gone.html", 500, "oops")]),
            Recorder::default(),
            options(&root, PublishFailurePolicy::Continue),
        );
        let outcome = crawler.crawl("http://e.com/gone.html").await.unwrap();
        assert_eq!(
            outcome,
            CrawlOutcome::NotFetched {
                reason: "HTTP 500".into()
            }
        );
        assert!(!root.exists());

        assert!(!crawler.crawl("http://e.com/missing").await.unwrap().is_ok());
        assert!(!crawler.crawl("not a url").await.unwrap().is_ok());
        assert!(!crawler.crawl("ftp://e.com/x").await.unwrap().is_ok());
        assert!(crawler.publisher().items.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolves_normalizes_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let html = r#"
            <img src="pic.jpg">
            <img src="http://cdn.example.com/a.png">
            <img src="/icons/x.webp">
            <img src="data:image/png;base64,AAAA">
            <img src=" spaced name.GIF ">
        "#;
        let crawler = PageCrawler::new(
            fetcher(&[("http://example.com/dir/page.html", 200, html)]),
            Recorder::default(),
            options(dir.path(), PublishFailurePolicy::Continue),
        );
        let CrawlOutcome::Crawled(report) = crawler
            .crawl("http://example.com/dir/page.html")
            .await
            .unwrap()
        else {
            panic!("expected crawl");
        };
        assert_eq!(report.images_found, 5);
        assert_eq!(report.published, 4);
        assert_eq!(report.skipped, 1);

        let items = crawler.publisher().items.lock().unwrap().clone();
        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://example.com/dir/pic.jpg",
                "http://cdn.example.com/a.png",
                "http://example.com/icons/x.webp",
                "http://example.com/dir/spacedname.GIF",
            ]
        );
        let names: Vec<_> = items
            .iter()
            .map(|i| std::path::Path::new(&i.save_path).file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["pic.jpg", "a.png", "x.png", "spacedname.gif"]);
        assert!(items[1].src_ref.is_none());
        for item in &items {
            assert!(std::path::Path::new(&item.save_path).starts_with(dir.path()));
        }
    }

    #[tokio::test]
    async fn page_without_images_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let crawler = PageCrawler::new(
            fetcher(&[("http://e.com/", 200, "<p>hello</p>")]),
            Recorder::default(),
            options(dir.path(), PublishFailurePolicy::Continue),
        );
        assert!(start_crawl(&crawler, "http://e.com/").await);
    }

    #[tokio::test]
    async fn publish_failure_policy() {
        let html = r#"<img src="a.png"><img src="b.png">"#;
        let failing = || Recorder {
            fail: vec!["http://e.com/a.png".to_string()],
            ..Recorder::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let crawler = PageCrawler::new(
            fetcher(&[("http://e.com/", 200, html)]),
            failing(),
            options(dir.path(), PublishFailurePolicy::Continue),
        );
        let CrawlOutcome::Crawled(report) = crawler.crawl("http://e.com/").await.unwrap() else {
            panic!("expected crawl");
        };
        assert_eq!(report.published, 1);
        assert_eq!(report.publish_failures, 1);

        let crawler = PageCrawler::new(
            fetcher(&[("http://e.com/", 200, html)]),
            failing(),
            options(dir.path(), PublishFailurePolicy::Abort),
        );
        assert!(crawler.crawl("http://e.com/").await.is_err());
        assert!(crawler.publisher().items.lock().unwrap().is_empty());
        assert!(!start_crawl(&crawler, "http://e.com/").await);
    }

    #[tokio::test]
    async fn relative_download_folder_publishes_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let crawler = PageCrawler::new(
            fetcher(&[("http://afsy.fr/", 200, r#"<img src="logo.png">"#)]),
            Recorder::default(),
            options(Path::new("dl"), PublishFailurePolicy::Continue),
        );
        let outcome = crawler.crawl("http://afsy.fr/").await;
        std::env::set_current_dir(previous).unwrap();

        let CrawlOutcome::Crawled(report) = outcome.unwrap() else {
            panic!("expected crawl");
        };
        assert!(report.saved_page.is_absolute());
        let root = std::fs::canonicalize(dir.path().join("dl")).unwrap();
        assert_eq!(
            std::fs::canonicalize(report.saved_page.parent().unwrap()).unwrap(),
            root
        );

        let items = crawler.publisher().items.lock().unwrap().clone();
        assert_eq!(items.len(), 1);
        assert!(Path::new(&items[0].save_path).is_absolute());
        assert!(Path::new(&items[0].saved_html_file).is_absolute());
        assert_eq!(
            std::fs::canonicalize(Path::new(&items[0].save_path).parent().unwrap()).unwrap(),
            root
        );
    }

    #[tokio::test]
    async fn unwritable_download_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let crawler = PageCrawler::new(
            fetcher(&[("http://e.com/", 200, "<img src=\"a.png\">")]),
            Recorder::default(),
            options(&file, PublishFailurePolicy::Continue),
        );
        assert!(crawler.crawl("http://e.com/").await.is_err());
        assert!(crawler.publisher().items.lock().unwrap().is_empty());
    }
}
