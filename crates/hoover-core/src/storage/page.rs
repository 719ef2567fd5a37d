//! Saved page files: `<YYYYMMDD-HHMMSS>-<base>.htm`, BOM + raw body.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Collision suffixes tried before giving up (same base within one second).
const MAX_NAME_ATTEMPTS: u32 = 100;

/// File name for a page saved at `at`: `20240131-235959-<base>.htm`.
pub fn saved_page_name(at: NaiveDateTime, base: &str) -> String {
    format!("{}-{}.htm", at.format("%Y%m%d-%H%M%S"), base)
}

/// Create a new saved page under `download_folder` holding BOM + `body`.
///
/// The file is created exclusively; if the timestamped name is taken, `-1`,
/// `-2`, ... is appended to the base so every crawl gets its own file.
/// The folder must already exist. Returns the page path.
pub fn save_page(download_folder: &Path, at: NaiveDateTime, base: &str, body: &[u8]) -> Result<PathBuf> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            saved_page_name(at, base)
        } else {
            saved_page_name(at, &format!("{}-{}", base, attempt))
        };
        let path = download_folder.join(name);
        let mut file = match std::fs::File::options().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e).with_context(|| format!("create saved page {}", path.display())),
        };
        file.write_all(UTF8_BOM)
            .and_then(|_| file.write_all(body))
            .and_then(|_| file.sync_all())
            .with_context(|| format!("write saved page {}", path.display()))?;
        return Ok(path);
    }
    anyhow::bail!(
        "no free saved-page name for {} in {}",
        base,
        download_folder.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 5)
            .unwrap()
    }

    #[test]
    fn name_format() {
        assert_eq!(saved_page_name(at(), "afsy.fr"), "20240131-235905-afsy.fr.htm");
    }

    #[test]
    fn bom_prefixed_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_page(dir.path(), at(), "page", b"<html></html>").unwrap();
        assert_eq!(path, dir.path().join("20240131-235905-page.htm"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\xEF\xBB\xBF<html></html>".to_vec());
    }

    #[test]
    fn same_second_crawls_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_page(dir.path(), at(), "page", b"one").unwrap();
        let second = save_page(dir.path(), at(), "page", b"two").unwrap();
        assert_ne!(first, second);
        assert_eq!(second, dir.path().join("20240131-235905-page-1.htm"));
        assert_eq!(std::fs::read(&first).unwrap(), b"\xEF\xBB\xBFone".to_vec());
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_page(&dir.path().join("missing"), at(), "p", b"x").is_err());
    }
}
