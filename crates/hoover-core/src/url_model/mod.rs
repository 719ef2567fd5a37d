//! Image URL normalization and local file naming.
//!
//! Resolves `img src` references against the page they came from, fixes the
//! extension to the allow-list, and derives the file names used for saved
//! pages and images under the download root.

mod path;
mod sanitize;

pub use path::{last_path_segment, split_extension};
pub use sanitize::sanitize_file_stem;

use std::path::{Path, PathBuf};
use url::Url;

/// Extensions kept as-is on saved images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Extension used when the URL's extension is missing or not allowed.
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// Stem used when a URL yields nothing usable.
const DEFAULT_IMAGE_STEM: &str = "image";
const DEFAULT_PAGE_STEM: &str = "page";

/// Removes every whitespace character, including ones embedded mid-URL.
pub fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.has_host()
}

/// Resolves an `img src` value against the page URL.
///
/// Absolute http(s) references pass through unchanged; anything else is
/// joined onto the page URL, so `pic.jpg` on `http://example.com/dir/page.html`
/// becomes `http://example.com/dir/pic.jpg`. Returns `None` for empty
/// references and for ones that do not end up as http(s) (`data:`,
/// `javascript:`, ...).
pub fn resolve_image_url(page: &Url, raw_src: &str) -> Option<Url> {
    let cleaned = strip_whitespace(raw_src);
    if cleaned.is_empty() {
        return None;
    }
    let resolved = match Url::parse(&cleaned) {
        Ok(abs) => abs,
        Err(url::ParseError::RelativeUrlWithoutBase) => page.join(&cleaned).ok()?,
        Err(_) => return None,
    };
    is_http(&resolved).then_some(resolved)
}

/// Extension for the saved copy of `url`: its own when allowed, else `png`.
pub fn image_extension(url: &Url) -> &'static str {
    let ext = last_path_segment(url).and_then(|name| split_extension(name).1);
    let Some(ext) = ext else {
        return DEFAULT_IMAGE_EXTENSION;
    };
    IMAGE_EXTENSIONS
        .iter()
        .find(|allowed| allowed.eq_ignore_ascii_case(ext))
        .copied()
        .unwrap_or(DEFAULT_IMAGE_EXTENSION)
}

/// File name for the saved copy of `url`: `<stem>.<ext>`.
pub fn image_file_name(url: &Url) -> String {
    let stem = last_path_segment(url)
        .map(|name| sanitize_file_stem(split_extension(name).0))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_STEM.to_string());
    format!("{}.{}", stem, image_extension(url))
}

/// Local path for the image: always a direct child of `download_folder`.
pub fn image_save_path(download_folder: &Path, url: &Url) -> PathBuf {
    download_folder.join(image_file_name(url))
}

/// Base name of a page URL, used in the saved page's file name.
///
/// Last path segment without its extension. Root URLs fall back to the host,
/// which loses its last dot segment the same way (`afsy.fr` → `afsy`), then
/// to `page` when neither is usable.
pub fn page_base_name(page: &Url) -> String {
    let stem = |name: &str| sanitize_file_stem(split_extension(name).0);
    let from_path = last_path_segment(page).map(stem);
    let from_host = || page.host_str().map(stem);
    from_path
        .filter(|s| !s.is_empty())
        .or_else(from_host)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PAGE_STEM.to_string())
}
