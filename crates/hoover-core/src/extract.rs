//! `<img src>` extraction from an HTML document.

use scraper::{Html, Selector};

/// Returns the `src` attribute of every `img` element, in document order.
///
/// Images without a `src` are skipped; values are returned as parsed (entities
/// decoded, whitespace untouched) so normalization happens in one place.
pub fn image_sources(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("img[src]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::to_string)
        .collect()
}

/// Like [`image_sources`] but for raw bytes; invalid UTF-8 is replaced.
pub fn image_sources_from_bytes(body: &[u8]) -> Vec<String> {
    image_sources(&String::from_utf8_lossy(body))
}
