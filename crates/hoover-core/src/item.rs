//! Image work item: the message passed from the crawler to the materializer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// One image to download and patch into a saved page.
///
/// Serialized as a JSON object with camelCase keys
/// (`url`, `savePath`, `savedHtmlFile`, optional `srcRef`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageWorkItem {
    /// Absolute http(s) URL of the image.
    pub url: String,
    /// Absolute local path under the download root.
    pub save_path: String,
    /// Saved page whose text references `url`.
    pub saved_html_file: String,
    /// `src` attribute text as it appeared in the page, when it differs from `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_ref: Option<String>,
}

/// Payload that can never be processed; redelivering it would not help.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("undecodable work item: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("work item field `{0}` is empty")]
    EmptyField(&'static str),
    #[error("work item url is not an absolute http(s) URL: {0}")]
    InvalidUrl(String),
    #[error("work item field `{0}` is not an absolute path")]
    RelativePath(&'static str),
}

impl ImageWorkItem {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode and validate a queued payload.
    pub fn from_json(payload: &str) -> Result<Self, PayloadError> {
        let item: ImageWorkItem = serde_json::from_str(payload)?;
        item.validate()?;
        Ok(item)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if self.url.trim().is_empty() {
            return Err(PayloadError::EmptyField("url"));
        }
        if self.save_path.trim().is_empty() {
            return Err(PayloadError::EmptyField("savePath"));
        }
        if self.saved_html_file.trim().is_empty() {
            return Err(PayloadError::EmptyField("savedHtmlFile"));
        }
        match Url::parse(&self.url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => {}
            _ => return Err(PayloadError::InvalidUrl(self.url.clone())),
        }
        if !Path::new(&self.save_path).is_absolute() {
            return Err(PayloadError::RelativePath("savePath"));
        }
        if !Path::new(&self.saved_html_file).is_absolute() {
            return Err(PayloadError::RelativePath("savedHtmlFile"));
        }
        Ok(())
    }
}
