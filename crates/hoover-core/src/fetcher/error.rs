//! Fetch error type.

use crate::retry::{classify_curl_error, classify_http_status, ErrorKind};

/// Failure of an HTTP GET, or a response the caller cannot use.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// libcurl reported an error (timeout, connection, invalid URL, ...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// The response status is not usable (non-2xx, or non-200 for pages).
    #[error("HTTP {0}")]
    Status(u32),
    /// 2xx response with no body.
    #[error("empty response body")]
    EmptyBody,
}

impl FetchError {
    /// Classification used for log fields and the redelivery backoff.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(e) => classify_curl_error(e),
            FetchError::Status(code) => classify_http_status(*code),
            FetchError::EmptyBody => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(FetchError::Status(404).kind(), ErrorKind::NotFound);
        assert_eq!(FetchError::Status(503).kind(), ErrorKind::Throttled);
        assert_eq!(FetchError::EmptyBody.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn display() {
        assert_eq!(FetchError::Status(500).to_string(), "HTTP 500");
        assert_eq!(FetchError::EmptyBody.to_string(), "empty response body");
    }
}
