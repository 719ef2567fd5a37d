//! Outbound HTTP GET.
//!
//! Both pipeline stages fetch through [`HttpFetcher`]: the crawler for the
//! page, the materializer for each image. The production implementation is
//! [`CurlFetcher`] (libcurl easy handle); tests substitute in-memory fakes.

mod easy;
mod error;

pub use easy::CurlFetcher;
pub use error::FetchError;

/// Status code and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET. Call from `spawn_blocking` when used from async code.
///
/// Returns `Ok` for any HTTP response, whatever its status; `Err` only when
/// no response was obtained (DNS, connect, timeout, invalid URL).
pub trait HttpFetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}
