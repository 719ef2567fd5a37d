//! Redelivery backoff policy.
//!
//! The work queue asks this policy what to do with an item whose delivery
//! failed: schedule it again after an exponential delay, or give up and
//! dead-letter it once the delivery budget is spent.

mod classify;
mod policy;

pub use classify::{classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
