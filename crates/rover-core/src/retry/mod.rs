//! Retry and backoff policy for file transfers.
//!
//! Classifies fetch failures (timeouts, throttling, connection failures) and
//! decides exponential backoff. The fetcher is the only caller; reconciliation
//! and orchestration never retry.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
