//! External video search/metadata capability.
//!
//! The matcher and pipeline only ever see this trait; the shipped YouTube
//! implementation lives in `youtube.rs` and tests substitute mocks.

use thiserror::Error;

use crate::models::{SearchHit, VideoMetadata};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("failed to parse provider response: {0}")]
    Parse(String),
    #[error("provider response is missing {0}")]
    MissingField(String),
}

/// A source of ordered search results and per-candidate metadata.
///
/// Both calls may fail transiently; callers wrap them in a `RetryPolicy`.
/// Implementations must be shareable across worker threads.
pub trait VideoProvider: Send + Sync {
    /// Ordered search results for a query, at most `max_results` of them.
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ProviderError>;

    /// Metadata for one candidate's URL.
    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ProviderError>;
}
