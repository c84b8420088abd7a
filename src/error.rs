//! Error types for fetching and extracting the feed.

use thiserror::Error;

/// Errors raised between the HTTP request and the extracted records.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The HTTP client could not be built.
    #[error("Failed to set up HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request failed or the server answered with an error status.
    #[error("Failed to fetch feed {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A feed entry lacks one of the fields every record needs.
    #[error("Feed entry {index} has no {field}")]
    MissingField { index: usize, field: &'static str },
}

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
