//! Law Crawler: statute harvester for Taiwanese legal databases
//!
//! This crate downloads statute text from the central government law
//! database and five municipal databases, normalizes every statute into a
//! [`LawRecord`](model::LawRecord) and stores each one as a JSON document.
//!
//! The crawl core (HTTP client with retry, randomized request delay, batch
//! pipeline, JSON sink) lives in [`crawler`] and [`output`]; the per-site
//! listing and extraction strategies live in [`sources`].

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod sources;

use thiserror::Error;

/// Main error type for crawl runs
///
/// Only configuration problems and an unusable output directory end a run
/// with this error; per-item and per-listing faults are logged and contained.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors from a single HTTP request, after the retry policy gave up
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Returns true if the server answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// Why a work item could not be turned into a record
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Page not found: {url}")]
    NotFound { url: String },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Malformed page {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("Fetch failed: {0}")]
    Fetch(FetchError),

    #[error("URL error: {0}")]
    Url(#[from] ::url::ParseError),
}

impl From<FetchError> for ExtractError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status { url, status: 404 } => ExtractError::NotFound { url },
            FetchError::Timeout { url } => ExtractError::Timeout { url },
            other => ExtractError::Fetch(other),
        }
    }
}

/// Errors while building the list of work items for a source
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Listing page unavailable: {0}")]
    Fetch(#[from] FetchError),

    #[error("Listing page {url} is malformed: {reason}")]
    Malformed { url: String, reason: String },

    #[error("URL error: {0}")]
    Url(#[from] ::url::ParseError),
}

/// Result type alias for crawl runs
pub type Result<T> = std::result::Result<T, CrawlerError>;

// Re-export commonly used types
pub use config::{Config, RunConfig};
pub use model::{Article, LawRecord, SourceKind, WorkItem};
pub use sources::{Source, SourceContext};
