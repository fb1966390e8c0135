//! Crawler module for fetching and processing statute pages
//!
//! This module contains the source-independent crawl machinery:
//! - HTTP fetching with retry logic
//! - Randomized request delay
//! - Listing discovery helpers and extraction rules
//! - The batched worker pipeline and the per-source runner

mod batch;
mod client;
mod delay;
pub mod discovery;
pub mod rules;
mod runner;

pub use batch::{run_batches, BatchOptions, Progress};
pub use client::HttpClient;
pub use delay::RandomDelay;
pub use runner::{run_source, run_sources, ItemError};

use crate::config::Config;
use crate::model::SourceKind;
use crate::output::RunSummary;

/// Crawls every source in `kinds`, in order
///
/// This is the main entry point for a run. For each source it will:
/// 1. Resolve the source's settings from `config`
/// 2. Walk the listing pages
/// 3. Extract and save every statute found
///
/// # Arguments
///
/// * `config` - The validated crawler configuration
/// * `kinds` - Sources to crawl
/// * `limit` - Optional cap on statutes per source
pub async fn crawl(config: &Config, kinds: &[SourceKind], limit: Option<usize>) -> crate::Result<RunSummary> {
    run_sources(config, kinds, limit).await
}
