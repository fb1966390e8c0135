//! Configuration module for the law crawler
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every section is optional: the built-in defaults describe the six
//! supported legal databases, so the crawler also runs without a file.
//!
//! # Example
//!
//! ```no_run
//! use law_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Retries per request: {}", config.retry.total);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpSettings, LoggingConfig, RetryPolicy, RunConfig, SourceConfig, SourcesConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
