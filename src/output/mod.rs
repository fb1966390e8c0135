//! Output module for persisting records and reporting runs
//!
//! This module handles:
//! - Writing one JSON document per statute
//! - Deriving safe file names from statute titles
//! - Printing the end-of-run summary

mod filename;
mod sink;
pub mod stats;

pub use filename::{file_name_for, sanitize_title, MAX_STEM_BYTES};
pub use sink::{JsonSink, SinkError};
pub use stats::{print_summary, RunSummary, SourceReport};
