//! Run statistics
//!
//! This module collects the per-source outcome of a run and prints the
//! end-of-run summary.

use crate::model::SourceKind;
use std::time::Duration;

/// Outcome of crawling one source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    /// Which source was crawled
    pub source: SourceKind,

    /// Work items found by discovery (after de-duplication and limits)
    pub discovered: usize,

    /// Records extracted and saved
    pub processed: usize,

    /// Wall-clock time spent on the source
    pub elapsed: Duration,
}

impl SourceReport {
    /// Work items that did not produce a saved record
    pub fn failed(&self) -> usize {
        self.discovered.saturating_sub(self.processed)
    }

    /// Share of work items saved, in percent
    pub fn success_rate(&self) -> f64 {
        percentage(self.processed, self.discovered)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<SourceReport>,
}

impl RunSummary {
    pub fn new(reports: Vec<SourceReport>) -> Self {
        Self { reports }
    }

    pub fn total_discovered(&self) -> usize {
        self.reports.iter().map(|r| r.discovered).sum()
    }

    pub fn total_processed(&self) -> usize {
        self.reports.iter().map(|r| r.processed).sum()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.reports.iter().map(|r| r.elapsed).sum()
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Sources:");
    for report in &summary.reports {
        println!(
            "  {:<11} processed {} of {} ({:.1}%), {} failed, {:.1}s",
            report.source.as_str(),
            report.processed,
            report.discovered,
            report.success_rate(),
            report.failed(),
            report.elapsed.as_secs_f64()
        );
    }
    println!();

    let discovered = summary.total_discovered();
    let processed = summary.total_processed();
    println!(
        "Success Rate: {:.1}% ({} / {} laws saved) in {:.1}s",
        percentage(processed, discovered),
        processed,
        discovered,
        summary.total_elapsed().as_secs_f64()
    );
}
