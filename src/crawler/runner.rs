//! Source runner - drives one source from discovery to saved records
//!
//! A run of one source:
//! - opens the output directory (failure ends the run)
//! - lists work items (failure is logged and yields no items)
//! - removes repeated URLs and applies the optional item limit
//! - extracts and saves every item through the batch pipeline
//! - reports how many records were saved

use crate::config::{Config, RunConfig};
use crate::crawler::batch::{run_batches, BatchOptions};
use crate::crawler::discovery::dedupe_items;
use crate::model::{SourceKind, WorkItem};
use crate::output::{file_name_for, JsonSink, RunSummary, SinkError, SourceReport};
use crate::sources::{source_for, Source, SourceContext};
use crate::{ExtractError, Result};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;

/// Why one work item produced no record
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("{url}: {source}")]
    Extract { url: String, source: ExtractError },

    #[error("{url}: failed to save record: {source}")]
    Persist { url: String, source: SinkError },
}

/// Everything a worker needs to turn a work item into a saved record
struct ItemWorker {
    source: Arc<dyn Source>,
    ctx: SourceContext,
    sink: JsonSink,
}

impl ItemWorker {
    /// Extracts and saves one item
    ///
    /// Returns `Ok(false)` when the page yields no law name; such records are
    /// not saved.
    async fn process(&self, item: WorkItem) -> std::result::Result<bool, ItemError> {
        let record = self
            .source
            .extract(&self.ctx, &item)
            .await
            .map_err(|source| ItemError::Extract {
                url: item.url.to_string(),
                source,
            })?;

        if !record.has_title() {
            tracing::warn!(url = %item.url, "No law name found, skipping");
            return Ok(false);
        }

        let file_name = file_name_for(&record.title);
        self.sink
            .save(&record, &file_name)
            .map_err(|source| ItemError::Persist {
                url: item.url.to_string(),
                source,
            })?;

        Ok(true)
    }
}

/// Runs one source to completion
///
/// # Errors
///
/// Fails only if the output directory cannot be created or the HTTP client
/// cannot be built. Listing and per-item faults are logged and reflected in
/// the returned report.
pub async fn run_source(source: Arc<dyn Source>, run: RunConfig) -> Result<SourceReport> {
    let span = tracing::info_span!("source", source = %run.source);
    crawl_source(source, run).instrument(span).await
}

async fn crawl_source(source: Arc<dyn Source>, run: RunConfig) -> Result<SourceReport> {
    let started = Instant::now();
    let sink = JsonSink::create(&run.output_dir)?;
    let ctx = SourceContext::new(&run)?;

    tracing::info!(
        base_url = %run.base_url,
        output_dir = %run.output_dir.display(),
        workers = run.concurrency,
        batch_size = run.batch_size,
        "Starting source"
    );

    let items = match source.list_work_items(&ctx).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list work items");
            Vec::new()
        }
    };

    let mut items = dedupe_items(items);
    if let Some(limit) = run.limit {
        items.truncate(limit);
    }
    let discovered = items.len();

    if discovered == 0 {
        tracing::warn!("No laws found");
        return Ok(SourceReport {
            source: run.source,
            discovered,
            processed: 0,
            elapsed: started.elapsed(),
        });
    }
    tracing::info!(count = discovered, "Found laws to process");

    let worker = Arc::new(ItemWorker { source, ctx, sink });
    let options = BatchOptions::new(
        run.batch_size,
        run.concurrency,
        format!("Processing {} laws", run.source),
    );
    let processed = run_batches(
        items,
        move |item| {
            let worker = Arc::clone(&worker);
            let span = tracing::Span::current();
            async move { worker.process(item).await }.instrument(span)
        },
        &options,
    )
    .await;

    tracing::info!("Done: processed {} of {} laws", processed, discovered);

    Ok(SourceReport {
        source: run.source,
        discovered,
        processed,
        elapsed: started.elapsed(),
    })
}

/// Runs the given sources one after another
///
/// A source whose listing fails still produces a (zero) report; only
/// configuration and output directory errors stop the remaining sources.
pub async fn run_sources(
    config: &Config,
    kinds: &[SourceKind],
    limit: Option<usize>,
) -> Result<RunSummary> {
    let mut reports = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let run = config.run_config(kind, limit)?;
        reports.push(run_source(source_for(kind), run).await?);
    }
    Ok(RunSummary::new(reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpSettings, RetryPolicy};
    use crate::model::LawRecord;
    use crate::DiscoveryError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    /// Serves `count` numbered laws; titles of items listed in `untitled`
    /// come back empty and items listed in `broken` fail
    struct FakeSource {
        count: usize,
        duplicate_first: bool,
        untitled: Vec<usize>,
        broken: Vec<usize>,
        listing_fails: bool,
    }

    impl FakeSource {
        fn new(count: usize) -> Self {
            Self {
                count,
                duplicate_first: false,
                untitled: Vec::new(),
                broken: Vec::new(),
                listing_fails: false,
            }
        }
    }

    fn law_url(n: usize) -> Url {
        Url::parse(&format!("https://law.example.gov.tw/law/{}", n)).unwrap()
    }

    #[async_trait]
    impl Source for FakeSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Taoyuan
        }

        async fn list_work_items(&self, _ctx: &SourceContext) -> std::result::Result<Vec<WorkItem>, DiscoveryError> {
            if self.listing_fails {
                return Err(DiscoveryError::Malformed {
                    url: "https://law.example.gov.tw/list".to_string(),
                    reason: "no table".to_string(),
                });
            }
            let mut items: Vec<WorkItem> = (1..=self.count).map(|n| WorkItem::new(law_url(n))).collect();
            if self.duplicate_first && self.count > 0 {
                items.push(WorkItem::new(law_url(1)));
            }
            Ok(items)
        }

        async fn extract(&self, _ctx: &SourceContext, item: &WorkItem) -> std::result::Result<LawRecord, ExtractError> {
            let n: usize = item.url.path_segments().and_then(|s| s.last()).unwrap().parse().unwrap();
            if self.broken.contains(&n) {
                return Err(ExtractError::Malformed {
                    url: item.url.to_string(),
                    reason: "broken fixture".to_string(),
                });
            }
            let mut record = LawRecord::new(SourceKind::Taoyuan, &item.url);
            if !self.untitled.contains(&n) {
                record.title = format!("桃園市測試法規{}", n);
            }
            Ok(record)
        }
    }

    fn run_config(output_dir: &Path, limit: Option<usize>) -> RunConfig {
        RunConfig {
            source: SourceKind::Taoyuan,
            base_url: Url::parse("https://law.example.gov.tw/").unwrap(),
            output_dir: output_dir.to_path_buf(),
            concurrency: 2,
            batch_size: 3,
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            retry: RetryPolicy::default(),
            http: HttpSettings::default(),
            limit,
        }
    }

    fn json_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .map(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .unwrap_or(false)
            })
            .count()
    }

    #[tokio::test]
    async fn test_every_item_is_saved() {
        let temp = TempDir::new().unwrap();
        let report = run_source(Arc::new(FakeSource::new(7)), run_config(temp.path(), None))
            .await
            .unwrap();

        assert_eq!(report.discovered, 7);
        assert_eq!(report.processed, 7);
        assert_eq!(json_files(temp.path()), 7);
        assert!(temp.path().join("桃園市測試法規3.json").is_file());
    }

    #[tokio::test]
    async fn test_failures_and_untitled_records_are_not_counted() {
        let temp = TempDir::new().unwrap();
        let source = FakeSource {
            untitled: vec![2],
            broken: vec![4, 5],
            ..FakeSource::new(6)
        };
        let report = run_source(Arc::new(source), run_config(temp.path(), None))
            .await
            .unwrap();

        assert_eq!(report.discovered, 6);
        assert_eq!(report.processed, 3);
        assert_eq!(report.failed(), 3);
        assert_eq!(json_files(temp.path()), 3);
    }

    #[tokio::test]
    async fn test_every_item_failing_saves_nothing() {
        let temp = TempDir::new().unwrap();
        let source = FakeSource {
            broken: (1..=5).collect(),
            ..FakeSource::new(5)
        };
        let report = run_source(Arc::new(source), run_config(temp.path(), None))
            .await
            .expect("item failures are contained");

        assert_eq!(report.discovered, 5);
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed(), 5);
        assert_eq!(json_files(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_duplicates_removed_and_limit_applied() {
        let temp = TempDir::new().unwrap();
        let source = FakeSource {
            duplicate_first: true,
            ..FakeSource::new(3)
        };
        let report = run_source(Arc::new(source), run_config(temp.path(), None))
            .await
            .unwrap();
        assert_eq!(report.discovered, 3);

        let temp = TempDir::new().unwrap();
        let report = run_source(Arc::new(FakeSource::new(10)), run_config(temp.path(), Some(4)))
            .await
            .unwrap();
        assert_eq!(report.discovered, 4);
        assert_eq!(report.processed, 4);
    }

    #[tokio::test]
    async fn test_listing_failure_yields_empty_report() {
        let temp = TempDir::new().unwrap();
        let source = FakeSource {
            listing_fails: true,
            ..FakeSource::new(5)
        };
        let report = run_source(Arc::new(source), run_config(temp.path(), None))
            .await
            .unwrap();

        assert_eq!(report.discovered, 0);
        assert_eq!(report.processed, 0);
        assert_eq!(json_files(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_unusable_output_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        let occupied = temp.path().join("occupied");
        std::fs::write(&occupied, "file").unwrap();

        let result = run_source(Arc::new(FakeSource::new(1)), run_config(&occupied, None)).await;
        assert!(matches!(result, Err(crate::CrawlerError::Sink(_))));
    }
}
