//! Per-site listing and extraction strategies
//!
//! Every supported legal database implements [`Source`]: one operation turns
//! the site's listing pages into [`WorkItem`]s, the other turns one work item
//! into a normalized [`LawRecord`]. Both go through a [`SourceContext`], which
//! applies the randomized delay and the retrying HTTP client to every request.
//!
//! HTML documents are parsed inside synchronous helpers and never held across
//! an `.await`.

mod central;
mod kaohsiung;
mod new_taipei;
mod result_list;
mod taichung;
mod taipei;
mod taoyuan;

pub use central::Central;
pub use kaohsiung::Kaohsiung;
pub use new_taipei::NewTaipei;
pub use taichung::Taichung;
pub use taipei::Taipei;
pub use taoyuan::Taoyuan;

use crate::config::RunConfig;
use crate::crawler::{HttpClient, RandomDelay};
use crate::model::{LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError, FetchError};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Request plumbing shared by every operation of one source run
#[derive(Debug, Clone)]
pub struct SourceContext {
    client: HttpClient,
    delay: RandomDelay,
    base_url: Url,
}

impl SourceContext {
    /// Builds the client and delay described by a run configuration
    pub fn new(run: &RunConfig) -> Result<Self, reqwest::Error> {
        let client = HttpClient::open(&run.http, &run.retry)?;
        let delay = RandomDelay::new(run.delay_min, run.delay_max);
        Ok(Self::from_parts(client, delay, run.base_url.clone()))
    }

    pub fn from_parts(client: HttpClient, delay: RandomDelay, base_url: Url) -> Self {
        Self {
            client,
            delay,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` against the site's base URL
    pub fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    /// Waits for the request delay, then fetches `url` as text
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.delay.wait().await;
        tracing::debug!(url = %url, "Fetching");
        self.client.get_text(url).await
    }
}

/// A legal database the crawler knows how to walk
#[async_trait]
pub trait Source: Send + Sync {
    /// Which database this is
    fn kind(&self) -> SourceKind;

    /// Walks the listing pages and returns every statute to extract
    ///
    /// Faults on individual listing pages are logged and skipped; an error is
    /// returned only when the listing cannot be started at all.
    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError>;

    /// Fetches and normalizes one statute
    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError>;
}

/// The strategy for a source
pub fn source_for(kind: SourceKind) -> Arc<dyn Source> {
    match kind {
        SourceKind::Central => Arc::new(Central),
        SourceKind::Taipei => Arc::new(Taipei),
        SourceKind::NewTaipei => Arc::new(NewTaipei),
        SourceKind::Taichung => Arc::new(Taichung),
        SourceKind::Taoyuan => Arc::new(Taoyuan),
        SourceKind::Kaohsiung => Arc::new(Kaohsiung),
    }
}

/// Copies the fields of a labeled information table into `record`
///
/// Labels are matched by substring; an empty value never replaces a value
/// already present (such as the title taken from the listing page).
pub(crate) fn apply_info_rows(rows: &[(String, String)], record: &mut LawRecord) {
    for (label, value) in rows {
        if value.is_empty() {
            continue;
        }
        let field = if label.contains("法規名稱") {
            &mut record.title
        } else if label.contains("法規體系") {
            &mut record.category
        } else if label.contains("公發布日") {
            &mut record.publish_date
        } else if label.contains("修正日期") {
            &mut record.modified_date
        } else if label.contains("發文字號") {
            &mut record.document_number
        } else {
            continue;
        };
        *field = value.clone();
    }
}

/// Shorthand for a malformed-page extraction error
pub(crate) fn malformed(url: &Url, reason: impl Into<String>) -> ExtractError {
    ExtractError::Malformed {
        url: url.to_string(),
        reason: reason.into(),
    }
}
