//! Kaohsiung City law database
//!
//! Same application as Taoyuan. Some law pages render the text as a run of
//! spans instead of an article table; those are split at each article
//! heading.

use super::result_list::{list_laws, parse_law_page, BodyFallback};
use super::{Source, SourceContext};
use crate::model::{LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError};
use async_trait::async_trait;

/// outlaw.kcg.gov.tw
#[derive(Debug, Clone, Copy, Default)]
pub struct Kaohsiung;

#[async_trait]
impl Source for Kaohsiung {
    fn kind(&self) -> SourceKind {
        SourceKind::Kaohsiung
    }

    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
        list_laws(ctx).await
    }

    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError> {
        let html = ctx.fetch(&item.url).await?;
        let mut record = LawRecord::new(SourceKind::Kaohsiung, &item.url);
        record.title = item.name_or_empty().to_string();
        record.listing_date = item.date.clone().unwrap_or_default();
        parse_law_page(&html, &mut record, BodyFallback::SpanArticles);
        Ok(record)
    }
}
