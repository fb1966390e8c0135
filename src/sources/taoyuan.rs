//! Taoyuan City law database

use super::result_list::{list_laws, parse_law_page, BodyFallback};
use super::{Source, SourceContext};
use crate::model::{LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError};
use async_trait::async_trait;

/// law.tycg.gov.tw
#[derive(Debug, Clone, Copy, Default)]
pub struct Taoyuan;

#[async_trait]
impl Source for Taoyuan {
    fn kind(&self) -> SourceKind {
        SourceKind::Taoyuan
    }

    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
        list_laws(ctx).await
    }

    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError> {
        let html = ctx.fetch(&item.url).await?;
        let mut record = LawRecord::new(SourceKind::Taoyuan, &item.url);
        record.title = item.name_or_empty().to_string();
        record.listing_date = item.date.clone().unwrap_or_default();
        parse_law_page(&html, &mut record, BodyFallback::WholeText);
        Ok(record)
    }
}
