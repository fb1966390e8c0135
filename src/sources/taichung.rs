//! Taichung City law database
//!
//! Discovery reads the category index and pages through each category with a
//! `page` query parameter until a page has no rows or no link to the next
//! page. Extraction reads a labeled information table and a two-column
//! article table from one page.

use super::{apply_info_rows, Source, SourceContext};
use crate::crawler::discovery::{
    follow_pages, page_number, resolve_link, with_page, ListingPage, MAX_LISTING_PAGES,
};
use crate::crawler::rules::{element_text, labeled_rows, select_all, select_first};
use crate::model::{Article, LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError};
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// law.taichung.gov.tw
#[derive(Debug, Clone, Copy, Default)]
pub struct Taichung;

#[async_trait]
impl Source for Taichung {
    fn kind(&self) -> SourceKind {
        SourceKind::Taichung
    }

    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
        let index_url = ctx.join("LawCategoryMain.aspx")?;
        let html = ctx.fetch(&index_url).await?;
        let categories = parse_category_links(&html, ctx.base_url());

        if categories.is_empty() {
            return Err(DiscoveryError::Malformed {
                url: index_url.to_string(),
                reason: "no category links".to_string(),
            });
        }
        tracing::info!(categories = categories.len(), "Found categories");

        let mut items = Vec::new();
        for category in categories {
            let found = follow_pages(with_page(&category, 1), MAX_LISTING_PAGES, |url| async move {
                let html = ctx.fetch(&url).await?;
                Ok::<_, DiscoveryError>(parse_listing_page(&html, ctx.base_url(), &url))
            })
            .await;
            tracing::info!(url = %category, found = found.len(), "Category processed");
            items.extend(found);
        }

        tracing::info!(found = items.len(), "Found law links");
        Ok(items)
    }

    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError> {
        let html = ctx.fetch(&item.url).await?;
        let mut record = LawRecord::new(SourceKind::Taichung, &item.url);
        record.title = item.name_or_empty().to_string();
        parse_law_page(&html, &mut record);
        Ok(record)
    }
}

/// Distinct category links from the category index
pub(crate) fn parse_category_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    select_all(document.root_element(), "a[href*='LawCategoryMain.aspx?CategoryID=']")
        .into_iter()
        .filter_map(|link| resolve_link(link.value().attr("href")?, base_url))
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// Laws in force on one category page, plus the next page if linked
pub(crate) fn parse_listing_page(html: &str, base_url: &Url, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let rows = select_all(root, "table.table-hover tr");
    if rows.is_empty() {
        return ListingPage::default();
    }

    let items = rows
        .into_iter()
        .filter(|row| select_first(*row, "span.label-fei").is_none())
        .filter_map(|row| {
            let link = select_first(row, "a[href*='LawContent.aspx']")?;
            let url = resolve_link(link.value().attr("href")?, base_url)?;
            Some(WorkItem::new(url).with_name(element_text(link)))
        })
        .collect();

    let next_number = page_number(page_url) + 1;
    let next = select_first(root, &format!("a[href*='page={}']", next_number))
        .map(|_| with_page(page_url, next_number));

    ListingPage { items, next }
}

/// Fills `record` from a law page
///
/// The modified date falls back to the promulgation date when the page shows
/// no amendment.
pub(crate) fn parse_law_page(html: &str, record: &mut LawRecord) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    if let Some(table) = select_first(root, "table.table-bordered") {
        apply_info_rows(&labeled_rows(table), record);
    }
    if record.modified_date.is_empty() {
        record.modified_date = record.publish_date.clone();
    }

    if let Some(table) = select_first(root, "table.tab-law") {
        for row in select_all(table, "tr") {
            let (Some(number), Some(content)) = (
                select_first(row, "td:nth-of-type(1)"),
                select_first(row, "td:nth-of-type(2)"),
            ) else {
                continue;
            };
            let content = element_text(content);
            if !content.is_empty() {
                record.articles.push(Article::new(element_text(number), content));
            }
        }
    }
}
