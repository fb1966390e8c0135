//! Central government law database
//!
//! Discovery walks the category tree on the search page, then reads the
//! result table of every category. Extraction reads one `LawAll.aspx` page.

use super::{Source, SourceContext};
use crate::crawler::discovery::{resolve_link, walk_category_tree, LinkAction};
use crate::crawler::rules::{digits_only, element_text, first_match, select_all, select_first, Rule};
use crate::model::{Article, LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

const SEARCH_PAGE: &str = "LawSearchLaw.aspx";
const CATEGORY_TREE: &str = "ul#tree";
const LAW_TABLE: &str = "table.table.table-hover.tab-list.tab-central";

const TITLE: &[Rule] = &[Rule::Text("#hlLawName")];
const CATEGORY: &[Rule] = &[Rule::Text(".table tr:nth-child(3) td")];
const MODIFIED_DATE: &[Rule] = &[
    Rule::Text("#trLNNDate td"),
    Rule::Text("#trLNODate td"),
    Rule::RowContaining {
        row: ".table-title tr",
        needle: "修正日期",
        value: "td",
    },
];

/// law.moj.gov.tw
#[derive(Debug, Clone, Copy, Default)]
pub struct Central;

#[async_trait]
impl Source for Central {
    fn kind(&self) -> SourceKind {
        SourceKind::Central
    }

    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
        let search_url = ctx.join(SEARCH_PAGE)?;
        let html = ctx.fetch(&search_url).await?;
        let (categories, estimated) = parse_category_tree(&html, &search_url);

        if categories.is_empty() {
            return Err(DiscoveryError::Malformed {
                url: search_url.to_string(),
                reason: "no category links".to_string(),
            });
        }
        tracing::info!(categories = categories.len(), estimated, "Found category links");

        let mut items = Vec::new();
        for category in categories {
            match ctx.fetch(&category).await {
                Ok(html) => items.extend(parse_category_page(&html, &category)),
                Err(e) => {
                    tracing::error!(url = %category, error = %e, "Failed to fetch category page");
                }
            }
        }

        tracing::info!(found = items.len(), "Found law links");
        Ok(items)
    }

    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError> {
        let html = ctx.fetch(&item.url).await?;
        Ok(parse_law_page(&html, &item.url))
    }
}

fn classify_tree_link(href: &str) -> LinkAction {
    if href.contains("LawSearchLaw.aspx?TY=") {
        if href.contains("fei=1") {
            LinkAction::Skip
        } else {
            LinkAction::Collect
        }
    } else if href.contains("javascript:void(0)") {
        LinkAction::Expand
    } else {
        LinkAction::Skip
    }
}

/// Category links from the search page, plus the sum of the count badges
pub(crate) fn parse_category_tree(html: &str, page_url: &Url) -> (Vec<Url>, u64) {
    let document = Html::parse_document(html);
    let links = walk_category_tree(&document, CATEGORY_TREE, page_url, classify_tree_link);

    let estimated = select_all(document.root_element(), "span.badge")
        .into_iter()
        .filter_map(|badge| element_text(badge).parse::<u64>().ok())
        .sum();

    (links, estimated)
}

/// Law links from a category's result table
pub(crate) fn parse_category_page(html: &str, page_url: &Url) -> Vec<WorkItem> {
    let document = Html::parse_document(html);
    let Some(table) = select_first(document.root_element(), LAW_TABLE) else {
        return Vec::new();
    };

    select_all(table, "a[href]")
        .into_iter()
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            if !href.to_ascii_lowercase().contains("lawall.aspx?pcode=") {
                return None;
            }
            let url = resolve_link(href, page_url)?;
            Some(WorkItem::new(url).with_name(element_text(link)))
        })
        .collect()
}

/// Normalizes a `LawAll.aspx` page
pub(crate) fn parse_law_page(html: &str, url: &Url) -> LawRecord {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut record = LawRecord::new(SourceKind::Central, url);
    record.title = first_match(root, TITLE).unwrap_or_default();
    record.category = first_match(root, CATEGORY).unwrap_or_default();
    record.modified_date = first_match(root, MODIFIED_DATE)
        .map(|date| digits_only(&date))
        .unwrap_or_default();

    for row in select_all(root, ".row") {
        let (Some(number), Some(content)) = (
            select_first(row, ".col-no a"),
            select_first(row, ".law-article"),
        ) else {
            continue;
        };
        record.articles.push(Article::new(
            format!("{}, {}", record.title, element_text(number)),
            element_text(content),
        ));
    }

    record
}
