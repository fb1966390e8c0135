//! Taipei City law database
//!
//! Discovery reads a numbered result list whose page count is printed in the
//! paging counter. Extraction combines the information page (title, date)
//! with the article page of the same law code.

use super::{malformed, Source, SourceContext};
use crate::crawler::discovery::{resolve_link, MAX_LISTING_PAGES};
use crate::crawler::rules::{element_text, first_match, select_all, select_first, select_text, Rule};
use crate::model::{Article, LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

const TITLE: &[Rule] = &[Rule::Text("div.col-input a.law-link")];
const MODIFIED_DATE: &[Rule] = &[Rule::NextSibling {
    label: "div.col-label",
    needle: "修正日期",
    inner: "dfn",
}];

/// Point numbering such as "一、"
static POINT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([一二三四五六七八九十]+、)").expect("hardcoded regex pattern is valid"));

/// www.laws.taipei.gov.tw
#[derive(Debug, Clone, Copy, Default)]
pub struct Taipei;

fn result_page(ctx: &SourceContext, page: usize) -> Result<Url, url::ParseError> {
    ctx.join(&format!(
        "Law/LawCategory/LawCategoryResult?categoryid=001&page={}",
        page
    ))
}

#[async_trait]
impl Source for Taipei {
    fn kind(&self) -> SourceKind {
        SourceKind::Taipei
    }

    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
        let first_url = result_page(ctx, 1)?;
        let first_page = ctx.fetch(&first_url).await?;

        let total_pages = parse_total_pages(&first_page).ok_or_else(|| DiscoveryError::Malformed {
            url: first_url.to_string(),
            reason: "no page counter".to_string(),
        })?;
        tracing::info!(total_pages, "Found result pages");

        let mut items = parse_result_page(&first_page, ctx.base_url());
        for page in 2..=total_pages.min(MAX_LISTING_PAGES) {
            let url = result_page(ctx, page)?;
            match ctx.fetch(&url).await {
                Ok(html) => {
                    items.extend(parse_result_page(&html, ctx.base_url()));
                    tracing::info!(page, total_pages, "Result page processed");
                }
                Err(e) => tracing::error!(url = %url, error = %e, "Failed to fetch result page"),
            }
        }

        tracing::info!(found = items.len(), "Found law links");
        Ok(items)
    }

    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError> {
        let code = law_code(&item.url).ok_or_else(|| malformed(&item.url, "no FL law code in URL"))?;
        let info_url = ctx.join(&format!("Law/LawSearch/LawInformation/FL{}", code))?;
        let content_url = ctx.join(&format!("Law/LawSearch/LawArticleContent/FL{}", code))?;

        let info = ctx.fetch(&info_url).await?;
        let mut record = LawRecord::new(SourceKind::Taipei, &content_url);
        parse_information(&info, &mut record);

        let content = ctx.fetch(&content_url).await?;
        record.articles = parse_articles(&content);

        Ok(record)
    }
}

/// Page count from the `div.paging-counts` block
pub(crate) fn parse_total_pages(html: &str) -> Option<usize> {
    let document = Html::parse_document(html);
    select_text(document.root_element(), "div.paging-counts em:nth-of-type(2)")?
        .parse()
        .ok()
}

/// Law links of one result page
pub(crate) fn parse_result_page(html: &str, base_url: &Url) -> Vec<WorkItem> {
    let document = Html::parse_document(html);
    select_all(document.root_element(), "table.table-tab td a[href]")
        .into_iter()
        .filter_map(|link| {
            let url = resolve_link(link.value().attr("href")?, base_url)?;
            Some(WorkItem::new(url).with_name(element_text(link)))
        })
        .collect()
}

/// The code after `/FL` in a law URL, without the query
pub(crate) fn law_code(url: &Url) -> Option<&str> {
    let (_, rest) = url.as_str().split_once("/FL")?;
    let code = rest.split(['?', '#']).next().unwrap_or_default();
    (!code.is_empty()).then_some(code)
}

/// Title and modified date from the information page
pub(crate) fn parse_information(html: &str, record: &mut LawRecord) {
    let document = Html::parse_document(html);
    let root = document.root_element();
    record.title = first_match(root, TITLE).unwrap_or_default();
    record.modified_date = first_match(root, MODIFIED_DATE).unwrap_or_default();
}

/// Articles from the article page
///
/// Items without an article body are chapter headings; the most recent
/// heading is attached to every following article.
pub(crate) fn parse_articles(html: &str) -> Vec<Article> {
    let document = Html::parse_document(html);
    let mut chapter = String::new();
    let mut articles = Vec::new();

    for item in select_all(document.root_element(), "ul.law.law-content li") {
        let Some(body) = select_first(item, "div.law-articlepre") else {
            let heading = element_text(item);
            if !heading.is_empty() {
                chapter = heading;
            }
            continue;
        };

        let text = element_text(body);
        let (number, content) = match POINT_NUMBER.captures(&text) {
            Some(caps) => {
                let number = caps[1].to_string();
                let content = text[number.len()..].trim().to_string();
                (number, content)
            }
            None => (
                select_text(item, "div.col-no").unwrap_or_default(),
                text,
            ),
        };

        if !content.is_empty() {
            articles.push(Article::new(number, content).in_chapter(chapter.clone()));
        }
    }

    articles
}
