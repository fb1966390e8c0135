//! New Taipei City law database
//!
//! Discovery reads the category list and then each category's table, keeping
//! the law title and its `fcode` as sidecar data. The site serves law text
//! through two page variants; extraction tries `FLAWDAT0202` first and falls
//! back to `FLAWDAT0201`.

use super::{malformed, Source, SourceContext};
use crate::crawler::discovery::resolve_link;
use crate::crawler::rules::{element_text, select_all, select_first, select_text};
use crate::model::{Article, LawRecord, SourceKind, WorkItem};
use crate::{DiscoveryError, ExtractError, FetchError};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use url::Url;

const CONTENT_PAGES: [&str; 2] = ["FLAWDAT0202.aspx", "FLAWDAT0201.aspx"];

/// web.law.ntpc.gov.tw
#[derive(Debug, Clone, Copy, Default)]
pub struct NewTaipei;

/// Law text parsed from a content page
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ContentPage {
    pub modified_date: String,
    pub articles: Vec<Article>,
}

fn content_url(ctx: &SourceContext, page: &str, fcode: &str) -> Result<Url, url::ParseError> {
    let mut url = ctx.join(&format!("Scripts/{}", page))?;
    url.query_pairs_mut().append_pair("fcode", fcode);
    Ok(url)
}

#[async_trait]
impl Source for NewTaipei {
    fn kind(&self) -> SourceKind {
        SourceKind::NewTaipei
    }

    async fn list_work_items(&self, ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
        let level_url = ctx.join("Level.aspx")?;
        let html = ctx.fetch(&level_url).await?;
        let categories = parse_level_page(&html, &level_url);

        if categories.is_empty() {
            return Err(DiscoveryError::Malformed {
                url: level_url.to_string(),
                reason: "no category links".to_string(),
            });
        }
        tracing::info!(categories = categories.len(), "Found categories");

        let mut items = Vec::new();
        for category in categories {
            let html = match ctx.fetch(&category).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!(url = %category, error = %e, "Failed to fetch category page");
                    continue;
                }
            };
            let found = parse_category_page(&html)
                .into_iter()
                .filter_map(|(title, fcode)| {
                    let url = content_url(ctx, CONTENT_PAGES[0], &fcode).ok()?;
                    Some(WorkItem::new(url).with_name(title).with_code(fcode))
                })
                .collect::<Vec<_>>();
            tracing::info!(url = %category, found = found.len(), "Category processed");
            items.extend(found);
        }

        tracing::info!(found = items.len(), "Found law links");
        Ok(items)
    }

    async fn extract(&self, ctx: &SourceContext, item: &WorkItem) -> Result<LawRecord, ExtractError> {
        let fcode = match &item.code {
            Some(code) => code.clone(),
            None => item
                .url
                .query_pairs()
                .find(|(key, _)| key == "fcode")
                .map(|(_, value)| value.into_owned())
                .ok_or_else(|| malformed(&item.url, "no fcode"))?,
        };

        let mut last_error: Option<FetchError> = None;
        for page in CONTENT_PAGES {
            let url = content_url(ctx, page, &fcode)?;
            match ctx.fetch(&url).await {
                Ok(html) => {
                    if let Some(content) = parse_content_page(&html) {
                        let mut record = LawRecord::new(SourceKind::NewTaipei, &url);
                        record.title = item.name_or_empty().to_string();
                        record.modified_date = content.modified_date;
                        record.articles = content.articles;
                        return Ok(record);
                    }
                    tracing::debug!(url = %url, "No law text on content page");
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Content page unavailable");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => e.into(),
            None => malformed(&item.url, "no articles on any content page"),
        })
    }
}

/// Category links from `Level.aspx`
pub(crate) fn parse_level_page(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    select_all(document.root_element(), "ul.level a[href*='Query2.aspx?no=C']")
        .into_iter()
        .filter_map(|link| resolve_link(link.value().attr("href")?, page_url))
        .collect()
}

/// `(title, fcode)` of every law in force listed in a category table
///
/// A row carrying the repealed marker (`fei.gif`) is skipped.
pub(crate) fn parse_category_page(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    select_all(document.root_element(), "table.tab-list a[href*='FLAWDAT01.aspx']")
        .into_iter()
        .filter(|link| !is_repealed(*link))
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let (_, lncode) = href.split_once("lncode=")?;
            let lncode = lncode.split('&').next().unwrap_or_default();
            if lncode.is_empty() {
                return None;
            }
            Some((element_text(link), lncode.replace("1C", "C")))
        })
        .collect()
}

fn is_repealed(link: ElementRef<'_>) -> bool {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "tr")
        .map(|row| select_first(row, "img[src*='fei.gif']").is_some())
        .unwrap_or(false)
}

/// Parses a content page; None if it carries no law text
pub(crate) fn parse_content_page(html: &str) -> Option<ContentPage> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut rows = select_all(root, "table.tab-law01 tr");
    if rows.is_empty() {
        rows = select_all(root, "table.tab-law tr");
    }

    let articles: Vec<Article> = rows
        .into_iter()
        .filter_map(|row| {
            let number = select_first(row, ".col-th")?;
            let content = select_first(row, ".col-td pre")?;
            Some(Article::new(element_text(number), element_text(content)))
        })
        .collect();

    if articles.is_empty() {
        return None;
    }

    let modified_date = select_text(root, "#cph_content_lawheader_law")
        .and_then(|header| parenthesized(&header))
        .unwrap_or_default();

    Some(ContentPage {
        modified_date,
        articles,
    })
}

/// Text between the first opening and the next closing parenthesis
fn parenthesized(text: &str) -> Option<String> {
    let start = text.find(['(', '（'])?;
    let rest = &text[start..];
    let rest = &rest[rest.chars().next()?.len_utf8()..];
    let end = rest.find([')', '）'])?;
    Some(rest[..end].trim().to_string())
}
