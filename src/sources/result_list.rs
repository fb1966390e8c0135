//! Listing and law pages shared by the Taoyuan and Kaohsiung databases
//!
//! Both sites run the same application: an "all laws" result list paged
//! through a pager link, and law pages with a labeled information table and
//! an article table. They differ only in how a page without an article table
//! is read, which is expressed as a [`BodyFallback`].

use super::{apply_info_rows, SourceContext};
use crate::crawler::discovery::{follow_pages, resolve_link, ListingPage, MAX_LISTING_PAGES};
use crate::crawler::rules::{element_text, labeled_rows, select_all, select_first, stripped_text};
use crate::model::{Article, LawRecord, WorkItem};
use crate::DiscoveryError;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use url::Url;

/// Every category, current laws only
const ALL_LAWS: &str = "LawResultList.aspx?NLawTypeID=all&GroupID=&CategoryID=1%2c01%2c02%2c03%2c04%2c05%2c06%2c07%2c08%2c09%2c10%2c11%2c12%2c13%2c14%2c15%2c16%2c17%2c18%2c19%2c20%2c21%2c22%2c23%2c24%2c25%2c26%2c27%2c28%2c29%2c30%2c31%2c33%2c34%2c35%2c36%2c32%2cb01%2cb02%2cb03%2cb04%2cb05%2cb06%2cb07%2cb08%2cb09%2cb10%2cb11%2cb12%2c&KW=&name=1&content=1&StartDate=&EndDate=&LNumber=&now=1&fei=1";

const NEXT_LINK: &str = "a#ctl00_cp_content_rptList_ctl11_PagerButtom_hlNext";

/// Article heading such as "第 12 條" or "第十二條"
static ARTICLE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^第\s*([一二三四五六七八九十百千]+|\d+)\s*條").expect("hardcoded regex pattern is valid")
});

/// How to read a law page that has no article table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyFallback {
    /// The whole `.law-reg-content` text becomes one unnumbered article
    WholeText,
    /// Spans are grouped into articles at each "第 N 條" heading
    SpanArticles,
}

/// Walks the result list and returns every law in force
pub(crate) async fn list_laws(ctx: &SourceContext) -> Result<Vec<WorkItem>, DiscoveryError> {
    let start = ctx.join(ALL_LAWS)?;
    let base_url = ctx.base_url();

    let mut first_page = true;
    let items = follow_pages(start, MAX_LISTING_PAGES, |url| {
        let log_total = std::mem::replace(&mut first_page, false);
        async move {
            let html = ctx.fetch(&url).await?;
            if log_total {
                if let Some(total) = parse_total(&html) {
                    tracing::info!(total, "Laws listed");
                }
            }
            Ok::<_, DiscoveryError>(parse_listing_page(&html, base_url))
        }
    })
    .await;

    tracing::info!(found = items.len(), "Found law links");
    Ok(items)
}

/// The "共 N 筆" total printed in `.pageinfo`
pub(crate) fn parse_total(html: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let info = element_text(select_first(document.root_element(), ".pageinfo")?);
    let (_, rest) = info.split_once('共')?;
    let (count, _) = rest.split_once('筆')?;
    count.trim().replace(',', "").parse().ok()
}

/// Laws in force on one result page, plus the pager's next link
pub(crate) fn parse_listing_page(html: &str, base_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let items = select_all(root, "table.table-hover tr")
        .into_iter()
        .filter(|row| select_first(*row, ".label-fei").is_none())
        .filter_map(|row| {
            let link = select_first(row, "a[href*='LawContent.aspx']")?;
            let url = resolve_link(link.value().attr("href")?, base_url)?;
            let date = select_first(row, "td:nth-of-type(2)")
                .map(element_text)
                .unwrap_or_default();
            Some(WorkItem::new(url).with_name(element_text(link)).with_date(date))
        })
        .collect();

    let next = select_first(root, NEXT_LINK)
        .filter(|link| !link.value().classes().any(|class| class == "disabled"))
        .and_then(|link| resolve_link(link.value().attr("href")?, base_url));

    ListingPage { items, next }
}

/// Fills `record` from a law page
pub(crate) fn parse_law_page(html: &str, record: &mut LawRecord, fallback: BodyFallback) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    if let Some(table) = select_first(root, "table.table-bordered") {
        apply_info_rows(&labeled_rows(table), record);
    }

    if let Some(table) = select_first(root, "table.tab-law") {
        record.articles = table_articles(table);
    }
    if !record.articles.is_empty() {
        return;
    }

    record.articles = match fallback {
        BodyFallback::WholeText => select_first(root, ".law-reg-content")
            .map(|body| vec![Article::new("", element_text(body))])
            .unwrap_or_default(),
        BodyFallback::SpanArticles => select_first(root, ".law-reg-content.law-article")
            .or_else(|| select_first(root, "div[id*='divLawContent']"))
            .map(|body| {
                let articles = span_articles(body);
                if articles.is_empty() {
                    vec![Article::new("", stripped_text(body))]
                } else {
                    articles
                }
            })
            .unwrap_or_default(),
    };
}

/// Articles of a `table.tab-law`
///
/// A single-cell row mentioning 章 is a chapter heading and is attached to
/// the articles that follow it.
fn table_articles(table: ElementRef<'_>) -> Vec<Article> {
    let mut chapter = String::new();
    let mut articles = Vec::new();

    for row in select_all(table, "tr") {
        let cells = select_all(row, "td");
        match cells.as_slice() {
            [number, content, ..] => {
                let content = element_text(*content);
                if !content.is_empty() {
                    articles.push(Article::new(element_text(*number), content).in_chapter(chapter.clone()));
                }
            }
            [heading] => {
                let heading = element_text(*heading);
                if heading.contains('章') {
                    chapter = heading;
                }
            }
            [] => {}
        }
    }

    articles
}

/// Groups the spans of a law body into articles
///
/// A span starting with an article heading opens a new article; its text up
/// to the first full-width space is the number and the rest starts the
/// content. Following spans are appended to the open article, joined by a
/// space. Text before the first heading and headings without content are
/// dropped.
fn span_articles(body: ElementRef<'_>) -> Vec<Article> {
    let mut articles = Vec::new();
    let mut open: Option<(String, Vec<String>)> = None;

    for span in select_all(body, "span") {
        let text = stripped_text(span);
        if text.is_empty() {
            continue;
        }

        if ARTICLE_HEADING.is_match(&text) {
            if let Some(article) = open.take().and_then(close_article) {
                articles.push(article);
            }
            let number = text.split('\u{3000}').next().unwrap_or_default().to_string();
            let rest = text[number.len()..].trim();
            let parts = if rest.is_empty() {
                Vec::new()
            } else {
                vec![rest.to_string()]
            };
            open = Some((number, parts));
        } else if let Some((_, parts)) = open.as_mut() {
            parts.push(text);
        }
    }

    if let Some(article) = open.and_then(close_article) {
        articles.push(article);
    }
    articles
}

fn close_article((number, parts): (String, Vec<String>)) -> Option<Article> {
    (!parts.is_empty()).then(|| Article::new(number, parts.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;

    fn base_url() -> Url {
        Url::parse("https://law.tycg.gov.tw/").unwrap()
    }

    fn record() -> LawRecord {
        let url = Url::parse("https://law.tycg.gov.tw/LawContent.aspx?id=1").unwrap();
        let mut record = LawRecord::new(SourceKind::Taoyuan, &url);
        record.title = "listing name".to_string();
        record
    }

    #[test]
    fn test_parse_total() {
        let html = r#"<div class="pageinfo">第 1/120 頁，共 2,395 筆</div>"#;
        assert_eq!(parse_total(html), Some(2395));
        let html = r#"<div class="pageinfo">第 1/120 頁，共 2395 筆</div>"#;
        assert_eq!(parse_total(html), Some(2395));
        assert_eq!(parse_total("<div></div>"), None);
    }

    #[test]
    fn test_parse_listing_page() {
        let html = r#"
            <table class="table-hover">
              <tr><td><a href="LawContent.aspx?id=1">桃園市自治條例</a></td><td>2023-06-30</td></tr>
              <tr><td><span class="label-fei">廢</span><a href="LawContent.aspx?id=2">已廢止</a></td><td>2001-01-01</td></tr>
              <tr><td><a href="LawContent.aspx?id=3">桃園市管理辦法</a></td></tr>
            </table>
            <a id="ctl00_cp_content_rptList_ctl11_PagerButtom_hlNext" href="LawResultList.aspx?page=2">下一頁</a>
        "#;
        let listing = parse_listing_page(html, &base_url());
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.items[0].name.as_deref(), Some("桃園市自治條例"));
        assert_eq!(listing.items[0].date.as_deref(), Some("2023-06-30"));
        assert_eq!(listing.items[1].date.as_deref(), Some(""));
        assert_eq!(
            listing.next.map(|u| u.to_string()).as_deref(),
            Some("https://law.tycg.gov.tw/LawResultList.aspx?page=2")
        );
    }

    #[test]
    fn test_disabled_next_link_ends_listing() {
        let html = r#"
            <a id="ctl00_cp_content_rptList_ctl11_PagerButtom_hlNext" class="btn disabled" href="LawResultList.aspx?page=9">下一頁</a>
        "#;
        assert!(parse_listing_page(html, &base_url()).next.is_none());

        let html = r#"<a id="ctl00_cp_content_rptList_ctl11_PagerButtom_hlNext">下一頁</a>"#;
        assert!(parse_listing_page(html, &base_url()).next.is_none());
    }

    #[test]
    fn test_parse_law_page_with_chapters() {
        let html = r#"
            <table class="table-bordered">
              <tr><th>法規名稱：</th><td>桃園市自治條例</td></tr>
              <tr><th>公發布日：</th><td>民國 104 年 01 月 01 日</td></tr>
              <tr><th>修正日期：</th><td>民國 112 年 06 月 30 日</td></tr>
              <tr><th>發文字號：</th><td>府法規字第 1120001 號</td></tr>
            </table>
            <table class="tab-law">
              <tr><td colspan="2">第一章 總則</td></tr>
              <tr><td>第 1 條</td><td>本自治條例依地方制度法制定之。</td></tr>
              <tr><td colspan="2">附註</td></tr>
              <tr><td colspan="2">第二章 附則</td></tr>
              <tr><td>第 2 條</td><td>本自治條例自公布日施行。</td></tr>
            </table>
            <div class="law-reg-content">should not be used</div>
        "#;
        let mut record = record();
        parse_law_page(html, &mut record, BodyFallback::WholeText);

        assert_eq!(record.title, "桃園市自治條例");
        assert_eq!(record.publish_date, "民國 104 年 01 月 01 日");
        assert_eq!(record.modified_date, "民國 112 年 06 月 30 日");
        assert_eq!(record.document_number, "府法規字第 1120001 號");
        assert_eq!(record.articles.len(), 2);
        assert_eq!(record.articles[0].chapter, "第一章 總則");
        assert_eq!(record.articles[1].chapter, "第二章 附則");
        assert_eq!(record.articles[1].number, "第 2 條");
    }

    #[test]
    fn test_whole_text_fallback() {
        let html = r#"<div class="law-reg-content">  一、本要點自發布日施行。 </div>"#;
        let mut record = record();
        parse_law_page(html, &mut record, BodyFallback::WholeText);
        assert_eq!(record.title, "listing name");
        assert_eq!(record.articles, vec![Article::new("", "一、本要點自發布日施行。")]);
    }

    #[test]
    fn test_span_articles_fallback() {
        let html = "
            <div class=\"law-reg-content law-article\">
              <span>前言不列入</span>
              <span>第 1 條\u{3000}本自治條例依地方制度法制定之。</span>
              <span>第二條</span>
              <span>本自治條例之主管機關為本府。</span>
              <span>前項業務得委任辦理。</span>
              <span>第 3 條</span>
              <span> </span>
            </div>
        ";
        let mut record = record();
        parse_law_page(html, &mut record, BodyFallback::SpanArticles);

        assert_eq!(
            record.articles,
            vec![
                Article::new("第 1 條", "本自治條例依地方制度法制定之。"),
                Article::new("第二條", "本自治條例之主管機關為本府。 前項業務得委任辦理。"),
            ]
        );
    }

    #[test]
    fn test_span_fallback_without_headings_keeps_whole_text() {
        let html = r#"<div id="divLawContent08"><span>一、</span><span>本要點自發布日施行。</span></div>"#;
        let mut record = record();
        parse_law_page(html, &mut record, BodyFallback::SpanArticles);
        assert_eq!(record.articles, vec![Article::new("", "一、本要點自發布日施行。")]);
    }

    #[test]
    fn test_page_without_body() {
        let mut record = record();
        parse_law_page("<p>查無資料</p>", &mut record, BodyFallback::SpanArticles);
        assert!(record.articles.is_empty());
    }
}
