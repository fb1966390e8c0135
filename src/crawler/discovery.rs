//! Work item discovery helpers
//!
//! This module turns listing markup into URLs to crawl:
//! - resolving `href` values against the page they appear on
//! - walking nested category trees with an explicit worklist
//! - following "next page" links with a loop guard and a page cap

use crate::model::WorkItem;
use crate::DiscoveryError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::future::Future;
use url::Url;

/// Upper bound on listing pages followed for a single listing
pub const MAX_LISTING_PAGES: usize = 2000;

/// What to do with a link found while walking a category tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// The link is a result; collect it
    Collect,
    /// The link toggles a sub-tree; walk the next `<ul>` in document order
    Expand,
    /// Ignore the link
    Skip,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<WorkItem>,
    pub next: Option<Url>,
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Collects result links from a nested category tree
///
/// The walk starts at the first element matching `root_selector` and visits
/// elements with an explicit stack, so deeply nested or malformed markup
/// cannot exhaust the call stack. Every element is visited at most once, even
/// when an [`LinkAction::Expand`] link points back into an already walked
/// part of the document. Collected links are returned in document order,
/// without duplicates.
pub fn walk_category_tree<F>(
    document: &Html,
    root_selector: &str,
    base_url: &Url,
    mut classify: F,
) -> Vec<Url>
where
    F: FnMut(&str) -> LinkAction,
{
    let Ok(selector) = Selector::parse(root_selector) else {
        return Vec::new();
    };
    let Some(root) = document.select(&selector).next() else {
        return Vec::new();
    };

    let mut stack = vec![root.id()];
    let mut visited = HashSet::new();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(element) = document.tree.get(id).and_then(ElementRef::wrap) else {
            continue;
        };

        if element.value().name() == "a" {
            let href = element.value().attr("href").unwrap_or("");
            match classify(href) {
                LinkAction::Collect => {
                    if let Some(url) = resolve_link(href, base_url) {
                        if seen.insert(url.to_string()) {
                            links.push(url);
                        }
                    }
                }
                LinkAction::Expand => {
                    if let Some(next) = next_element_named(document, element, "ul") {
                        stack.push(next.id());
                    }
                }
                LinkAction::Skip => {}
            }
        }

        // Reversed so that children are popped in document order
        let children: Vec<_> = element.children().filter_map(ElementRef::wrap).collect();
        stack.extend(children.into_iter().rev().map(|child| child.id()));
    }

    links
}

/// First element named `name` after `from` in document order
fn next_element_named<'a>(document: &'a Html, from: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .skip_while(|node| node.id() != from.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == name)
}

/// Follows a paginated listing from `start`
///
/// Stops when a page has no next link, when a next link points to a page that
/// was already fetched, after `max_pages` pages, or at the first page that
/// cannot be fetched (items gathered so far are kept).
pub async fn follow_pages<F, Fut>(start: Url, max_pages: usize, mut fetch_page: F) -> Vec<WorkItem>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<ListingPage, DiscoveryError>>,
{
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(start);
    let mut pages = 0;

    while let Some(url) = current.take() {
        if pages >= max_pages {
            tracing::warn!(url = %url, pages, "Listing page cap reached");
            break;
        }
        if !visited.insert(url.to_string()) {
            tracing::warn!(url = %url, "Listing links back to a visited page");
            break;
        }
        pages += 1;

        match fetch_page(url.clone()).await {
            Ok(page) => {
                tracing::info!(url = %url, page = pages, found = page.items.len(), "Listing page processed");
                items.extend(page.items);
                current = page.next;
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to fetch listing page");
                break;
            }
        }
    }

    items
}

/// Returns `url` with its `page` query parameter set to `page`
pub fn with_page(url: &Url, page: u32) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut paged = url.clone();
    paged
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("page", &page.to_string());
    paged
}

/// Reads the `page` query parameter, defaulting to 1
pub fn page_number(url: &Url) -> u32 {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

/// Removes repeated URLs, keeping the first occurrence
pub fn dedupe_items(items: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.url.to_string()))
        .collect()
}
