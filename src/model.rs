//! Work items, normalized law records and the source catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// The legal databases this crate knows how to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Central government law database (law.moj.gov.tw)
    Central,
    /// Taipei City
    Taipei,
    /// New Taipei City
    NewTaipei,
    /// Taichung City
    Taichung,
    /// Taoyuan City
    Taoyuan,
    /// Kaohsiung City
    Kaohsiung,
}

impl SourceKind {
    /// Every source, in the order a full run visits them
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Central,
        SourceKind::Taipei,
        SourceKind::NewTaipei,
        SourceKind::Taichung,
        SourceKind::Taoyuan,
        SourceKind::Kaohsiung,
    ];

    /// Stable identifier used on the command line, in config tables and in
    /// the `Source` field of every record
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Central => "central",
            SourceKind::Taipei => "taipei",
            SourceKind::NewTaipei => "new-taipei",
            SourceKind::Taichung => "taichung",
            SourceKind::Taoyuan => "taoyuan",
            SourceKind::Kaohsiung => "kaohsiung",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown source '{}'", s))
    }
}

/// One fetchable unit of crawl work
///
/// Listing pages sometimes expose information that the detail page does not
/// reliably repeat (the statute name, the listing date, a site-specific code);
/// that information travels with the URL as sidecar metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Detail page to fetch
    pub url: Url,

    /// Display name shown on the listing page
    pub name: Option<String>,

    /// Date shown on the listing page
    pub date: Option<String>,

    /// Site-specific law code
    pub code: Option<String>,
}

impl WorkItem {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            name: None,
            date: None,
            code: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sidecar name, or an empty string
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// A normalized statute
///
/// Every field is always serialized; unknown values are empty strings so that
/// consumers see the same schema regardless of the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawRecord {
    #[serde(rename = "Source")]
    pub source: String,

    #[serde(rename = "LawName")]
    pub title: String,

    #[serde(rename = "LawCategory")]
    pub category: String,

    #[serde(rename = "LawModifiedDate")]
    pub modified_date: String,

    #[serde(rename = "LawPublishDate")]
    pub publish_date: String,

    /// Issuing document number (發文字號)
    #[serde(rename = "LawNumber")]
    pub document_number: String,

    /// Date shown next to the statute on the listing page
    #[serde(rename = "LawListingDate")]
    pub listing_date: String,

    #[serde(rename = "LawURL")]
    pub url: String,

    #[serde(rename = "LawArticles")]
    pub articles: Vec<Article>,
}

impl LawRecord {
    /// Creates an empty record for the given source and page
    pub fn new(source: SourceKind, url: &Url) -> Self {
        Self {
            source: source.as_str().to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Returns true if the record carries a usable title
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// One article (條) of a statute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Chapter heading the article belongs to, if the site shows one
    #[serde(rename = "Chapter")]
    pub chapter: String,

    #[serde(rename = "ArticleNo")]
    pub number: String,

    #[serde(rename = "ArticleContent")]
    pub content: String,
}

impl Article {
    pub fn new(number: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chapter: String::new(),
            number: number.into(),
            content: content.into(),
        }
    }

    pub fn in_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = chapter.into();
        self
    }
}
