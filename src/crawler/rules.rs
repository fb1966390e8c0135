//! Selector rules for pulling fields out of parsed pages
//!
//! Government sites render the same field in different places depending on
//! the page template. A field is therefore described as a list of [`Rule`]s
//! evaluated in order; the first rule that yields non-empty text wins.

use scraper::{ElementRef, Selector};

/// One way of locating a field's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text of the first element matching the selector
    Text(&'static str),

    /// Text of `value` inside the first `row` whose text contains `needle`
    RowContaining {
        row: &'static str,
        needle: &'static str,
        value: &'static str,
    },

    /// Text of `inner` inside the element right after the first `label`
    /// whose text contains `needle`
    NextSibling {
        label: &'static str,
        needle: &'static str,
        inner: &'static str,
    },
}

impl Rule {
    /// Applies the rule within `scope`
    pub fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        match *self {
            Rule::Text(css) => select_text(scope, css),
            Rule::RowContaining { row, needle, value } => select_all(scope, row)
                .into_iter()
                .find(|element| element_text(*element).contains(needle))
                .and_then(|element| select_text(element, value)),
            Rule::NextSibling {
                label,
                needle,
                inner,
            } => {
                let label = select_all(scope, label)
                    .into_iter()
                    .find(|element| element_text(*element).contains(needle))?;
                let sibling = label.next_siblings().find_map(ElementRef::wrap)?;
                select_text(sibling, inner)
            }
        }
    }
}

/// Evaluates `rules` in order and returns the first non-empty text
pub fn first_match(scope: ElementRef<'_>, rules: &[Rule]) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(scope))
}

/// Every element under `scope` matching `css`
///
/// An unparsable selector matches nothing.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// First element under `scope` matching `css`
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Trimmed text of the first element matching `css`, if non-empty
pub fn select_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(scope, css)
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// All text below an element, trimmed at both ends
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// All text below an element with every text node trimmed and glued together
pub fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect()
}

/// `(label, value)` pairs from the rows of a `th`/`td` table
///
/// Rows lacking either cell are skipped.
pub fn labeled_rows(table: ElementRef<'_>) -> Vec<(String, String)> {
    select_all(table, "tr")
        .into_iter()
        .filter_map(|row| {
            let label = select_first(row, "th")?;
            let value = select_first(row, "td")?;
            Some((element_text(label), element_text(value)))
        })
        .collect()
}

/// Keeps only the ASCII digits of `text`
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const LAW_PAGE: &str = r#"
        <html><body>
          <table class="table-title">
            <tr><th>法規名稱：</th><td>道路交通管理處罰條例</td></tr>
            <tr><th>修正日期：</th><td>民國 113 年 05 月 29 日</td></tr>
          </table>
          <div class="row">
            <div class="col-label">公發布日</div><div class="col-input"><dfn>2001-01-01</dfn></div>
          </div>
          <div class="row">
            <div class="col-label">修正日期</div><div class="col-input"><dfn> 2024-05-29 </dfn></div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_first_matching_rule_wins() {
        let document = Html::parse_document(LAW_PAGE);
        let rules = [
            Rule::Text("#trLNNDate td"),
            Rule::Text("#trLNODate td"),
            Rule::RowContaining {
                row: ".table-title tr",
                needle: "修正日期",
                value: "td",
            },
        ];

        let date = first_match(document.root_element(), &rules).unwrap();
        assert_eq!(date, "民國 113 年 05 月 29 日");
        assert_eq!(digits_only(&date), "1130529");
    }

    #[test]
    fn test_earlier_rule_takes_precedence() {
        let html = r#"<table id="x"><tr id="trLNNDate"><td>20240101</td></tr></table>"#;
        let document = Html::parse_document(html);
        let rules = [Rule::Text("#trLNNDate td"), Rule::Text("td")];
        assert_eq!(
            first_match(document.root_element(), &rules).as_deref(),
            Some("20240101")
        );
    }

    #[test]
    fn test_empty_text_falls_through() {
        let html = r#"<p id="empty">   </p><p id="full">內容</p>"#;
        let document = Html::parse_document(html);
        let rules = [Rule::Text("#empty"), Rule::Text("#full")];
        assert_eq!(
            first_match(document.root_element(), &rules).as_deref(),
            Some("內容")
        );
    }

    #[test]
    fn test_next_sibling_rule() {
        let document = Html::parse_document(LAW_PAGE);
        let rule = Rule::NextSibling {
            label: "div.col-label",
            needle: "修正日期",
            inner: "dfn",
        };
        assert_eq!(
            rule.apply(document.root_element()).as_deref(),
            Some("2024-05-29")
        );
    }

    #[test]
    fn test_no_rule_matches() {
        let document = Html::parse_document(LAW_PAGE);
        let rules = [Rule::Text("#missing"), Rule::Text("not a [ selector")];
        assert!(first_match(document.root_element(), &rules).is_none());
    }

    #[test]
    fn test_labeled_rows_skip_incomplete_rows() {
        let html = r#"
            <table class="table-bordered">
              <tr><th>法規名稱</th><td> 臺中市自治條例 </td></tr>
              <tr><td>only a value</td></tr>
              <tr><th>法規體系</th><td>民政類</td></tr>
            </table>
        "#;
        let document = Html::parse_document(html);
        let table = select_first(document.root_element(), "table.table-bordered").unwrap();
        assert_eq!(
            labeled_rows(table),
            vec![
                ("法規名稱".to_string(), "臺中市自治條例".to_string()),
                ("法規體系".to_string(), "民政類".to_string()),
            ]
        );
    }

    #[test]
    fn test_stripped_text_joins_trimmed_nodes() {
        let html = r#"<div id="c"><span> 第一條 </span>
            <span>本法依憲法制定之。</span></div>"#;
        let document = Html::parse_document(html);
        let div = select_first(document.root_element(), "#c").unwrap();
        assert_eq!(stripped_text(div), "第一條本法依憲法制定之。");
    }
}
