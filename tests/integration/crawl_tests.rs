//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the law databases and run
//! whole sources end-to-end, from the listing pages to the JSON files.

use law_crawler::config::{Config, RetryPolicy, SourceConfig};
use law_crawler::crawler::run_sources;
use law_crawler::{LawRecord, SourceKind};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast settings pointing one source at the mock server
fn source_config(server: &MockServer, output_dir: &Path) -> SourceConfig {
    let mut source = SourceConfig::new(
        &format!("{}/", server.uri()),
        output_dir.to_str().expect("temp dir is valid UTF-8"),
    );
    source.max_workers = 2;
    source.batch_size = 2;
    source.delay_min = 0.0;
    source.delay_max = 0.0;
    source
}

fn create_test_config() -> Config {
    let mut config = Config::default();
    config.retry = RetryPolicy {
        total: 1,
        backoff_factor: 0.0,
        backoff_max_secs: 0.0,
        status_forcelist: vec![500, 502, 503, 504],
    };
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn read_record(dir: &Path, file_name: &str) -> LawRecord {
    let text = std::fs::read_to_string(dir.join(file_name))
        .unwrap_or_else(|e| panic!("missing {}: {}", file_name, e));
    serde_json::from_str(&text).expect("record is valid JSON")
}

fn json_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_result_list_source_end_to_end() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    // Listing page 1: two laws in force, one repealed, pager to page 2
    Mock::given(method("GET"))
        .and(path("/LawResultList.aspx"))
        .and(query_param("NLawTypeID", "all"))
        .respond_with(html(
            r#"
            <div class="pageinfo">第 1/2 頁，共 3 筆</div>
            <table class="table-hover">
              <tr><td><a href="LawContent.aspx?id=1">高雄市自治條例</a></td><td>2023-01-01</td></tr>
              <tr><td><span class="label-fei">廢</span><a href="LawContent.aspx?id=9">已廢止規則</a></td><td>2000-01-01</td></tr>
              <tr><td><a href="LawContent.aspx?id=2">高雄市管理辦法</a></td><td>2022-02-02</td></tr>
            </table>
            <a id="ctl00_cp_content_rptList_ctl11_PagerButtom_hlNext" href="LawResultList.aspx?page=2">下一頁</a>
            "#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    // Listing page 2: one law, disabled pager
    Mock::given(method("GET"))
        .and(path("/LawResultList.aspx"))
        .and(query_param("page", "2"))
        .respond_with(html(
            r#"
            <table class="table-hover">
              <tr><td><a href="LawContent.aspx?id=3">高雄市收費標準</a></td><td>2021-03-03</td></tr>
            </table>
            <a id="ctl00_cp_content_rptList_ctl11_PagerButtom_hlNext" class="disabled" href="javascript:void(0)">下一頁</a>
            "#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/LawContent.aspx"))
        .and(query_param("id", "1"))
        .respond_with(html(
            r#"
            <table class="table-bordered">
              <tr><th>法規名稱：</th><td>高雄市自治條例</td></tr>
              <tr><th>修正日期：</th><td>民國 112 年 01 月 01 日</td></tr>
            </table>
            <table class="tab-law">
              <tr><td colspan="2">第一章 總則</td></tr>
              <tr><td>第 1 條</td><td>本自治條例依地方制度法制定之。</td></tr>
            </table>
            "#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/LawContent.aspx"))
        .and(query_param("id", "2"))
        .respond_with(html(
            "<div class=\"law-reg-content law-article\">\
               <span>第 1 條\u{3000}本辦法依自治條例訂定之。</span>\
               <span>第 2 條\u{3000}本辦法自發布日施行。</span>\
             </div>",
        ))
        .mount(&server)
        .await;

    // Persistently failing law page: one attempt plus one retry
    Mock::given(method("GET"))
        .and(path("/LawContent.aspx"))
        .and(query_param("id", "3"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.sources.kaohsiung = source_config(&server, output.path());

    let summary = run_sources(&config, &[SourceKind::Kaohsiung], None)
        .await
        .expect("run completes");

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].discovered, 3);
    assert_eq!(summary.reports[0].processed, 2);
    assert_eq!(json_file_count(output.path()), 2);

    let first = read_record(output.path(), "高雄市自治條例.json");
    assert_eq!(first.source, "kaohsiung");
    assert_eq!(first.modified_date, "民國 112 年 01 月 01 日");
    assert_eq!(first.listing_date, "2023-01-01");
    assert_eq!(first.articles.len(), 1);
    assert_eq!(first.articles[0].chapter, "第一章 總則");

    let second = read_record(output.path(), "高雄市管理辦法.json");
    assert_eq!(second.articles.len(), 2);
    assert_eq!(second.articles[1].number, "第 2 條");
    assert_eq!(second.articles[1].content, "本辦法自發布日施行。");
    assert!(second.url.ends_with("/LawContent.aspx?id=2"));
}

#[tokio::test]
async fn test_two_page_source_end_to_end() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    let listing = |links: &str| {
        html(&format!(
            r#"<div class="paging-counts">第 <em>1</em> / <em>2</em> 頁</div>
               <table class="table-tab"><tr><td>{}</td></tr></table>"#,
            links
        ))
    };

    Mock::given(method("GET"))
        .and(path("/Law/LawCategory/LawCategoryResult"))
        .and(query_param("page", "1"))
        .respond_with(listing(r#"<a href="/Law/LawSearch/LawInformation/FL001">法規一</a>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Law/LawCategory/LawCategoryResult"))
        .and(query_param("page", "2"))
        .respond_with(listing(r#"<a href="/Law/LawSearch/LawInformation/FL002">法規二</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    for (code, title) in [("001", "臺北市甲自治條例"), ("002", "臺北市乙自治條例")] {
        Mock::given(method("GET"))
            .and(path(format!("/Law/LawSearch/LawInformation/FL{}", code)))
            .respond_with(html(&format!(
                r#"<div class="col-input"><a class="law-link" href="javascript:void(0)">{}</a></div>
                   <div class="col-label">修正日期</div><div class="col-input"><dfn>2024-01-01</dfn></div>"#,
                title
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/Law/LawSearch/LawArticleContent/FL{}", code)))
            .respond_with(html(
                r#"<ul class="law law-content">
                     <li>第一章 總則</li>
                     <li><div class="col-no">第 1 條</div><div class="law-articlepre">本自治條例依法制定之。</div></li>
                   </ul>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config();
    config.sources.taipei = source_config(&server, output.path());

    let summary = run_sources(&config, &[SourceKind::Taipei], None)
        .await
        .expect("run completes");

    assert_eq!(summary.total_discovered(), 2);
    assert_eq!(summary.total_processed(), 2);

    let record = read_record(output.path(), "臺北市乙自治條例.json");
    assert_eq!(record.source, "taipei");
    assert_eq!(record.modified_date, "2024-01-01");
    assert!(record.url.ends_with("/Law/LawSearch/LawArticleContent/FL002"));
    assert_eq!(record.articles[0].chapter, "第一章 總則");
}

#[tokio::test]
async fn test_listing_failure_does_not_stop_other_sources() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    // Every listing endpoint is down
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.sources.new_taipei = source_config(&server, &output.path().join("new-taipei"));
    config.sources.taichung = source_config(&server, &output.path().join("taichung"));

    let summary = run_sources(&config, &[SourceKind::NewTaipei, SourceKind::Taichung], None)
        .await
        .expect("listing faults are contained");

    assert_eq!(summary.reports.len(), 2);
    assert!(summary.reports.iter().all(|r| r.discovered == 0 && r.processed == 0));
    assert_eq!(json_file_count(&output.path().join("taichung")), 0);
}

#[tokio::test]
async fn test_unusable_output_directory_ends_run() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let occupied = output.path().join("occupied");
    std::fs::write(&occupied, "not a directory").unwrap();

    let mut config = create_test_config();
    config.sources.taoyuan = source_config(&server, &occupied);

    let result = run_sources(&config, &[SourceKind::Taoyuan], None).await;
    assert!(result.is_err());
}
