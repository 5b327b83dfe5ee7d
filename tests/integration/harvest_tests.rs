//! Integration tests for the harvest loop and the enricher
//!
//! These tests use wiremock to serve listing and detail pages and drive
//! the engine end-to-end over real HTTP.

use scraper::Html;
use serde_json::Value;
use std::time::{Duration, Instant};
use vlr_harvest::config::HttpConfig;
use vlr_harvest::harvest::{
    plan, run_harvest, Enricher, EnrichmentTask, PageTemplate, RetryPolicy, SelectorDetail,
    SelectorExtractor, UNKNOWN,
};
use vlr_harvest::http::{check_health, HttpClient};
use vlr_harvest::ExtractError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing page with one `.item` per title
fn listing_html(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .map(|title| format!(r#"<li class="item"><span class="title">{}</span></li>"#, title))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", items)
}

fn title_extractor() -> SelectorExtractor {
    SelectorExtractor::new("li.item", [("title".to_string(), "span.title".to_string())])
        .expect("valid selectors")
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        request_delay: Duration::from_millis(1),
        timeout: Duration::from_secs(2),
    }
}

fn client() -> HttpClient {
    HttpClient::new(&HttpConfig::default()).expect("Failed to build client")
}

fn titles(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|record| record["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Page 1 is served at `/results`, later pages at `/results/?page=N`
async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    let mock = if page == 1 {
        Mock::given(method("GET")).and(path("/results"))
    } else {
        Mock::given(method("GET"))
            .and(path("/results/"))
            .and(query_param("page", page.to_string()))
    };
    mock.respond_with(response).mount(server).await;
}

fn template(server: &MockServer) -> PageTemplate {
    PageTemplate::parse(&format!("{}/results", server.uri())).expect("valid base URL")
}

#[tokio::test]
async fn test_failed_page_does_not_abort_harvest() {
    let server = MockServer::start().await;

    for page in [1, 2, 4, 5] {
        let title = format!("p{}", page);
        mount_page(
            &server,
            page,
            ResponseTemplate::new(200).set_body_string(listing_html(&[&title])),
        )
        .await;
    }

    Mock::given(method("GET"))
        .and(path("/results/"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(5, None, None),
        &fast_policy(2),
    )
    .await;

    assert_eq!(outcome.failed_pages(), &[3]);
    assert_eq!(outcome.succeeded_pages(), 4);
    assert!(outcome.is_partial());
    assert_eq!(titles(outcome.records()), vec!["p1", "p2", "p4", "p5"]);
    assert_eq!(outcome.record_count(), 4);
}

#[tokio::test]
async fn test_records_carry_their_page_number() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_string(listing_html(&["a", "b"])),
    )
    .await;
    mount_page(
        &server,
        3,
        ResponseTemplate::new(200).set_body_string(listing_html(&["c"])),
    )
    .await;

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(1, Some(2), Some(3)),
        &fast_policy(1),
    )
    .await;

    let pages: Vec<u64> = outcome
        .records()
        .iter()
        .filter_map(|record| record["page_number"].as_u64())
        .collect();
    assert_eq!(pages, vec![2, 2, 3]);
    assert!(!outcome.is_partial());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_string(listing_html(&["ok"])),
    )
    .await;

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(1, None, None),
        &fast_policy(3),
    )
    .await;

    assert!(outcome.failed_pages().is_empty());
    assert_eq!(titles(outcome.records()), vec!["ok"]);
}

#[tokio::test]
async fn test_empty_page_is_success_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(1, None, None),
        &fast_policy(3),
    )
    .await;

    assert_eq!(outcome.succeeded_pages(), 1);
    assert!(outcome.failed_pages().is_empty());
    assert_eq!(outcome.record_count(), 0);
}

#[tokio::test]
async fn test_timeout_counts_as_failed_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_html(&["late"]))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retries: 2,
        request_delay: Duration::from_millis(1),
        timeout: Duration::from_millis(100),
    };

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(1, None, None),
        &policy,
    )
    .await;

    assert_eq!(outcome.failed_pages(), &[1]);
    assert_eq!(outcome.succeeded_pages(), 0);
    assert!(outcome.records().is_empty());
}

/// Serves pages 1 to 3; page 2 is expected `page_two_hits` times
async fn mount_three_pages(server: &MockServer, page_two_hits: u64) {
    mount_page(
        server,
        1,
        ResponseTemplate::new(200).set_body_string(listing_html(&["p1"])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/results/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["p2"])))
        .expect(page_two_hits)
        .mount(server)
        .await;
    mount_page(
        server,
        3,
        ResponseTemplate::new(200).set_body_string(listing_html(&["p3"])),
    )
    .await;
}

#[tokio::test]
async fn test_extractor_error_is_retried_then_page_failed() {
    let server = MockServer::start().await;
    mount_three_pages(&server, 3).await;

    let picky = |_: &Html, page: u32| -> Result<Vec<u32>, ExtractError> {
        if page == 2 {
            Err(ExtractError::Malformed {
                page,
                message: "results table missing".to_string(),
            })
        } else {
            Ok(vec![page])
        }
    };

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &picky,
        plan(3, None, None),
        &fast_policy(3),
    )
    .await;

    assert_eq!(outcome.failed_pages(), &[2]);
    assert_eq!(outcome.succeeded_pages(), 2);
    assert_eq!(outcome.records(), &[1, 3]);
}

#[tokio::test]
async fn test_extractor_panic_costs_only_its_page() {
    let server = MockServer::start().await;
    mount_three_pages(&server, 1).await;

    let broken = |_: &Html, page: u32| -> Result<Vec<u32>, ExtractError> {
        let rows: Vec<u32> = Vec::new();
        if page == 2 {
            return Ok(vec![rows[5]]);
        }
        Ok(vec![page])
    };

    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &broken,
        plan(3, None, None),
        &fast_policy(1),
    )
    .await;

    assert_eq!(outcome.failed_pages(), &[2]);
    assert_eq!(outcome.records(), &[1, 3]);
}

#[tokio::test]
async fn test_backoff_doubles_and_skips_final_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retries: 3,
        request_delay: Duration::from_millis(100),
        timeout: Duration::from_secs(2),
    };

    let started = Instant::now();
    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(1, None, None),
        &policy,
    )
    .await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.failed_pages(), &[1]);
    // 200ms after attempt 1, 400ms after attempt 2, nothing after attempt 3
    assert!(elapsed >= Duration::from_millis(600), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1400), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_request_delay_between_pages_only() {
    let server = MockServer::start().await;
    mount_three_pages(&server, 1).await;

    let policy = RetryPolicy {
        max_retries: 1,
        request_delay: Duration::from_millis(200),
        timeout: Duration::from_secs(2),
    };

    let started = Instant::now();
    let outcome = run_harvest(
        &client(),
        "results",
        &template(&server),
        &title_extractor(),
        plan(3, None, None),
        &policy,
    )
    .await;
    let elapsed = started.elapsed();

    assert_eq!(titles(outcome.records()), vec!["p1", "p2", "p3"]);
    // Two pauses between three pages, none after the last one
    assert!(elapsed >= Duration::from_millis(400), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(600), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_enrichment_preserves_input_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/detail/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="score">2:0</div>"#)
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/detail/b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/detail/c"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<div class="score">1:2</div>"#))
        .mount(&server)
        .await;

    let tasks = vec![
        EnrichmentTask::new("A", format!("{}/detail/a", server.uri())),
        EnrichmentTask::new("B", format!("{}/detail/b", server.uri())),
        EnrichmentTask::new("C", format!("{}/detail/c", server.uri())),
        EnrichmentTask {
            primary: "D",
            secondary_url: None,
        },
    ];

    let detail = SelectorDetail::new([("score".to_string(), ".score".to_string())])
        .expect("valid selectors");
    let enriched = Enricher::new(detail, Duration::from_secs(2))
        .enrich(&client(), tasks)
        .await;

    let primaries: Vec<&str> = enriched.iter().map(|item| item.primary).collect();
    assert_eq!(primaries, vec!["A", "B", "C", "D"]);

    let resolved: Vec<bool> = enriched.iter().map(|item| item.resolved).collect();
    assert_eq!(resolved, vec![true, false, true, false]);

    assert_eq!(enriched[0].detail["score"], "2:0");
    assert_eq!(enriched[1].detail["score"], UNKNOWN);
    assert_eq!(enriched[2].detail["score"], "1:2");
    assert_eq!(enriched[3].detail["score"], UNKNOWN);
}

#[tokio::test]
async fn test_enrichment_timeout_yields_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/detail/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="score">0:0</div>"#)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let detail = SelectorDetail::new([("score".to_string(), ".score".to_string())])
        .expect("valid selectors");
    let enriched = Enricher::new(detail, Duration::from_millis(50))
        .enrich(
            &client(),
            vec![EnrichmentTask::new(1, format!("{}/detail/slow", server.uri()))],
        )
        .await;

    assert_eq!(enriched.len(), 1);
    assert!(!enriched[0].resolved);
    assert_eq!(enriched[0].detail["score"], UNKNOWN);
}

#[tokio::test]
async fn test_health_check_reports_each_site() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sites = vec![
        format!("{}/up", server.uri()),
        format!("{}/down", server.uri()),
        "http://127.0.0.1:1/unreachable".to_string(),
    ];

    let report = check_health(&client(), &sites).await;

    assert_eq!(report.len(), 3);
    assert!(report[0].healthy);
    assert_eq!(report[0].status, Some(200));
    assert!(!report[1].healthy);
    assert_eq!(report[1].status, Some(503));
    assert!(!report[2].healthy);
    assert_eq!(report[2].status, None);
}
