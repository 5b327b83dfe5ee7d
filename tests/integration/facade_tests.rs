//! Integration tests for the cached harvesters
//!
//! These tests check that cache hits never touch the network, that total
//! failures are reported and never cached, and that invalid requests are
//! rejected before any request is sent.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use vlr_harvest::config::{HttpConfig, LimitsConfig};
use vlr_harvest::harvest::{
    EnrichedHarvester, Enricher, Harvester, HarvestRequest, LinkedSelectorExtractor,
    OutcomeCache, PageTemplate, RetryPolicy, SelectorDetail, SelectorExtractor, UNKNOWN,
};
use vlr_harvest::http::ConnectionManager;
use vlr_harvest::HarvestError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TTL: Duration = Duration::from_secs(300);

/// Limits loose enough for millisecond delays
fn test_limits() -> LimitsConfig {
    LimitsConfig {
        max_page_window: 10,
        max_retries: 5,
        min_request_delay_ms: 0,
        max_request_delay_ms: 5000,
        min_timeout_secs: 1,
        max_timeout_secs: 120,
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        request_delay: Duration::from_millis(1),
        timeout: Duration::from_secs(2),
    }
}

fn request(page_count: u32) -> HarvestRequest {
    HarvestRequest::pages(page_count).with_retry(fast_policy(2))
}

fn listing_harvester(server: &MockServer) -> Harvester<SelectorExtractor> {
    let template =
        PageTemplate::parse(&format!("{}/matches/results", server.uri())).expect("valid base URL");
    let extractor =
        SelectorExtractor::new("div.match", [("team".to_string(), ".team".to_string())])
            .expect("valid selectors");

    Harvester::new(
        "results",
        TTL,
        template,
        extractor,
        Arc::new(ConnectionManager::new(HttpConfig::default())),
        Arc::new(OutcomeCache::new(100)),
    )
    .with_limits(test_limits())
}

async fn mount_results(server: &MockServer, response: ResponseTemplate, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/matches/results"))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

fn results_page() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(
        r#"<div class="match"><span class="team">Sentinels</span></div>
           <div class="match"><span class="team">Fnatic</span></div>"#,
    )
}

#[tokio::test]
async fn test_second_harvest_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_results(&server, results_page(), 1).await;

    let harvester = listing_harvester(&server);
    let first = harvester.harvest(&request(1)).await.expect("first harvest");
    let second = harvester.harvest(&request(1)).await.expect("cached harvest");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.record_count(), 2);
    assert_eq!(first.records()[0]["team"], "Sentinels");
}

#[tokio::test]
async fn test_retry_settings_share_cache_entry() {
    let server = MockServer::start().await;
    mount_results(&server, results_page(), 1).await;

    let harvester = listing_harvester(&server);
    harvester.harvest(&request(1)).await.expect("first harvest");

    let patient = HarvestRequest::pages(1).with_retry(fast_policy(5));
    assert!(harvester.harvest(&patient).await.is_ok());
}

#[tokio::test]
async fn test_total_failure_is_no_data_and_not_cached() {
    let server = MockServer::start().await;
    mount_results(&server, ResponseTemplate::new(500), 4).await;

    let harvester = listing_harvester(&server);

    for _ in 0..2 {
        match harvester.harvest(&request(1)).await {
            Err(HarvestError::NoData {
                source_name,
                failed_pages,
            }) => {
                assert_eq!(source_name, "results");
                assert_eq!(failed_pages, vec![1]);
            }
            other => panic!("Expected NoData, got {:?}", other.map(|o| o.record_count())),
        }
    }
}

#[tokio::test]
async fn test_invalid_request_never_reaches_network() {
    let server = MockServer::start().await;
    mount_results(&server, results_page(), 0).await;

    let harvester = listing_harvester(&server);

    let too_many_retries = HarvestRequest::pages(1).with_retry(fast_policy(9));
    let too_wide = request(11);

    for bad in [too_many_retries, too_wide] {
        assert!(matches!(
            harvester.harvest(&bad).await,
            Err(HarvestError::InvalidRequest(_))
        ));
    }
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = MockServer::start().await;
    mount_results(&server, results_page(), 2).await;

    let harvester = listing_harvester(&server);
    harvester.harvest(&request(1)).await.expect("first harvest");

    assert!(harvester.invalidate(&request(1)));
    assert!(!harvester.invalidate(&request(1)));

    harvester.harvest(&request(1)).await.expect("refetch");
}

#[tokio::test]
async fn test_enriched_listing_merges_details() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/matches"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a class="match" href="/match/1"><span class="team">EDG</span></a>
               <a class="match" href="/match/2"><span class="team">PRX</span></a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/match/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<div class="score">13-11</div>"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/match/2"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/matches", server.uri());
    let listing = LinkedSelectorExtractor::new(
        SelectorExtractor::new("a.match", [("team".to_string(), ".team".to_string())])
            .expect("valid selectors"),
        "a",
        url::Url::parse(&base).expect("valid base URL"),
    )
    .expect("valid link selector");
    let detail = SelectorDetail::new([("score".to_string(), ".score".to_string())])
        .expect("valid selectors");

    let harvester: EnrichedHarvester<Value, _, _> = EnrichedHarvester::new(
        "live",
        TTL,
        PageTemplate::parse(&base).expect("valid base URL"),
        listing,
        Enricher::new(detail, Duration::from_secs(2)),
        Arc::new(ConnectionManager::new(HttpConfig::default())),
        Arc::new(OutcomeCache::new(100)),
    )
    .with_limits(test_limits());

    let outcome = harvester.harvest(&fast_policy(1)).await.expect("harvest");
    let cached = harvester.harvest(&fast_policy(1)).await.expect("cached");
    assert!(Arc::ptr_eq(&outcome, &cached));

    let records = outcome.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].primary["team"], "EDG");
    assert!(records[0].resolved);
    assert_eq!(records[0].detail["score"], "13-11");
    assert_eq!(records[1].primary["team"], "PRX");
    assert!(!records[1].resolved);
    assert_eq!(records[1].detail["score"], UNKNOWN);
}
