//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to stand in for the listing site and exercise
//! the full discovery/extraction cycle end-to-end.

use magpie::config::{
    Config, DiscoveryConfig, OutputConfig, PipelineConfig, RenderConfig, WorkerConfig,
};
use magpie::pipeline::{run_pipeline, CancelToken};
use magpie::render::HttpClientFactory;
use magpie::storage::{RecordStore, RunStatus, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, db_path: &str, error_dir: &str) -> Config {
    Config {
        discovery: DiscoveryConfig {
            listing_url: format!("{}/jobs/search/?keywords=rust", base_url),
            page_size: 25,
            max_pages: 3,
            max_reveal_attempts: 1,
            page_settle_ms: 200, // Long enough that requeues land before stop signals
            reveal_wait_ms: 0,
        },
        pipeline: PipelineConfig {
            worker_count: 1,
            queue_capacity: 32,
            dequeue_timeout_ms: 50,
            first_item_wait_secs: 5,
        },
        worker: WorkerConfig {
            parse_attempts: 2,
            settle_min_ms: 0,
            settle_max_ms: 1,
            reload_wait_ms: 0,
        },
        render: RenderConfig::default(),
        output: OutputConfig {
            database_path: db_path.to_string(),
            csv_path: "./unused.csv".to_string(),
            error_page_dir: error_dir.to_string(),
        },
    }
}

fn listing_card(id: u32) -> String {
    format!(
        r#"<li>
             <a class="job-card-list__title--link" href="/jobs/view/{id}/">Job {id}</a>
             <ul class="job-card-container__metadata-wrapper"><li>Berlin (Remote)</li></ul>
           </li>"#
    )
}

fn listing_page(ids: &[u32]) -> String {
    let cards: String = ids.iter().map(|id| listing_card(*id)).collect();
    format!("<html><body><ul>{}</ul></body></html>", cards)
}

fn detail_page(title: &str) -> String {
    format!(
        r#"<html><body>
            <h1>{title}</h1>
            <h4>
              <a class="topcard__org-name-link" href="https://example.com/company/acme">Acme Corp</a>
              <span class="posted-time-ago__text">3 days ago</span>
            </h4>
            <div class="description__text">Build fast things.</div>
        </body></html>"#
    )
}

/// Mounts the two-page listing index: one full page, then an empty one
async fn mount_listing(server: &MockServer, ids: &[u32]) {
    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(ids)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u32, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/jobs/view/{}/", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(title)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_end_to_end() {
    let server = MockServer::start().await;
    mount_listing(&server, &[1001, 1002]).await;
    mount_detail(&server, 1001, "Rust Engineer").await;
    mount_detail(&server, 1002, "Systems Programmer").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        dir.path().join("errors").to_str().unwrap(),
    );

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        CancelToken::new(),
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.duplicate, 0);
    assert_eq!(summary.dropped, 0);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.count_records().unwrap(), 2);

    let record = store.get_by_identity("1001").unwrap().unwrap();
    assert_eq!(record.type_hint, "Remote");
    assert_eq!(record.fields[0], ("Job Title".to_string(), "Rust Engineer".to_string()));
    assert!(record
        .fields
        .iter()
        .any(|(name, value)| name == "Post Converted Time" && value != "Not Mentioned"));

    let runs = store.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].config_hash, "test-hash");
}

#[tokio::test]
async fn test_second_harvest_skips_known_listings() {
    let server = MockServer::start().await;
    mount_listing(&server, &[1001, 1002]).await;
    mount_detail(&server, 1001, "Rust Engineer").await;
    mount_detail(&server, 1002, "Systems Programmer").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let error_dir = dir.path().join("errors");
    let factory = Arc::new(HttpClientFactory::new(RenderConfig::default()));

    let first = run_pipeline(
        create_test_config(
            &server.uri(),
            db_path.to_str().unwrap(),
            error_dir.to_str().unwrap(),
        ),
        Arc::clone(&factory) as Arc<dyn magpie::render::RenderClientFactory>,
        CancelToken::new(),
        "hash-1",
    )
    .await
    .unwrap();
    assert_eq!(first.inserted, 2);

    let second = run_pipeline(
        create_test_config(
            &server.uri(),
            db_path.to_str().unwrap(),
            error_dir.to_str().unwrap(),
        ),
        factory,
        CancelToken::new(),
        "hash-2",
    )
    .await
    .unwrap();

    assert_eq!(second.discovered, 2);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicate, 2);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.count_records().unwrap(), 2);
    assert_eq!(store.list_runs().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limited_detail_is_requeued_and_recovered() {
    let server = MockServer::start().await;
    mount_listing(&server, &[1001]).await;

    // First hit on the detail page is rate limited; the retry after client
    // replacement succeeds.
    Mock::given(method("GET"))
        .and(path("/jobs/view/1001/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_detail(&server, 1001, "Rust Engineer").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        dir.path().join("errors").to_str().unwrap(),
    );

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        CancelToken::new(),
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.requeued, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.dropped, 0);

    let store = SqliteStore::open(&db_path).unwrap();
    assert!(store.exists_by_identity("1001").unwrap());
}

#[tokio::test]
async fn test_unparsable_detail_is_archived_and_dropped() {
    let server = MockServer::start().await;
    mount_listing(&server, &[1001]).await;

    // The detail page never renders its required content.
    Mock::given(method("GET"))
        .and(path("/jobs/view/1001/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>still loading</p></body></html>"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let error_dir = dir.path().join("errors");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        error_dir.to_str().unwrap(),
    );

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        CancelToken::new(),
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.inserted, 0);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.count_records().unwrap(), 0);
    assert!(error_dir.join("1001.html").exists());
}

#[tokio::test]
async fn test_unreachable_detail_is_dropped() {
    let server = MockServer::start().await;
    mount_listing(&server, &[1001]).await;

    Mock::given(method("GET"))
        .and(path("/jobs/view/1001/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        dir.path().join("errors").to_str().unwrap(),
    );

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        CancelToken::new(),
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.requeued, 0);
    assert_eq!(summary.inserted, 0);
}

#[tokio::test]
async fn test_cancelled_harvest_is_marked_interrupted() {
    let server = MockServer::start().await;
    mount_listing(&server, &[1001]).await;
    mount_detail(&server, 1001, "Rust Engineer").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        dir.path().join("errors").to_str().unwrap(),
    );

    let cancel = CancelToken::new();
    cancel.cancel();

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        cancel,
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.inserted, 0);

    let store = SqliteStore::open(&db_path).unwrap();
    let runs = store.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Interrupted);
}

/// Guards the cross-run identity contract: records are keyed by listing id,
/// not by the (tracking-parameter laden) URL they were discovered under.
#[tokio::test]
async fn test_identity_ignores_tracking_parameters() {
    let server = MockServer::start().await;

    // The card links carry tracking parameters this time.
    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><ul>
                 <li>
                   <a class="job-card-list__title--link" href="/jobs/view/1001/?refId=abc&trk=x">Job 1001</a>
                   <ul class="job-card-container__metadata-wrapper"><li>Berlin (Remote)</li></ul>
                 </li>
               </ul></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .mount(&server)
        .await;
    mount_detail(&server, 1001, "Rust Engineer").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        dir.path().join("errors").to_str().unwrap(),
    );

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        CancelToken::new(),
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.inserted, 1);

    let store = SqliteStore::open(&db_path).unwrap();
    let record = store.get_by_identity("1001").unwrap().unwrap();
    assert!(record.url.contains("/jobs/view/1001/"));
}

/// Workers drain the queue between slow listing pages instead of treating
/// the lull as end-of-work. Listings from late pages must still be stored.
#[tokio::test]
async fn test_slow_listing_page_does_not_strand_workers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[1001])))
        .mount(&server)
        .await;
    // The second results page takes far longer than the dequeue timeout.
    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "25"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[1002]))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/search/"))
        .and(query_param("start", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .mount(&server)
        .await;
    mount_detail(&server, 1001, "Rust Engineer").await;
    mount_detail(&server, 1002, "Systems Programmer").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        dir.path().join("errors").to_str().unwrap(),
    );

    let summary = run_pipeline(
        config,
        Arc::new(HttpClientFactory::new(RenderConfig::default())),
        CancelToken::new(),
        "test-hash",
    )
    .await
    .unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.dropped, 0);

    let store = SqliteStore::open(&db_path).unwrap();
    assert!(store.exists_by_identity("1001").unwrap());
    assert!(store.exists_by_identity("1002").unwrap());
}
