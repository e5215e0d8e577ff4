use std::sync::Arc;
use std::time::{Duration, Instant};

use vigil_core::store::{SiteDocument, SiteRecord};
use vigil_core::{
    run_fleet_scan, HealthStatus, JsonFileStore, MemoryStore, MonitoredSite, ScanOptions, SiteId,
    SiteStore, VigilError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_returning(status: u16, delay: Option<Duration>) -> MockServer {
    let server = MockServer::start().await;
    let mut response = ResponseTemplate::new(status);
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

fn options() -> ScanOptions {
    ScanOptions::default()
        .with_timeout(Duration::from_millis(500))
        .with_concurrency(4)
}

fn record(id: &str, url: String) -> SiteRecord {
    SiteRecord {
        id: SiteId::from(id),
        url,
        name: None,
        status: None,
        last_health_check: None,
        ssl_expiration_days: None,
    }
}

#[tokio::test]
async fn test_mixed_fleet_in_memory() {
    let healthy = server_returning(200, None).await;
    let broken = server_returning(503, None).await;
    let missing = server_returning(404, None).await;
    let slow = server_returning(200, Some(Duration::from_secs(5))).await;

    let store = Arc::new(MemoryStore::new(vec![
        MonitoredSite::new("ok", healthy.uri()),
        MonitoredSite::new("broken", broken.uri()),
        MonitoredSite::new("missing", missing.uri()),
        MonitoredSite::new("slow", slow.uri()).with_name("Slow site"),
        MonitoredSite::new("garbage", "ftp://files.example.com"),
    ]));

    let started = Instant::now();
    let summary = run_fleet_scan(store.clone(), options()).await.unwrap();
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "slow site held the scan for {:?}",
        started.elapsed()
    );

    assert_eq!(summary.total(), 5);
    assert_eq!(summary.count(HealthStatus::Running), 1);
    assert_eq!(summary.count(HealthStatus::Problematic), 2);
    assert_eq!(summary.count(HealthStatus::Stopped), 2);
    assert!(summary.write_failures.is_empty());

    let ok = &summary.reports[&SiteId::from("ok")];
    assert_eq!(ok.http_status, Some(200));
    // Plain http has no certificate to measure
    assert_eq!(ok.days_until_expiry, None);
    assert!(ok.detail.is_none());

    assert_eq!(summary.reports[&SiteId::from("broken")].http_status, Some(503));
    assert_eq!(summary.reports[&SiteId::from("slow")].status, HealthStatus::Stopped);
    assert_eq!(summary.reports[&SiteId::from("slow")].name.as_deref(), Some("Slow site"));

    // Every site, including the unusable one, got a status written back
    assert_eq!(store.recorded(), 5);
    assert_eq!(
        store.health(&SiteId::from("garbage")).map(|h| h.status),
        Some(HealthStatus::Stopped)
    );
}

#[tokio::test]
async fn test_failed_write_does_not_stop_the_scan() {
    let healthy = server_returning(200, None).await;

    let store = Arc::new(MemoryStore::new(vec![
        MonitoredSite::new("a", healthy.uri()),
        MonitoredSite::new("b", healthy.uri()),
        MonitoredSite::new("c", healthy.uri()),
    ]));
    store.fail_writes_for("b");

    let summary = run_fleet_scan(store.clone(), options()).await.unwrap();

    assert_eq!(summary.count(HealthStatus::Running), 3);
    assert_eq!(summary.write_failures.len(), 1);
    assert!(summary.write_failures.contains_key(&SiteId::from("b")));
    assert!(store.health(&SiteId::from("a")).is_some());
    assert!(store.health(&SiteId::from("b")).is_none());
    assert!(store.health(&SiteId::from("c")).is_some());
}

#[tokio::test]
async fn test_listing_failure_aborts_scan() {
    let store = Arc::new(MemoryStore::new(Vec::new()));
    store.fail_listing(true);

    let result = run_fleet_scan(store, options()).await;
    assert!(matches!(result, Err(VigilError::Persistence(_))));
}

#[tokio::test]
async fn test_json_store_round_trip() {
    let healthy = server_returning(200, None).await;
    let broken = server_returning(500, None).await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("sites.json");
    let store = Arc::new(JsonFileStore::new(&file));
    store
        .save(&SiteDocument {
            sites: vec![record("1", healthy.uri()), record("2", broken.uri())],
            ..SiteDocument::default()
        })
        .await
        .unwrap();

    let summary = run_fleet_scan(store.clone() as Arc<dyn SiteStore>, options())
        .await
        .unwrap();
    assert!(summary.write_failures.is_empty());

    let document = store.load().await.unwrap();
    assert!(document.updated_at.is_some());

    let first = &document.sites[0];
    assert_eq!(first.status, Some(HealthStatus::Running));
    assert!(first.last_health_check.is_some());
    assert_eq!(first.ssl_expiration_days, None);

    let second = &document.sites[1];
    assert_eq!(second.status, Some(HealthStatus::Problematic));
    assert_eq!(second.last_health_check, Some(summary.reports[&SiteId::from("2")].checked_at));
}
