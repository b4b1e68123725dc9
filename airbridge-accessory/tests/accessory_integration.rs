//! End-to-end accessory behavior with scripted transport and clock.
//!
//! Every scenario runs a real task over a mock fetcher, so the staleness
//! decisions, ingestion paths, and store pushes are exercised exactly as a
//! host runtime would drive them. Pushes are followed by a query before
//! asserting: the inbox is processed in order, so the query's answer proves
//! the push has been applied.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use airbridge_accessory::{AccessoryBuilder, CharacteristicStore, QueryError};
use airbridge_connectors::http::FetchError;
use airbridge_connectors::notifications::{
    NotificationError, NotificationPayload, NotificationRegistry, NotificationValue,
};
use airbridge_connectors::NotificationSink;
use airbridge_core::time::ManualClock;
use airbridge_core::{
    AccessoryConfig, AirQualityLevel, Characteristic, CharacteristicValue, DocumentError,
};

use common::{config, MockFetch, RecordingStore};

fn level(value: CharacteristicValue) -> AirQualityLevel {
    match value {
        CharacteristicValue::Level(level) => level,
        other => panic!("expected a level, got {other:?}"),
    }
}

fn density(value: CharacteristicValue) -> f32 {
    match value {
        CharacteristicValue::Density(density) => density,
        other => panic!("expected a density, got {other:?}"),
    }
}

fn payload(characteristic: &str, value: NotificationValue) -> NotificationPayload {
    NotificationPayload { characteristic: characteristic.to_string(), value }
}

#[tokio::test]
async fn zero_ttl_fetches_on_every_query() {
    let (fetch, calls) = MockFetch::new(vec![
        MockFetch::ok(r#"{"pm10": 10}"#),
        MockFetch::ok(r#"{"pm10": 41}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(0), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    let first = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(first), AirQualityLevel::Excellent);

    let second = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(second), AirQualityLevel::Fair);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn infinite_ttl_fetches_exactly_once() {
    let (fetch, calls) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 10, "pm25": 5}"#)]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    let first = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(first), AirQualityLevel::Excellent);

    // A push update changes the answer without any further fetch.
    handle.notify(payload("PM10Density", NotificationValue::Number(80.0))).await;

    let second = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(second), AirQualityLevel::Inferior);
    assert_eq!(
        density(handle.get(Characteristic::Pm10Density).await.unwrap()),
        80.0
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn finite_ttl_boundary_is_exclusive() {
    let (fetch, calls) = MockFetch::new(vec![
        MockFetch::ok(r#"{"pm10": 10}"#),
        MockFetch::ok(r#"{"pm10": 41}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    let clock = ManualClock::new(1_000);
    let handle = AccessoryBuilder::new(config(30_000), store)
        .with_fetcher(Box::new(fetch))
        .with_clock(Box::new(clock.clone()))
        .spawn()
        .await
        .unwrap();

    handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Exactly at the TTL boundary the cache still answers.
    clock.advance(30_000);
    let cached = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(cached), AirQualityLevel::Excellent);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // One millisecond past it, the fetch happens.
    clock.advance(1);
    let refreshed = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(refreshed), AirQualityLevel::Fair);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_fetches_leave_the_cache_stale() {
    let (fetch, calls) = MockFetch::new(vec![
        Err(FetchError::Transport("connection refused".to_string())),
        MockFetch::ok(r#"{"pm10": 10}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    // Infinite TTL: were the failure marked fresh, the second query would
    // never fetch.
    let handle = AccessoryBuilder::new(config(-1), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    let error = handle.get(Characteristic::AirQuality).await.unwrap_err();
    assert!(matches!(error, QueryError::Fetch(FetchError::Transport(_))));

    let recovered = handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(level(recovered), AirQualityLevel::Excellent);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn error_statuses_fail_the_query() {
    let (fetch, calls) = MockFetch::new(vec![
        MockFetch::status(503, "overloaded"),
        MockFetch::ok(r#"{"pm10": 10}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    let error = handle.get(Characteristic::AirQuality).await.unwrap_err();
    assert!(matches!(error, QueryError::Status(503)));

    handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn malformed_documents_fail_the_query() {
    let (fetch, calls) = MockFetch::new(vec![
        MockFetch::ok("[1, 2]"),
        MockFetch::ok("not json"),
        MockFetch::ok(r#"{"pm10": 10}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    let error = handle.get(Characteristic::AirQuality).await.unwrap_err();
    assert!(matches!(error, QueryError::Document(DocumentError::NotAnObject)));

    let error = handle.get(Characteristic::AirQuality).await.unwrap_err();
    assert!(matches!(error, QueryError::Document(DocumentError::Json(_))));

    handle.get(Characteristic::AirQuality).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn one_bad_field_does_not_fail_the_document() {
    let (fetch, calls) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": "oops", "pm25": 35}"#)]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Fair
    );
    assert_eq!(density(handle.get(Characteristic::Pm10Density).await.unwrap()), 0.0);
    assert_eq!(density(handle.get(Characteristic::Pm25Density).await.unwrap()), 35.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_finite_values_never_reach_the_store() {
    let (fetch, calls) = MockFetch::new(vec![
        MockFetch::ok(r#"{"pm10": 80, "pm25": 12}"#),
        MockFetch::ok(r#"{"pm10": "nan"}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    let clock = ManualClock::new(0);
    let handle = AccessoryBuilder::new(config(10_000), store.clone())
        .with_fetcher(Box::new(fetch))
        .with_clock(Box::new(clock.clone()))
        .spawn()
        .await
        .unwrap();

    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Inferior
    );

    // The refetched document reports a failed read; the stored 80 and its
    // level survive it.
    clock.advance(10_001);
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Inferior
    );
    assert_eq!(density(handle.get(Characteristic::Pm10Density).await.unwrap()), 80.0);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // A pushed "nan" clears its field instead of storing the NaN.
    handle.notify(payload("PM10Density", NotificationValue::Text("nan".to_string()))).await;
    assert_eq!(density(handle.get(Characteristic::Pm10Density).await.unwrap()), 0.0);
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Excellent
    );
    for (_, value) in store.updates() {
        if let CharacteristicValue::Density(density) = value {
            assert!(density.is_finite(), "store received {density}");
        }
    }
}

#[tokio::test]
async fn precomputed_levels_override_the_classifier() {
    let (fetch, _) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 5, "air_quality": 4}"#)]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store)
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Inferior
    );
}

#[tokio::test]
async fn push_updates_reclassify_and_push_to_the_store() {
    let (fetch, _) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 41, "pm25": 10}"#)]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store.clone())
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Fair
    );

    // Numeric string, the way some firmwares push.
    handle.notify(payload("PM2_5Density", NotificationValue::Text("60".to_string()))).await;
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Inferior
    );
    assert_eq!(store.last_for(Characteristic::Pm25Density), Some(CharacteristicValue::Density(60.0)));
    assert_eq!(
        store.last_for(Characteristic::AirQuality),
        Some(CharacteristicValue::Level(AirQualityLevel::Inferior))
    );

    // A malformed push clears its field; the other reading keeps driving
    // the level.
    handle.notify(payload("PM10Density", NotificationValue::Text("abc".to_string()))).await;
    assert_eq!(density(handle.get(Characteristic::Pm10Density).await.unwrap()), 0.0);
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Inferior
    );
}

#[tokio::test]
async fn unknown_characteristics_are_ignored_and_queries_do_not_push() {
    let (fetch, calls) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 10}"#)]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store.clone())
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    handle.notify(payload("VOCDensity", NotificationValue::Number(9.0))).await;

    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Excellent
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Neither the ignored push nor the query path writes to the store.
    assert!(store.updates().is_empty());
}

#[tokio::test]
async fn air_quality_pushes_adopt_only_valid_levels() {
    let (fetch, _) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 5}"#)]);
    let store = Arc::new(RecordingStore::default());
    let handle = AccessoryBuilder::new(config(-1), store.clone())
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Excellent
    );

    handle.notify(payload("AirQuality", NotificationValue::Number(5.0))).await;
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Poor
    );
    assert_eq!(
        store.last_for(Characteristic::AirQuality),
        Some(CharacteristicValue::Level(AirQualityLevel::Poor))
    );

    // Out-of-range and non-numeric levels change nothing.
    handle.notify(payload("AirQuality", NotificationValue::Number(7.0))).await;
    handle.notify(payload("AirQuality", NotificationValue::Text("high".to_string()))).await;
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Poor
    );
}

#[tokio::test(start_paused = true)]
async fn polling_pushes_updates_without_queries() {
    let (fetch, calls) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 41}"#)]);
    let store = Arc::new(RecordingStore::default());
    let config = AccessoryConfig::from_json(
        r#"{
            "name": "poll test",
            "getUrl": "http://sensor.local/status",
            "statusCache": 0,
            "pullInterval": 1000
        }"#,
    )
    .unwrap();
    let handle = AccessoryBuilder::new(config, store.clone())
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    assert!(store.updates().is_empty());

    // Paused time skips straight past the first tick.
    tokio::time::sleep(std::time::Duration::from_millis(1_050)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.last_for(Characteristic::AirQuality),
        Some(CharacteristicValue::Level(AirQualityLevel::Fair))
    );
    assert_eq!(store.last_for(Characteristic::Pm10Density), Some(CharacteristicValue::Density(41.0)));
    assert_eq!(handle.name(), "poll test");
}

#[tokio::test(start_paused = true)]
async fn query_fetches_rearm_the_poll_timer() {
    let (fetch, calls) = MockFetch::new(vec![
        MockFetch::ok(r#"{"pm10": 10}"#),
        MockFetch::ok(r#"{"pm10": 41}"#),
    ]);
    let store = Arc::new(RecordingStore::default());
    let config = AccessoryConfig::from_json(
        r#"{
            "name": "poll test",
            "getUrl": "http://sensor.local/status",
            "statusCache": 0,
            "pullInterval": 1000
        }"#,
    )
    .unwrap();
    let handle = AccessoryBuilder::new(config, store.clone())
        .with_fetcher(Box::new(fetch))
        .spawn()
        .await
        .unwrap();

    // A query 600 ms in fetches and pushes the next poll out to 1600 ms.
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Excellent
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Past the original 1000 ms tick: no poll ran.
    tokio::time::sleep(std::time::Duration::from_millis(450)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.updates().is_empty());

    // The re-armed tick at 1600 ms polls and pushes.
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        store.last_for(Characteristic::AirQuality),
        Some(CharacteristicValue::Level(AirQualityLevel::Fair))
    );
}

#[tokio::test]
async fn registry_delivery_reaches_the_accessory() {
    let (fetch, calls) = MockFetch::new(vec![MockFetch::ok(r#"{"pm10": 5}"#)]);
    let store = Arc::new(RecordingStore::default());
    let registry = Arc::new(NotificationRegistry::new());
    let config = AccessoryConfig::from_json(
        r#"{
            "name": "aq test",
            "getUrl": "http://sensor.local/status",
            "statusCache": -1,
            "notificationID": "aq-1",
            "notificationPassword": "secret"
        }"#,
    )
    .unwrap();
    let handle = AccessoryBuilder::new(config, store)
        .with_fetcher(Box::new(fetch))
        .with_registry(registry.clone())
        .spawn()
        .await
        .unwrap();

    registry
        .deliver("aq-1", Some("secret"), payload("PM2_5Density", NotificationValue::Number(51.0)))
        .await
        .unwrap();

    // The fetched pm10 merges over the pushed pm25; the worse one wins.
    assert_eq!(
        level(handle.get(Characteristic::AirQuality).await.unwrap()),
        AirQualityLevel::Inferior
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let error = registry
        .deliver("aq-1", Some("wrong"), payload("PM2_5Density", NotificationValue::Number(1.0)))
        .await
        .unwrap_err();
    assert_eq!(error, NotificationError::PasswordMismatch("aq-1".to_string()));
}

#[tokio::test]
async fn build_fails_without_a_url() {
    let config = AccessoryConfig::from_json(r#"{"name": "aq test"}"#).unwrap();
    let store: Arc<dyn CharacteristicStore> = Arc::new(RecordingStore::default());
    let error = AccessoryBuilder::new(config, store).spawn().await.unwrap_err();
    assert!(matches!(error, airbridge_core::ConfigError::MissingUrl));
}
