//! Integration tests for the SensorThings client and batch loaders against
//! an in-process server.
//!
//! Run with: cargo test --test upstream_test

mod common;

use chrono::Duration;
use st_dash::error::AppError;
use st_dash::frost::FrostClient;
use st_dash::frost::models::IotId;
use st_dash::pipeline::{GapConfig, HealthStatus};
use st_dash::services::dashboard::{self, DataStatus, ThingSummary};

use common::{config_for, newest_reading, spawn_frost_stub, stub_client};

fn placed(id: i64, name: &str) -> ThingSummary {
    ThingSummary {
        id: IotId::Int(id),
        name: name.to_string(),
        description: String::new(),
        coordinates: [52.0, 4.3],
        location_description: String::new(),
    }
}

#[tokio::test]
async fn things_listing_follows_next_link() {
    let client = stub_client().await;
    let things = client.get_things().await.unwrap();

    let ids: Vec<_> = things.iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, vec![IotId::Int(1), IotId::Int(2), IotId::Int(3)]);
}

#[tokio::test]
async fn observations_are_truncated_to_limit() {
    let client = stub_client().await;
    let id = IotId::Int(10);

    // Within the first page
    assert_eq!(client.get_observations(&id, 2).await.unwrap().len(), 2);
    // Spills into the second page and stops there
    assert_eq!(client.get_observations(&id, 4).await.unwrap().len(), 4);
    // Server runs out before the limit
    assert_eq!(client.get_observations(&id, 100).await.unwrap().len(), 5);

    let latest = client.get_latest_observation(&id).await.unwrap().unwrap();
    assert_eq!(latest.timestamp(), Some(newest_reading()));
    assert_eq!(latest.numeric_result(), Some(21.5));
}

#[tokio::test]
async fn pagination_stops_at_page_cap() {
    let client = stub_client().await;
    let records = client.get_observations(&IotId::Int(12), 1000).await.unwrap();
    // frost_max_pages = 3, one reading per page
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn error_status_becomes_upstream_error() {
    let client = stub_client().await;

    let missing = client.get_datastream(&IotId::Int(99)).await;
    assert!(matches!(missing, Err(AppError::Upstream(msg)) if msg.contains("404")));

    let failing = client.get_observations(&IotId::Int(11), 10).await;
    assert!(matches!(failing, Err(AppError::Upstream(msg)) if msg.contains("500")));
}

#[tokio::test]
async fn unreachable_server_is_upstream_error() {
    let root = spawn_frost_stub().await;
    let client = FrostClient::new(&config_for(format!("{root}/broken"))).unwrap();

    let result = dashboard::load_things(&client).await;
    assert!(matches!(result, Err(AppError::Upstream(msg)) if msg.contains("503")));
}

#[tokio::test]
async fn things_with_failed_or_missing_locations_are_skipped() {
    let client = stub_client().await;
    let things = dashboard::load_things(&client).await.unwrap();

    // Thing 2's location lookup fails, thing 3 has no location
    assert_eq!(things.len(), 1);
    assert_eq!(things[0].id, IotId::Int(1));
    assert_eq!(things[0].coordinates, [52.00482, 4.37034]);
    assert_eq!(things[0].location_description, "Building 28");
}

#[tokio::test]
async fn datastream_failure_marks_only_that_entry() {
    let client = stub_client().await;
    let datastreams = dashboard::load_datastreams(&client, &IotId::Int(1))
        .await
        .unwrap();

    assert_eq!(datastreams.len(), 2);

    let temperature = &datastreams[0];
    assert_eq!(temperature.display_name, "Temperature (℃)");
    assert!(temperature.error.is_none());
    let latest = temperature.latest.as_ref().unwrap();
    assert_eq!(latest.value, Some(21.5));
    assert_eq!(latest.phenomenon_time, Some(newest_reading()));

    let co2 = &datastreams[1];
    assert_eq!(co2.display_name, "CO₂");
    assert!(co2.latest.is_none());
    assert!(co2.error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn datastream_listing_failure_is_an_error() {
    let client = stub_client().await;
    let result = dashboard::load_datastreams(&client, &IotId::Int(3)).await;
    assert!(matches!(result, Err(AppError::Upstream(_))));
}

#[tokio::test]
async fn health_uses_the_datastreams_that_answered() {
    let client = stub_client().await;
    let now = newest_reading() + Duration::minutes(30);

    let health = dashboard::thing_health(&client, &placed(1, "Room120 (Indoor)"), now).await;
    assert_eq!(health.health.status, HealthStatus::Active);
    assert_eq!(health.health.minutes_since_last_observation, Some(30.0));
    assert_eq!(health.datastreams_failed, 1);
}

#[tokio::test]
async fn all_health_keeps_registry_order() {
    let client = stub_client().await;
    let now = newest_reading() + Duration::minutes(90);
    let things = [placed(3, "Basement"), placed(1, "Room120 (Indoor)")];

    let health = dashboard::all_health(&client, &things, now).await;
    assert_eq!(health.len(), 2);

    // Datastream listing fails for thing 3
    assert_eq!(health[0].thing_id, IotId::Int(3));
    assert_eq!(health[0].health.status, HealthStatus::Down);
    assert_eq!(health[0].health.label, "No data");

    assert_eq!(health[1].thing_id, IotId::Int(1));
    assert_eq!(health[1].health.status, HealthStatus::Warning);
}

#[tokio::test]
async fn series_is_loaded_across_pages() {
    let client = stub_client().await;
    let view = dashboard::load_series(&client, &IotId::Int(10), 5, &GapConfig::default())
        .await
        .unwrap();

    assert_eq!(view.status, DataStatus::Ready);
    assert_eq!(view.description, "Air temperature");
    assert_eq!(view.points.len(), 5);
    assert_eq!(view.stats.current, "21.50");
    assert_eq!(view.stats.min, "19.50");
    assert_eq!(view.stats.avg, "20.50");
    assert_eq!(view.stats.gap_count, 0);
    assert_eq!(view.latest_time, Some(newest_reading()));
}

#[tokio::test]
async fn series_fails_when_observations_fail() {
    let client = stub_client().await;
    let result = dashboard::load_series(&client, &IotId::Int(11), 5, &GapConfig::default()).await;
    // Datastream 11 has no metadata endpoint either
    assert!(matches!(result, Err(AppError::Upstream(_))));
}
