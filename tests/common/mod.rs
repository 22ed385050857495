//! In-process SensorThings server for integration tests.
//!
//! Serves a small fixed dataset under `/v1.1` with deliberate failures:
//!
//! | Entity | Behavior |
//! |--------|----------|
//! | Things | two pages: 1, 2 then 3 |
//! | Thing 1 | located, datastreams 10 and 11 |
//! | Thing 2 | location lookup fails (500) |
//! | Thing 3 | no location, datastream listing fails (500) |
//! | Datastream 10 | five readings over two pages, newest 12:00 |
//! | Datastream 11 | observation lookup fails (500) |
//! | Datastream 12 | endless pages of one reading each |
//!
//! Anything under `/broken` answers 503.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use st_dash::config::Config;
use st_dash::frost::FrostClient;
use tokio::net::TcpListener;

/// Newest reading of datastream 10.
pub fn newest_reading() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn reading(minutes_before_newest: i64, result: Value) -> Value {
    let time = newest_reading() - chrono::Duration::minutes(minutes_before_newest);
    json!({"@iot.id": minutes_before_newest, "phenomenonTime": time.to_rfc3339(), "result": result})
}

fn page(value: Value, next: Option<String>) -> Response {
    let mut body = json!({ "value": value });
    if let Some(next) = next {
        body["@iot.nextLink"] = json!(next);
    }
    Json(body).into_response()
}

fn query_value<'a>(uri: &'a Uri, key: &str) -> Option<&'a str> {
    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

async fn frost(State(base): State<Arc<String>>, uri: Uri) -> Response {
    let path = uri.path();
    if path.starts_with("/broken") {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    let Some(path) = path.strip_prefix("/v1.1") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match path {
        "/Things" => match query_value(&uri, "$skip") {
            Some("2") => page(json!([{"@iot.id": 3, "name": "Basement"}]), None),
            _ => page(
                json!([
                    {"@iot.id": 1, "name": "Room120 (Indoor)", "description": "Netatmo NWS03"},
                    {"@iot.id": 2, "name": "Rooftop"}
                ]),
                Some(format!("{base}/Things?$skip=2")),
            ),
        },
        "/Things(1)/Locations" => page(
            json!([{
                "@iot.id": 1,
                "name": "TU Delft",
                "description": "Building 28",
                "location": {"type": "Point", "coordinates": [52.00482, 4.37034]}
            }]),
            None,
        ),
        "/Things(3)/Locations" => page(json!([]), None),
        "/Things(1)/Datastreams" => page(
            json!([
                {"@iot.id": 10, "name": "temperature", "unitOfMeasurement": {"symbol": "°C"}},
                {"@iot.id": 11, "name": "co2", "unitOfMeasurement": {"symbol": "ppm"}}
            ]),
            None,
        ),
        "/Datastreams(10)" => Json(json!({
            "@iot.id": 10,
            "name": "temperature",
            "description": "Air temperature",
            "unitOfMeasurement": {"symbol": "°C"}
        }))
        .into_response(),
        // Ignores $top like a server with a small page size
        "/Datastreams(10)/Observations" => match query_value(&uri, "page") {
            Some("2") => page(json!([reading(15, json!(20.0)), reading(20, json!(19.5))]), None),
            _ => page(
                json!([
                    reading(0, json!(21.5)),
                    reading(5, json!("21.0")),
                    reading(10, json!(20.5))
                ]),
                Some(format!("{base}/Datastreams(10)/Observations?page=2")),
            ),
        },
        "/Datastreams(12)/Observations" => {
            let n: u32 = query_value(&uri, "page")
                .and_then(|p| p.parse().ok())
                .unwrap_or(1);
            page(
                json!([reading(i64::from(n), json!(1.0))]),
                Some(format!("{base}/Datastreams(12)/Observations?page={}", n + 1)),
            )
        }
        "/Things(2)/Locations" | "/Things(3)/Datastreams" | "/Datastreams(11)/Observations" => {
            (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the stub server; returns the root URL (without `/v1.1`).
pub async fn spawn_frost_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let root = format!("http://{}", listener.local_addr().unwrap());
    let base = Arc::new(format!("{root}/v1.1"));

    let app = Router::new().fallback(frost).with_state(base);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    root
}

/// Configuration pointing at `base_url` with a three-page cap.
pub fn config_for(base_url: String) -> Config {
    Config {
        frost_base_url: base_url,
        frost_max_pages: 3,
        frost_concurrency: 4,
        ..Config::default()
    }
}

/// Client for the healthy part of the stub.
pub async fn stub_client() -> FrostClient {
    let root = spawn_frost_stub().await;
    FrostClient::new(&config_for(format!("{root}/v1.1"))).unwrap()
}
