use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::pipeline::series::Observation;

/// SensorThings entity identifier (`@iot.id`). FROST uses integers by
/// default but the standard allows strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum IotId {
    Int(i64),
    Str(String),
}

impl IotId {
    /// Parse a path parameter: integers stay integers, anything else is a
    /// string id.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        s.trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Str(s.trim().to_string()), Self::Int)
    }

    /// Form used inside entity paths, e.g. `Things(3)` or `Things('abc')`.
    #[must_use]
    pub fn path_segment(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Str(s) => format!("'{}'", odata_escape(s)),
        }
    }
}

impl fmt::Display for IotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Quote-escape a string literal for an OData `$filter` expression.
#[must_use]
pub fn odata_escape(s: &str) -> String {
    s.replace('\'', "''")
}

/// Paged entity collection: `{"value": [...], "@iot.nextLink": "..."}`
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@iot.nextLink", default)]
    pub next_link: Option<String>,
    #[serde(rename = "@iot.count", default)]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thing {
    #[serde(rename = "@iot.id")]
    pub id: IotId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    #[serde(rename = "@iot.id", default)]
    pub id: Option<IotId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// GeoJSON-like point. Our FROST deployments store `[lat, lon]`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

impl Location {
    #[must_use]
    pub fn lat_lon(&self) -> Option<[f64; 2]> {
        match self.location.as_ref()?.coordinates.as_slice() {
            [lat, lon, ..] => Some([*lat, *lon]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitOfMeasurement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Datastream {
    #[serde(rename = "@iot.id")]
    pub id: IotId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "unitOfMeasurement", default)]
    pub unit_of_measurement: Option<UnitOfMeasurement>,
}

impl Datastream {
    #[must_use]
    pub fn unit_symbol(&self) -> &str {
        self.unit_of_measurement
            .as_ref()
            .and_then(|u| u.symbol.as_deref())
            .unwrap_or("")
    }
}

/// Observation as returned by the server. `result` is kept raw because
/// sensors occasionally publish strings or booleans.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRecord {
    #[serde(rename = "@iot.id", default)]
    pub id: Option<IotId>,
    #[serde(rename = "phenomenonTime", default)]
    pub phenomenon_time: Option<String>,
    #[serde(default)]
    pub result: serde_json::Value,
}

impl ObservationRecord {
    /// Reading time. Interval times (`start/end`) resolve to their start.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.phenomenon_time.as_deref()?;
        let instant = raw.split('/').next().unwrap_or(raw).trim();
        DateTime::parse_from_rfc3339(instant)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Numeric result; anything non-numeric or non-finite is `None`.
    #[must_use]
    pub fn numeric_result(&self) -> Option<f64> {
        let value = match &self.result {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Convert to a pipeline observation; `None` if the time is unusable.
    #[must_use]
    pub fn to_observation(&self) -> Option<Observation> {
        self.timestamp()
            .map(|t| Observation::new(t, self.numeric_result()))
    }
}
