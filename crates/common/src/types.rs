//! Domain types shared across the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Flylat airline identifier.
pub type EntityId = u64;

// ── Airports ──────────────────────────────────────────────────────────

/// A coordinate as airportdb reports it: usually a number, sometimes a
/// numeric string. Non-finite values are rejected.
pub fn parse_coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

// Cache files written from raw airportdb rows may hold string coordinates.
fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    parse_coordinate(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid coordinate: {}", raw)))
}

// Keeps an explicit `null` as `Some(Value::Null)` so it is written back.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Resolved metadata for one airport, keyed by its ICAO code.
///
/// Older cache files only carry code, name and coordinates (under the
/// capitalised `ICAO`/`Name`/`Latitude`/`Longitude` keys), so the
/// secondary fields are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    #[serde(alias = "ICAO")]
    pub code: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Latitude", deserialize_with = "deserialize_coordinate")]
    pub latitude: f64,
    #[serde(alias = "Longitude", deserialize_with = "deserialize_coordinate")]
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl AirportRecord {
    pub fn new(code: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            latitude,
            longitude,
            country: None,
            municipality: None,
            region: None,
        }
    }
}

/// A route endpoint as written into snapshots.
///
/// Unresolved endpoints keep their code and carry nulls everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportEndpoint {
    pub code: String,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    pub municipality: Option<String>,
    pub region: Option<String>,
}

impl AirportEndpoint {
    pub fn resolved(record: &AirportRecord) -> Self {
        Self {
            code: record.code.clone(),
            name: Some(record.name.clone()),
            latitude: Some(record.latitude),
            longitude: Some(record.longitude),
            country: record.country.clone(),
            municipality: record.municipality.clone(),
            region: record.region.clone(),
        }
    }

    pub fn unresolved(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
            latitude: None,
            longitude: None,
            country: None,
            municipality: None,
            region: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.name.is_some() && self.latitude.is_some() && self.longitude.is_some()
    }
}

// ── Routes ────────────────────────────────────────────────────────────

/// Route fields the collector never interprets. Anything the source sends
/// beyond the named ones lands in `extra` and is written back unchanged.
/// A named field sent as `null` stays `Some(Value::Null)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteAttributes {
    #[serde(
        default,
        alias = "id",
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub route_id: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")]
    pub profit: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")]
    pub distance: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")]
    pub flown: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")]
    pub verified: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A route as returned by `company/get_routes.php`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRoute {
    #[serde(rename = "dep", alias = "departure")]
    pub departure_code: String,
    #[serde(rename = "des", alias = "destination")]
    pub destination_code: String,
    #[serde(flatten)]
    pub attributes: RouteAttributes,
}

impl RawRoute {
    pub fn new(departure_code: impl Into<String>, destination_code: impl Into<String>) -> Self {
        Self {
            departure_code: departure_code.into(),
            destination_code: destination_code.into(),
            attributes: RouteAttributes::default(),
        }
    }
}

/// A route whose endpoint codes have been replaced by airport metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRoute {
    pub departure: AirportEndpoint,
    pub destination: AirportEndpoint,
    #[serde(flatten)]
    pub attributes: RouteAttributes,
}

/// Everything the route source returns for one airline.
#[derive(Debug, Clone)]
pub struct RawRouteSet {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub routes: Vec<RawRoute>,
}

/// The enriched route document for one airline at one point in time.
/// Each new snapshot replaces the previous file for that airline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(rename = "name")]
    pub entity_name: String,
    #[serde(rename = "id")]
    pub entity_id: EntityId,
    #[serde(rename = "updateTimestamp", with = "chrono::serde::ts_seconds")]
    pub update_timestamp: DateTime<Utc>,
    pub routes: Vec<EnrichedRoute>,
}

// ── Airline list ──────────────────────────────────────────────────────

/// `airlines.json` has been written both as a bare array and wrapped in
/// an `airlines` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AirlineList {
    Wrapped { airlines: Vec<Value> },
    Bare(Vec<Value>),
}

impl AirlineList {
    fn entries(&self) -> &[Value] {
        match self {
            AirlineList::Wrapped { airlines } => airlines,
            AirlineList::Bare(entries) => entries,
        }
    }

    /// Airline ids in file order. Entries without a usable id are skipped.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entries()
            .iter()
            .filter_map(|entry| match entry.get("id")? {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect()
    }

    /// Number of entries that had no usable id.
    pub fn skipped(&self) -> usize {
        self.entries().len() - self.ids().len()
    }
}
