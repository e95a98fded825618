//! airportdb.io client.
//!
//! Looks up a single airport by ICAO code and maps the response onto
//! `AirportRecord`. Used by the resolver on a cache miss.

pub mod rate_limit;

use std::time::Duration;

use async_trait::async_trait;
use common::error::{body_excerpt, error_chain};
use common::{parse_coordinate, AirportRecord, Error};
use enrichment::AirportLookup;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub use rate_limit::RateLimiter;

/// Response from `GET /airport/{icao}`. Only the fields we keep.
#[derive(Debug, Deserialize)]
pub struct AirportResponse {
    #[serde(default)]
    pub ident: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    // Usually a number; some rows carry it as a string.
    #[serde(default)]
    pub latitude_deg: Option<Value>,
    #[serde(default)]
    pub longitude_deg: Option<Value>,
    #[serde(default)]
    pub iso_country: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub iso_region: Option<String>,
}

fn coordinate(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(parse_coordinate)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl AirportResponse {
    /// `None` unless name, latitude and longitude are all present.
    pub fn into_record(self, code: &str) -> Option<AirportRecord> {
        let latitude = coordinate(&self.latitude_deg)?;
        let longitude = coordinate(&self.longitude_deg)?;
        let name = non_empty(self.name)?;

        Some(AirportRecord {
            code: code.to_string(),
            name,
            latitude,
            longitude,
            country: non_empty(self.iso_country),
            municipality: non_empty(self.municipality),
            region: non_empty(self.iso_region),
        })
    }
}

/// airportdb API client with a shared request budget.
#[derive(Debug, Clone)]
pub struct AirportDbClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    limiter: RateLimiter,
}

impl AirportDbClient {
    pub fn new(
        base_url: &str,
        api_token: String,
        timeout: Duration,
        requests_per_sec: u32,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("flylat-collector/0.1")
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build airportdb client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_token,
            limiter: RateLimiter::per_second(requests_per_sec),
        })
    }

    /// Fetch one airport. `Ok(None)` when airportdb does not know the code
    /// or returns a record without coordinates.
    pub async fn fetch_airport(&self, code: &str) -> Result<Option<AirportRecord>, Error> {
        let url = format!("{}/airport/{}", self.base_url, code);
        self.limiter.wait().await;

        // The token goes in the query string; keep it out of the logs.
        debug!("Fetching airport: {}", url);

        let resp = self
            .client
            .get(&url)
            .query(&[("apiToken", self.api_token.as_str())])
            .send()
            .await
            .map_err(|e| Error::ExternalLookup(format!("HTTP error for {}: {}", code, error_chain(&e))))?;

        let status = resp.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalLookup(format!(
                "airportdb returned {} for {}: {}",
                status,
                code,
                body_excerpt(&body)
            )));
        }

        let payload: AirportResponse = resp
            .json()
            .await
            .map_err(|e| Error::ExternalLookup(format!("JSON parse error for {}: {}", code, e)))?;

        let record = payload.into_record(code);
        if record.is_none() {
            debug!("airportdb has no coordinates for {}", code);
        }
        Ok(record)
    }
}

#[async_trait]
impl AirportLookup for AirportDbClient {
    async fn lookup_airport(&self, code: &str) -> Result<Option<AirportRecord>, Error> {
        self.fetch_airport(code).await
    }
}
