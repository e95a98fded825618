//! flylat.net client.
//!
//! Covers: airline name (scraped from the public company page), the route
//! list and the daily company-data document.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use common::error::{body_excerpt, error_chain};
use common::{EntityId, Error, RawRoute, RawRouteSet};
use enrichment::RouteSource;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

fn airline_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<td[^>]*>\s*Airline Name\s*</td>\s*<td[^>]*>(.*?)</td>")
            .expect("airline name pattern is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Text of the cell next to the `Airline Name` label, if the page has one.
pub fn parse_airline_name(html: &str) -> Option<String> {
    let cell = airline_name_pattern().captures(html)?.get(1)?.as_str();
    let text = decode_entities(&tag_pattern().replace_all(cell, ""));
    let name = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Async client for the flylat company endpoints.
#[derive(Debug, Clone)]
pub struct FlylatClient {
    client: reqwest::Client,
    base_url: String,
}

impl FlylatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("flylat-collector/0.1")
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build flylat client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, Error> {
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Flylat(format!("HTTP error for {}: {}", url, error_chain(&e))))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Flylat(format!(
                "flylat returned {} for {}: {}",
                status,
                url,
                body_excerpt(&body)
            )));
        }

        Ok(resp)
    }

    /// Airline name from `company/{id}`.
    pub async fn fetch_airline_name(&self, id: EntityId) -> Result<String, Error> {
        let url = format!("{}/company/{}", self.base_url, id);
        let html = self
            .get(&url)
            .await?
            .text()
            .await
            .map_err(|e| Error::Flylat(format!("failed to read company page {}: {}", id, e)))?;

        parse_airline_name(&html)
            .ok_or_else(|| Error::Flylat(format!("no airline name on company page {}", id)))
    }

    /// Route list from `company/get_routes.php`.
    pub async fn fetch_routes(&self, id: EntityId) -> Result<Vec<RawRoute>, Error> {
        let url = format!("{}/company/get_routes.php?id={}", self.base_url, id);
        let routes: Vec<RawRoute> = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::Flylat(format!("JSON parse error for routes of {}: {}", id, e)))?;

        debug!("Got {} routes for airline {}", routes.len(), id);
        Ok(routes)
    }

    /// Company-data document from `company/get_data.php`, kept opaque.
    pub async fn fetch_company_data(&self, id: EntityId) -> Result<Value, Error> {
        let url = format!("{}/company/get_data.php?id={}", self.base_url, id);
        self.get(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::Flylat(format!("JSON parse error for company data {}: {}", id, e)))
    }
}

#[async_trait]
impl RouteSource for FlylatClient {
    async fn fetch_raw_routes(&self, entity_id: EntityId) -> Result<RawRouteSet, Error> {
        let entity_name = self
            .fetch_airline_name(entity_id)
            .await
            .map_err(|e| Error::entity_fetch(entity_id, e))?;
        let routes = self
            .fetch_routes(entity_id)
            .await
            .map_err(|e| Error::entity_fetch(entity_id, e))?;

        Ok(RawRouteSet {
            entity_id,
            entity_name,
            routes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY_PAGE: &str = r#"
        <html><body>
          <table class="table">
            <tr><td>Callsign</td><td>RUSTY</td></tr>
            <tr>
              <td class="label">Airline Name</td>
              <td class="value"> <b>Rustic&nbsp;Airlines &amp; Co</b>
              </td>
            </tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_airline_name() {
        assert_eq!(
            parse_airline_name(COMPANY_PAGE).as_deref(),
            Some("Rustic Airlines & Co")
        );
    }

    #[test]
    fn test_parse_airline_name_missing_label() {
        assert!(parse_airline_name("<table><tr><td>Callsign</td><td>X</td></tr></table>").is_none());
        assert!(parse_airline_name("<td>Airline Name</td><td>  </td>").is_none());
    }

    #[test]
    fn test_route_payload_deserializes() {
        let payload = r#"[
            {"dep": "KJFK", "des": "EGLL", "profit": 12000, "flown": 31},
            {"dep": "EGLL", "des": "LFPG", "ticket_price": "180.50", "verified": 1}
        ]"#;

        let routes: Vec<RawRoute> = serde_json::from_str(payload).expect("routes");
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].destination_code, "EGLL");
        assert_eq!(routes[1].attributes.ticket_price, Some(serde_json::json!("180.50")));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = FlylatClient::new("https://flylat.net/", Duration::from_secs(5)).expect("client");
        assert_eq!(client.base_url, "https://flylat.net");
    }
}
