//! Collector configuration: .env file, config.toml, then environment overrides.

use common::config::CollectorConfig;
use common::Error;
use std::path::{Path, PathBuf};

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_config(config: &CollectorConfig, require_token: bool) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if require_token && config.airportdb_api_token.trim().is_empty() {
        issues.push("AIRPORTDB_API_TOKEN is required to collect routes".into());
    }
    if config.flylat_base_url.trim().is_empty() {
        issues.push("flylat_base_url must not be empty".into());
    }
    if config.airportdb_base_url.trim().is_empty() {
        issues.push("airportdb_base_url must not be empty".into());
    }
    if config.data_dir.as_os_str().is_empty() {
        issues.push("data_dir must not be empty".into());
    }
    if config.airlines_file.trim().is_empty() {
        issues.push("airlines_file must not be empty".into());
    }
    if config.airport_cache_file.trim().is_empty() {
        issues.push("airport_cache_file must not be empty".into());
    }
    if config.max_concurrent_fetches == 0 {
        issues.push("max_concurrent_fetches must be > 0".into());
    }
    if config.http_timeout_secs == 0 {
        issues.push("http_timeout_secs must be > 0".into());
    }
    if config.airportdb_requests_per_sec == 0 {
        issues.push("airportdb_requests_per_sec must be > 0".into());
    }
    if !(0..=48).contains(&config.collection_offset_hours) {
        issues.push("collection_offset_hours must be in [0,48]".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load collector configuration from environment and optional config file.
///
/// The airportdb token is only demanded when `require_token` is set, so a
/// company-data-only run works without one.
pub fn load_config(require_token: bool) -> Result<CollectorConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = CollectorConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Some(token) = non_empty_env("AIRPORTDB_API_TOKEN").or_else(|| non_empty_env("API_TOKEN")) {
        config.airportdb_api_token = token;
    }
    if let Some(dir) = non_empty_env("FLYLAT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = non_empty_env("FLYLAT_LOG_DIR") {
        config.log_dir = PathBuf::from(dir);
    }
    if let Some(url) = non_empty_env("FLYLAT_BASE_URL") {
        config.flylat_base_url = url;
    }
    if let Some(url) = non_empty_env("AIRPORTDB_BASE_URL") {
        config.airportdb_base_url = url;
    }
    if let Some(raw) = non_empty_env("FLYLAT_MAX_CONCURRENT_FETCHES") {
        config.max_concurrent_fetches =
            parse_positive_u64(&raw, "FLYLAT_MAX_CONCURRENT_FETCHES")? as usize;
    }
    if let Some(raw) = non_empty_env("FLYLAT_HTTP_TIMEOUT_SECS") {
        config.http_timeout_secs = parse_positive_u64(&raw, "FLYLAT_HTTP_TIMEOUT_SECS")?;
    }
    if let Some(raw) = non_empty_env("AIRPORTDB_REQUESTS_PER_SEC") {
        let parsed = parse_positive_u64(&raw, "AIRPORTDB_REQUESTS_PER_SEC")?;
        config.airportdb_requests_per_sec = u32::try_from(parsed).map_err(|_| {
            Error::Config("AIRPORTDB_REQUESTS_PER_SEC is out of range".into())
        })?;
    }

    // 5. Validate.
    validate_config(&config, require_token)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid_without_token_requirement() {
        let config = CollectorConfig::default();
        assert!(validate_config(&config, false).is_ok());
        assert_eq!(config.max_concurrent_fetches, 10);
        assert_eq!(config.airport_cache_path(), PathBuf::from("flylat/data/airports.json"));
    }

    #[test]
    fn test_token_required_for_routes() {
        let config = CollectorConfig::default();
        let err = validate_config(&config, true).expect_err("missing token");
        assert!(err.to_string().contains("AIRPORTDB_API_TOKEN"));

        let config = CollectorConfig {
            airportdb_api_token: "secret".into(),
            ..CollectorConfig::default()
        };
        assert!(validate_config(&config, true).is_ok());
    }

    #[test]
    fn test_all_issues_are_reported_together() {
        let config = CollectorConfig {
            max_concurrent_fetches: 0,
            http_timeout_secs: 0,
            collection_offset_hours: -1,
            ..CollectorConfig::default()
        };

        let message = validate_config(&config, false)
            .expect_err("invalid")
            .to_string();
        assert!(message.contains("max_concurrent_fetches"));
        assert!(message.contains("http_timeout_secs"));
        assert!(message.contains("collection_offset_hours"));
    }

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let config: CollectorConfig = toml::from_str(
            r#"
            data_dir = "/srv/flylat"
            max_concurrent_fetches = 4
            "#,
        )
        .expect("toml");

        assert_eq!(config.data_dir, PathBuf::from("/srv/flylat"));
        assert_eq!(config.max_concurrent_fetches, 4);
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.flylat_base_url, "https://flylat.net");
    }

    #[test]
    fn test_parse_positive_u64() {
        assert_eq!(parse_positive_u64(" 8 ", "X").expect("valid"), 8);
        assert!(parse_positive_u64("0", "X").is_err());
        assert!(parse_positive_u64("-3", "X").is_err());
    }
}
