//! Unified error type for the flylat collector.

use thiserror::Error;

use crate::types::EntityId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Flylat API error: {0}")]
    Flylat(String),

    #[error("Airport lookup failed: {0}")]
    ExternalLookup(String),

    #[error("Airport cache load failed: {0}")]
    CacheLoad(String),

    #[error("Airport cache save failed: {0}")]
    CacheSave(String),

    #[error("Fetch failed for airline {entity_id}: {message}")]
    EntityFetch { entity_id: EntityId, message: String },

    #[error("Snapshot write failed: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap any error as a fetch failure for one airline.
    pub fn entity_fetch(entity_id: EntityId, err: impl std::fmt::Display) -> Self {
        Error::EntityFetch {
            entity_id,
            message: err.to_string(),
        }
    }
}

/// Render an error with its chained causes, so network failures
/// (DNS/TLS/socket) are visible in one line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

/// Single-line excerpt of a response body for error messages.
pub fn body_excerpt(raw: &str) -> String {
    const MAX_CHARS: usize = 500;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &compact[..cut]),
        None => compact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_excerpt_truncates_on_char_boundary() {
        let body = "ü".repeat(600);
        let excerpt = body_excerpt(&body);
        assert_eq!(excerpt.chars().count(), 501);
        assert!(excerpt.ends_with('…'));
        assert_eq!(body_excerpt("a\nb"), "a b");
    }

    #[test]
    fn test_error_chain_includes_causes() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let outer = Error::Io(inner);
        assert!(error_chain(&outer).contains("connection reset"));
    }

    #[test]
    fn test_entity_fetch_message_names_airline() {
        let err = Error::entity_fetch(17, "HTTP 404");
        assert_eq!(err.to_string(), "Fetch failed for airline 17: HTTP 404");
    }
}
