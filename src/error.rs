//! Error taxonomy shared by the harvesting components.
//!
//! Component boundaries (the normalization gateway, the schema repository,
//! the fetch state store and the GitHub client) return [`HarvestError`] so
//! callers can tell a rejected document from an unreachable host. Command
//! orchestration wraps these in `anyhow` with context.

use thiserror::Error;

/// Errors that can occur while harvesting, persisting or cataloging schemas.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The document failed parsing or structural validation.
    #[error("schema validation failed: {0}")]
    Validation(String),

    /// A local locator did not resolve to a readable file.
    #[error("not found: {0}")]
    NotFound(String),

    /// A remote locator was unreachable or answered with a non-2xx status.
    #[error("network request failed: {0}")]
    Network(String),

    /// A well-formed response that the downstream system rejected.
    #[error("upstream rejected request: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for harvesting operations.
pub type HarvestResult<T> = Result<T, HarvestError>;

impl HarvestError {
    /// Stable taxonomy label, used in fetch state records and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::Validation(_) => "VALIDATION_ERROR",
            HarvestError::NotFound(_) => "NOT_FOUND",
            HarvestError::Network(_) => "NETWORK_ERROR",
            HarvestError::Upstream(_) => "UPSTREAM_ERROR",
            HarvestError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => HarvestError::NotFound(err.to_string()),
            _ => HarvestError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        HarvestError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: HarvestError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), "NOT_FOUND");
    }

    #[test]
    fn other_io_errors_are_internal() {
        let err: HarvestError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), "INTERNAL_ERROR");
    }

    #[test]
    fn display_includes_message() {
        let err = HarvestError::Network("GET https://x.test -> 503".to_string());
        assert_eq!(
            err.to_string(),
            "network request failed: GET https://x.test -> 503"
        );
    }
}
