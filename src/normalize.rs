//! Normalization gateway.
//!
//! Turns a schema locator (an `http(s)://` URL, a `file://` URL or a plain
//! path) into a [`NormalizedSchema`]. The gateway performs no retries; retry
//! policy belongs to the batch driver, which simply tries again on its next
//! run.
//!
//! # Failure mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | transport failure, non-2xx status | [`HarvestError::Network`] |
//! | local path missing | [`HarvestError::NotFound`] |
//! | neither JSON nor YAML, or fails the structural contract | [`HarvestError::Validation`] |
//!
//! The structural contract is deliberately shallow: an OpenAPI 3.x or
//! Swagger 2.0 marker, an `info` object with `title` and `version`, and an
//! object-valued `paths` when present. Full dialect conversion is not done.

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::models::NormalizedSchema;

/// Anything that can turn a locator into a canonical schema.
///
/// Implementations must be idempotent: the same locator over unchanged
/// upstream content yields an equal [`NormalizedSchema`].
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, locator: &str) -> HarvestResult<NormalizedSchema>;
}

/// Where a locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Remote(String),
    Local(PathBuf),
}

impl Locator {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Locator::Remote(trimmed.to_string())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            Locator::Local(PathBuf::from(path))
        } else {
            Locator::Local(PathBuf::from(trimmed))
        }
    }
}

/// Default gateway: fetches over HTTP or reads from disk, then validates.
pub struct DocumentNormalizer {
    client: reqwest::Client,
    contract: JSONSchema,
}

impl DocumentNormalizer {
    pub fn new(fetch: &FetchConfig) -> HarvestResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .user_agent(fetch.user_agent.clone())
            .build()
            .map_err(|e| HarvestError::Internal(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            contract: compile_contract()?,
        })
    }

    async fn load(&self, locator: &Locator) -> HarvestResult<String> {
        match locator {
            Locator::Remote(url) => {
                let response = self
                    .client
                    .get(url)
                    .header("Accept", "application/json, application/yaml;q=0.9, */*;q=0.5")
                    .send()
                    .await
                    .map_err(|e| HarvestError::Network(format!("GET {}: {}", url, e)))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(HarvestError::Network(format!("GET {} -> {}", url, status)));
                }
                response
                    .text()
                    .await
                    .map_err(|e| HarvestError::Network(format!("reading {}: {}", url, e)))
            }
            Locator::Local(path) => match tokio::fs::read_to_string(path).await {
                Ok(body) => Ok(body),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(HarvestError::NotFound(path.display().to_string()))
                }
                Err(e) => Err(HarvestError::Internal(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                ))),
            },
        }
    }

    /// Parse and validate already-loaded content.
    pub fn normalize_str(&self, content: &str) -> HarvestResult<NormalizedSchema> {
        let document = parse_document(content)?;
        self.check(&document)?;
        Ok(NormalizedSchema::from_document(document))
    }

    fn check(&self, document: &Value) -> HarvestResult<()> {
        if let Err(errors) = self.contract.validate(document) {
            let details = errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{}: {}", path, err)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(HarvestError::Validation(details));
        }
        Ok(())
    }
}

#[async_trait]
impl Normalizer for DocumentNormalizer {
    async fn normalize(&self, locator: &str) -> HarvestResult<NormalizedSchema> {
        let locator = Locator::parse(locator);
        let content = self.load(&locator).await?;
        self.normalize_str(&content)
    }
}

/// Parse JSON first, then YAML (a superset, but with worse error messages).
pub fn parse_document(content: &str) -> HarvestResult<Value> {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            let trimmed = content.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                return Err(HarvestError::Validation(format!("invalid JSON: {}", json_err)));
            }
            serde_yaml::from_str::<Value>(content)
                .map_err(|e| HarvestError::Validation(format!("neither JSON nor YAML: {}", e)))
        }
    }
}

fn contract() -> Value {
    json!({
        "type": "object",
        "required": ["info"],
        "properties": {
            "openapi": { "type": "string", "pattern": "^3\\." },
            "swagger": { "type": "string", "enum": ["2.0"] },
            "info": {
                "type": "object",
                "required": ["title", "version"],
                "properties": {
                    "title": { "type": "string" },
                    "version": { "type": ["string", "number"] },
                    "description": { "type": "string" }
                }
            },
            "paths": { "type": "object" }
        },
        "oneOf": [
            { "required": ["openapi"] },
            { "required": ["swagger"] }
        ]
    })
}

fn compile_contract() -> HarvestResult<JSONSchema> {
    JSONSchema::compile(&contract())
        .map_err(|e| HarvestError::Internal(format!("compiling document contract: {}", e)))
}
