//! Core data models used throughout the harvester.
//!
//! These types represent the candidates, normalized schemas, fetch state
//! records and repository entries that flow through the acquisition and
//! reconciliation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Version used when a document declares none.
pub const LATEST_VERSION: &str = "latest";

/// Which producer contributed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Seed,
    GuruIndex,
    Discovery,
    CommunityIssue,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Seed => "seed",
            Provenance::GuruIndex => "guru-index",
            Provenance::Discovery => "discovery",
            Provenance::CommunityIssue => "community-issue",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared version of a candidate and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLocator {
    pub version: String,
    pub locator: String,
}

/// A prospective schema source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Stable dedup key across runs.
    pub identity: String,
    /// URL or file path of the preferred schema.
    pub schema_locator: String,
    pub title: Option<String>,
    pub provenance: Provenance,
    /// Declared version set; empty means "whatever the document declares".
    pub versions: Vec<VersionLocator>,
}

impl Candidate {
    pub fn new(
        identity: impl Into<String>,
        schema_locator: impl Into<String>,
        provenance: Provenance,
    ) -> Self {
        Self {
            identity: identity.into(),
            schema_locator: schema_locator.into(),
            title: None,
            provenance,
            versions: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>, locator: impl Into<String>) -> Self {
        self.versions.push(VersionLocator {
            version: version.into(),
            locator: locator.into(),
        });
        self
    }
}

/// Canonical output of the normalization gateway. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSchema {
    /// `openapi` or `swagger` marker of the document.
    pub spec_version: String,
    /// `info.version`, or [`LATEST_VERSION`] when absent.
    pub declared_version: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub raw_document: Value,
}

impl NormalizedSchema {
    /// Build from a validated document tree, canonicalizing key order.
    pub fn from_document(document: Value) -> Self {
        let document = canonicalize(document);
        let spec_version = document
            .get("openapi")
            .or_else(|| document.get("swagger"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let info = document.get("info");
        let declared_version = info
            .and_then(|i| i.get("version"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| LATEST_VERSION.to_string());
        let title = info
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let description = info
            .and_then(|i| i.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            spec_version,
            declared_version,
            title,
            description,
            raw_document: document,
        }
    }

    /// Canonical serialization: sorted keys, two-space indent, trailing newline.
    pub fn to_canonical_json(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.raw_document).unwrap_or_default();
        out.push('\n');
        out
    }
}

/// Recursively rebuild every object with its keys in sorted order.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Outcome of one attempted `(identity, version)` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStateRecord {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FetchStateRecord {
    pub fn success(schema_path: impl Into<String>) -> Self {
        Self {
            ok: true,
            error: None,
            schema_path: Some(schema_path.into()),
            updated_at: Utc::now(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            schema_path: None,
            updated_at: Utc::now(),
        }
    }
}

/// A persisted schema found by a repository walk.
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    /// Sanitized identity (the directory name).
    pub id: String,
    /// Sanitized version (the file stem).
    pub version: String,
    pub path: PathBuf,
    pub document: Value,
}

impl RepositoryEntry {
    pub fn title(&self) -> Option<&str> {
        self.document
            .pointer("/info/title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn description(&self) -> Option<&str> {
        self.document
            .pointer("/info/description")
            .and_then(Value::as_str)
    }

    /// The `openapi` marker, else the `swagger` marker.
    pub fn spec_marker(&self) -> Option<&str> {
        self.document
            .get("openapi")
            .or_else(|| self.document.get("swagger"))
            .and_then(Value::as_str)
    }

    pub fn is_openapi3(&self) -> bool {
        self.document.get("openapi").is_some()
    }
}

/// Counters returned by a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declared_version_defaults_to_latest() {
        let schema = NormalizedSchema::from_document(json!({
            "openapi": "3.0.0",
            "info": { "title": "No Version" }
        }));
        assert_eq!(schema.declared_version, "latest");
        assert_eq!(schema.spec_version, "3.0.0");
        assert_eq!(schema.title.as_deref(), Some("No Version"));
    }

    #[test]
    fn swagger_marker_is_spec_version() {
        let schema = NormalizedSchema::from_document(json!({
            "swagger": "2.0",
            "info": { "title": "Old", "version": "1.2" }
        }));
        assert_eq!(schema.spec_version, "2.0");
        assert_eq!(schema.declared_version, "1.2");
    }

    #[test]
    fn canonical_json_is_sorted_and_newline_terminated() {
        let schema = NormalizedSchema::from_document(json!({
            "paths": {},
            "info": { "version": "1", "title": "T" },
            "openapi": "3.1.0"
        }));
        let out = schema.to_canonical_json();
        assert!(out.ends_with("}\n"));
        let info = out.find("\"info\"").unwrap();
        let openapi = out.find("\"openapi\"").unwrap();
        let paths = out.find("\"paths\"").unwrap();
        assert!(info < openapi && openapi < paths);
    }

    #[test]
    fn state_record_serializes_camel_case_without_empty_fields() {
        let record = FetchStateRecord::success("schemas/acme/v1.json");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["ok"], json!(true));
        assert_eq!(value["schemaPath"], json!("schemas/acme/v1.json"));
        assert!(value.get("error").is_none());
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn provenance_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(Provenance::CommunityIssue).unwrap(),
            json!("community-issue")
        );
        assert_eq!(Provenance::GuruIndex.to_string(), "guru-index");
    }
}
