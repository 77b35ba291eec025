//! Seeding from the public APIs.guru index.
//!
//! `atlas seed` downloads the index list and writes two files:
//!
//! - `sources/apis-guru-index.json`: every API with every version and its
//!   schema URLs, used by `atlas fetch-all`.
//! - `sources/seeds.apis-guru.json`: one seed per API pointing at its
//!   preferred version, merged by `atlas refresh`.
//!
//! There is no fallback when the index cannot be fetched; the command fails.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HarvestError, HarvestResult};
use crate::export::{read_json, write_json};
use crate::models::{Candidate, Provenance};

pub const INDEX_FILE: &str = "apis-guru-index.json";
pub const SEEDS_FILE: &str = "seeds.apis-guru.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One version of one API in the stored index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuruVersion {
    pub openapi_url: Option<String>,
    pub swagger_url: Option<String>,
    #[serde(default)]
    pub info: VersionInfo,
}

impl GuruVersion {
    /// The OpenAPI URL if present, else the Swagger URL.
    pub fn schema_url(&self) -> Option<&str> {
        self.openapi_url
            .as_deref()
            .or(self.swagger_url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuruEntry {
    pub id: String,
    pub preferred_version: Option<String>,
    pub title: String,
    #[serde(default)]
    pub versions: BTreeMap<String, GuruVersion>,
}

/// Stored index: API id → entry.
pub type GuruIndex = BTreeMap<String, GuruEntry>;

/// Preferred-version seed, as written to `seeds.apis-guru.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuruSeed {
    pub id: String,
    pub schema_url: String,
    pub title: String,
    pub source: String,
    pub preferred_version: String,
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Project the raw index list into the stored index and preferred seeds.
pub fn project(raw: &Value) -> (GuruIndex, Vec<GuruSeed>) {
    let mut index = GuruIndex::new();
    let mut seeds = Vec::new();

    let Some(apis) = raw.as_object() else {
        return (index, seeds);
    };

    for (id, entry) in apis {
        let raw_versions = entry.get("versions").and_then(Value::as_object);

        let mut versions = BTreeMap::new();
        let mut first_version = None;
        if let Some(raw_versions) = raw_versions {
            for (ver, meta) in raw_versions {
                if first_version.is_none() {
                    first_version = Some(ver.clone());
                }
                versions.insert(
                    ver.clone(),
                    GuruVersion {
                        openapi_url: str_field(meta, "openapiUrl").map(str::to_string),
                        swagger_url: str_field(meta, "swaggerUrl").map(str::to_string),
                        info: VersionInfo {
                            title: Some(
                                meta.pointer("/info/title")
                                    .and_then(Value::as_str)
                                    .filter(|t| !t.is_empty())
                                    .unwrap_or(id)
                                    .to_string(),
                            ),
                        },
                    },
                );
            }
        }

        let preferred = str_field(entry, "preferred")
            .map(str::to_string)
            .or(first_version);

        let preferred_meta = preferred.as_ref().and_then(|p| versions.get(p));
        let title = preferred_meta
            .and_then(|v| v.info.title.clone())
            .unwrap_or_else(|| id.clone());

        if let (Some(pref), Some(meta)) = (&preferred, preferred_meta) {
            if let Some(url) = meta.schema_url() {
                seeds.push(GuruSeed {
                    id: id.clone(),
                    schema_url: url.to_string(),
                    title: title.clone(),
                    source: "apis.guru".to_string(),
                    preferred_version: pref.clone(),
                });
            }
        }

        index.insert(
            id.clone(),
            GuruEntry {
                id: id.clone(),
                preferred_version: preferred,
                title,
                versions,
            },
        );
    }

    (index, seeds)
}

/// Expand the stored index into candidates carrying their full version set.
///
/// Versions without any schema URL are left out; APIs with no fetchable
/// version produce no candidate.
pub fn candidates_from_index(index: &GuruIndex) -> Vec<Candidate> {
    index
        .values()
        .filter_map(|entry| {
            let fetchable: Vec<(&String, &str)> = entry
                .versions
                .iter()
                .filter_map(|(ver, meta)| meta.schema_url().map(|u| (ver, u)))
                .collect();
            let preferred_url = entry
                .preferred_version
                .as_ref()
                .and_then(|p| entry.versions.get(p))
                .and_then(GuruVersion::schema_url)
                .or_else(|| fetchable.first().map(|(_, u)| *u))?;

            let mut candidate = Candidate::new(&entry.id, preferred_url, Provenance::GuruIndex)
                .with_title(&entry.title);
            for (ver, url) in fetchable {
                candidate = candidate.with_version(ver.clone(), url);
            }
            Some(candidate)
        })
        .collect()
}

/// Load the stored index; a missing file is an empty index.
pub fn load_index(config: &Config) -> Result<GuruIndex> {
    let path = config.sources_dir().join(INDEX_FILE);
    Ok(read_json(&path)?.unwrap_or_default())
}

async fn fetch_list(config: &Config) -> HarvestResult<Value> {
    let url = &config.guru.list_url;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch.timeout_secs))
        .user_agent(config.fetch.user_agent.clone())
        .build()?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HarvestError::Network(format!("GET {}: {}", url, e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Network(format!(
            "Failed to fetch {}: {}",
            url, status
        )));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| HarvestError::Upstream(format!("{} returned invalid JSON: {}", url, e)))
}

/// `atlas seed`: fetch the index and write both seed files.
pub async fn run_seed(config: &Config) -> Result<()> {
    tracing::info!(url = %config.guru.list_url, "fetching index");
    let raw = fetch_list(config)
        .await
        .context("index fetch failed; seeding has no fallback")?;

    let (index, seeds) = project(&raw);
    let sources = config.sources_dir();
    write_json(&sources.join(INDEX_FILE), &index)?;
    write_json(&sources.join(SEEDS_FILE), &seeds)?;

    println!("seeded index: {} apis", index.len());
    println!("seeded preferred urls: {}", seeds.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_list() -> Value {
        json!({
            "acme.com": {
                "preferred": "2.0",
                "versions": {
                    "1.0": {
                        "swaggerUrl": "https://guru.test/acme/1.0/swagger.json",
                        "info": { "title": "Acme v1" }
                    },
                    "2.0": {
                        "swaggerUrl": "https://guru.test/acme/2.0/openapi.json",
                        "info": { "title": "Acme" }
                    }
                }
            },
            "nourl.io": {
                "versions": { "v1": { "info": {} } }
            }
        })
    }

    #[test]
    fn projects_index_and_preferred_seeds() {
        let (index, seeds) = project(&raw_list());
        assert_eq!(index.len(), 2);

        let acme = &index["acme.com"];
        assert_eq!(acme.preferred_version.as_deref(), Some("2.0"));
        assert_eq!(acme.title, "Acme");
        assert_eq!(acme.versions.len(), 2);

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].id, "acme.com");
        assert_eq!(seeds[0].schema_url, "https://guru.test/acme/2.0/openapi.json");
        assert_eq!(seeds[0].source, "apis.guru");
    }

    #[test]
    fn preferred_falls_back_to_first_version() {
        let (index, _) = project(&json!({
            "x": { "versions": { "a": { "swaggerUrl": "u" } } }
        }));
        assert_eq!(index["x"].preferred_version.as_deref(), Some("a"));
        assert_eq!(index["x"].title, "x");
    }

    #[test]
    fn fallback_version_is_lexicographically_first() {
        let (index, seeds) = project(&json!({
            "x": { "versions": {
                "2.0": { "openapiUrl": "https://x.test/2.json" },
                "1.0": { "openapiUrl": "https://x.test/1.json" }
            } }
        }));
        assert_eq!(index["x"].preferred_version.as_deref(), Some("1.0"));
        assert_eq!(seeds[0].schema_url, "https://x.test/1.json");
    }

    #[test]
    fn candidates_carry_every_fetchable_version() {
        let (index, _) = project(&raw_list());
        let candidates = candidates_from_index(&index);
        assert_eq!(candidates.len(), 1);
        let acme = &candidates[0];
        assert_eq!(acme.provenance, Provenance::GuruIndex);
        assert_eq!(acme.versions.len(), 2);
        assert_eq!(acme.schema_locator, "https://guru.test/acme/2.0/openapi.json");
    }

    #[test]
    fn stored_index_round_trips_field_names() {
        let (index, seeds) = project(&raw_list());
        let value = serde_json::to_value(&index).unwrap();
        assert_eq!(
            value["acme.com"]["versions"]["1.0"]["swaggerUrl"],
            json!("https://guru.test/acme/1.0/swagger.json")
        );
        assert_eq!(value["acme.com"]["preferredVersion"], json!("2.0"));
        let seed = serde_json::to_value(&seeds[0]).unwrap();
        assert_eq!(seed["preferredVersion"], json!("2.0"));
        assert_eq!(seed["schemaUrl"], json!("https://guru.test/acme/2.0/openapi.json"));
    }
}
