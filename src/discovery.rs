//! Discovery of schemas at well-known locations.
//!
//! For each base URL in `sources/discovery-targets.json` the probe tries the
//! configured suffixes in order and keeps the first one that normalizes.
//! Hosts are independent of each other; a host with no working suffix simply
//! yields nothing. Results go to `catalog/discovered.json`, which the next
//! `atlas refresh` picks up as a source list.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::export::{display_relative, read_json, write_json};
use crate::normalize::{DocumentNormalizer, Normalizer};

pub const DISCOVERED_FILE: &str = "discovered.json";

/// One discovered schema, as written to `catalog/discovered.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredItem {
    /// `host[:port]` of the base URL.
    pub id: String,
    pub schema_url: String,
    pub title: String,
    pub openapi: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryOutput {
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<DiscoveredItem>,
}

/// `host[:port]` of a base URL, falling back to the raw string. Default
/// ports are omitted.
fn host_of(base: &str) -> String {
    reqwest::Url::parse(base)
        .ok()
        .and_then(|u| {
            let host = u.host_str()?;
            Some(match u.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
        })
        .unwrap_or_else(|| base.to_string())
}

pub struct DiscoveryProbe<'a> {
    normalizer: &'a dyn Normalizer,
    suffixes: &'a [String],
}

impl<'a> DiscoveryProbe<'a> {
    pub fn new(normalizer: &'a dyn Normalizer, suffixes: &'a [String]) -> Self {
        Self {
            normalizer,
            suffixes,
        }
    }

    /// Try each suffix in order; the first that normalizes wins.
    pub async fn probe(&self, base: &str) -> Option<DiscoveredItem> {
        let base = base.trim().trim_end_matches('/');
        for suffix in self.suffixes {
            let url = format!("{}{}", base, suffix);
            match self.normalizer.normalize(&url).await {
                Ok(schema) => {
                    tracing::info!(url = %url, "schema discovered");
                    let openapi = Some(schema.spec_version.clone()).filter(|v| !v.is_empty());
                    return Some(DiscoveredItem {
                        id: host_of(base),
                        schema_url: url,
                        title: schema.title.unwrap_or_else(|| base.to_string()),
                        openapi,
                    });
                }
                Err(e) => {
                    tracing::debug!(url = %url, kind = e.kind(), error = %e, "probe miss");
                }
            }
        }
        tracing::info!(base = %base, "no schema found");
        None
    }

    /// Probe every base, `concurrency` hosts at a time, keeping input order.
    pub async fn probe_all(&self, bases: &[String], concurrency: usize) -> Vec<DiscoveredItem> {
        stream::iter(bases.iter().map(|base| self.probe(base)))
            .buffered(concurrency.max(1))
            .filter_map(|found| async move { found })
            .collect()
            .await
    }
}

/// Read the targets file: a JSON array of base URLs. Missing means none.
pub fn load_targets(config: &Config) -> Result<Vec<String>> {
    let path = config.discovery_targets_path();
    let targets: Option<Vec<String>> = read_json(&path)
        .with_context(|| format!("loading discovery targets from {}", path.display()))?;
    Ok(targets
        .unwrap_or_default()
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .collect())
}

/// `atlas discover`: probe every target and write the discovery output.
pub async fn run_discover(config: &Config) -> Result<Vec<DiscoveredItem>> {
    let targets = load_targets(config)?;
    if targets.is_empty() {
        tracing::warn!(
            path = %config.discovery_targets_path().display(),
            "no discovery targets configured"
        );
    }

    let normalizer = DocumentNormalizer::new(&config.fetch)?;
    let probe = DiscoveryProbe::new(&normalizer, &config.discovery.suffixes);
    let items = probe.probe_all(&targets, config.fetch.concurrency).await;

    let path = config.catalog_dir().join(DISCOVERED_FILE);
    write_json(
        &path,
        &DiscoveryOutput {
            updated_at: Utc::now(),
            count: items.len(),
            items: items.clone(),
        },
    )?;
    println!(
        "discovered {} of {} targets -> {}",
        items.len(),
        targets.len(),
        display_relative(&path, config.root())
    );
    Ok(items)
}
