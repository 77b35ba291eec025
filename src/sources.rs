//! Candidate source lists on disk and their health.
//!
//! The refresh pipeline merges four lists, in this priority order:
//!
//! | Source | File | Provenance |
//! |--------|------|------------|
//! | `seeds` | `sources/seeds.json` | seed |
//! | `guru` | `sources/seeds.apis-guru.json` | guru-index |
//! | `discovered` | `catalog/discovered.json` | discovery |
//! | `community` | `sources/community-candidates.json` | community-issue |
//!
//! Each file may be either a bare array of records or an object with an
//! `items` array. Missing files count as empty lists.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::export::read_json;
use crate::models::{Candidate, Provenance};

/// A candidate as it appears in any of the source files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub id: String,
    pub schema_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceFile {
    Bare(Vec<SourceRecord>),
    Wrapped {
        #[serde(default)]
        items: Vec<SourceRecord>,
    },
}

/// One configured candidate list.
#[derive(Debug, Clone)]
pub struct SourceList {
    pub name: &'static str,
    pub path: PathBuf,
    pub provenance: Provenance,
}

/// Health of one list, for `atlas sources`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub path: String,
    pub status: String,
    pub count: usize,
    pub healthy: bool,
}

/// The four lists in priority order.
pub fn source_lists(config: &Config) -> Vec<SourceList> {
    let sources = config.sources_dir();
    vec![
        SourceList {
            name: "seeds",
            path: sources.join("seeds.json"),
            provenance: Provenance::Seed,
        },
        SourceList {
            name: "guru",
            path: sources.join("seeds.apis-guru.json"),
            provenance: Provenance::GuruIndex,
        },
        SourceList {
            name: "discovered",
            path: config.catalog_dir().join("discovered.json"),
            provenance: Provenance::Discovery,
        },
        SourceList {
            name: "community",
            path: sources.join("community-candidates.json"),
            provenance: Provenance::CommunityIssue,
        },
    ]
}

impl SourceList {
    /// Load the list. Records without a schema URL are dropped.
    pub fn load(&self) -> Result<Vec<Candidate>> {
        let file: Option<SourceFile> = read_json(&self.path)?;
        let records = match file {
            Some(SourceFile::Bare(records)) => records,
            Some(SourceFile::Wrapped { items }) => items,
            None => Vec::new(),
        };
        Ok(records
            .into_iter()
            .filter_map(|r| {
                let url = r.schema_url.filter(|u| !u.trim().is_empty())?;
                let mut candidate = Candidate::new(r.id, url, self.provenance);
                candidate.title = r.title;
                Some(candidate)
            })
            .collect())
    }

    pub fn status(&self) -> SourceStatus {
        let (status, count, healthy) = if !self.path.exists() {
            ("MISSING".to_string(), 0, false)
        } else {
            match self.load() {
                Ok(items) => ("OK".to_string(), items.len(), true),
                Err(e) => (format!("INVALID ({})", e), 0, false),
            }
        };
        SourceStatus {
            name: self.name.to_string(),
            path: self.path.display().to_string(),
            status,
            count,
            healthy,
        }
    }
}

/// Load every list in priority order. A malformed list is reported and
/// treated as empty so one bad file cannot block the others.
pub fn load_candidate_lists(config: &Config) -> Vec<Vec<Candidate>> {
    source_lists(config)
        .iter()
        .map(|list| match list.load() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(source = list.name, error = %e, "skipping malformed source list");
                Vec::new()
            }
        })
        .collect()
}

pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    source_lists(config).iter().map(SourceList::status).collect()
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<8} {:<8} PATH", "SOURCE", "STATUS", "COUNT");
    for s in get_sources(config) {
        println!("{:<12} {:<8} {:<8} {}", s.name, s.status, s.count, s.path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_bare_and_wrapped_lists() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_root(tmp.path());
        std::fs::create_dir_all(config.sources_dir()).unwrap();
        std::fs::create_dir_all(config.catalog_dir()).unwrap();
        std::fs::write(
            config.sources_dir().join("seeds.json"),
            r#"[{"id":"acme","schemaUrl":"https://acme.test/openapi.json","title":"Acme"}]"#,
        )
        .unwrap();
        std::fs::write(
            config.catalog_dir().join("discovered.json"),
            r#"{"updatedAt":"2026-01-01T00:00:00Z","count":1,"items":[{"id":"beta.test","schemaUrl":"https://beta.test/swagger.json","title":"Beta","openapi":null}]}"#,
        )
        .unwrap();

        let lists = load_candidate_lists(&config);
        assert_eq!(lists.len(), 4);
        assert_eq!(lists[0].len(), 1);
        assert_eq!(lists[0][0].provenance, Provenance::Seed);
        assert_eq!(lists[0][0].title.as_deref(), Some("Acme"));
        assert!(lists[1].is_empty());
        assert_eq!(lists[2][0].identity, "beta.test");
        assert_eq!(lists[2][0].provenance, Provenance::Discovery);
        assert!(lists[3].is_empty());
    }

    #[test]
    fn records_without_url_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_root(tmp.path());
        std::fs::create_dir_all(config.sources_dir()).unwrap();
        std::fs::write(
            config.sources_dir().join("seeds.json"),
            r#"[{"id":"a"},{"id":"b","schemaUrl":""},{"id":"c","schemaUrl":"x.json"}]"#,
        )
        .unwrap();
        let lists = load_candidate_lists(&config);
        assert_eq!(lists[0].len(), 1);
        assert_eq!(lists[0][0].identity, "c");
    }

    #[test]
    fn malformed_list_is_empty_and_unhealthy() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_root(tmp.path());
        std::fs::create_dir_all(config.sources_dir()).unwrap();
        std::fs::write(config.sources_dir().join("seeds.json"), "{oops").unwrap();

        assert!(load_candidate_lists(&config)[0].is_empty());
        let statuses = get_sources(&config);
        assert!(!statuses[0].healthy);
        assert!(statuses[0].status.starts_with("INVALID"));
        assert_eq!(statuses[1].status, "MISSING");
    }
}
