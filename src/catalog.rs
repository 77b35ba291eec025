//! Catalog views derived from the schema repository.
//!
//! One repository walk collects a [`CatalogEntry`] per readable document;
//! the three views are projections of that same list, so they always agree
//! on the set of `(id, version)` pairs.
//!
//! | View | File | Shape |
//! |------|------|-------|
//! | plain | `catalog/index.json` | `{ updatedAt, count, entries }` |
//! | search | `catalog/search-index.json` | `{ updatedAt, count, records }` |
//! | bridge | `catalog/bridge-catalog.json` | `{ updatedAt, schemas }` |
//!
//! Views are never written back into the repository and can always be
//! regenerated from scratch.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::export::{display_relative, write_json};
use crate::models::RepositoryEntry;
use crate::repository::SchemaRepository;

pub const PLAIN_FILE: &str = "index.json";
pub const SEARCH_FILE: &str = "search-index.json";
pub const BRIDGE_FILE: &str = "bridge-catalog.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Plain,
    Search,
    Bridge,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Plain, ViewKind::Search, ViewKind::Bridge];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "plain" => Some(ViewKind::Plain),
            "search" => Some(ViewKind::Search),
            "bridge" => Some(ViewKind::Bridge),
            _ => None,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ViewKind::Plain => PLAIN_FILE,
            ViewKind::Search => SEARCH_FILE,
            ViewKind::Bridge => BRIDGE_FILE,
        }
    }
}

/// Everything any view needs from one repository entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub version: String,
    /// `info.title`, else the identity.
    pub title: String,
    /// `info.description`, else empty.
    pub description: String,
    /// `openapi` marker, else `swagger` marker.
    pub openapi: Option<String>,
    pub openapi3: bool,
    pub path: PathBuf,
}

impl CatalogEntry {
    fn from_repository(entry: RepositoryEntry) -> Self {
        Self {
            title: entry.title().unwrap_or(&entry.id).to_string(),
            description: entry.description().unwrap_or_default().to_string(),
            openapi: entry.spec_marker().map(str::to_string),
            openapi3: entry.is_openapi3(),
            id: entry.id,
            version: entry.version,
            path: entry.path,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlainEntry {
    pub id: String,
    pub version: String,
    pub title: String,
    pub openapi: Option<String>,
    pub schema_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlainIndex {
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub entries: Vec<PlainEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub id: String,
    pub version: String,
    pub title: String,
    pub description: String,
    pub openapi: Option<String>,
    #[serde(rename = "_tags")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub records: Vec<SearchRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSchema {
    pub id: String,
    pub version: String,
    pub title: String,
    pub schema_url: String,
    pub openapi: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCatalog {
    pub updated_at: DateTime<Utc>,
    pub schemas: Vec<BridgeSchema>,
}

/// A built view, ready to serialize.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CatalogView {
    Plain(PlainIndex),
    Search(SearchIndex),
    Bridge(BridgeCatalog),
}

impl CatalogView {
    /// The `(id, version)` pairs this view references, in order.
    pub fn keys(&self) -> Vec<(String, String)> {
        match self {
            CatalogView::Plain(v) => v
                .entries
                .iter()
                .map(|e| (e.id.clone(), e.version.clone()))
                .collect(),
            CatalogView::Search(v) => v
                .records
                .iter()
                .map(|r| (r.id.clone(), r.version.clone()))
                .collect(),
            CatalogView::Bridge(v) => v
                .schemas
                .iter()
                .map(|s| (s.id.clone(), s.version.clone()))
                .collect(),
        }
    }
}

/// Snapshot of the repository, projected into views on demand.
pub struct CatalogBuilder {
    entries: Vec<CatalogEntry>,
    /// Base for `schemaPath` in the plain index.
    project_root: PathBuf,
    updated_at: DateTime<Utc>,
}

impl CatalogBuilder {
    /// Walk `repository` once. Unreadable entries are logged and left out.
    pub fn scan(repository: &SchemaRepository, project_root: impl Into<PathBuf>) -> Self {
        let entries = repository
            .walk()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(CatalogEntry::from_repository(entry)),
                Err(e) => {
                    tracing::warn!(kind = e.kind(), error = %e, "skipping repository entry");
                    None
                }
            })
            .collect();
        Self {
            entries,
            project_root: project_root.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn build(&self, kind: ViewKind) -> CatalogView {
        match kind {
            ViewKind::Plain => CatalogView::Plain(self.plain()),
            ViewKind::Search => CatalogView::Search(self.search()),
            ViewKind::Bridge => CatalogView::Bridge(self.bridge()),
        }
    }

    pub fn plain(&self) -> PlainIndex {
        let entries: Vec<PlainEntry> = self
            .entries
            .iter()
            .map(|e| PlainEntry {
                id: e.id.clone(),
                version: e.version.clone(),
                title: e.title.clone(),
                openapi: e.openapi.clone(),
                schema_path: display_relative(&e.path, &self.project_root),
            })
            .collect();
        PlainIndex {
            updated_at: self.updated_at,
            count: entries.len(),
            entries,
        }
    }

    pub fn search(&self) -> SearchIndex {
        let records: Vec<SearchRecord> = self
            .entries
            .iter()
            .map(|e| SearchRecord {
                object_id: format!("{}:{}", e.id, e.version),
                id: e.id.clone(),
                version: e.version.clone(),
                title: e.title.clone(),
                description: e.description.clone(),
                openapi: e.openapi.clone(),
                tags: vec![
                    e.id.clone(),
                    e.version.clone(),
                    dialect_tag(e.openapi3).to_string(),
                ],
            })
            .collect();
        SearchIndex {
            updated_at: self.updated_at,
            count: records.len(),
            records,
        }
    }

    pub fn bridge(&self) -> BridgeCatalog {
        BridgeCatalog {
            updated_at: self.updated_at,
            schemas: self
                .entries
                .iter()
                .map(|e| BridgeSchema {
                    id: e.id.clone(),
                    version: e.version.clone(),
                    title: e.title.clone(),
                    schema_url: format!("/schemas/{}/{}.json", e.id, e.version),
                    openapi: e.openapi.clone(),
                })
                .collect(),
        }
    }

    /// Write the requested views into `catalog_dir`, returning the paths.
    pub fn write(&self, kinds: &[ViewKind], catalog_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for kind in kinds {
            let path = catalog_dir.join(kind.file_name());
            write_json(&path, &self.build(*kind))?;
            written.push(path);
        }
        Ok(written)
    }
}

fn dialect_tag(openapi3: bool) -> &'static str {
    if openapi3 {
        "openapi3"
    } else {
        "swagger"
    }
}

/// Parse a `build` argument: one view name or `all`.
pub fn parse_kinds(raw: &str) -> Result<Vec<ViewKind>> {
    if raw == "all" {
        return Ok(ViewKind::ALL.to_vec());
    }
    match ViewKind::parse(raw) {
        Some(kind) => Ok(vec![kind]),
        None => bail!(
            "Unknown catalog view: '{}'. Available: plain, search, bridge, all",
            raw
        ),
    }
}

/// `atlas build`: rebuild catalog views from the repository.
pub fn run_build(config: &Config, kinds: &[ViewKind]) -> Result<()> {
    let repository = SchemaRepository::new(config.schemas_dir());
    let builder = CatalogBuilder::scan(&repository, config.root());
    let written = builder.write(kinds, &config.catalog_dir())?;

    for path in &written {
        println!(
            "wrote {} ({} entries)",
            display_relative(path, config.root()),
            builder.entries().len()
        );
    }
    tracing::info!(entries = builder.entries().len(), views = written.len(), "catalog built");
    Ok(())
}
