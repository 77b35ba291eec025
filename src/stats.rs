//! Repository and fetch-state overview.
//!
//! Provides a quick summary of what has been harvested: API and version
//! counts, the OpenAPI 3 / Swagger 2 split, and the ok/failed tallies of the
//! durable fetch state files. Used by `atlas stats` to confirm that harvests
//! are making progress.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::Config;
use crate::ingest::{FETCH_ALL_STATE_FILE, REFRESH_STATE_FILE};
use crate::repository::SchemaRepository;
use crate::state::FetchStateStore;

/// Counts over the schema repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    pub apis: usize,
    pub versions: usize,
    pub openapi3: usize,
    pub swagger: usize,
    pub unreadable: usize,
}

/// Counts over one durable state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStats {
    pub name: &'static str,
    pub path: PathBuf,
    pub ok: usize,
    pub failed: usize,
    pub last_update: Option<DateTime<Utc>>,
}

pub fn repository_stats(repository: &SchemaRepository) -> RepositoryStats {
    let mut stats = RepositoryStats::default();
    let mut ids = BTreeSet::new();

    for entry in repository.walk() {
        match entry {
            Ok(entry) => {
                stats.versions += 1;
                if entry.is_openapi3() {
                    stats.openapi3 += 1;
                } else {
                    stats.swagger += 1;
                }
                ids.insert(entry.id);
            }
            Err(_) => stats.unreadable += 1,
        }
    }

    stats.apis = ids.len();
    stats
}

pub fn state_stats(name: &'static str, path: PathBuf) -> StateStats {
    let store = FetchStateStore::open(&path);
    let ok = store.records().filter(|(_, r)| r.ok).count();
    StateStats {
        name,
        ok,
        failed: store.len() - ok,
        last_update: store.records().map(|(_, r)| r.updated_at).max(),
        path,
    }
}

/// Run the stats command and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let repository = SchemaRepository::new(config.schemas_dir());
    let repo = repository_stats(&repository);

    println!("Schema Atlas: Repository Stats");
    println!("==============================");
    println!();
    println!("  Repository:  {}", repository.root().display());
    println!("  APIs:        {}", repo.apis);
    println!("  Versions:    {}", repo.versions);
    println!("  OpenAPI 3:   {}", repo.openapi3);
    println!("  Swagger 2:   {}", repo.swagger);
    if repo.unreadable > 0 {
        println!("  Unreadable:  {}", repo.unreadable);
    }

    let cache = config.cache_dir();
    let states = [
        state_stats("refresh", cache.join(REFRESH_STATE_FILE)),
        state_stats("fetch-all", cache.join(FETCH_ALL_STATE_FILE)),
    ];

    println!();
    println!("  Fetch state:");
    println!(
        "  {:<12} {:>8} {:>8}   {}",
        "RUN", "OK", "FAILED", "LAST UPDATE"
    );
    println!("  {}", "-".repeat(48));
    for s in &states {
        let last = match s.last_update {
            Some(ts) => format_ts_relative(ts.timestamp()),
            None => "never".to_string(),
        };
        println!("  {:<12} {:>8} {:>8}   {}", s.name, s.ok, s.failed, last);
    }
    println!();

    Ok(())
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchStateRecord, NormalizedSchema};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn counts_apis_versions_and_dialects() {
        let tmp = TempDir::new().unwrap();
        let repo = SchemaRepository::new(tmp.path().join("schemas"));
        for (id, ver, doc) in [
            ("a", "1", json!({ "openapi": "3.0.0", "info": { "title": "A", "version": "1" } })),
            ("a", "2", json!({ "openapi": "3.1.0", "info": { "title": "A", "version": "2" } })),
            ("b", "1", json!({ "swagger": "2.0", "info": { "title": "B", "version": "1" } })),
        ] {
            repo.put(id, ver, &NormalizedSchema::from_document(doc)).unwrap();
        }

        let stats = repository_stats(&repo);
        assert_eq!(stats.apis, 2);
        assert_eq!(stats.versions, 3);
        assert_eq!(stats.openapi3, 2);
        assert_eq!(stats.swagger, 1);
        assert_eq!(stats.unreadable, 0);
    }

    #[test]
    fn state_counts_ok_and_failed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        let mut store = FetchStateStore::open(&path);
        store.record("a@1", FetchStateRecord::success("schemas/a/1.json")).unwrap();
        store.record("b@1", FetchStateRecord::failure("boom")).unwrap();

        let stats = state_stats("test", path);
        assert_eq!(stats.ok, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_update.is_some());
    }

    #[test]
    fn relative_time() {
        let now = Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 120), "2 mins ago");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
    }
}
