//! Resumable batch driver.
//!
//! Expands candidates into `(identity, version)` work items, skips keys the
//! fetch state store already marks `ok`, and normalizes the rest through a
//! bounded pool of in-flight requests. Outcomes are consumed by a single
//! writer loop: each one is written to the repository and flushed to the
//! state store before the next outcome is taken, so an interrupted run loses
//! at most the requests still in flight.
//!
//! A failing item never aborts the batch; it is recorded `ok: false` and
//! retried on the next run.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{HarvestError, HarvestResult};
use crate::export::display_relative;
use crate::models::{BatchSummary, Candidate, FetchStateRecord, NormalizedSchema, LATEST_VERSION};
use crate::normalize::Normalizer;
use crate::progress::{BatchProgressEvent, BatchProgressReporter, NoProgress};
use crate::repository::SchemaRepository;
use crate::state::{state_key, FetchStateStore};

/// One `(identity, version)` pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub identity: String,
    /// Declared version, when the candidate carried a version set.
    pub version: Option<String>,
    pub locator: String,
}

impl WorkItem {
    pub fn key(&self) -> String {
        state_key(
            &self.identity,
            self.version.as_deref().unwrap_or(LATEST_VERSION),
        )
    }

    /// Version the repository entry is stored under.
    fn storage_version<'a>(&'a self, schema: &'a NormalizedSchema) -> &'a str {
        self.version
            .as_deref()
            .unwrap_or(schema.declared_version.as_str())
    }
}

/// Expand candidates into work items, one per declared version (or one
/// unversioned item), dropping repeated keys.
pub fn work_items(candidates: &[Candidate]) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for candidate in candidates {
        let expanded: Vec<WorkItem> = if candidate.versions.is_empty() {
            vec![WorkItem {
                identity: candidate.identity.clone(),
                version: None,
                locator: candidate.schema_locator.clone(),
            }]
        } else {
            candidate
                .versions
                .iter()
                .map(|v| WorkItem {
                    identity: candidate.identity.clone(),
                    version: Some(v.version.clone()),
                    locator: v.locator.clone(),
                })
                .collect()
        };
        for item in expanded {
            if seen.insert(item.key()) {
                items.push(item);
            }
        }
    }

    items
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Label used in progress output.
    pub run: String,
    /// Maximum in-flight normalizations.
    pub concurrency: usize,
    /// Cap on newly processed items; 0 = unlimited.
    pub max: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            run: "batch".to_string(),
            concurrency: 1,
            max: 0,
        }
    }
}

/// Summary written to `catalog/fetch-report.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub processed: usize,
    pub ok: usize,
    pub failed: usize,
    pub max: usize,
}

impl FetchReport {
    pub fn new(summary: &BatchSummary, max: usize) -> Self {
        Self {
            updated_at: chrono::Utc::now(),
            processed: summary.processed,
            ok: summary.ok,
            failed: summary.failed,
            max,
        }
    }
}

/// Everything a batch run reads from and writes to.
pub struct BatchDriver<'a> {
    normalizer: &'a dyn Normalizer,
    repository: &'a SchemaRepository,
    state: &'a mut FetchStateStore,
    progress: &'a dyn BatchProgressReporter,
    /// Base for the `schemaPath` recorded in state; absolute paths otherwise.
    project_root: Option<PathBuf>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        normalizer: &'a dyn Normalizer,
        repository: &'a SchemaRepository,
        state: &'a mut FetchStateStore,
    ) -> Self {
        Self {
            normalizer,
            repository,
            state,
            progress: &NoProgress,
            project_root: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn BatchProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Run one batch over `candidates`.
    ///
    /// Only a failure to persist fetch state aborts the run; per-item
    /// normalization and repository errors are recorded and skipped.
    pub async fn run(
        &mut self,
        candidates: &[Candidate],
        options: &BatchOptions,
    ) -> HarvestResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        let limit = if options.max == 0 {
            usize::MAX
        } else {
            options.max
        };

        let mut pending = Vec::new();
        for item in work_items(candidates) {
            if self.state.is_done(&item.key()) {
                summary.skipped += 1;
                continue;
            }
            if pending.len() >= limit {
                continue;
            }
            pending.push(item);
        }

        let total = pending.len() as u64;
        self.progress.report(BatchProgressEvent::Planned {
            run: options.run.clone(),
            pending: total,
            skipped: summary.skipped as u64,
        });
        tracing::info!(
            run = %options.run,
            pending = total,
            skipped = summary.skipped,
            "batch planned"
        );

        let normalizer = self.normalizer;
        let mut outcomes = stream::iter(pending.into_iter().map(|item| async move {
            let result = normalizer.normalize(&item.locator).await;
            (item, result)
        }))
        .buffer_unordered(options.concurrency.max(1));

        while let Some((item, result)) = outcomes.next().await {
            let key = item.key();
            summary.processed += 1;

            let record = match result.and_then(|schema| self.store(&item, &schema)) {
                Ok(record) => {
                    summary.ok += 1;
                    println!("ok {}", key);
                    tracing::debug!(key = %key, "stored");
                    record
                }
                Err(e) => {
                    summary.failed += 1;
                    println!("fail {}", key);
                    tracing::warn!(key = %key, kind = e.kind(), error = %e, "fetch failed");
                    FetchStateRecord::failure(e.to_string())
                }
            };

            self.state.record(key, record).map_err(|e| {
                HarvestError::Internal(format!("persisting fetch state: {}", e))
            })?;

            self.progress.report(BatchProgressEvent::Fetching {
                run: options.run.clone(),
                n: summary.processed as u64,
                total,
            });
        }

        Ok(summary)
    }

    fn store(&self, item: &WorkItem, schema: &NormalizedSchema) -> HarvestResult<FetchStateRecord> {
        let path = self
            .repository
            .put(&item.identity, item.storage_version(schema), schema)?;
        let shown = match &self.project_root {
            Some(root) => display_relative(&path, root),
            None => path.display().to_string(),
        };
        Ok(FetchStateRecord::success(shown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;

    #[test]
    fn unversioned_candidate_is_one_latest_item() {
        let items = work_items(&[Candidate::new("acme", "https://a", Provenance::Seed)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key(), "acme@latest");
        assert_eq!(items[0].version, None);
    }

    #[test]
    fn versioned_candidate_expands_per_version() {
        let candidate = Candidate::new("acme", "https://a/2", Provenance::GuruIndex)
            .with_version("1.0", "https://a/1")
            .with_version("2.0", "https://a/2");
        let items = work_items(&[candidate]);
        let keys: Vec<_> = items.iter().map(WorkItem::key).collect();
        assert_eq!(keys, vec!["acme@1.0", "acme@2.0"]);
        assert_eq!(items[0].locator, "https://a/1");
    }

    #[test]
    fn repeated_keys_are_dropped() {
        let a = Candidate::new("acme", "https://a", Provenance::Seed).with_version("1", "u1");
        let b = Candidate::new("acme", "https://b", Provenance::Seed).with_version("1", "u2");
        let items = work_items(&[a, b]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].locator, "u1");
    }

    #[test]
    fn report_shape() {
        let summary = BatchSummary {
            processed: 3,
            ok: 2,
            failed: 1,
            skipped: 5,
        };
        let value = serde_json::to_value(FetchReport::new(&summary, 10)).unwrap();
        assert_eq!(value["processed"], 3);
        assert_eq!(value["ok"], 2);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["max"], 10);
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("skipped").is_none());
    }
}
