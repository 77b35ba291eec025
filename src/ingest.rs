//! Harvest orchestration for `atlas refresh` and `atlas fetch-all`.
//!
//! Both commands build a candidate list, open a fetch state store and hand
//! them to the [`BatchDriver`]. They differ in where candidates come from
//! and how durable the state is:
//!
//! | Command | Candidates | State |
//! |---------|------------|-------|
//! | `refresh` | every source list, aggregated | in-memory, or `.cache/refresh-state.json` with `--resume` |
//! | `fetch-all` | every version in the stored guru index | `.cache/fetch-all-versions-state.json` |

use anyhow::{Context, Result};

use crate::aggregate::aggregate;
use crate::batch::{BatchDriver, BatchOptions, FetchReport};
use crate::catalog::{CatalogBuilder, ViewKind};
use crate::config::Config;
use crate::export::{display_relative, write_json};
use crate::guru;
use crate::models::{BatchSummary, Candidate};
use crate::normalize::{DocumentNormalizer, Normalizer};
use crate::progress::BatchProgressReporter;
use crate::repository::SchemaRepository;
use crate::sources::load_candidate_lists;
use crate::state::FetchStateStore;

pub const REFRESH_STATE_FILE: &str = "refresh-state.json";
pub const FETCH_ALL_STATE_FILE: &str = "fetch-all-versions-state.json";
pub const FETCH_REPORT_FILE: &str = "fetch-report.json";

/// Resolve the per-run cap: an explicit `--max` wins over configuration.
fn effective_max(config: &Config, max: Option<usize>) -> usize {
    max.unwrap_or(config.fetch.max_schemas)
}

/// Run one batch against the configured repository.
pub async fn harvest(
    config: &Config,
    normalizer: &dyn Normalizer,
    state: &mut FetchStateStore,
    candidates: &[Candidate],
    options: &BatchOptions,
    progress: &dyn BatchProgressReporter,
) -> Result<BatchSummary> {
    let repository = SchemaRepository::new(config.schemas_dir());
    let summary = BatchDriver::new(normalizer, &repository, state)
        .with_progress(progress)
        .with_project_root(config.root())
        .run(candidates, options)
        .await?;
    Ok(summary)
}

fn print_summary(run: &str, summary: &BatchSummary) {
    println!(
        "{}: processed {}, ok {}, failed {}, skipped {}",
        run, summary.processed, summary.ok, summary.failed, summary.skipped
    );
}

/// `atlas refresh`: harvest every aggregated candidate and rebuild the catalog.
pub async fn run_refresh(
    config: &Config,
    resume: bool,
    max: Option<usize>,
    progress: &dyn BatchProgressReporter,
) -> Result<BatchSummary> {
    let candidates = aggregate(load_candidate_lists(config));
    tracing::info!(candidates = candidates.len(), "aggregated candidates");

    let mut state = if resume {
        FetchStateStore::open(config.cache_dir().join(REFRESH_STATE_FILE))
    } else {
        FetchStateStore::in_memory()
    };

    let normalizer = DocumentNormalizer::new(&config.fetch)?;
    let options = BatchOptions {
        run: "refresh".to_string(),
        concurrency: config.fetch.concurrency,
        max: effective_max(config, max),
    };
    let summary = harvest(config, &normalizer, &mut state, &candidates, &options, progress).await?;
    print_summary("refresh", &summary);

    let repository = SchemaRepository::new(config.schemas_dir());
    let builder = CatalogBuilder::scan(&repository, config.root());
    builder
        .write(&ViewKind::ALL, &config.catalog_dir())
        .context("rebuilding catalog after refresh")?;
    println!("catalog: {} entries", builder.entries().len());

    Ok(summary)
}

/// `atlas fetch-all`: resumable harvest of every indexed version.
pub async fn run_fetch_all(
    config: &Config,
    max: Option<usize>,
    reset: bool,
    progress: &dyn BatchProgressReporter,
) -> Result<BatchSummary> {
    let index = guru::load_index(config)?;
    if index.is_empty() {
        tracing::warn!("guru index is empty; run `atlas seed` first");
    }
    let candidates = guru::candidates_from_index(&index);

    let mut state = FetchStateStore::open(config.cache_dir().join(FETCH_ALL_STATE_FILE));
    if reset {
        state.reset()?;
        tracing::info!("fetch state reset");
    }

    let max = effective_max(config, max);
    let normalizer = DocumentNormalizer::new(&config.fetch)?;
    let options = BatchOptions {
        run: "fetch-all".to_string(),
        concurrency: config.fetch.concurrency,
        max,
    };
    let summary = harvest(config, &normalizer, &mut state, &candidates, &options, progress).await?;
    print_summary("fetch-all", &summary);

    let report_path = config.catalog_dir().join(FETCH_REPORT_FILE);
    write_json(&report_path, &FetchReport::new(&summary, max))?;
    println!("report: {}", display_relative(&report_path, config.root()));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_max_overrides_config() {
        let mut config = Config::default();
        config.fetch.max_schemas = 50;
        assert_eq!(effective_max(&config, None), 50);
        assert_eq!(effective_max(&config, Some(3)), 3);
        assert_eq!(effective_max(&config, Some(0)), 0);
    }
}
