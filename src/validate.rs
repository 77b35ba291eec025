//! Re-validation of every stored schema.
//!
//! `atlas validate` pushes each repository file back through the
//! normalization gateway and prints `ok <path>` or `fail <path>: <error>`.
//! The command exits non-zero when anything fails, so it can gate CI.

use anyhow::Result;

use crate::config::Config;
use crate::export::display_relative;
use crate::models::BatchSummary;
use crate::normalize::{DocumentNormalizer, Normalizer};
use crate::repository::SchemaRepository;

/// Re-normalize every entry; returns the ok/failed tally.
pub async fn validate_repository(
    repository: &SchemaRepository,
    normalizer: &dyn Normalizer,
    project_root: &std::path::Path,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for entry in repository.walk() {
        summary.processed += 1;
        match entry {
            Ok(entry) => {
                let shown = display_relative(&entry.path, project_root);
                match normalizer.normalize(&entry.path.to_string_lossy()).await {
                    Ok(_) => {
                        summary.ok += 1;
                        println!("ok {}", shown);
                    }
                    Err(e) => {
                        summary.failed += 1;
                        println!("fail {}: {}", shown, e);
                        tracing::warn!(path = %shown, kind = e.kind(), error = %e, "validation failed");
                    }
                }
            }
            Err(e) => {
                summary.failed += 1;
                println!("fail {}", e);
                tracing::warn!(kind = e.kind(), error = %e, "unreadable repository entry");
            }
        }
    }

    summary
}

/// `atlas validate`. Returns the number of failed entries.
pub async fn run_validate(config: &Config) -> Result<usize> {
    let repository = SchemaRepository::new(config.schemas_dir());
    let normalizer = DocumentNormalizer::new(&config.fetch)?;
    let summary = validate_repository(&repository, &normalizer, config.root()).await;
    println!(
        "validated {}: ok {}, failed {}",
        summary.processed, summary.ok, summary.failed
    );
    Ok(summary.failed)
}
