//! Schema repository: one canonical document per `(identity, version)`.
//!
//! Layout on disk:
//!
//! ```text
//! schemas/
//!   <sanitized-identity>/
//!     <sanitized-version>.json
//! ```
//!
//! Writes overwrite in place; nothing is ever deleted by the harvester.
//! [`SchemaRepository::walk`] returns a fresh lazy iterator on every call,
//! sorted by path so catalog output is deterministic.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{HarvestError, HarvestResult};
use crate::models::{NormalizedSchema, RepositoryEntry};

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// `.` and `..` are additionally rewritten so a sanitized component can
/// never name the current or parent directory.
pub fn slug(raw: &str) -> String {
    let out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match out.as_str() {
        "" => "_".to_string(),
        "." | ".." => out.replace('.', "_"),
        _ => out,
    }
}

#[derive(Debug, Clone)]
pub struct SchemaRepository {
    root: PathBuf,
}

impl SchemaRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage path for a key, after sanitization.
    pub fn path_for(&self, identity: &str, version: &str) -> PathBuf {
        self.root
            .join(slug(identity))
            .join(format!("{}.json", slug(version)))
    }

    /// Write (or overwrite) the canonical document for a key.
    pub fn put(
        &self,
        identity: &str,
        version: &str,
        schema: &NormalizedSchema,
    ) -> HarvestResult<PathBuf> {
        let path = self.path_for(identity, version);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HarvestError::Internal(format!("creating {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(&path, schema.to_canonical_json())
            .map_err(|e| HarvestError::Internal(format!("writing {}: {}", path.display(), e)))?;
        Ok(path)
    }

    /// Lazily walk every `*.json` entry. A missing root yields nothing.
    ///
    /// Entries that cannot be read or parsed are yielded as errors so callers
    /// can skip them without abandoning the walk.
    pub fn walk(&self) -> impl Iterator<Item = HarvestResult<RepositoryEntry>> {
        let exists = self.root.is_dir();
        let walker = WalkDir::new(&self.root).min_depth(1).sort_by_file_name();
        walker
            .into_iter()
            .filter(move |_| exists)
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let is_json = entry.file_type().is_file()
                        && entry.path().extension().and_then(|e| e.to_str()) == Some("json");
                    if is_json {
                        Some(read_entry(entry.path()))
                    } else {
                        None
                    }
                }
                Err(e) => Some(Err(HarvestError::Internal(e.to_string()))),
            })
    }

    /// Number of stored documents (parseable or not).
    pub fn count(&self) -> usize {
        self.walk().count()
    }
}

fn read_entry(path: &Path) -> HarvestResult<RepositoryEntry> {
    let id = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let version = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let content = std::fs::read_to_string(path)
        .map_err(|e| HarvestError::Internal(format!("reading {}: {}", path.display(), e)))?;
    let document = serde_json::from_str(&content).map_err(|e| {
        HarvestError::Validation(format!("{} is not valid JSON: {}", path.display(), e))
    })?;

    Ok(RepositoryEntry {
        id,
        version,
        path: path.to_path_buf(),
        document,
    })
}
