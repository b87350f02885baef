//! Snapshot-file source: re-reads a JSON array of entities on every fetch.
//!
//! Pairs with anything that periodically dumps cluster metrics to disk, e.g. a
//! cron job wrapping `kubectl get --raw /apis/metrics.k8s.io/...`. Quantity
//! strings (`250m`, `128Mi`) are accepted alongside plain numbers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{KloadError, Result};
use crate::source::{Entity, MetricsSource};

/// Reads `[{"name": ..., "cpu": ..., "cpu_limit": ..., ...}, ...]` from a file.
pub struct JsonFileSource {
    path: PathBuf,
    max_columns: usize,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl AsRef<Path>, max_columns: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_columns,
        }
    }

    /// Path being polled.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSource for JsonFileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch(&mut self) -> Result<Vec<Entity>> {
        let raw = fs::read_to_string(&self.path).map_err(|e| KloadError::io(&self.path, e))?;
        let entities: Vec<Entity> =
            serde_json::from_str(&raw).map_err(|e| KloadError::SourceUnavailable {
                source_name: self.name().to_string(),
                details: format!("{}: {e}", self.path.display()),
            })?;
        Ok(entities)
    }

    fn max_columns_hint(&self) -> usize {
        self.max_columns
    }
}
