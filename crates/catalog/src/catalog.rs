//! Ordered, deduplicated record of discovered photos
//!
//! Single writer (the scan/watch ingestion path), many readers. Readers
//! observe either the pre- or post-insertion state, never a partial one:
//! every operation takes the lock for its whole duration.

use crate::entry::{is_photo_path, PhotoEntry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Catalog query errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog holds no entries yet. Callers asking for a backlog
    /// treat this as "nothing to replay", not as a failure.
    #[error("catalog is empty")]
    Empty,
}

struct CatalogInner {
    /// Entries in catalog order: mtime-ascending from the bootstrap
    /// scan, append order afterwards. Never re-sorted.
    entries: Vec<Arc<PhotoEntry>>,
    /// Path index for O(1) duplicate detection.
    by_path: HashMap<PathBuf, Arc<PhotoEntry>>,
}

/// The authoritative set of known photos.
pub struct PhotoCatalog {
    inner: RwLock<CatalogInner>,
}

impl PhotoCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner {
                entries: Vec::new(),
                by_path: HashMap::new(),
            }),
        }
    }

    /// Record a discovered photo. Returns true when the entry is new.
    ///
    /// Paths that are already present or do not carry a recognized photo
    /// extension are skipped and reported as not new.
    pub fn ingest(&self, entry: Arc<PhotoEntry>) -> bool {
        if !is_photo_path(entry.path()) {
            return false;
        }

        let mut inner = self.inner.write();
        if inner.by_path.contains_key(entry.path()) {
            debug!("Skip adding photo at {}: already registered", entry);
            return false;
        }

        inner
            .by_path
            .insert(entry.path().to_path_buf(), entry.clone());
        inner.entries.push(entry.clone());
        info!("Add new photo at {}", entry);
        true
    }

    /// The last `n` entries in catalog order, most recently appended
    /// last. Returns fewer than `n` when the catalog is smaller, and
    /// `CatalogError::Empty` when there is nothing at all to return.
    pub fn recent(&self, n: usize) -> Result<Vec<Arc<PhotoEntry>>, CatalogError> {
        let inner = self.inner.read();
        if inner.entries.is_empty() && n > 0 {
            return Err(CatalogError::Empty);
        }

        let start = inner.entries.len().saturating_sub(n);
        Ok(inner.entries[start..].to_vec())
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl Default for PhotoCatalog {
    fn default() -> Self {
        Self::new()
    }
}
