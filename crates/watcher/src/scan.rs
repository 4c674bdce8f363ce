//! One-shot bootstrap scan of the photo folder

use anyhow::{Context, Result};
use catalog::{PhotoCatalog, PhotoEntry};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Enumerate the photo folder once and ingest every regular file,
/// oldest modification time first.
///
/// This establishes the catalog's ordering baseline; everything the live
/// watcher appends later follows it. Returns the number of entries that
/// were actually new. A folder that cannot be read is an error the
/// caller must treat as fatal: without a baseline the service would
/// start in an undefined state.
pub fn scan_folder(folder: &Path, catalog: &PhotoCatalog) -> Result<usize> {
    info!("Start scanning photo folder at {}", folder.display());

    let dir = fs::read_dir(folder)
        .with_context(|| format!("Failed to read photo folder {}", folder.display()))?;

    let mut found = Vec::new();
    for dirent in dir {
        let dirent = dirent
            .with_context(|| format!("Failed to enumerate photo folder {}", folder.display()))?;
        let path = dirent.path();

        // A file can vanish between listing and stat; that loses one
        // entry, not the whole scan.
        let metadata = match dirent.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {}: failed to stat: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let mod_time = match metadata.modified() {
            Ok(mod_time) => mod_time,
            Err(e) => {
                warn!("Skipping {}: no modification time: {}", path.display(), e);
                continue;
            }
        };

        found.push(PhotoEntry::new(path, mod_time));
    }

    found.sort_by_key(|entry| entry.mod_time());

    let mut added = 0;
    for entry in found {
        if catalog.ingest(Arc::new(entry)) {
            added += 1;
        }
    }

    info!(
        "Finished scanning photo folder at {} ({} new photos)",
        folder.display(),
        added
    );
    Ok(added)
}
