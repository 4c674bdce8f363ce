//! Live folder watching
//!
//! Bridges notify create events into catalog ingestion. Newly ingested
//! entries go out on an unbounded channel, so the watcher never waits on
//! whoever consumes them.

use anyhow::{Context, Result};
use catalog::{PhotoCatalog, PhotoEntry};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Watches one photo folder for newly created files.
pub struct FolderWatcher {
    folder: PathBuf,
    catalog: Arc<PhotoCatalog>,
    new_photos: mpsc::UnboundedSender<Arc<PhotoEntry>>,
}

impl FolderWatcher {
    pub fn new(
        folder: PathBuf,
        catalog: Arc<PhotoCatalog>,
        new_photos: mpsc::UnboundedSender<Arc<PhotoEntry>>,
    ) -> Self {
        Self {
            folder,
            catalog,
            new_photos,
        }
    }

    /// Watch the folder until the event stream ends.
    ///
    /// Per-event failures (a file deleted before it could be stat'ed, a
    /// transient watch error) are logged and skipped; only a failure to
    /// establish the watch at all is returned.
    pub async fn run(self) -> Result<()> {
        let folder = self
            .folder
            .canonicalize()
            .with_context(|| format!("Failed to resolve photo folder {}", self.folder.display()))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut fs_watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| {
                // Runs on notify's own thread; never block it.
                let _ = tx.send(result);
            })
            .context("Failed to create filesystem watcher")?;
        fs_watcher
            .watch(&folder, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch photo folder {}", folder.display()))?;

        info!("Starting to watch for new photos in {}", folder.display());

        while let Some(result) = rx.recv().await {
            match result {
                Ok(event) => self.handle_event(event),
                Err(e) => warn!("File watcher error: {}", e),
            }
        }

        Ok(())
    }

    fn handle_event(&self, event: Event) {
        if !matches!(event.kind, EventKind::Create(_)) {
            return;
        }
        for path in &event.paths {
            self.handle_created(path);
        }
    }

    /// Ingest one newly created path and announce it if it is new.
    fn handle_created(&self, path: &Path) {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to get file info for {}: {}", path.display(), e);
                return;
            }
        };
        if !metadata.is_file() {
            return;
        }
        let mod_time = match metadata.modified() {
            Ok(mod_time) => mod_time,
            Err(e) => {
                warn!("No modification time for {}: {}", path.display(), e);
                return;
            }
        };

        let entry = Arc::new(PhotoEntry::new(path.to_path_buf(), mod_time));
        if self.catalog.ingest(entry.clone()) {
            // Receiver gone means shutdown; nothing left to announce to.
            let _ = self.new_photos.send(entry);
        } else {
            debug!("Ignoring {}: duplicate or not a photo", path.display());
        }
    }
}
