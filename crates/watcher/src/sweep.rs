//! Periodic sweep for missed filesystem events
//!
//! Re-enumerates the photo folder on an interval and ingests anything
//! the live watcher missed (event queue overflow, races around watch
//! setup). The catalog's dedup makes the sweep safe to run alongside
//! the watcher.

use anyhow::Result;
use catalog::{PhotoCatalog, PhotoEntry};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodic photo folder sweep
pub struct PeriodicSweep {
    folder: PathBuf,
    interval: Duration,
    catalog: Arc<PhotoCatalog>,
    new_photos: mpsc::UnboundedSender<Arc<PhotoEntry>>,
}

impl PeriodicSweep {
    pub fn new(
        folder: PathBuf,
        interval: Duration,
        catalog: Arc<PhotoCatalog>,
        new_photos: mpsc::UnboundedSender<Arc<PhotoEntry>>,
    ) -> Self {
        Self {
            folder,
            interval,
            catalog,
            new_photos,
        }
    }

    /// Run the sweep loop indefinitely. Scan failures are logged and the
    /// loop continues; a transient failure here must not take down the
    /// service the way a failed bootstrap scan does.
    pub async fn run(self) -> Result<()> {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the bootstrap scan
        // already covered that ground.
        timer.tick().await;

        info!("Starting periodic photo sweep (interval: {:?})", self.interval);

        loop {
            timer.tick().await;

            match self.sweep() {
                Ok(0) => debug!("Periodic sweep: no missed photos"),
                Ok(found) => info!("Periodic sweep found {} missed photos", found),
                Err(e) => warn!("Periodic sweep failed: {}", e),
            }
        }
    }

    /// Scan the folder once, ingesting and announcing anything new.
    fn sweep(&self) -> Result<usize> {
        let mut found = 0;

        for dirent in fs::read_dir(&self.folder)? {
            let dirent = dirent?;
            let metadata = match dirent.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Sweep skipping {}: {}", dirent.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let mod_time = match metadata.modified() {
                Ok(mod_time) => mod_time,
                Err(e) => {
                    warn!("Sweep skipping {}: {}", dirent.path().display(), e);
                    continue;
                }
            };

            let entry = Arc::new(PhotoEntry::new(dirent.path(), mod_time));
            if self.catalog.ingest(entry.clone()) {
                found += 1;
                let _ = self.new_photos.send(entry);
            }
        }

        Ok(found)
    }
}
