//! Photo folder watching for Photobeam
//!
//! This crate bridges the filesystem into the photo catalog:
//! - One-shot bootstrap scan, oldest modification time first
//! - Live create-event watching via notify
//! - Periodic sweep for events the live watcher missed
//!
//! All three feed the same ingestion path; newly ingested entries are
//! pushed into an unbounded channel so downstream consumers can never
//! stall discovery.

pub mod scan;
pub mod sweep;
pub mod watch;

pub use scan::scan_folder;
pub use sweep::PeriodicSweep;
pub use watch::FolderWatcher;
