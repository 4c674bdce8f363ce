//! The photo entry value type

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// File extensions recognized as photos, matched case-insensitively.
const PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Check whether a path looks like a photo file.
pub fn is_photo_path(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => PHOTO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// One discovered photo: its path (the identity) and modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoEntry {
    path: PathBuf,
    mod_time: SystemTime,
}

/// Wire form of a photo notification.
#[derive(Serialize)]
struct WirePhoto<'a> {
    path: &'a Path,
    mod_time_ms: u64,
}

impl PhotoEntry {
    pub fn new(path: PathBuf, mod_time: SystemTime) -> Self {
        Self { path, mod_time }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mod_time(&self) -> SystemTime {
        self.mod_time
    }

    /// Modification time as milliseconds since the Unix epoch. Times
    /// before the epoch clamp to zero.
    pub fn mod_time_ms(&self) -> u64 {
        self.mod_time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    /// Serialize the entry into the JSON message sent to subscribers.
    ///
    /// Fails only when the path is not valid UTF-8.
    pub fn wire_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&WirePhoto {
            path: &self.path,
            mod_time_ms: self.mod_time_ms(),
        })
    }
}

impl std::fmt::Display for PhotoEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
