//! Bounded, persisted history of report outcomes
//!
//! Entries are kept most-recent-first and capped (50 by default). The whole
//! list is rewritten as a JSON array on every change. Before each append the
//! file is re-read, so a `taprelay clear-logs` run from another process is
//! not undone by the daemon's next write.

use crate::error::LogStoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default number of retained entries
pub const DEFAULT_CAPACITY: usize = 50;

/// Timestamp layout used for entries, e.g. "Nov 12 04:12:01"
const TIMESTAMP_FORMAT: &str = "%b %d %H:%M:%S";

/// One finalized report outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    /// Backend HTTP outcome or local failure tag
    pub status: String,
    pub notification_text: String,
    pub contract_address: String,
    pub extraction_status: String,
    /// Backend response body or error text
    pub response: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time
    pub fn now(
        status: impl Into<String>,
        notification_text: impl Into<String>,
        contract_address: impl Into<String>,
        extraction_status: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            status: status.into(),
            notification_text: notification_text.into(),
            contract_address: contract_address.into(),
            extraction_status: extraction_status.into(),
            response: response.into(),
        }
    }
}

/// Most-recent-first ring of log entries
pub struct LogStore {
    path: Option<PathBuf>,
    capacity: usize,
    entries: Mutex<Vec<LogEntry>>,
}

impl LogStore {
    /// Open a file-backed store, loading whatever is already persisted.
    ///
    /// A corrupt file is logged and treated as empty; it is replaced on the
    /// next write.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, LogStoreError> {
        let path = path.into();
        let capacity = capacity.max(1);

        let mut entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(LogStoreError::Json(e)) => {
                tracing::error!("Ignoring corrupt log file {:?}: {}", path, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        entries.truncate(capacity);

        tracing::debug!(
            "Loaded {} log entries from {:?}",
            entries.len(),
            path
        );

        Ok(Self {
            path: Some(path),
            capacity,
            entries: Mutex::new(entries),
        })
    }

    /// A store that never touches disk
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            capacity: capacity.max(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Prepend an entry, evict beyond capacity, persist the full list
    pub fn append(&self, entry: LogEntry) -> Result<(), LogStoreError> {
        let mut entries = self.lock();

        if let Some(ref path) = self.path {
            match read_entries(path) {
                Ok(on_disk) => *entries = on_disk,
                Err(e) => tracing::warn!("Using in-memory log entries, reload failed: {}", e),
            }
        }

        entries.insert(0, entry);
        entries.truncate(self.capacity);

        match self.path {
            Some(ref path) => write_entries(path, &entries),
            None => Ok(()),
        }
    }

    /// All entries, most recent first
    pub fn load_all(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry and persist the empty list
    pub fn clear(&self) -> Result<(), LogStoreError> {
        let mut entries = self.lock();
        entries.clear();

        match self.path {
            Some(ref path) => write_entries(path, &entries),
            None => Ok(()),
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<LogEntry>, LogStoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(path)?;
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&json)?)
}

fn write_entries(path: &Path, entries: &[LogEntry]) -> Result<(), LogStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Write then rename so readers never see a half-written file
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;

    tracing::trace!("Persisted {} log entries to {:?}", entries.len(), path);
    Ok(())
}
