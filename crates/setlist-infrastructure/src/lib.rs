// SPDX-License-Identifier: GPL-3.0-or-later

//! Durable ledger persistence.
//!
//! The ledger lives in a single JSON file: an ordered array of field-tagged
//! records, human-inspectable, loaded wholesale at startup and overwritten
//! on every flush. Persistence is best-effort and never fatal to a run.

use std::path::{Path, PathBuf};

use setlist_domain::{Ledger, PipelineState};
use tracing::{info, warn};

/// File-backed store for the recognition ledger.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted ledger.
    ///
    /// Absence of a persisted ledger is not an error. Any read or parse
    /// failure is logged and yields an empty ledger; the caller proceeds
    /// unpersisted rather than failing the run.
    pub fn load(&self) -> Ledger {
        if !self.path.exists() {
            return Ledger::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<Ledger>(&contents) {
                Ok(ledger) => {
                    info!(
                        target: "ledger",
                        "loaded {} previously recognized songs",
                        ledger.len()
                    );
                    ledger
                }
                Err(e) => {
                    warn!(target: "ledger", "could not parse ledger file: {}", e);
                    Ledger::new()
                }
            },
            Err(e) => {
                warn!(target: "ledger", "could not read ledger file: {}", e);
                Ledger::new()
            }
        }
    }

    /// Durably persist the full ledger, overwriting any prior copy.
    ///
    /// No-op once the pipeline state is inactive. Write failures are
    /// logged and swallowed.
    pub fn flush(&self, ledger: &Ledger, state: &PipelineState) {
        if !state.is_active() {
            return;
        }

        let serialized = match serde_json::to_string_pretty(ledger) {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "ledger", "could not serialize ledger: {}", e);
                return;
            }
        };

        if let Err(e) = std::fs::write(&self.path, serialized) {
            warn!(target: "ledger", "could not save ledger: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use setlist_domain::LedgerEntry;

    fn entry(artist: &str, title: &str) -> LedgerEntry {
        LedgerEntry {
            artist: artist.to_string(),
            title: title.to_string(),
            timestamp: 42.0,
            recognized_at: Utc::now(),
            source: "https://example.com/v".to_string(),
            window_start: 60.0,
            window_end: 120.0,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("songs.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = LedgerStore::new(path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_flush_load_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("songs.json"));
        let state = PipelineState::new();

        let mut ledger = Ledger::new();
        ledger.append(entry("B Artist", "Second"));
        ledger.append(entry("A Artist", "First"));
        store.flush(&ledger, &state);

        let reloaded = store.load();
        assert_eq!(reloaded, ledger);

        // flush(load(flush(L))) is idempotent.
        store.flush(&reloaded, &state);
        assert_eq!(store.load(), ledger);
    }

    #[test]
    fn test_flush_is_noop_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let store = LedgerStore::new(&path);
        let state = PipelineState::new();
        state.shutdown();

        let mut ledger = Ledger::new();
        ledger.append(entry("A", "B"));
        store.flush(&ledger, &state);

        assert!(!path.exists());
    }

    #[test]
    fn test_flush_failure_is_swallowed() {
        let store = LedgerStore::new("/nonexistent-dir/songs.json");
        let state = PipelineState::new();
        let mut ledger = Ledger::new();
        ledger.append(entry("A", "B"));
        // Must not panic or return an error.
        store.flush(&ledger, &state);
    }

    #[test]
    fn test_persisted_format_is_field_tagged_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let store = LedgerStore::new(&path);

        let mut ledger = Ledger::new();
        ledger.append(entry("Radiohead", "Lucky"));
        store.flush(&ledger, &PipelineState::new());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"artist\": \"Radiohead\""));
        assert!(raw.contains("\"window_start\""));
        assert!(raw.trim_start().starts_with('['));
    }
}
