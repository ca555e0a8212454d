// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fixed recognition window length in seconds.
pub const WINDOW_SECS: f64 = 60.0;

/// Target sample rate for decoded audio (mono).
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

// ============================================================================
// Ledger
// ============================================================================

/// One recognized segment of a source track.
///
/// Immutable once created. Identity for deduplication is
/// (artist lower-cased, title lower-cased, source), compared exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub artist: String,
    pub title: String,
    /// Offset into the source track (seconds) where the service matched.
    pub timestamp: f64,
    /// Wall-clock time of recognition.
    pub recognized_at: DateTime<Utc>,
    /// Source identifier, e.g. the originating URL.
    pub source: String,
    /// Start of the recognized window (seconds).
    pub window_start: f64,
    /// End of the recognized window (seconds).
    pub window_end: f64,
}

/// Ordered, deduplicated record of all recognized segments.
///
/// Insertion order is preserved; no two entries share the same
/// deduplication tuple. Mutated only by appending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Case-insensitive comparison of artist and title, exact comparison of
    /// source. Linear scan; expected ledger sizes are small.
    pub fn is_duplicate(&self, artist: &str, title: &str, source: &str) -> bool {
        let artist = artist.to_lowercase();
        let title = title.to_lowercase();
        self.entries.iter().any(|e| {
            e.artist.to_lowercase() == artist
                && e.title.to_lowercase() == title
                && e.source == source
        })
    }

    /// Append an entry. The caller must have already checked
    /// [`Ledger::is_duplicate`]; the ledger does not re-check.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }
}

// ============================================================================
// Audio
// ============================================================================

/// Decoded sample buffer for one source item: mono PCM at a fixed rate.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioTrack {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples covered by a window, clipped to the buffer.
    pub fn window_samples(&self, window: &Window) -> &[i16] {
        let start = (window.start * self.sample_rate as f64) as usize;
        let end = ((window.end * self.sample_rate as f64) as usize).min(self.samples.len());
        &self.samples[start.min(end)..end]
    }
}

/// Half-open time interval [start, end) over an [`AudioTrack`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    /// Window label used for staging-artifact names, e.g. `chunk_120`.
    pub fn label(&self) -> String {
        format!("chunk_{}", self.start as u64)
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{:02}-{}:{:02}",
            (self.start / 60.0) as u64,
            (self.start % 60.0) as u64,
            (self.end / 60.0) as u64,
            (self.end % 60.0) as u64
        )
    }
}

/// Partition a track duration into fixed-length windows in strictly
/// increasing time order. The last window is clipped to the actual duration.
pub fn plan_windows(duration_secs: f64) -> Vec<Window> {
    if duration_secs <= 0.0 {
        return Vec::new();
    }
    let count = (duration_secs / WINDOW_SECS).ceil() as usize;
    (0..count)
        .map(|i| Window {
            start: i as f64 * WINDOW_SECS,
            end: ((i + 1) as f64 * WINDOW_SECS).min(duration_secs),
        })
        .collect()
}

// ============================================================================
// Pipeline state
// ============================================================================

/// Cooperative cancellation token shared by every long-running component.
///
/// Flipped inactive exactly once, at shutdown, and never reset. Components
/// check it at the top of per-track and per-window loop bodies and cease
/// issuing new work; in-flight I/O completes but its result is discarded.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    shutdown: Arc<AtomicBool>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(artist: &str, title: &str, source: &str) -> LedgerEntry {
        LedgerEntry {
            artist: artist.to_string(),
            title: title.to_string(),
            timestamp: 12.5,
            recognized_at: Utc::now(),
            source: source.to_string(),
            window_start: 0.0,
            window_end: 60.0,
        }
    }

    #[test]
    fn test_plan_windows_exact_multiple() {
        let windows = plan_windows(120.0);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0], Window { start: 0.0, end: 60.0 });
        assert_eq!(windows[1], Window { start: 60.0, end: 120.0 });
    }

    #[test]
    fn test_plan_windows_clips_last() {
        // 150s track -> [0,60), [60,120), [120,150)
        let windows = plan_windows(150.0);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2], Window { start: 120.0, end: 150.0 });
    }

    #[test]
    fn test_plan_windows_count_is_ceiling() {
        assert_eq!(plan_windows(60.0).len(), 1);
        assert_eq!(plan_windows(60.1).len(), 2);
        assert_eq!(plan_windows(1.0).len(), 1);
        assert!(plan_windows(0.0).is_empty());
    }

    #[test]
    fn test_plan_windows_never_exceed_duration() {
        let duration = 361.7;
        let windows = plan_windows(duration);
        assert_eq!(windows.last().unwrap().end, duration);
        for w in &windows {
            assert!(w.end <= duration);
            assert!(w.start < w.end);
        }
    }

    #[test]
    fn test_window_display() {
        let w = Window { start: 60.0, end: 120.0 };
        assert_eq!(w.to_string(), "1:00-2:00");
        let w = Window { start: 120.0, end: 150.0 };
        assert_eq!(w.to_string(), "2:00-2:30");
    }

    #[test]
    fn test_window_label() {
        assert_eq!(Window { start: 120.0, end: 150.0 }.label(), "chunk_120");
    }

    #[test]
    fn test_duplicate_is_case_insensitive_on_artist_title() {
        let mut ledger = Ledger::new();
        ledger.append(entry("A", "B", "S"));
        assert!(ledger.is_duplicate("a", "b", "S"));
        assert!(ledger.is_duplicate("A", "B", "S"));
    }

    #[test]
    fn test_duplicate_source_is_exact() {
        let mut ledger = Ledger::new();
        ledger.append(entry("A", "B", "S"));
        // Same song under a different source is not a duplicate.
        assert!(!ledger.is_duplicate("a", "b", "S2"));
        assert!(!ledger.is_duplicate("a", "b", "s"));
    }

    #[test]
    fn test_ledger_preserves_insertion_order() {
        let mut ledger = Ledger::new();
        ledger.append(entry("First", "One", "S"));
        ledger.append(entry("Second", "Two", "S"));
        let artists: Vec<_> = ledger.entries().iter().map(|e| e.artist.as_str()).collect();
        assert_eq!(artists, vec!["First", "Second"]);
    }

    #[test]
    fn test_track_window_samples() {
        let track = AudioTrack::new(vec![0i16; 150 * 100], 100);
        assert_eq!(track.duration_secs(), 150.0);
        let windows = plan_windows(track.duration_secs());
        assert_eq!(track.window_samples(&windows[0]).len(), 6_000);
        assert_eq!(track.window_samples(&windows[2]).len(), 3_000);
    }

    #[test]
    fn test_pipeline_state_shutdown_is_sticky() {
        let state = PipelineState::new();
        assert!(state.is_active());
        let clone = state.clone();
        clone.shutdown();
        assert!(!state.is_active());
    }
}
