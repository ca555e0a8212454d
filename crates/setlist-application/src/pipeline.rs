// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use setlist_domain::{plan_windows, AudioTrack, Ledger, LedgerEntry, PipelineState, TARGET_SAMPLE_RATE};
use setlist_infrastructure::LedgerStore;
use setlist_recognition::decode_audio;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::ChunkProcessor;

const RECLAIM_PAUSE: Duration = Duration::from_millis(500);

/// Drives one track through the windowed recognition loop.
///
/// Windows are processed strictly sequentially in time order. Each
/// successful recognition is appended to the ledger and flushed
/// immediately, so partial progress survives a crash.
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    processor: ChunkProcessor,
    store: LedgerStore,
    reclaim_every_windows: usize,
    reclaim_after: Duration,
}

impl PipelineDriver {
    pub fn new(
        processor: ChunkProcessor,
        store: LedgerStore,
        reclaim_every_windows: usize,
        reclaim_after: Duration,
    ) -> Self {
        Self {
            processor,
            store,
            reclaim_every_windows: reclaim_every_windows.max(1),
            reclaim_after,
        }
    }

    /// Decode a fetched audio artifact and run the window loop over it.
    ///
    /// Decode failure (including an empty decoded buffer) is fatal for this
    /// track only; it is not retried.
    pub async fn run_file(
        &self,
        audio_path: &Path,
        source: &str,
        ledger: &mut Ledger,
        state: &PipelineState,
    ) -> Result<Vec<LedgerEntry>> {
        let path = audio_path.to_path_buf();
        let decoded =
            tokio::task::spawn_blocking(move || decode_audio(&path, TARGET_SAMPLE_RATE))
                .await
                .context("decode task panicked")?;

        let track = match decoded {
            Ok(track) => track,
            Err(e) => {
                self.reclaim().await;
                return Err(e).context("failed to decode audio");
            }
        };

        self.run_track(&track, source, ledger, state).await
    }

    /// Run the window loop over an already-decoded track.
    pub async fn run_track(
        &self,
        track: &AudioTrack,
        source: &str,
        ledger: &mut Ledger,
        state: &PipelineState,
    ) -> Result<Vec<LedgerEntry>> {
        let duration = track.duration_secs();
        let windows = plan_windows(duration);

        info!(
            target: "pipeline",
            "processing {:.0}m {:.0}s audio in {} windows",
            (duration / 60.0).floor(),
            duration % 60.0,
            windows.len()
        );

        let mut results = Vec::new();
        let mut last_reclaim = Instant::now();

        for (i, window) in windows.iter().enumerate() {
            if !state.is_active() {
                info!(target: "pipeline", "shutdown requested, stopping after window {}", i);
                break;
            }

            // Bounds peak memory growth across very long tracks; does not
            // affect recognition outcomes.
            if i % self.reclaim_every_windows == 0 || last_reclaim.elapsed() > self.reclaim_after {
                self.reclaim().await;
                last_reclaim = Instant::now();
            }

            info!(target: "pipeline", "scanning window {}", window);

            if let Some(entry) = self
                .processor
                .process(track, *window, source, ledger, state)
                .await
            {
                info!(target: "pipeline", "recognized {} - {} at {}", entry.artist, entry.title, window);
                results.push(entry.clone());
                ledger.append(entry);
                self.store.flush(ledger, state);
            }
        }

        self.reclaim().await;
        Ok(results)
    }

    /// Explicit resource-reclamation point: yield to the runtime and pause
    /// briefly so decoder and transport buffers can be released.
    async fn reclaim(&self) {
        debug!(target: "pipeline", "reclaiming resources");
        tokio::task::yield_now().await;
        sleep(RECLAIM_PAUSE).await;
    }
}
