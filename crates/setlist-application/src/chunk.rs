// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use chrono::Utc;
use setlist_domain::{AudioTrack, Ledger, LedgerEntry, PipelineState, Window};
use setlist_recognition::{staging, RecognitionClient};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::RetryPolicy;

/// Processes one audio window: stage, recognize, dedup-check, clean up.
///
/// The staging artifact is removed after every attempt on every exit path.
/// The processor never mutates the ledger; the caller decides whether to
/// append a returned entry.
#[derive(Debug, Clone)]
pub struct ChunkProcessor {
    client: RecognitionClient,
    work_dir: PathBuf,
    retry: RetryPolicy,
}

impl ChunkProcessor {
    pub fn new(client: RecognitionClient, work_dir: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            client,
            work_dir: work_dir.into(),
            retry,
        }
    }

    /// Process one window against `source`, returning a new ledger entry on
    /// a non-duplicate recognition and `None` otherwise.
    pub async fn process(
        &self,
        track: &AudioTrack,
        window: Window,
        source: &str,
        ledger: &Ledger,
        state: &PipelineState,
    ) -> Option<LedgerEntry> {
        let artifact = staging::artifact_path(&self.work_dir, &window);

        for attempt in 1..=self.retry.max_attempts {
            let outcome = self.attempt(track, window, source, ledger, state).await;
            staging::remove_artifact(&artifact);

            match outcome {
                Ok(result) => return result,
                Err(e) => {
                    if attempt == self.retry.max_attempts {
                        warn!(target: "pipeline", "window {} failed: {}", window, e);
                    } else {
                        debug!(target: "pipeline", "window {} attempt {} failed: {}", window, attempt, e);
                        sleep(self.retry.pause).await;
                    }
                }
            }
        }

        None
    }

    /// One staging-and-recognition attempt. The caller removes the staging
    /// artifact regardless of how this returns.
    async fn attempt(
        &self,
        track: &AudioTrack,
        window: Window,
        source: &str,
        ledger: &Ledger,
        state: &PipelineState,
    ) -> setlist_recognition::Result<Option<LedgerEntry>> {
        if !state.is_active() {
            return Ok(None);
        }

        let artifact = staging::artifact_path(&self.work_dir, &window);
        staging::write_artifact(&artifact, track.window_samples(&window), track.sample_rate)?;

        let size = std::fs::metadata(&artifact)?.len();
        if size == 0 {
            return Err(setlist_recognition::RecognitionError::EmptyArtifact(
                artifact.display().to_string(),
            ));
        }

        let Some(found) = self.client.identify(&artifact).await? else {
            return Ok(None);
        };

        // A result for an in-flight lookup is discarded once shutdown begins.
        if !state.is_active() {
            return Ok(None);
        }

        if ledger.is_duplicate(&found.artist, &found.title, source) {
            debug!(
                target: "pipeline",
                "duplicate suppressed: {} - {} ({})",
                found.artist, found.title, source
            );
            return Ok(None);
        }

        Ok(Some(LedgerEntry {
            timestamp: window.start + found.offset_secs,
            artist: found.artist,
            title: found.title,
            recognized_at: Utc::now(),
            source: source.to_string(),
            window_start: window.start,
            window_end: window.end,
        }))
    }
}
