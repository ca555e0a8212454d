// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::{MediaError, Result};

const AUDIO_FILENAME: &str = "audio.wav";

/// True when a reference points at an ordered collection rather than a
/// single item.
pub fn is_collection(reference: &str) -> bool {
    reference.to_lowercase().contains("list=")
}

/// Fetches remote media through an external `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    yt_dlp: PathBuf,
    work_dir: PathBuf,
}

impl MediaFetcher {
    pub fn new(yt_dlp: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp: yt_dlp.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Path the fetched audio artifact lands at.
    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(AUDIO_FILENAME)
    }

    /// Fetch one media reference as a WAV artifact and return its path.
    ///
    /// Forces single-item extraction even when the reference carries
    /// collection markers. A pre-existing artifact at the target path is
    /// removed first.
    pub async fn fetch(&self, reference: &str) -> Result<PathBuf> {
        let artifact = self.artifact_path();
        if artifact.exists() {
            let _ = std::fs::remove_file(&artifact);
        }

        info!(target: "media", "fetching: {}", reference);

        let output = Command::new(&self.yt_dlp)
            .args(fetch_args(&artifact, reference))
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        if !artifact.exists() {
            return Err(MediaError::MissingArtifact(artifact.display().to_string()));
        }

        debug!(target: "media", "fetched artifact at {}", artifact.display());
        Ok(artifact)
    }

    /// Resolve a collection reference into its ordered member references
    /// without downloading any media.
    pub async fn resolve_collection(&self, reference: &str) -> Result<Vec<String>> {
        info!(target: "media", "resolving collection: {}", reference);

        let output = Command::new(&self.yt_dlp)
            .args(resolve_args(reference))
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let members: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if members.is_empty() {
            return Err(MediaError::EmptyCollection(reference.to_string()));
        }

        debug!(target: "media", "collection has {} members", members.len());
        Ok(members)
    }
}

fn fetch_args(artifact: &Path, reference: &str) -> Vec<String> {
    vec![
        "-f".to_string(),
        "bestaudio/best".to_string(),
        "-x".to_string(),
        "--audio-format".to_string(),
        "wav".to_string(),
        "--no-playlist".to_string(),
        "--retries".to_string(),
        "3".to_string(),
        "-o".to_string(),
        artifact.display().to_string(),
        reference.to_string(),
    ]
}

fn resolve_args(reference: &str) -> Vec<String> {
    vec![
        "--flat-playlist".to_string(),
        "--print".to_string(),
        "url".to_string(),
        reference.to_string(),
    ]
}
