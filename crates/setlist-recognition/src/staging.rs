// SPDX-License-Identifier: GPL-3.0-or-later

//! Transient staging artifacts: one WAV file per window, created solely to
//! satisfy the recognition service's file-backed input and deleted
//! immediately after use.

use std::path::{Path, PathBuf};

use setlist_domain::Window;
use tracing::trace;

use crate::Result;

/// Path of the staging artifact for a window, named by the window's start
/// offset to avoid collision between windows.
pub fn artifact_path(work_dir: &Path, window: &Window) -> PathBuf {
    work_dir.join(format!("{}.wav", window.label()))
}

/// Encode window samples as 16-bit mono PCM WAV at `path`.
pub fn write_artifact(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| crate::RecognitionError::AudioProcessing(e.to_string()))?;
    let mut writer16 = writer.get_i16_writer(samples.len() as u32);
    for &sample in samples {
        writer16.write_sample(sample);
    }
    writer16
        .flush()
        .map_err(|e| crate::RecognitionError::AudioProcessing(e.to_string()))?;
    writer
        .finalize()
        .map_err(|e| crate::RecognitionError::AudioProcessing(e.to_string()))?;

    trace!(target: "recognition", "staged {} samples at {}", samples.len(), path.display());
    Ok(())
}

/// Remove a staging artifact, ignoring a file that is already gone.
pub fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(target: "recognition", "failed to remove staging artifact {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_named_by_window_start() {
        let window = Window { start: 120.0, end: 150.0 };
        let path = artifact_path(Path::new("/tmp/work"), &window);
        assert_eq!(path, Path::new("/tmp/work/chunk_120.wav"));
    }

    #[test]
    fn test_write_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0.wav");
        let samples = vec![1i16, -2, 3, -4];

        write_artifact(&path, &samples, 44_100).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 44_100);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn test_remove_artifact_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_60.wav");
        std::fs::write(&path, b"data").unwrap();

        remove_artifact(&path);
        assert!(!path.exists());
        // Removing again must not panic.
        remove_artifact(&path);
    }
}
