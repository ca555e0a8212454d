// SPDX-License-Identifier: GPL-3.0-or-later

//! Decode fetched media into a mono sample buffer at the target rate.
//!
//! Symphonia handles container probing and decoding; when the source rate
//! differs from the target, the buffer is resampled with rubato.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument};

use setlist_domain::AudioTrack;

use crate::{RecognitionError, Result};

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Decode an audio file into mono PCM at `target_rate`.
///
/// Empty decoded output is an error; the caller treats it as fatal for the
/// current track.
#[instrument(skip_all, fields(file = ?path.as_ref()))]
pub fn decode_audio<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<AudioTrack> {
    let path = path.as_ref();

    debug!(target: "recognition", "opening media for decode");
    let reader = File::open(path)
        .map_err(|e| RecognitionError::AudioProcessing(format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(reader), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| RecognitionError::AudioProcessing(format!("Failed to probe stream: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| RecognitionError::AudioProcessing("No audio tracks found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            RecognitionError::AudioProcessing(format!("Failed to create decoder: {}", e))
        })?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(target_rate);
    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => {
                return Err(RecognitionError::AudioProcessing(format!(
                    "Error reading packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| RecognitionError::AudioProcessing(format!("Failed to decode frame: {}", e)))?;

        match decoded {
            AudioBufferRef::F32(buf) => {
                let spec = buf.spec();
                if spec.rate > 0 {
                    sample_rate = spec.rate;
                }

                let channels = spec.channels.count().max(1);
                for frame_idx in 0..buf.frames() {
                    let mut mixed = 0.0f32;
                    for ch in 0..channels {
                        mixed += buf.chan(ch)[frame_idx];
                    }
                    mixed /= channels as f32;
                    let clipped = mixed.clamp(-1.0, 1.0);
                    samples.push((clipped * i16::MAX as f32) as i16);
                }
            }
            AudioBufferRef::S16(buf) => {
                let spec = buf.spec();
                if spec.rate > 0 {
                    sample_rate = spec.rate;
                }

                let channels = spec.channels.count().max(1);
                for frame_idx in 0..buf.frames() {
                    let mut mixed: i32 = 0;
                    for ch in 0..channels {
                        mixed += buf.chan(ch)[frame_idx] as i32;
                    }
                    mixed /= channels as i32;
                    samples.push(mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
                }
            }
            AudioBufferRef::S32(buf) => {
                let spec = buf.spec();
                if spec.rate > 0 {
                    sample_rate = spec.rate;
                }

                let channels = spec.channels.count().max(1);
                for frame_idx in 0..buf.frames() {
                    let mut mixed: f64 = 0.0;
                    for ch in 0..channels {
                        mixed += buf.chan(ch)[frame_idx] as f64;
                    }
                    mixed /= channels as f64;
                    let clipped = (mixed / i32::MAX as f64).clamp(-1.0, 1.0);
                    samples.push((clipped * i16::MAX as f64) as i16);
                }
            }
            _other => {
                return Err(RecognitionError::AudioProcessing(
                    "Unsupported sample format".to_string(),
                ));
            }
        }
    }

    if samples.is_empty() {
        return Err(RecognitionError::AudioProcessing(
            "Empty decoded audio".to_string(),
        ));
    }

    let samples = if sample_rate == target_rate {
        samples
    } else {
        debug!(
            target: "recognition",
            from = sample_rate,
            to = target_rate,
            "resampling decoded audio"
        );
        resample(&samples, sample_rate, target_rate)?
    };

    Ok(AudioTrack::new(samples, target_rate))
}

/// Resample a mono i16 buffer with a fixed-chunk FFT resampler.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Result<Vec<i16>> {
    let mono: Vec<f32> = samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect();

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLER_CHUNK_SIZE,
        1,
        1,
    )
    .map_err(|e| RecognitionError::AudioProcessing(format!("Failed to create resampler: {}", e)))?;

    let mut output = Vec::with_capacity(
        (mono.len() as f64 * to_rate as f64 / from_rate as f64) as usize,
    );
    let mut input_pos = 0;

    while input_pos + RESAMPLER_CHUNK_SIZE <= mono.len() {
        let chunk = &mono[input_pos..input_pos + RESAMPLER_CHUNK_SIZE];
        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| RecognitionError::AudioProcessing(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&resampled[0]);
        input_pos += RESAMPLER_CHUNK_SIZE;
    }

    // Final partial chunk: pad with zeros, keep only the samples that
    // correspond to real input.
    if input_pos < mono.len() {
        let remaining = mono.len() - input_pos;
        let mut last_chunk = vec![0.0f32; RESAMPLER_CHUNK_SIZE];
        last_chunk[..remaining].copy_from_slice(&mono[input_pos..]);
        let resampled = resampler
            .process(&[last_chunk.as_slice()], None)
            .map_err(|e| RecognitionError::AudioProcessing(format!("Resampling failed: {}", e)))?;
        let out_len = (remaining as f64 * to_rate as f64 / from_rate as f64) as usize;
        output.extend_from_slice(&resampled[0][..out_len.min(resampled[0].len())]);
    }

    Ok(output
        .into_iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_file() {
        let err = decode_audio("/nonexistent/audio.wav", 44_100).unwrap_err();
        assert!(matches!(err, RecognitionError::AudioProcessing(_)));
    }

    #[test]
    fn test_decode_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..44_100u32 {
            let t = i as f32 / 44_100.0;
            let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin();
            writer.write_sample((sample * 0.5 * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let track = decode_audio(&path, 44_100).unwrap();
        assert_eq!(track.sample_rate, 44_100);
        // One second of audio at the target rate.
        assert!((track.duration_secs() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![1000i16; 44_100];
        let out = resample(&samples, 44_100, 22_050).unwrap();
        let expected = 22_050.0;
        assert!((out.len() as f64 - expected).abs() < 256.0);
    }

    #[test]
    fn test_decode_empty_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();
        assert!(decode_audio(&path, 44_100).is_err());
    }
}
