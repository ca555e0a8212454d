// SPDX-License-Identifier: GPL-3.0-or-later

//! Fingerprint-recognition service integration and audio I/O.
//!
//! This crate provides:
//! - An HTTP client for a fingerprint-matching service (one lookup per
//!   staged audio window)
//! - Decoding of fetched media into a mono sample buffer at a fixed rate
//! - WAV encoding of window samples into transient staging artifacts

pub mod client;
pub mod decode;
pub mod error;
pub mod staging;

pub use client::{RecognitionClient, TrackMatch};
pub use decode::decode_audio;
pub use error::{RecognitionError, Result};
