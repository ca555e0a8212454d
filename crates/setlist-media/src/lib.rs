// SPDX-License-Identifier: GPL-3.0-or-later

//! Media fetch collaborator: resolves a media reference into a local audio
//! artifact (or a collection reference into its member references) by
//! driving an external `yt-dlp` binary, with inter-item pacing.

pub mod error;
pub mod fetcher;
pub mod pacing;

pub use error::{MediaError, Result};
pub use fetcher::{is_collection, MediaFetcher};
pub use pacing::RateLimiter;
