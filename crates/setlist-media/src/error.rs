// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to spawn fetch command: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("fetch command failed: {0}")]
    CommandFailed(String),

    #[error("fetched artifact missing at {0}")]
    MissingArtifact(String),

    #[error("collection has no members: {0}")]
    EmptyCollection(String),
}
