// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecognitionError>;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    #[error("Empty staging artifact: {0}")]
    EmptyArtifact(String),

    #[error("Recognition service error: {0}")]
    ServiceError(String),

    #[error("Invalid response from recognition service: {0}")]
    InvalidResponse(String),

    #[error("Staging I/O error: {0}")]
    StagingIo(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
