// SPDX-License-Identifier: GPL-3.0-or-later

//! The chunked recognition pipeline: windowing and scheduling, per-window
//! retry and cleanup, deduplication against the persisted ledger, and the
//! periodic resource-reclamation cadence that keeps a long-running loop
//! stable.

pub mod chunk;
pub mod pipeline;
pub mod retry;
pub mod sources;

pub use chunk::ChunkProcessor;
pub use pipeline::PipelineDriver;
pub use retry::RetryPolicy;
pub use sources::SourceIterator;
