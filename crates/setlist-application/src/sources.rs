// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use setlist_domain::{Ledger, PipelineState};
use setlist_infrastructure::LedgerStore;
use setlist_media::{is_collection, MediaFetcher, RateLimiter};
use tracing::{info, warn};

use crate::PipelineDriver;

/// Resolves a media reference into one or more tracks and feeds them to
/// the pipeline driver one at a time.
///
/// A collection member that fails to fetch is skipped with a logged
/// notice; remaining members are always attempted.
pub struct SourceIterator {
    fetcher: MediaFetcher,
    driver: PipelineDriver,
    pacing: RateLimiter,
}

impl SourceIterator {
    pub fn new(fetcher: MediaFetcher, driver: PipelineDriver, pacing: RateLimiter) -> Self {
        Self {
            fetcher,
            driver,
            pacing,
        }
    }

    /// Process a single reference or an ordered collection of references.
    pub async fn run(
        &self,
        reference: &str,
        ledger: &mut Ledger,
        store: &LedgerStore,
        state: &PipelineState,
    ) -> Result<()> {
        if is_collection(reference) {
            self.run_collection(reference, ledger, store, state).await
        } else {
            self.run_single(reference, ledger, state).await
        }
    }

    async fn run_single(
        &self,
        reference: &str,
        ledger: &mut Ledger,
        state: &PipelineState,
    ) -> Result<()> {
        let artifact = self
            .fetcher
            .fetch(reference)
            .await
            .context("failed to fetch media")?;

        let outcome = self
            .driver
            .run_file(&artifact, reference, ledger, state)
            .await;
        self.discard_artifact(&artifact);
        outcome.map(|_| ())
    }

    async fn run_collection(
        &self,
        reference: &str,
        ledger: &mut Ledger,
        store: &LedgerStore,
        state: &PipelineState,
    ) -> Result<()> {
        info!(target: "pipeline", "processing collection: {}", reference);

        let members = self
            .fetcher
            .resolve_collection(reference)
            .await
            .context("failed to resolve collection")?;
        info!(target: "pipeline", "found {} items in collection", members.len());

        for (i, member) in members.iter().enumerate() {
            if !state.is_active() {
                info!(target: "pipeline", "shutdown requested, stopping after item {}", i);
                break;
            }

            info!(target: "pipeline", "processing item {}/{}: {}", i + 1, members.len(), member);
            self.pacing.acquire().await;

            let artifact = match self.fetcher.fetch(member).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(target: "pipeline", "skipping item, fetch failed: {}", e);
                    continue;
                }
            };

            // A track-fatal failure aborts only this member.
            if let Err(e) = self.driver.run_file(&artifact, member, ledger, state).await {
                warn!(target: "pipeline", "skipping item, processing failed: {:#}", e);
            }
            self.discard_artifact(&artifact);
            store.flush(ledger, state);
        }

        Ok(())
    }

    fn discard_artifact(&self, artifact: &std::path::Path) {
        match std::fs::remove_file(artifact) {
            Ok(()) => info!(target: "pipeline", "cleaned up audio artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(target: "pipeline", "could not remove audio artifact: {}", e),
        }
    }
}
