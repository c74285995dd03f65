use crate::error::Result;
use crate::indexing::ProjectionBuilder;
use crate::store::{FeatureStore, MutationEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Keeps the derived projections consistent with store contents.
///
/// Consistency is eventual: `put`/`delete` return once the canonical write
/// lands and the event is queued; projections converge when the maintainer
/// has applied the event. The processed-count watch channel is the
/// convergence signal callers can await.
pub struct IndexMaintainer {
    projections: Vec<Arc<dyn ProjectionBuilder>>,
    processed_tx: watch::Sender<u64>,
    processed_rx: watch::Receiver<u64>,
    abort_rebuild: AtomicBool,
}

impl IndexMaintainer {
    pub fn new(projections: Vec<Arc<dyn ProjectionBuilder>>) -> Self {
        let (processed_tx, processed_rx) = watch::channel(0);
        Self {
            projections,
            processed_tx,
            processed_rx,
            abort_rebuild: AtomicBool::new(false),
        }
    }

    /// Number of events applied so far
    pub fn processed(&self) -> u64 {
        *self.processed_rx.borrow()
    }

    /// Wait until at least `count` events have been applied.
    ///
    /// This is the convergence point: a query issued after this returns sees
    /// the effects of the first `count` published mutations.
    pub async fn wait_for_processed(&self, count: u64) {
        let mut rx = self.processed_rx.clone();
        while *rx.borrow_and_update() < count {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Apply one event to every projection.
    ///
    /// A failing projection is reported and skipped; the event still counts
    /// as processed so other projections and later documents proceed.
    pub async fn apply(&self, event: &MutationEvent) {
        for projection in &self.projections {
            if let Err(e) = projection.apply(event).await {
                tracing::warn!(
                    projection = projection.name(),
                    error = %e,
                    "Projection update failed for one document; skipping"
                );
            }
        }
        self.processed_tx.send_modify(|count| *count += 1);
    }

    /// Drain the store's mutation channel until it closes
    pub async fn run(&self, mut events: mpsc::Receiver<MutationEvent>) {
        tracing::info!(
            projections = self.projections.len(),
            "Index maintainer started"
        );
        while let Some(event) = events.recv().await {
            self.apply(&event).await;
        }
        tracing::info!("Index maintainer stopped: event channel closed");
    }

    /// Request that an in-flight `rebuild` stop after the current document
    pub fn abort(&self) {
        self.abort_rebuild.store(true, Ordering::Relaxed);
    }

    /// Rebuild every projection from store contents.
    ///
    /// Clears all projections, then replays every stored feature and report.
    /// Abort is honored between documents; the per-identifier apply is the
    /// atomic unit, so an aborted rebuild never leaves one identifier's
    /// entries partially built.
    pub async fn rebuild(&self, store: &dyn FeatureStore) -> Result<usize> {
        self.abort_rebuild.store(false, Ordering::Relaxed);

        for projection in &self.projections {
            projection.clear().await?;
        }

        let features = store.scan_features().await?;
        let reports = store.scan_reports().await?;
        let mut replayed = 0usize;

        for feature in features {
            if self.abort_rebuild.load(Ordering::Relaxed) {
                tracing::warn!(replayed, "Rebuild aborted");
                return Ok(replayed);
            }
            self.apply(&MutationEvent::FeaturePut(feature)).await;
            replayed += 1;
        }

        for report in reports {
            if self.abort_rebuild.load(Ordering::Relaxed) {
                tracing::warn!(replayed, "Rebuild aborted");
                return Ok(replayed);
            }
            self.apply(&MutationEvent::ReportPut(report)).await;
            replayed += 1;
        }

        tracing::info!(replayed, "Rebuild complete");
        Ok(replayed)
    }
}
