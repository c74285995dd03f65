pub mod factory;
pub mod memory;
pub mod sled_store;

pub use factory::create_store;
pub use memory::InMemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;
use crate::models::{AnalysisReport, FeatureDocument, FeatureSummary, FeatureUpload, ReportSubmission};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A store mutation, published to the index maintainer after the canonical
/// write lands. Each event carries everything a projection needs; projections
/// never read back from the store.
#[derive(Debug, Clone)]
pub enum MutationEvent {
    /// A feature was created or overwritten
    FeaturePut(FeatureDocument),

    /// A feature was deleted
    FeatureDeleted { id: String, branch: String },

    /// An analysis report was submitted
    ReportPut(AnalysisReport),
}

/// Trait for canonical feature storage
///
/// `put` is a total-replacement upsert keyed by the derived identifier;
/// per-identifier writes are linearizable because every backend builds the
/// full replacement value before one atomic per-key insert. Backends hold a
/// per-identifier lock across the insert and the event publication, so the
/// channel delivers events for one identifier in store order and projections
/// converge to the winning write.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Persist a feature, recomputing its identifier from the upload's
    /// (branch, group, title) coordinates. Overwrites any prior content at
    /// that identifier, including the upload date.
    async fn put(&self, upload: FeatureUpload) -> Result<FeatureDocument>;

    /// Get a feature by identifier
    async fn get(&self, id: &str) -> Result<Option<FeatureDocument>>;

    /// Delete a feature by identifier
    async fn delete(&self, id: &str) -> Result<()>;

    /// List feature summaries in a branch (case-insensitive branch name)
    async fn list_by_branch(&self, branch: &str) -> Result<Vec<FeatureSummary>>;

    /// Persist an analysis report, assigning its id and timestamp
    async fn put_report(&self, submission: ReportSubmission) -> Result<AnalysisReport>;

    /// All stored features, for bulk re-indexing
    async fn scan_features(&self) -> Result<Vec<FeatureDocument>>;

    /// All stored reports, for bulk re-indexing
    async fn scan_reports(&self) -> Result<Vec<AnalysisReport>>;
}

/// Publish a mutation event, tolerating a missing consumer.
///
/// The write has already landed; a closed channel only means projections will
/// not converge until the next rebuild.
pub(crate) async fn publish(
    events: &tokio::sync::mpsc::Sender<MutationEvent>,
    event: MutationEvent,
) {
    if events.send(event).await.is_err() {
        tracing::warn!("index maintainer channel closed; projection update dropped");
    }
}

/// Per-identifier write locks shared by both backends.
///
/// A mutation's store insert and its event publication must happen as one
/// unit per identifier: without the lock, two racing `put`s for the same
/// coordinates can publish their events in the opposite order of their
/// inserts, leaving every projection converged on the losing write until the
/// next rebuild.
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Sort order shared by both backends for branch listings
pub(crate) fn sort_summaries(summaries: &mut [FeatureSummary]) {
    summaries.sort_by(|a, b| {
        (a.group.to_lowercase(), a.title.to_lowercase())
            .cmp(&(b.group.to_lowercase(), b.title.to_lowercase()))
    });
}
