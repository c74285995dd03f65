use crate::error::{AppError, Result};
use crate::identity::{branch_prefix, split_identifier};
use crate::models::{AnalysisReport, FeatureDocument, FeatureSummary, FeatureUpload, ReportSubmission};
use crate::store::{publish, sort_summaries, FeatureStore, KeyLocks, MutationEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// In-memory feature store (for tests and single-node evaluation)
#[derive(Clone)]
pub struct InMemoryStore {
    features: Arc<DashMap<String, FeatureDocument>>,
    reports: Arc<DashMap<Uuid, AnalysisReport>>,
    write_locks: Arc<KeyLocks>,
    events: mpsc::Sender<MutationEvent>,
}

impl InMemoryStore {
    pub fn new(events: mpsc::Sender<MutationEvent>) -> Self {
        Self {
            features: Arc::new(DashMap::new()),
            reports: Arc::new(DashMap::new()),
            write_locks: Arc::new(KeyLocks::new()),
            events,
        }
    }
}

#[async_trait]
impl FeatureStore for InMemoryStore {
    async fn put(&self, upload: FeatureUpload) -> Result<FeatureDocument> {
        // The whole replacement document is built up front; the insert is a
        // single atomic per-key operation, so racing puts for the same
        // coordinates resolve last-writer-wins without interleaving. The
        // per-identifier lock keeps insert and publish as one unit, so the
        // channel sees events in store order.
        let document = FeatureDocument::from_upload(upload)?;

        let lock = self.write_locks.lock_for(&document.id);
        let _guard = lock.lock().await;

        self.features.insert(document.id.clone(), document.clone());

        tracing::debug!(id = %document.id, branch = %document.branch, "Feature saved");
        publish(&self.events, MutationEvent::FeaturePut(document.clone())).await;

        Ok(document)
    }

    async fn get(&self, id: &str) -> Result<Option<FeatureDocument>> {
        Ok(self.features.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        split_identifier(id)?;

        let lock = self.write_locks.lock_for(id);
        let _guard = lock.lock().await;

        if let Some((_, document)) = self.features.remove(id) {
            tracing::debug!(id = %id, "Feature deleted");
            publish(
                &self.events,
                MutationEvent::FeatureDeleted {
                    id: document.id,
                    branch: document.branch,
                },
            )
            .await;
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Feature {} not found", id)))
        }
    }

    async fn list_by_branch(&self, branch: &str) -> Result<Vec<FeatureSummary>> {
        let prefix = branch_prefix(branch);

        let mut summaries: Vec<FeatureSummary> = self
            .features
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.value().summary())
            .collect();

        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn put_report(&self, submission: ReportSubmission) -> Result<AnalysisReport> {
        let report = AnalysisReport::from_submission(submission);
        self.reports.insert(report.report_id, report.clone());

        tracing::debug!(report_id = %report.report_id, version = %report.version, "Report saved");
        publish(&self.events, MutationEvent::ReportPut(report.clone())).await;

        Ok(report)
    }

    async fn scan_features(&self) -> Result<Vec<FeatureDocument>> {
        Ok(self.features.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn scan_reports(&self) -> Result<Vec<AnalysisReport>> {
        Ok(self.reports.iter().map(|entry| entry.value().clone()).collect())
    }
}
