use crate::error::{AppError, Result};
use crate::identity::{branch_prefix, split_identifier};
use crate::models::{AnalysisReport, FeatureDocument, FeatureSummary, FeatureUpload, ReportSubmission};
use crate::store::{publish, sort_summaries, FeatureStore, KeyLocks, MutationEvent};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Persistent feature store using the Sled embedded database
///
/// Feature keys are the derived identifiers, so the cleartext branch prefix
/// doubles as the range-scan key for branch listings.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    features_tree: sled::Tree,
    reports_tree: sled::Tree,
    write_locks: Arc<KeyLocks>,
    events: mpsc::Sender<MutationEvent>,
}

impl SledStore {
    /// Open or create a Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P, events: mpsc::Sender<MutationEvent>) -> Result<Self> {
        let path_str = path.as_ref();
        let db = sled::open(&path)
            .map_err(|e| AppError::Storage(format!("Failed to open Sled database: {}", e)))?;

        let features_tree = db
            .open_tree("features")
            .map_err(|e| AppError::Storage(format!("Failed to open features tree: {}", e)))?;

        let reports_tree = db
            .open_tree("reports")
            .map_err(|e| AppError::Storage(format!("Failed to open reports tree: {}", e)))?;

        tracing::info!("Initialized Sled store at {:?}", path_str);

        Ok(Self {
            db: Arc::new(db),
            features_tree,
            reports_tree,
            write_locks: Arc::new(KeyLocks::new()),
            events,
        })
    }

    fn serialize_feature(document: &FeatureDocument) -> Result<Vec<u8>> {
        bincode::serialize(document)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize feature: {}", e)))
    }

    fn deserialize_feature(bytes: &[u8]) -> Result<FeatureDocument> {
        bincode::deserialize(bytes)
            .map_err(|e| AppError::Serialization(format!("Failed to deserialize feature: {}", e)))
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl FeatureStore for SledStore {
    async fn put(&self, upload: FeatureUpload) -> Result<FeatureDocument> {
        // Whole-document replacement through one atomic per-key insert. The
        // per-identifier lock keeps insert and publish as one unit, so the
        // channel sees events in store order.
        let document = FeatureDocument::from_upload(upload)?;
        let value = Self::serialize_feature(&document)?;

        let lock = self.write_locks.lock_for(&document.id);
        let _guard = lock.lock().await;

        self.features_tree
            .insert(document.id.as_bytes(), value)
            .map_err(|e| AppError::Storage(format!("Failed to save feature: {}", e)))?;

        self.features_tree
            .flush()
            .map_err(|e| AppError::Storage(format!("Failed to flush features tree: {}", e)))?;

        tracing::debug!(id = %document.id, branch = %document.branch, "Feature saved to Sled");
        publish(&self.events, MutationEvent::FeaturePut(document.clone())).await;

        Ok(document)
    }

    async fn get(&self, id: &str) -> Result<Option<FeatureDocument>> {
        match self.features_tree.get(id.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_feature(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Failed to get feature: {}", e))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        split_identifier(id)?;

        let lock = self.write_locks.lock_for(id);
        let _guard = lock.lock().await;

        let removed = self
            .features_tree
            .remove(id.as_bytes())
            .map_err(|e| AppError::Storage(format!("Failed to delete feature: {}", e)))?;

        let Some(bytes) = removed else {
            return Err(AppError::NotFound(format!("Feature {} not found", id)));
        };

        let document = Self::deserialize_feature(&bytes)?;

        self.features_tree
            .flush()
            .map_err(|e| AppError::Storage(format!("Failed to flush features tree: {}", e)))?;

        tracing::debug!(id = %id, "Feature deleted from Sled");
        publish(
            &self.events,
            MutationEvent::FeatureDeleted {
                id: document.id,
                branch: document.branch,
            },
        )
        .await;

        Ok(())
    }

    async fn list_by_branch(&self, branch: &str) -> Result<Vec<FeatureSummary>> {
        let prefix = branch_prefix(branch);
        let mut summaries = Vec::new();

        for result in self.features_tree.scan_prefix(prefix.as_bytes()) {
            let (_, value) = result
                .map_err(|e| AppError::Storage(format!("Failed to scan branch: {}", e)))?;
            summaries.push(Self::deserialize_feature(&value)?.summary());
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn put_report(&self, submission: ReportSubmission) -> Result<AnalysisReport> {
        let report = AnalysisReport::from_submission(submission);
        // Reports carry an arbitrary JSON payload, which bincode cannot
        // round-trip; reports are stored as JSON instead.
        let value = serde_json::to_vec(&report)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize report: {}", e)))?;

        self.reports_tree
            .insert(report.report_id.as_bytes(), value)
            .map_err(|e| AppError::Storage(format!("Failed to save report: {}", e)))?;

        self.reports_tree
            .flush()
            .map_err(|e| AppError::Storage(format!("Failed to flush reports tree: {}", e)))?;

        tracing::debug!(report_id = %report.report_id, version = %report.version, "Report saved to Sled");
        publish(&self.events, MutationEvent::ReportPut(report.clone())).await;

        Ok(report)
    }

    async fn scan_features(&self) -> Result<Vec<FeatureDocument>> {
        let mut documents = Vec::new();
        for result in self.features_tree.iter() {
            let (_, value) = result
                .map_err(|e| AppError::Storage(format!("Failed to iterate features: {}", e)))?;
            documents.push(Self::deserialize_feature(&value)?);
        }
        Ok(documents)
    }

    async fn scan_reports(&self) -> Result<Vec<AnalysisReport>> {
        let mut reports = Vec::new();
        for result in self.reports_tree.iter() {
            let (_, value) = result
                .map_err(|e| AppError::Storage(format!("Failed to iterate reports: {}", e)))?;
            let report: AnalysisReport = serde_json::from_slice(&value).map_err(|e| {
                AppError::Serialization(format!("Failed to deserialize report: {}", e))
            })?;
            reports.push(report);
        }
        Ok(reports)
    }
}
