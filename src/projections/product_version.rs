use crate::error::{AppError, Result};
use crate::indexing::ProjectionBuilder;
use crate::models::AnalysisReport;
use crate::store::MutationEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One projected analysis report slot
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportSlot {
    /// Sourced from report metadata
    product: String,

    /// Sourced from the report body
    version: String,

    created_at: DateTime<Utc>,
}

/// One (product, version) group as seen at query time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVersionGroup {
    pub product: String,
    pub version: String,
    pub count: usize,
    pub report_ids: Vec<Uuid>,
}

/// Projection of analysis reports onto (product, version) keys.
///
/// `product` comes from the report's metadata map while `version` is a direct
/// field; this is the one place the two sources are joined into a single key.
#[derive(Default)]
pub struct ProductVersionProjection {
    slots: DashMap<Uuid, ReportSlot>,
}

impl ProductVersionProjection {
    pub fn new() -> Self {
        Self::default()
    }

    fn project(&self, report: &AnalysisReport) -> Result<()> {
        let product = report.product().ok_or_else(|| {
            AppError::Indexing(format!(
                "report {} has no product metadata",
                report.report_id
            ))
        })?;

        if report.version.trim().is_empty() {
            return Err(AppError::Indexing(format!(
                "report {} has an empty version",
                report.report_id
            )));
        }

        self.slots.insert(
            report.report_id,
            ReportSlot {
                product: product.to_string(),
                version: report.version.clone(),
                created_at: report.created_at,
            },
        );
        Ok(())
    }

    /// Group the projected reports by (product, version).
    ///
    /// Aggregation happens here at query time; the stored slots stay
    /// per-report. BTreeMap keys give a deterministic group order.
    pub fn grouped(&self) -> Vec<ProductVersionGroup> {
        let mut groups: BTreeMap<(String, String), Vec<(DateTime<Utc>, Uuid)>> = BTreeMap::new();

        for entry in self.slots.iter() {
            let slot = entry.value();
            groups
                .entry((slot.product.clone(), slot.version.clone()))
                .or_default()
                .push((slot.created_at, *entry.key()));
        }

        groups
            .into_iter()
            .map(|((product, version), mut members)| {
                members.sort();
                ProductVersionGroup {
                    product,
                    version,
                    count: members.len(),
                    report_ids: members.into_iter().map(|(_, id)| id).collect(),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[async_trait]
impl ProjectionBuilder for ProductVersionProjection {
    fn name(&self) -> &'static str {
        "product-version"
    }

    async fn apply(&self, event: &MutationEvent) -> Result<()> {
        match event {
            MutationEvent::ReportPut(report) => self.project(report),
            // Feature mutations carry no report data.
            MutationEvent::FeaturePut(_) | MutationEvent::FeatureDeleted { .. } => Ok(()),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.slots.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportSubmission, PRODUCT_METADATA_KEY};
    use std::collections::HashMap;

    fn report(product: Option<&str>, version: &str) -> AnalysisReport {
        let mut metadata = HashMap::new();
        if let Some(product) = product {
            metadata.insert(PRODUCT_METADATA_KEY.to_string(), product.to_string());
        }
        AnalysisReport::from_submission(ReportSubmission {
            version: version.to_string(),
            metadata,
            payload: serde_json::Value::Null,
        })
    }

    #[tokio::test]
    async fn test_product_from_metadata_version_from_body() {
        let projection = ProductVersionProjection::new();
        projection
            .apply(&MutationEvent::ReportPut(report(Some("Checkout"), "2.1")))
            .await
            .unwrap();

        let groups = projection.grouped();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].product, "Checkout");
        assert_eq!(groups[0].version, "2.1");
        assert_eq!(groups[0].count, 1);
    }

    #[tokio::test]
    async fn test_grouping_collects_same_key() {
        let projection = ProductVersionProjection::new();
        for _ in 0..3 {
            projection
                .apply(&MutationEvent::ReportPut(report(Some("Checkout"), "2.1")))
                .await
                .unwrap();
        }
        projection
            .apply(&MutationEvent::ReportPut(report(Some("Checkout"), "2.2")))
            .await
            .unwrap();
        projection
            .apply(&MutationEvent::ReportPut(report(Some("Cart"), "2.1")))
            .await
            .unwrap();

        let groups = projection.grouped();
        assert_eq!(groups.len(), 3);

        // BTreeMap ordering: Cart before Checkout, versions ascending.
        assert_eq!(groups[0].product, "Cart");
        assert_eq!(groups[1].version, "2.1");
        assert_eq!(groups[1].count, 3);
        assert_eq!(groups[2].version, "2.2");
    }

    #[tokio::test]
    async fn test_missing_product_is_an_indexing_failure() {
        let projection = ProductVersionProjection::new();
        let result = projection
            .apply(&MutationEvent::ReportPut(report(None, "2.1")))
            .await;
        assert!(matches!(result, Err(AppError::Indexing(_))));
        assert!(projection.is_empty());
    }

    #[tokio::test]
    async fn test_feature_events_are_ignored() {
        let projection = ProductVersionProjection::new();
        projection
            .apply(&MutationEvent::FeatureDeleted {
                id: "main/x".to_string(),
                branch: "main".to_string(),
            })
            .await
            .unwrap();
        assert!(projection.is_empty());
    }
}
