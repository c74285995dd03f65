use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Metadata key the product classification is read from.
///
/// `version` is a direct field on the report while `product` travels in the
/// metadata map; the product×version projection joins both into one grouping
/// key. The asymmetry is part of the report contract, keep it.
pub const PRODUCT_METADATA_KEY: &str = "product";

/// An uploaded analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Assigned at submission; the projection slot key
    pub report_id: Uuid,

    /// Version under analysis (direct field)
    pub version: String,

    /// Free-form metadata; product lives under [`PRODUCT_METADATA_KEY`]
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Submission timestamp
    pub created_at: DateTime<Utc>,

    /// Opaque report body
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl AnalysisReport {
    /// Create a report from a submission, assigning id and timestamp
    pub fn from_submission(submission: ReportSubmission) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            version: submission.version,
            metadata: submission.metadata,
            created_at: Utc::now(),
            payload: submission.payload,
        }
    }

    /// Product classification, sourced from metadata
    pub fn product(&self) -> Option<&str> {
        self.metadata
            .get(PRODUCT_METADATA_KEY)
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
    }
}

/// Caller-submitted analysis report body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportSubmission {
    #[validate(length(min = 1, max = 255))]
    pub version: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_read_from_metadata() {
        let report = AnalysisReport::from_submission(ReportSubmission {
            version: "2.1".to_string(),
            metadata: HashMap::from([(
                PRODUCT_METADATA_KEY.to_string(),
                "Checkout".to_string(),
            )]),
            payload: serde_json::Value::Null,
        });

        assert_eq!(report.product(), Some("Checkout"));
        assert_eq!(report.version, "2.1");
    }

    #[test]
    fn test_missing_or_blank_product_is_none() {
        let report = AnalysisReport::from_submission(ReportSubmission {
            version: "2.1".to_string(),
            metadata: HashMap::new(),
            payload: serde_json::Value::Null,
        });
        assert_eq!(report.product(), None);

        let blank = AnalysisReport::from_submission(ReportSubmission {
            version: "2.1".to_string(),
            metadata: HashMap::from([(PRODUCT_METADATA_KEY.to_string(), "  ".to_string())]),
            payload: serde_json::Value::Null,
        });
        assert_eq!(blank.product(), None);
    }
}
