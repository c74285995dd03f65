use crate::error::Result;
use crate::identity::derive_identifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single scenario inside a feature: a name and its ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    /// Step lines in execution order
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Shared step block executed before every scenario of a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub steps: Vec<String>,
}

/// The canonical stored feature record
///
/// Identity is the lowercased (branch, group, title) tuple; `identifier` is
/// derived from it and is the store key. Content at an identifier is fully
/// replaceable: a re-upload with the same coordinates overwrites everything,
/// including `upload_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDocument {
    /// Derived store key: `<branch-lowercase>/<digest-uuid>`
    pub id: String,

    /// Branch name, display casing preserved
    pub branch: String,

    /// Group name, display casing preserved
    pub group: String,

    /// Feature title, display casing preserved
    pub title: String,

    /// Optional product classification (metadata, not part of identity)
    pub product: Option<String>,

    /// Optional version classification (metadata, not part of identity)
    pub version: Option<String>,

    /// Set at write time; refreshed on every overwrite
    pub upload_date: DateTime<Utc>,

    /// Tags, deduplicated at write time
    pub tags: Vec<String>,

    /// Free-text description, analyzed for search
    pub description: String,

    /// Optional shared step block
    pub background: Option<Background>,

    /// Ordered scenarios
    pub scenarios: Vec<Scenario>,
}

impl FeatureDocument {
    /// Build the canonical document from an upload, deriving the identifier
    /// from the upload's coordinates and stamping the upload date.
    pub fn from_upload(upload: FeatureUpload) -> Result<Self> {
        let id = derive_identifier(&upload.branch, &upload.group, &upload.title)?;

        let mut tags = upload.tags;
        tags.sort();
        tags.dedup();

        Ok(Self {
            id,
            branch: upload.branch,
            group: upload.group,
            title: upload.title,
            product: upload.product,
            version: upload.version,
            upload_date: Utc::now(),
            tags,
            description: upload.description,
            background: upload.background,
            scenarios: upload.scenarios,
        })
    }

    /// The listing shape for this document
    pub fn summary(&self) -> FeatureSummary {
        FeatureSummary {
            id: self.id.clone(),
            branch: self.branch.clone(),
            group: self.group.clone(),
            title: self.title.clone(),
            product: self.product.clone(),
            version: self.version.clone(),
            tags: self.tags.clone(),
            upload_date: self.upload_date,
        }
    }
}

/// Caller-submitted feature body plus coordinates
///
/// Any caller-side notion of an identifier is ignored; the store always
/// recomputes the key from (branch, group, title).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeatureUpload {
    #[validate(length(min = 1, max = 255))]
    pub branch: String,

    #[validate(length(min = 1, max = 255))]
    pub group: String,

    #[validate(length(min = 1, max = 500))]
    pub title: String,

    pub product: Option<String>,

    pub version: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub description: String,

    pub background: Option<Background>,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// Compact listing entry emitted by branch listings and recency queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub id: String,
    pub branch: String,
    pub group: String,
    pub title: String,
    pub product: Option<String>,
    pub version: Option<String>,
    pub tags: Vec<String>,
    pub upload_date: DateTime<Utc>,
}
