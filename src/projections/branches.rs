use crate::error::Result;
use crate::indexing::ProjectionBuilder;
use crate::models::FeatureSummary;
use crate::store::MutationEvent;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

/// Per-branch slot: display name plus the branch's feature summaries
struct BranchSlot {
    /// Most recently written display casing
    display: String,

    features: HashMap<String, FeatureSummary>,
}

/// Projection answering "which branches exist" and "what is in branch X"
/// without scanning the canonical corpus. Keyed by lowercased branch name;
/// display casing is preserved from the latest write.
#[derive(Default)]
pub struct BranchListingProjection {
    branches: DashMap<String, BranchSlot>,
}

impl BranchListingProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Branch display names, sorted by their case-folded key
    pub fn list_branches(&self) -> Vec<String> {
        let mut entries: Vec<(String, String)> = self
            .branches
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().display.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, display)| display).collect()
    }

    /// Feature summaries in a branch (case-insensitive branch name)
    pub fn list_branch(&self, branch: &str) -> Vec<FeatureSummary> {
        self.branches
            .get(&branch.to_lowercase())
            .map(|slot| slot.features.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All feature summaries across branches
    pub fn all_features(&self) -> Vec<FeatureSummary> {
        self.branches
            .iter()
            .flat_map(|entry| entry.value().features.values().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[async_trait]
impl ProjectionBuilder for BranchListingProjection {
    fn name(&self) -> &'static str {
        "branch-listing"
    }

    async fn apply(&self, event: &MutationEvent) -> Result<()> {
        match event {
            MutationEvent::FeaturePut(feature) => {
                let key = feature.branch.to_lowercase();
                let mut slot = self.branches.entry(key).or_insert_with(|| BranchSlot {
                    display: feature.branch.clone(),
                    features: HashMap::new(),
                });
                slot.display = feature.branch.clone();
                slot.features.insert(feature.id.clone(), feature.summary());
                Ok(())
            }
            MutationEvent::FeatureDeleted { id, branch } => {
                let key = branch.to_lowercase();
                let emptied = {
                    let Some(mut slot) = self.branches.get_mut(&key) else {
                        return Ok(());
                    };
                    slot.features.remove(id);
                    slot.features.is_empty()
                };
                if emptied {
                    self.branches.remove_if(&key, |_, slot| slot.features.is_empty());
                }
                Ok(())
            }
            MutationEvent::ReportPut(_) => Ok(()),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.branches.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureDocument, FeatureUpload};

    fn put_event(branch: &str, group: &str, title: &str) -> MutationEvent {
        MutationEvent::FeaturePut(
            FeatureDocument::from_upload(FeatureUpload {
                branch: branch.to_string(),
                group: group.to_string(),
                title: title.to_string(),
                product: None,
                version: None,
                tags: vec![],
                description: String::new(),
                background: None,
                scenarios: vec![],
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_branches_listed_case_insensitively() {
        let projection = BranchListingProjection::new();
        projection.apply(&put_event("Main", "Cart", "Add Item")).await.unwrap();
        projection.apply(&put_event("main", "Cart", "Remove Item")).await.unwrap();
        projection.apply(&put_event("release-1", "Cart", "Add Item")).await.unwrap();

        let branches = projection.list_branches();
        assert_eq!(branches, vec!["main".to_string(), "release-1".to_string()]);

        assert_eq!(projection.list_branch("MAIN").len(), 2);
        assert_eq!(projection.list_branch("release-1").len(), 1);
    }

    #[tokio::test]
    async fn test_reupload_keeps_one_entry() {
        let projection = BranchListingProjection::new();
        projection.apply(&put_event("main", "Cart", "Add Item")).await.unwrap();
        projection.apply(&put_event("main", "CART", "ADD ITEM")).await.unwrap();

        assert_eq!(projection.list_branch("main").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_empties_branch() {
        let projection = BranchListingProjection::new();
        let event = put_event("main", "Cart", "Add Item");
        let id = match &event {
            MutationEvent::FeaturePut(doc) => doc.id.clone(),
            _ => unreachable!(),
        };
        projection.apply(&event).await.unwrap();

        projection
            .apply(&MutationEvent::FeatureDeleted {
                id,
                branch: "main".to_string(),
            })
            .await
            .unwrap();

        assert!(projection.list_branches().is_empty());
        assert!(projection.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_branch_is_noop() {
        let projection = BranchListingProjection::new();
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
