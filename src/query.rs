//! Read-side query service.
//!
//! Every operation here reads derived projections only; none touches the
//! canonical store or triggers recomputation. Results reflect whatever the
//! index maintainer has converged to.

use crate::error::Result;
use crate::models::FeatureSummary;
use crate::projections::{BranchListingProjection, ProductVersionGroup, ProductVersionProjection};
use crate::search::{SearchRequest, SearchResponse, SearchService};
use std::sync::Arc;

/// Projection-backed read service
pub struct QueryService {
    search: Arc<SearchService>,
    product_version: Arc<ProductVersionProjection>,
    branches: Arc<BranchListingProjection>,
}

impl QueryService {
    pub fn new(
        search: Arc<SearchService>,
        product_version: Arc<ProductVersionProjection>,
        branches: Arc<BranchListingProjection>,
    ) -> Self {
        Self {
            search,
            product_version,
            branches,
        }
    }

    /// Free-text search with exact filters; stable ranking
    pub async fn search_by_text(&self, request: &SearchRequest) -> Result<SearchResponse> {
        Ok(self.search.search(request).await?)
    }

    /// Feature summaries newest-first, optionally restricted to one branch.
    /// Ties on upload date break by identifier for a deterministic order.
    pub fn list_by_upload_date_descending(&self, branch: Option<&str>) -> Vec<FeatureSummary> {
        let mut summaries = match branch {
            Some(branch) => self.branches.list_branch(branch),
            None => self.branches.all_features(),
        };

        summaries.sort_by(|a, b| {
            b.upload_date
                .cmp(&a.upload_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    /// Features in a branch, grouped order as stored by the projection
    pub fn list_by_branch(&self, branch: &str) -> Vec<FeatureSummary> {
        let mut summaries = self.branches.list_branch(branch);
        summaries.sort_by(|a, b| {
            (a.group.to_lowercase(), a.title.to_lowercase())
                .cmp(&(b.group.to_lowercase(), b.title.to_lowercase()))
        });
        summaries
    }

    /// Analysis reports grouped by (product, version)
    pub fn group_by_product_and_version(&self) -> Vec<ProductVersionGroup> {
        self.product_version.grouped()
    }

    /// Known branch names, sorted, display casing
    pub fn list_branches(&self) -> Vec<String> {
        self.branches.list_branches()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureDocument, FeatureUpload};
    use crate::search::SearchConfig;
    use crate::store::MutationEvent;
    use crate::indexing::ProjectionBuilder;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn service() -> (QueryService, Arc<BranchListingProjection>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let search = Arc::new(
            SearchService::new(SearchConfig {
                index_path: temp_dir.path().to_path_buf(),
                ..Default::default()
            })
            .await
            .unwrap(),
        );
        let branches = Arc::new(BranchListingProjection::new());
        let query = QueryService::new(
            search,
            Arc::new(ProductVersionProjection::new()),
            branches.clone(),
        );
        (query, branches, temp_dir)
    }

    fn document(branch: &str, title: &str) -> FeatureDocument {
        FeatureDocument::from_upload(FeatureUpload {
            branch: branch.to_string(),
            group: "Cart".to_string(),
            title: title.to_string(),
            product: None,
            version: None,
            tags: vec![],
            description: String::new(),
            background: None,
            scenarios: vec![],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_recency_listing_orders_newest_first_with_id_tiebreak() {
        let (query, branches, _temp_dir) = service().await;

        let mut older = document("main", "Add Item");
        older.upload_date -= Duration::hours(1);
        let newer = document("main", "Remove Item");

        // Same timestamp pair to exercise the identifier tie-break.
        let tied_a = document("main", "Tie A");
        let mut tied_b = document("main", "Tie B");
        tied_b.upload_date = tied_a.upload_date;

        for doc in [&older, &newer, &tied_a, &tied_b] {
            branches
                .apply(&MutationEvent::FeaturePut((*doc).clone()))
                .await
                .unwrap();
        }

        let listed = query.list_by_upload_date_descending(Some("main"));
        assert_eq!(listed.len(), 4);
        assert_eq!(listed.last().unwrap().title, "Add Item");

        let tied: Vec<&FeatureSummary> = listed
            .iter()
            .filter(|s| s.title.starts_with("Tie"))
            .collect();
        assert_eq!(tied.len(), 2);
        assert!(tied[0].id < tied[1].id);
    }

    #[tokio::test]
    async fn test_branch_scoping() {
        let (query, branches, _temp_dir) = service().await;

        branches
            .apply(&MutationEvent::FeaturePut(document("main", "Add Item")))
            .await
            .unwrap();
        branches
            .apply(&MutationEvent::FeaturePut(document("release-1", "Add Item")))
            .await
            .unwrap();

        assert_eq!(query.list_branches(), vec!["main", "release-1"]);
        assert_eq!(query.list_by_upload_date_descending(Some("main")).len(), 1);
        assert_eq!(query.list_by_upload_date_descending(None).len(), 2);
        assert_eq!(query.list_by_branch("MAIN").len(), 1);
    }
}
