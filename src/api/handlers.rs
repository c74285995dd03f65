use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{AnalysisReport, FeatureDocument, FeatureSummary, FeatureUpload, ReportSubmission};
use crate::projections::ProductVersionGroup;
use crate::search::{SearchRequest, SearchResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Upload a feature.
///
/// The identifier is always recomputed from (branch, group, title); a second
/// upload with the same coordinates overwrites the first.
pub async fn upload_feature(
    State(state): State<AppState>,
    Json(request): Json<FeatureUpload>,
) -> Result<(StatusCode, Json<FeatureDocument>)> {
    request.validate()?;

    let document = state.store.put(request).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Get a feature by its branch and digest path segments
pub async fn get_feature(
    State(state): State<AppState>,
    Path((branch, digest)): Path<(String, String)>,
) -> Result<Json<FeatureDocument>> {
    let id = feature_id(&branch, &digest);
    let document = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feature {} not found", id)))?;
    Ok(Json(document))
}

/// Delete a feature by its branch and digest path segments
pub async fn delete_feature(
    State(state): State<AppState>,
    Path((branch, digest)): Path<(String, String)>,
) -> Result<StatusCode> {
    state.store.delete(&feature_id(&branch, &digest)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List known branches
pub async fn list_branches(State(state): State<AppState>) -> Result<Json<BranchListResponse>> {
    Ok(Json(BranchListResponse {
        branches: state.query.list_branches(),
    }))
}

#[derive(Debug, Serialize)]
pub struct BranchListResponse {
    pub branches: Vec<String>,
}

/// List the features in one branch
pub async fn list_branch_features(
    State(state): State<AppState>,
    Path(branch): Path<String>,
) -> Result<Json<Vec<FeatureSummary>>> {
    Ok(Json(state.query.list_by_branch(&branch)))
}

/// List features newest-first, optionally scoped to a branch
pub async fn recent_features(
    State(state): State<AppState>,
    Query(params): Query<RecentFeaturesQuery>,
) -> Result<Json<Vec<FeatureSummary>>> {
    let limit = params.limit.unwrap_or(20).min(100); // Max 100 per page

    let mut summaries = state
        .query
        .list_by_upload_date_descending(params.branch.as_deref());
    summaries.truncate(limit);
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct RecentFeaturesQuery {
    pub branch: Option<String>,
    pub limit: Option<usize>,
}

/// Free-text search over the feature corpus
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let mut request = SearchRequest::new(params.q.unwrap_or_default())
        .with_limit(params.limit.unwrap_or(20).min(100))
        .with_offset(params.offset.unwrap_or(0));

    if let Some(tags) = params.tag {
        let tags: Vec<String> = tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if !tags.is_empty() {
            request = request.with_tags(tags);
        }
    }
    if let Some(product) = params.product {
        request = request.with_product(product);
    }
    if let Some(group) = params.group {
        request = request.with_group(group);
    }

    let response = state.query.search_by_text(&request).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,

    /// Comma-separated tag filter; all listed tags must match
    pub tag: Option<String>,

    pub product: Option<String>,
    pub group: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Submit an analysis report
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<ReportSubmission>,
) -> Result<(StatusCode, Json<AnalysisReport>)> {
    request.validate()?;

    let report = state.store.put_report(request).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Reports grouped by (product, version)
pub async fn grouped_reports(
    State(state): State<AppState>,
) -> Result<Json<GroupedReportsResponse>> {
    Ok(Json(GroupedReportsResponse {
        groups: state.query.group_by_product_and_version(),
    }))
}

#[derive(Debug, Serialize)]
pub struct GroupedReportsResponse {
    pub groups: Vec<ProductVersionGroup>,
}

/// Rebuild the store key from its URL segments. The branch half of the key is
/// stored lowercased, so lookups are case-insensitive on branch.
fn feature_id(branch: &str, digest: &str) -> String {
    format!("{}/{}", branch.to_lowercase(), digest)
}
