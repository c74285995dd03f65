//! Search service: projection maintenance plus ranked querying

use crate::error::Result as AppResult;
use crate::indexing::ProjectionBuilder;
use crate::models::FeatureDocument;
use crate::search::config::SearchConfig;
use crate::search::document::FeatureSearchDoc;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::IndexManager;
use crate::search::query::{QueryBuilder, SearchRequest};
use crate::store::MutationEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::schema::Value;
use tantivy::TantivyDocument;

/// A single search result hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub branch: String,
    pub group: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub upload_date: DateTime<Utc>,

    /// Relevance score
    pub score: f32,
}

/// Search response with results and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,

    /// Total number of hits (before pagination)
    pub total_hits: usize,

    pub query: String,
    pub offset: usize,
    pub limit: usize,
}

/// Search service over the feature index
pub struct SearchService {
    index_manager: Arc<IndexManager>,
    config: SearchConfig,
}

impl SearchService {
    pub async fn new(config: SearchConfig) -> SearchResult<Self> {
        let index_manager = Arc::new(IndexManager::new(config.clone()).await?);

        Ok(Self {
            index_manager,
            config,
        })
    }

    /// Execute a search and return ranked hits.
    ///
    /// Ranking is score-descending with identifier as the tie-breaker, so an
    /// identical request against an identical index state always yields the
    /// identical ordering.
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let query_builder = QueryBuilder::new(
            self.index_manager.schema().clone(),
            self.index_manager.index().clone(),
        );
        let tantivy_query = query_builder
            .build(request)
            .map_err(|e| SearchError::QueryParsingFailed(e.to_string()))?;

        let searcher = self.index_manager.reader().searcher();

        let limit = request.limit.min(self.config.max_results).max(1);
        let collector = TopDocs::with_limit(limit).and_offset(request.offset);

        let top_docs = searcher
            .search(&*tantivy_query, &collector)
            .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;

        let total_hits = searcher
            .search(&*tantivy_query, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Count failed: {}", e)))?;

        let schema = self.index_manager.schema();
        let mut hits = Vec::new();

        for (score, doc_address) in top_docs {
            let retrieved_doc = searcher
                .doc(doc_address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;

            hits.push(self.doc_to_search_hit(&retrieved_doc, score, schema));
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        // Echo the limit the collector actually ran with, not the raw
        // request value, so pagination metadata matches the returned hits.
        Ok(SearchResponse {
            hits,
            total_hits,
            query: request.query.clone(),
            offset: request.offset,
            limit,
        })
    }

    fn doc_to_search_hit(
        &self,
        doc: &TantivyDocument,
        score: f32,
        schema: &tantivy::schema::Schema,
    ) -> SearchHit {
        SearchHit {
            id: self.get_field_value(doc, schema, "id").unwrap_or_default(),
            branch: self.get_field_value(doc, schema, "branch").unwrap_or_default(),
            group: self.get_field_value(doc, schema, "group").unwrap_or_default(),
            title: self.get_field_value(doc, schema, "title").unwrap_or_default(),
            description: self
                .get_field_value(doc, schema, "description")
                .unwrap_or_default(),
            tags: self.get_multi_field_values(doc, schema, "tags"),
            product: self.get_field_value(doc, schema, "product"),
            version: self.get_field_value(doc, schema, "version"),
            upload_date: self
                .get_date_field(doc, schema, "upload_date")
                .unwrap_or_else(Utc::now),
            score,
        }
    }

    fn get_field_value(
        &self,
        doc: &TantivyDocument,
        schema: &tantivy::schema::Schema,
        field_name: &str,
    ) -> Option<String> {
        schema.get_field(field_name).ok().and_then(|field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        })
    }

    fn get_multi_field_values(
        &self,
        doc: &TantivyDocument,
        schema: &tantivy::schema::Schema,
        field_name: &str,
    ) -> Vec<String> {
        schema
            .get_field(field_name)
            .ok()
            .map(|field| {
                doc.get_all(field)
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get_date_field(
        &self,
        doc: &TantivyDocument,
        schema: &tantivy::schema::Schema,
        field_name: &str,
    ) -> Option<DateTime<Utc>> {
        schema.get_field(field_name).ok().and_then(|field| {
            doc.get_first(field).and_then(|v| {
                v.as_datetime().and_then(|dt| {
                    DateTime::from_timestamp(dt.into_timestamp_secs(), 0)
                })
            })
        })
    }

    /// Index one feature, replacing any prior entry for its identifier
    pub async fn index_feature(&self, feature: &FeatureDocument) -> SearchResult<()> {
        let document = FeatureSearchDoc::from(feature);
        self.index_manager.index_document(&document).await
    }

    /// Remove a feature from the index
    pub async fn delete_feature(&self, id: &str) -> SearchResult<()> {
        self.index_manager.delete_document(id).await
    }

    /// Commit pending changes
    pub async fn commit(&self) -> SearchResult<()> {
        self.index_manager.commit().await
    }

    /// Number of live entries
    pub fn num_docs(&self) -> u64 {
        self.index_manager.num_docs()
    }
}

#[async_trait]
impl ProjectionBuilder for SearchService {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn apply(&self, event: &MutationEvent) -> AppResult<()> {
        match event {
            MutationEvent::FeaturePut(feature) => {
                self.index_feature(feature).await.map_err(Into::into)
            }
            MutationEvent::FeatureDeleted { id, .. } => {
                self.delete_feature(id).await.map_err(Into::into)
            }
            MutationEvent::ReportPut(_) => Ok(()),
        }
    }

    async fn clear(&self) -> AppResult<()> {
        self.index_manager.clear_index().await.map_err(Into::into)
    }
}
