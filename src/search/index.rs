//! Search index management

use crate::search::config::SearchConfig;
use crate::search::document::{build_feature_schema, FeatureSearchDoc};
use crate::search::error::{SearchError, SearchResult};
use std::path::Path;
use std::sync::Arc;
use tantivy::schema::Schema;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tokio::sync::RwLock;

/// Manages the tantivy index backing the search projection
pub struct IndexManager {
    index: Index,
    schema: Schema,

    /// Index writer (wrapped in RwLock for thread-safety)
    writer: Arc<RwLock<IndexWriter>>,

    reader: IndexReader,
    config: SearchConfig,
}

impl IndexManager {
    /// Create a new IndexManager, opening an existing index or creating one
    pub async fn new(config: SearchConfig) -> SearchResult<Self> {
        std::fs::create_dir_all(&config.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let schema = build_feature_schema();

        let index = if Self::index_exists(&config.index_path) {
            Index::open_in_dir(&config.index_path).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })?
        } else {
            Index::create_in_dir(&config.index_path, schema.clone()).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })?
        };

        let writer = index
            .writer(config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        Ok(Self {
            index,
            schema,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            config,
        })
    }

    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn reader(&self) -> &IndexReader {
        &self.reader
    }

    /// Index one feature document, replacing any prior entry for its
    /// identifier. Delete-by-term and add happen under one writer lock and
    /// commit, so a query never sees the old and new entry side by side.
    pub async fn index_document(&self, document: &FeatureSearchDoc) -> SearchResult<()> {
        let tantivy_doc = document.to_tantivy_doc(&self.schema);

        let mut writer = self.writer.write().await;

        if let Ok(id_field) = self.schema.get_field("id") {
            let term = tantivy::Term::from_field_text(id_field, &document.id);
            writer.delete_term(term);
        }

        writer
            .add_document(tantivy_doc)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to add document: {}", e)))?;

        if self.config.realtime_indexing {
            writer.commit().map_err(|e| {
                SearchError::IndexingFailed(format!("Failed to commit document: {}", e))
            })?;
            self.reader.reload()?;
        }

        Ok(())
    }

    /// Delete a document by identifier
    pub async fn delete_document(&self, document_id: &str) -> SearchResult<()> {
        let mut writer = self.writer.write().await;

        if let Ok(id_field) = self.schema.get_field("id") {
            let term = tantivy::Term::from_field_text(id_field, document_id);
            writer.delete_term(term);

            if self.config.realtime_indexing {
                writer.commit().map_err(|e| {
                    SearchError::DeletionFailed(format!("Failed to commit deletion: {}", e))
                })?;
                self.reader.reload()?;
            }
        }

        Ok(())
    }

    /// Commit pending changes and make them visible to searchers
    pub async fn commit(&self) -> SearchResult<()> {
        let mut writer = self.writer.write().await;
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.reader.reload()?;
        Ok(())
    }

    /// Clear the entire index
    pub async fn clear_index(&self) -> SearchResult<()> {
        let mut writer = self.writer.write().await;
        writer
            .delete_all_documents()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to clear index: {}", e)))?;
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit clear: {}", e)))?;
        self.reader.reload()?;
        Ok(())
    }

    /// Number of live documents in the index
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}
