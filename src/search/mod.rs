//! Full-text search projection over feature documents.
//!
//! One tantivy entry per document: analyzed title/description/step bodies for
//! free-text matching, verbatim fields for exact filtering, and the upload
//! date for recency. Entries are replaced wholesale whenever the source
//! document is overwritten, keyed by the derived identifier.

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod service;

pub use config::SearchConfig;
pub use document::{build_feature_schema, FeatureSearchDoc};
pub use error::{SearchError, SearchResult};
pub use index::IndexManager;
pub use query::{SearchFilters, SearchRequest};
pub use service::{SearchHit, SearchResponse, SearchService};
