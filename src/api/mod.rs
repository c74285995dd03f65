pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::query::QueryService;
use crate::store::FeatureStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeatureStore>,
    pub query: Arc<QueryService>,
}

impl AppState {
    pub fn new(store: Arc<dyn FeatureStore>, query: Arc<QueryService>) -> Self {
        Self { store, query }
    }
}
