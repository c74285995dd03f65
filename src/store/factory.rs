use crate::config::{StateBackend, StateConfig};
use crate::error::Result;
use crate::store::{FeatureStore, InMemoryStore, MutationEvent, SledStore};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Create a feature store from configuration
pub fn create_store(
    config: &StateConfig,
    events: mpsc::Sender<MutationEvent>,
) -> Result<Arc<dyn FeatureStore>> {
    match config.backend {
        StateBackend::Memory => {
            tracing::info!("Using in-memory feature store");
            Ok(Arc::new(InMemoryStore::new(events)))
        }
        StateBackend::Sled => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| "./data/features".into());
            Ok(Arc::new(SledStore::new(path, events)?))
        }
    }
}
