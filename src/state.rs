use crate::config::Config;
use crate::store::ItemStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
