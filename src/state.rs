use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{CarStore, SharedStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(config: AppConfig, store: impl CarStore + 'static) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }
}
