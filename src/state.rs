use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::ContentEngine;

/// Adapter options that do not belong to the engine
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Normalized mount prefix ("/api", or "" for the root)
    pub prefix: String,
    /// Return bare document arrays from find-many
    pub simple_find: bool,
    /// Collection used when a token does not name one
    pub user_collection: String,
}

impl AdapterSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            prefix: crate::config::normalize_prefix(&config.api.prefix),
            simple_find: config.api.simple_find,
            user_collection: config.security.user_collection.clone(),
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
            simple_find: false,
            user_collection: "users".to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ContentEngine>,
    pub settings: Arc<AdapterSettings>,
}

impl AppState {
    pub fn new(engine: Arc<dyn ContentEngine>, settings: AdapterSettings) -> Self {
        Self {
            engine,
            settings: Arc::new(settings),
        }
    }
}
