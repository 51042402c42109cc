use axum::{
    extract::State,
    http::{Method, Uri},
    response::Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// GET / - service description
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = &state.settings.prefix;

    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "prefix": prefix,
        "collections": state.engine.collections(),
        "endpoints": {
            "auth": format!("{}/:collection/login, {}/:collection/logout, {}/:collection/me", prefix, prefix, prefix),
            "find": format!("GET {}/:collection, GET {}/:collection/count", prefix, prefix),
            "record": format!("GET|PATCH|DELETE {}/:collection/:id", prefix),
            "create": format!("POST {}/:collection", prefix),
        }
    }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}

/// Fallback for anything no route or custom endpoint claimed
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} {} not found", method, uri.path()))
}
