use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers;
use crate::middleware::{parse_query, require_user, resolve_user, route_custom_endpoints};
use crate::state::AppState;

/// Full application router.
///
/// Request flow: trace → query parsing → bearer resolution → custom endpoint
/// classifier → route (with the user gate where required) → handler.
pub fn app(state: AppState) -> Router {
    let api = Router::new().merge(auth_routes()).merge(data_routes());

    let prefix = state.settings.prefix.clone();
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .merge(service_routes())
        .fallback(handlers::service::not_found)
        .layer(from_fn_with_state(state.clone(), route_custom_endpoints))
        .layer(from_fn_with_state(state.clone(), resolve_user))
        .layer(from_fn(parse_query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    let open = Router::new()
        .route("/:collection/login", post(auth::login))
        .route("/:collection/logout", post(auth::logout));

    let gated = Router::new()
        .route("/:collection/me", get(auth::me))
        .route_layer(from_fn(require_user));

    open.merge(gated)
}

fn data_routes() -> Router<AppState> {
    use handlers::data;

    Router::new()
        .route(
            "/:collection",
            get(data::collection_find).post(data::collection_create),
        )
        .route("/:collection/count", get(data::collection_count))
        .route(
            "/:collection/:id",
            get(data::record_get)
                .patch(data::record_patch)
                .delete(data::record_delete),
        )
        .route_layer(from_fn(require_user))
}

fn service_routes() -> Router<AppState> {
    use handlers::service;

    Router::new()
        .route("/", get(service::root))
        .route("/health", get(service::health))
}

/// CORS for the configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let base = CorsLayer::new().allow_methods(methods).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(parsed)
}
