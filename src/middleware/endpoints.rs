use axum::{
    extract::{OriginalUri, Request, State},
    http::header::LOCATION,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tracing::debug;

use crate::engine::{Endpoint, EndpointRequest, EndpointResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{CurrentUser, ParsedQuery};

/// Largest custom endpoint request body that is buffered
pub const MAX_ENDPOINT_BODY: usize = 10 * 1024 * 1024;

const AUTH_PREFIX: &str = "/auth";

/// Path relative to the API prefix or `/auth`; None for paths outside both
pub fn relative_path(prefix: &str, path: &str) -> Option<String> {
    if prefix.is_empty() {
        return Some(path.to_string());
    }
    [prefix, AUTH_PREFIX].iter().find_map(|p| {
        let rest = path.strip_prefix(p)?;
        (rest.is_empty() || rest.starts_with('/')).then(|| rest.to_string())
    })
}

fn first_segment(relative: &str) -> &str {
    relative.trim_start_matches('/').split('/').next().unwrap_or_default()
}

/// Request classifier.
///
/// Paths naming a registered collection go on to the collection routes.
/// Anything else is offered to the engine's custom endpoints (exact path and
/// method); a request nothing claims continues down the router.
pub async fn route_custom_endpoints(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let Some(relative) = relative_path(&state.settings.prefix, &path) else {
        return next.run(request).await;
    };
    if state.engine.has_collection(first_segment(&relative)) {
        return next.run(request).await;
    }

    let endpoint = state
        .engine
        .config()
        .endpoints
        .iter()
        .find(|e| e.matches(request.method(), &relative))
        .cloned();
    let Some(endpoint) = endpoint else {
        return next.run(request).await;
    };

    debug!("dispatching {} {} to custom endpoint", request.method(), relative);
    match invoke(endpoint, relative, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn invoke(endpoint: Endpoint, path: String, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, MAX_ENDPOINT_BODY)
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {}", e)))?;

    let query = match parts.extensions.get::<ParsedQuery>() {
        Some(parsed) => parsed.0.clone(),
        None => parts
            .uri
            .query()
            .map(crate::query::normalize_query)
            .unwrap_or_default(),
    };
    let user = parts.extensions.get::<CurrentUser>().and_then(|current| current.0.clone());

    let result = endpoint
        .handler
        .handle(EndpointRequest {
            method: parts.method,
            path,
            headers: parts.headers,
            query,
            user,
            body,
        })
        .await?;

    relay(result)
}

/// 3xx with a Location becomes a redirect; everything else relays status + JSON
fn relay(result: EndpointResponse) -> Result<Response, ApiError> {
    if result.status.is_redirection() {
        if let Some(location) = result.location() {
            return Ok((result.status, [(LOCATION, location.clone())]).into_response());
        }
    }

    let body = result
        .json()
        .map_err(|e| ApiError::internal(format!("Custom endpoint returned invalid JSON: {}", e)))?;
    Ok((result.status, Json(body)).into_response())
}
