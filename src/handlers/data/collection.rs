use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::engine::{CountArgs, CreateArgs, FindArgs};
use crate::error::ApiError;
use crate::handlers::utils::take_depth;
use crate::state::AppState;
use crate::types::{ParsedQuery, RequestContext};

/// GET /:collection - paginated find, or a bare array in simple mode
pub async fn find(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    ParsedQuery(mut query): ParsedQuery,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let depth = take_depth(&mut query, 0);

    let result = state
        .engine
        .find(FindArgs {
            collection,
            depth,
            query,
            override_access: false,
            req: ctx,
        })
        .await?;

    if state.settings.simple_find {
        return Ok(Json(Value::Array(result.docs)).into_response());
    }

    let envelope = serde_json::to_value(result)
        .map_err(|e| ApiError::internal(format!("Failed to serialize result: {}", e)))?;
    Ok(Json(envelope).into_response())
}

/// GET /:collection/count
pub async fn count(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    ParsedQuery(mut query): ParsedQuery,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let depth = take_depth(&mut query, 0);

    let total = state
        .engine
        .count(CountArgs {
            collection,
            depth,
            query,
            override_access: false,
            req: ctx,
        })
        .await?;

    Ok(Json(json!({ "totalDocs": total })))
}

/// POST /:collection
pub async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    ctx: RequestContext,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(data) = payload?;

    let doc = state
        .engine
        .create(CreateArgs {
            collection,
            data,
            req: ctx,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(doc)))
}
