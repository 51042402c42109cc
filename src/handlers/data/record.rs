use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde_json::Value;

use crate::engine::{DeleteArgs, FindByIdArgs, UpdateArgs};
use crate::error::ApiError;
use crate::handlers::utils::take_depth;
use crate::state::AppState;
use crate::types::{ParsedQuery, RequestContext};

/// GET /:collection/:id
pub async fn get(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    ParsedQuery(mut query): ParsedQuery,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let depth = take_depth(&mut query, 2);

    let doc = state
        .engine
        .find_by_id(FindByIdArgs {
            collection: collection.clone(),
            id: id.clone(),
            depth,
            override_access: false,
            req: ctx,
        })
        .await?
        .ok_or_else(|| ApiError::record_not_found(&collection, &id))?;

    Ok(Json(doc))
}

/// PATCH /:collection/:id
pub async fn patch(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    ctx: RequestContext,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(data) = payload?;

    let doc = state
        .engine
        .update(UpdateArgs {
            collection,
            id,
            data,
            req: ctx,
        })
        .await?;

    Ok(Json(doc))
}

/// DELETE /:collection/:id
pub async fn delete(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let doc = state
        .engine
        .delete(DeleteArgs {
            collection,
            id,
            req: ctx,
        })
        .await?;

    Ok(Json(doc))
}
