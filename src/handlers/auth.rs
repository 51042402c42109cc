use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;

use crate::engine::{AuthResponse, FindByIdArgs, LoginArgs, LogoutArgs};
use crate::error::ApiError;
use crate::middleware::require_user::NOT_ALLOWED;
use crate::state::AppState;
use crate::types::{ParsedQuery, RequestContext};

use super::utils::{strip_sessions, take_depth};

/// Engine body plus whatever headers it set (session cookies)
fn relay(result: AuthResponse) -> Response {
    (result.headers, Json(result.body)).into_response()
}

/// POST /:collection/login
pub async fn login(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    ctx: RequestContext,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(data) = payload?;

    let result = state
        .engine
        .login(LoginArgs {
            collection,
            data,
            req: ctx,
        })
        .await?;

    Ok(relay(result))
}

/// POST /:collection/logout
pub async fn logout(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let result = state
        .engine
        .logout(LogoutArgs { collection, req: ctx })
        .await?;

    Ok(relay(result))
}

/// GET /:collection/me - the caller's own record, without sessions
pub async fn me(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    ParsedQuery(mut query): ParsedQuery,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let id = ctx
        .user
        .as_ref()
        .and_then(|user| user.id())
        .ok_or_else(|| ApiError::unauthorized(NOT_ALLOWED))?;
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

    Ok(Json(strip_sessions(doc)))
}
