use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::types::CurrentUser;

pub const NOT_ALLOWED: &str = "You are not allowed to perform this action.";

/// Gate for routes that need a resolved user. Runs after `resolve_user`.
pub async fn require_user(request: Request, next: Next) -> Result<Response, ApiError> {
    let authenticated = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|current| current.0.is_some());

    if !authenticated {
        return Err(ApiError::unauthorized(NOT_ALLOWED));
    }

    Ok(next.run(request).await)
}
