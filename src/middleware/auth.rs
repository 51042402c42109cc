use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::{bearer_token, verify_token};
use crate::engine::FindByIdArgs;
use crate::state::AppState;
use crate::types::{AuthenticatedUser, CurrentUser, RequestContext};

/// Resolve the bearer token (if any) into a user and store it on the request.
///
/// Never rejects: a missing, malformed, expired or orphaned token leaves the
/// request anonymous and the route gates decide what that means.
pub async fn resolve_user(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user = authenticate(&state, request.headers()).await;
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = bearer_token(header)?;

    let claims = match verify_token(&state.engine.config().secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("ignoring bearer token: {}", e);
            return None;
        }
    };
    let id = claims.subject()?.to_string();
    let collection = claims
        .collection
        .clone()
        .unwrap_or_else(|| state.settings.user_collection.clone());

    // The token is the access proof, so the lookup bypasses access rules
    let lookup = state
        .engine
        .find_by_id(FindByIdArgs {
            collection: collection.clone(),
            id: id.clone(),
            depth: 0,
            override_access: true,
            req: RequestContext::new(None, headers.clone()),
        })
        .await;

    match lookup {
        Ok(Some(doc)) => Some(AuthenticatedUser::new(collection, doc)),
        Ok(None) => {
            debug!("token subject {} not found in {}", id, collection);
            None
        }
        Err(e) => {
            debug!("token user lookup failed for {} in {}: {}", id, collection, e);
            None
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<CurrentUser>().and_then(|current| current.0.clone());
        Ok(RequestContext::new(user, parts.headers.clone()))
    }
}
