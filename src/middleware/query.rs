use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::query::normalize_query;
use crate::types::ParsedQuery;

/// Parse the query string once and store it for handlers and the classifier
pub async fn parse_query(mut request: Request, next: Next) -> Response {
    let parsed = request.uri().query().map(normalize_query).unwrap_or_default();
    request.extensions_mut().insert(ParsedQuery(parsed));
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for ParsedQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(parsed) = parts.extensions.get::<ParsedQuery>() {
            return Ok(parsed.clone());
        }
        // Routers built without the middleware still get a parsed query
        Ok(ParsedQuery(parts.uri.query().map(normalize_query).unwrap_or_default()))
    }
}
