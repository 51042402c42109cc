//! Request-scoped types shared by middleware, handlers and the engine seam

use axum::http::HeaderMap;
use serde_json::{Map, Value};

/// User record resolved from a bearer token, together with the collection it came from
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub collection: String,
    pub doc: Value,
}

impl AuthenticatedUser {
    pub fn new(collection: impl Into<String>, doc: Value) -> Self {
        Self {
            collection: collection.into(),
            doc,
        }
    }

    pub fn id(&self) -> Option<String> {
        document_id(&self.doc)
    }
}

/// Request data handed to every engine call so the engine can run its own access rules
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<AuthenticatedUser>,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn new(user: Option<AuthenticatedUser>, headers: HeaderMap) -> Self {
        Self { user, headers }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Parsed and coerced query string, stored in request extensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery(pub Map<String, Value>);

/// Resolved user (if any), stored in request extensions by the auth resolver
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

/// Ids are strings in most engines but numeric ids are accepted too
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_accepts_strings_and_numbers() {
        assert_eq!(document_id(&json!({"id": "abc"})), Some("abc".to_string()));
        assert_eq!(document_id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(document_id(&json!({"id": ""})), None);
        assert_eq!(document_id(&json!({"name": "x"})), None);
    }
}
