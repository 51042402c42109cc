use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};

use super::EngineError;
use crate::types::AuthenticatedUser;

/// A custom endpoint registered with the engine
#[derive(Clone)]
pub struct Endpoint {
    /// Path relative to the API prefix, e.g. "/special"
    pub path: String,
    /// Matched case-insensitively against the request method
    pub method: String,
    pub handler: Arc<dyn EndpointHandler>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: impl Into<String>, handler: impl EndpointHandler + 'static) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.path == path && self.method.eq_ignore_ascii_case(method.as_str())
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn handle(&self, req: EndpointRequest) -> Result<EndpointResponse, EngineError>;
}

#[async_trait]
impl<F, Fut> EndpointHandler for F
where
    F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EndpointResponse, EngineError>> + Send + 'static,
{
    async fn handle(&self, req: EndpointRequest) -> Result<EndpointResponse, EngineError> {
        (self)(req).await
    }
}

/// Request object synthesized for a custom endpoint handler
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub method: Method,
    /// Path with the API prefix stripped
    pub path: String,
    pub headers: HeaderMap,
    pub query: Map<String, Value>,
    pub user: Option<AuthenticatedUser>,
    pub body: Bytes,
}

impl EndpointRequest {
    /// Localization hook. No translations are loaded, so keys come back unchanged.
    pub fn t(&self, key: &str) -> String {
        key.to_string()
    }

    pub fn json_body(&self) -> Result<Value, EngineError> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// What a custom endpoint handler returns
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl EndpointResponse {
    pub fn with_json(status: StatusCode, value: &Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(value.to_string()),
        }
    }

    pub fn redirect(status: StatusCode, location: &str) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        let location = HeaderValue::from_str(location)
            .map_err(|e| EngineError::message(format!("invalid redirect location: {}", e)))?;
        headers.insert(header::LOCATION, location);
        Ok(Self {
            status,
            headers,
            body: Bytes::new(),
        })
    }

    /// Body parsed as JSON; an empty body reads as null
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
    }

    pub fn location(&self) -> Option<&HeaderValue> {
        self.headers.get(header::LOCATION)
    }
}
