//! The content engine seam.
//!
//! Everything the adapter forwards to lives behind [`ContentEngine`]. Query
//! planning, access control, validation and persistence are the engine's job;
//! the adapter only builds argument structs and reshapes results.

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::RequestContext;

pub mod endpoint;
pub mod memory;

pub use endpoint::{Endpoint, EndpointHandler, EndpointRequest, EndpointResponse};
pub use memory::{CollectionConfig, MemoryEngine};

/// Engine-wide settings the adapter reads
#[derive(Clone, Default)]
pub struct EngineConfig {
    /// Shared secret the bearer-token verification key is derived from
    pub secret: String,
    /// Custom endpoints, matched by exact path and method
    pub endpoints: Vec<Endpoint>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("secret", &"<redacted>")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FindArgs {
    pub collection: String,
    pub depth: u32,
    /// Every query parameter except `depth`: where, sort, limit, page, ...
    pub query: Map<String, Value>,
    pub override_access: bool,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct CountArgs {
    pub collection: String,
    pub depth: u32,
    pub query: Map<String, Value>,
    pub override_access: bool,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct FindByIdArgs {
    pub collection: String,
    pub id: String,
    pub depth: u32,
    pub override_access: bool,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub collection: String,
    pub data: Value,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct UpdateArgs {
    pub collection: String,
    pub id: String,
    pub data: Value,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct DeleteArgs {
    pub collection: String,
    pub id: String,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct LoginArgs {
    pub collection: String,
    /// Credentials exactly as posted
    pub data: Value,
    pub req: RequestContext,
}

#[derive(Debug, Clone)]
pub struct LogoutArgs {
    pub collection: String,
    pub req: RequestContext,
}

/// Result of login/logout: a body plus response headers (session cookies)
#[derive(Debug, Clone, Default)]
pub struct AuthResponse {
    pub body: Value,
    pub headers: HeaderMap,
}

/// Paginated find-many envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDocs {
    pub docs: Vec<Value>,
    pub total_docs: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub page: u64,
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl PaginatedDocs {
    /// Slice `all` into the requested page. `limit == 0` means everything on one page.
    pub fn paginate(all: Vec<Value>, limit: u64, page: u64) -> Self {
        let total_docs = all.len() as u64;
        let page = page.max(1);
        let effective_limit = if limit == 0 { total_docs.max(1) } else { limit };
        let total_pages = if total_docs == 0 {
            1
        } else {
            total_docs.div_ceil(effective_limit)
        };

        // Offsets saturate so an absurd page is simply past the end
        let offset = (page - 1).saturating_mul(effective_limit);
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(effective_limit).unwrap_or(usize::MAX);
        let docs: Vec<Value> = all.into_iter().skip(start).take(take).collect();

        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;

        Self {
            docs,
            total_docs,
            limit: effective_limit,
            total_pages,
            page,
            paging_counter: offset.saturating_add(1),
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }
}

/// Field-level validation detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Errors raised by the engine. The adapter classifies them by shape, not by variant.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        EngineError::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        EngineError::Status {
            status: 401,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        EngineError::Status {
            status: 403,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::Status {
            status: 404,
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        EngineError::Message(message.into())
    }

    /// Field-level details, present only on validation-shaped errors
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            EngineError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Validation { .. } => Some(400),
            EngineError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "ValidationError",
            EngineError::Status { .. } => "APIError",
            EngineError::Message(_) | EngineError::Json(_) => "Error",
        }
    }
}

/// Operations the adapter forwards to.
///
/// Every call receives the [`RequestContext`] so the engine can enforce its
/// own per-collection access rules on top of the adapter's authenticated gate.
#[async_trait]
pub trait ContentEngine: Send + Sync {
    fn config(&self) -> &EngineConfig;

    /// Registered collection slugs
    fn collections(&self) -> Vec<String>;

    fn has_collection(&self, slug: &str) -> bool {
        self.collections().iter().any(|c| c == slug)
    }

    async fn find(&self, args: FindArgs) -> Result<PaginatedDocs, EngineError>;

    async fn count(&self, args: CountArgs) -> Result<u64, EngineError>;

    /// `Ok(None)` when the record does not exist
    async fn find_by_id(&self, args: FindByIdArgs) -> Result<Option<Value>, EngineError>;

    async fn create(&self, args: CreateArgs) -> Result<Value, EngineError>;

    async fn update(&self, args: UpdateArgs) -> Result<Value, EngineError>;

    async fn delete(&self, args: DeleteArgs) -> Result<Value, EngineError>;

    async fn login(&self, args: LoginArgs) -> Result<AuthResponse, EngineError>;

    async fn logout(&self, args: LogoutArgs) -> Result<AuthResponse, EngineError>;
}
