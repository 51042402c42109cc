//! In-memory content engine.
//!
//! Backs the binary and the test suite. Documents live per collection in
//! insertion order; auth collections store a salted password hash and a
//! `sessions` list that login and logout maintain.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Utc;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    AuthResponse, ContentEngine, CountArgs, CreateArgs, DeleteArgs, EngineConfig, EngineError, Endpoint,
    FieldError, FindArgs, FindByIdArgs, LoginArgs, LogoutArgs, PaginatedDocs, UpdateArgs,
};
use crate::auth::{issue_token, Claims};
use crate::config::AppConfig;
use crate::filter::{Filter, FilterError};
use crate::types::{document_id, RequestContext};

pub const TOKEN_COOKIE: &str = "rest-token";

/// Fields never returned to callers
const HIDDEN_FIELDS: &[&str] = &["hash", "salt"];
/// Fields callers cannot write directly
const SYSTEM_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "hash", "salt", "sessions"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub slug: String,
    /// Auth collections accept login/logout and require email + password
    pub auth: bool,
    pub required: Vec<String>,
}

impl CollectionConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            auth: false,
            required: vec![],
        }
    }

    pub fn auth(slug: impl Into<String>) -> Self {
        Self {
            auth: true,
            ..Self::new(slug)
        }
    }

    pub fn required(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }
}

pub struct MemoryEngine {
    config: EngineConfig,
    collections: Vec<CollectionConfig>,
    token_expiry_hours: u64,
    docs: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryEngine {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            config: EngineConfig {
                secret: secret.into(),
                endpoints: vec![],
            },
            collections: vec![],
            token_expiry_hours: 2,
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_collection(mut self, collection: CollectionConfig) -> Self {
        self.collections.retain(|c| c.slug != collection.slug);
        self.collections.push(collection);
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoints.push(endpoint);
        self
    }

    pub fn with_token_expiry_hours(mut self, hours: u64) -> Self {
        self.token_expiry_hours = hours;
        self
    }

    /// Engine described by the application config: the user collection is an
    /// auth collection, every other configured slug a plain one.
    pub async fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        let user_collection = &config.security.user_collection;
        let mut engine = MemoryEngine::new(config.security.secret.clone())
            .with_token_expiry_hours(config.security.token_expiry_hours);

        for slug in &config.engine.collections {
            let collection = if slug == user_collection {
                CollectionConfig::auth(slug.clone())
            } else {
                CollectionConfig::new(slug.clone())
            };
            engine = engine.with_collection(collection);
        }

        if let Some(seed) = &config.engine.seed_admin {
            engine
                .seed_user(user_collection, &seed.email, &seed.password, json!({}))
                .await?;
            info!("seeded user {} into {}", seed.email, user_collection);
        }

        Ok(engine)
    }

    /// Create an auth-collection user without access checks
    pub async fn seed_user(
        &self,
        collection: &str,
        email: &str,
        password: &str,
        extra: Value,
    ) -> Result<Value, EngineError> {
        let mut data = match extra {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert("email".to_string(), Value::String(email.to_string()));
        data.insert("password".to_string(), Value::String(password.to_string()));

        self.create(CreateArgs {
            collection: collection.to_string(),
            data: Value::Object(data),
            req: RequestContext::anonymous(),
        })
        .await
    }

    fn collection(&self, slug: &str) -> Result<&CollectionConfig, EngineError> {
        self.collections
            .iter()
            .find(|c| c.slug == slug)
            .ok_or_else(|| EngineError::not_found(format!("Collection '{}' not found", slug)))
    }

    /// Anonymous callers only get through with `override_access`
    fn check_access(req: &RequestContext, override_access: bool) -> Result<(), EngineError> {
        if override_access || req.user.is_some() {
            return Ok(());
        }
        Err(EngineError::forbidden("You are not allowed to perform this action."))
    }

    fn validate(
        collection: &CollectionConfig,
        data: &Map<String, Value>,
        existing: Option<&Map<String, Value>>,
    ) -> Result<(), EngineError> {
        let mut required: Vec<&str> = collection.required.iter().map(String::as_str).collect();
        if collection.auth {
            required.push("email");
            if existing.is_none() {
                required.push("password");
            }
        }

        let mut errors = Vec::new();
        for field in required {
            let value = data.get(field).or_else(|| existing.and_then(|e| e.get(field)));
            if is_blank(value) {
                errors.push(FieldError {
                    field: field.to_string(),
                    message: "This field is required.".to_string(),
                });
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        let message = if fields.len() == 1 {
            format!("The following field is invalid: {}", fields[0])
        } else {
            format!("The following fields are invalid: {}", fields.join(", "))
        };
        Err(EngineError::validation(message, errors))
    }

    fn set_password(doc: &mut Map<String, Value>, password: &str) {
        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&salt, password);
        doc.insert("salt".to_string(), Value::String(salt));
        doc.insert("hash".to_string(), Value::String(hash));
    }

    fn find_index(docs: &[Value], id: &str) -> Option<usize> {
        docs.iter().position(|d| document_id(d).as_deref() == Some(id))
    }

    fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderMap, EngineError> {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            TOKEN_COOKIE, token, max_age_secs
        );
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| EngineError::message(format!("invalid session cookie: {}", e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, value);
        Ok(headers)
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_object(data: Value) -> Result<Map<String, Value>, EngineError> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(EngineError::validation(
            "The document must be an object",
            vec![FieldError {
                field: "data".to_string(),
                message: "Expected a JSON object.".to_string(),
            }],
        )),
    }
}

fn strip_system_fields(data: &mut Map<String, Value>) {
    for field in SYSTEM_FIELDS {
        data.remove(*field);
    }
}

/// Copy of `doc` without hidden fields
fn present(doc: &Value) -> Value {
    let mut out = doc.clone();
    if let Value::Object(map) = &mut out {
        for field in HIDDEN_FIELDS {
            map.remove(*field);
        }
    }
    out
}

impl From<FilterError> for EngineError {
    fn from(err: FilterError) -> Self {
        let field = err.param().to_string();
        let message = err.to_string();
        EngineError::validation(
            format!("The following field is invalid: {}", field),
            vec![FieldError { field, message }],
        )
    }
}

#[async_trait]
impl ContentEngine for MemoryEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn collections(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.slug.clone()).collect()
    }

    async fn find(&self, args: FindArgs) -> Result<PaginatedDocs, EngineError> {
        self.collection(&args.collection)?;
        Self::check_access(&args.req, args.override_access)?;
        let filter = Filter::from_query(&args.query)?;

        let store = self.docs.read().await;
        let docs: Vec<Value> = store
            .get(&args.collection)
            .map(|docs| docs.iter().map(present).collect())
            .unwrap_or_default();

        debug!(
            "find {} depth={} limit={} page={}",
            args.collection,
            args.depth,
            filter.limit(),
            filter.page()
        );
        Ok(filter.apply(docs))
    }

    async fn count(&self, args: CountArgs) -> Result<u64, EngineError> {
        self.collection(&args.collection)?;
        Self::check_access(&args.req, args.override_access)?;
        let filter = Filter::from_query(&args.query)?;

        let store = self.docs.read().await;
        Ok(store
            .get(&args.collection)
            .map(|docs| filter.count(docs))
            .unwrap_or(0))
    }

    async fn find_by_id(&self, args: FindByIdArgs) -> Result<Option<Value>, EngineError> {
        self.collection(&args.collection)?;
        Self::check_access(&args.req, args.override_access)?;

        let store = self.docs.read().await;
        Ok(store
            .get(&args.collection)
            .and_then(|docs| Self::find_index(docs, &args.id).map(|i| present(&docs[i]))))
    }

    async fn create(&self, args: CreateArgs) -> Result<Value, EngineError> {
        let collection = self.collection(&args.collection)?;
        let mut data = as_object(args.data)?;
        Self::validate(collection, &data, None)?;
        let password = data.remove("password");
        strip_system_fields(&mut data);

        let mut store = self.docs.write().await;
        let docs = store.entry(args.collection.clone()).or_default();

        if collection.auth {
            let email = data.get("email").cloned().unwrap_or(Value::Null);
            if docs.iter().any(|d| d.get("email") == Some(&email)) {
                return Err(EngineError::validation(
                    "The following field is invalid: email",
                    vec![FieldError {
                        field: "email".to_string(),
                        message: "A user with the given email is already registered.".to_string(),
                    }],
                ));
            }
            if let Some(Value::String(password)) = &password {
                Self::set_password(&mut data, password);
            }
            data.insert("sessions".to_string(), json!([]));
        }

        let now = Utc::now().to_rfc3339();
        data.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        data.insert("createdAt".to_string(), Value::String(now.clone()));
        data.insert("updatedAt".to_string(), Value::String(now));

        let doc = Value::Object(data);
        docs.push(doc.clone());
        debug!("created document in {}", args.collection);
        Ok(present(&doc))
    }

    async fn update(&self, args: UpdateArgs) -> Result<Value, EngineError> {
        let collection = self.collection(&args.collection)?;
        Self::check_access(&args.req, false)?;
        let mut data = as_object(args.data)?;
        let password = data.remove("password");
        strip_system_fields(&mut data);

        let mut store = self.docs.write().await;
        let docs = store.entry(args.collection.clone()).or_default();
        let index = Self::find_index(docs, &args.id)
            .ok_or_else(|| EngineError::not_found(format!("Document '{}' not found in {}", args.id, args.collection)))?;

        let Value::Object(existing) = &docs[index] else {
            return Err(EngineError::message("stored document is not an object"));
        };
        Self::validate(collection, &data, Some(existing))?;

        let mut merged = existing.clone();
        for (key, value) in data {
            merged.insert(key, value);
        }
        if collection.auth {
            if let Some(Value::String(password)) = &password {
                Self::set_password(&mut merged, password);
            }
        }
        merged.insert("updatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));

        docs[index] = Value::Object(merged);
        Ok(present(&docs[index]))
    }

    async fn delete(&self, args: DeleteArgs) -> Result<Value, EngineError> {
        self.collection(&args.collection)?;
        Self::check_access(&args.req, false)?;

        let mut store = self.docs.write().await;
        let docs = store.entry(args.collection.clone()).or_default();
        let index = Self::find_index(docs, &args.id)
            .ok_or_else(|| EngineError::not_found(format!("Document '{}' not found in {}", args.id, args.collection)))?;

        let removed = docs.remove(index);
        Ok(present(&removed))
    }

    async fn login(&self, args: LoginArgs) -> Result<AuthResponse, EngineError> {
        let collection = self.collection(&args.collection)?;
        if !collection.auth {
            return Err(EngineError::not_found(format!(
                "Auth collection '{}' not found",
                args.collection
            )));
        }

        let credentials = args.data.as_object().cloned().unwrap_or_default();
        let mut errors = Vec::new();
        for field in ["email", "password"] {
            if is_blank(credentials.get(field)) {
                errors.push(FieldError {
                    field: field.to_string(),
                    message: "This field is required.".to_string(),
                });
            }
        }
        if !errors.is_empty() {
            return Err(EngineError::validation("Missing email or password", errors));
        }
        let email = credentials.get("email").and_then(Value::as_str).unwrap_or_default();
        let password = credentials.get("password").and_then(Value::as_str).unwrap_or_default();

        let mut store = self.docs.write().await;
        let docs = store.entry(args.collection.clone()).or_default();
        let incorrect = || EngineError::unauthorized("The email or password provided is incorrect.");

        let index = docs
            .iter()
            .position(|d| d.get("email").and_then(Value::as_str) == Some(email))
            .ok_or_else(incorrect)?;
        let Value::Object(user) = &mut docs[index] else {
            return Err(incorrect());
        };

        let salt = user.get("salt").and_then(Value::as_str).unwrap_or_default();
        let hash = user.get("hash").and_then(Value::as_str).unwrap_or_default();
        if hash.is_empty() || hash_password(salt, password) != hash {
            return Err(incorrect());
        }

        let id = document_id(&Value::Object(user.clone())).ok_or_else(incorrect)?;
        let claims = Claims::new(id, args.collection.clone(), self.token_expiry_hours)
            .map_err(|e| EngineError::message(e.to_string()))?
            .with_email(email);
        let token = issue_token(&self.config.secret, &claims)
            .map_err(|e| EngineError::message(e.to_string()))?;

        let session = json!({
            "id": Uuid::new_v4().to_string(),
            "createdAt": Utc::now().to_rfc3339(),
            "expiresAt": chrono::DateTime::from_timestamp(claims.exp, 0).map(|d| d.to_rfc3339()),
        });
        match user.get_mut("sessions") {
            Some(Value::Array(sessions)) => sessions.push(session),
            _ => {
                user.insert("sessions".to_string(), json!([session]));
            }
        }

        let headers = Self::session_cookie(&token, claims.exp - claims.iat)?;
        Ok(AuthResponse {
            body: json!({
                "message": "Auth Passed",
                "user": present(&docs[index]),
                "token": token,
                "exp": claims.exp,
            }),
            headers,
        })
    }

    async fn logout(&self, args: LogoutArgs) -> Result<AuthResponse, EngineError> {
        self.collection(&args.collection)?;
        let user = args
            .req
            .user
            .as_ref()
            .filter(|u| u.collection == args.collection)
            .ok_or_else(|| EngineError::unauthorized("You are not logged in."))?;
        let id = user.id().ok_or_else(|| EngineError::unauthorized("You are not logged in."))?;

        let mut store = self.docs.write().await;
        if let Some(docs) = store.get_mut(&args.collection) {
            if let Some(index) = Self::find_index(docs, &id) {
                if let Value::Object(doc) = &mut docs[index] {
                    doc.insert("sessions".to_string(), json!([]));
                }
            }
        }

        Ok(AuthResponse {
            body: json!({ "message": "You have been logged out successfully." }),
            headers: Self::session_cookie("", 0)?,
        })
    }
}
