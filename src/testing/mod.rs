use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::{issue_token, Claims};
use crate::engine::{
    CollectionConfig, ContentEngine, CreateArgs, EngineError, Endpoint, EndpointRequest, EndpointResponse,
    MemoryEngine,
};
use crate::router::app;
use crate::state::{AdapterSettings, AppState};
use crate::types::{document_id, AuthenticatedUser, RequestContext};

pub const TEST_SECRET: &str = "test-secret";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// Router over a seeded memory engine with a few custom endpoints
pub struct TestApp {
    pub router: Router,
    pub engine: Arc<MemoryEngine>,
    pub admin_id: String,
    prefix: String,
    special_calls: Arc<AtomicUsize>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(AdapterSettings::default()).await
    }

    pub async fn with_settings(settings: AdapterSettings) -> Self {
        let special_calls = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(test_engine(special_calls.clone()));

        let admin = engine
            .seed_user("users", ADMIN_EMAIL, ADMIN_PASSWORD, json!({ "name": "Admin" }))
            .await
            .expect("failed to seed admin");
        let admin_id = document_id(&admin).expect("seeded admin has an id");

        let prefix = settings.prefix.clone();
        let state = AppState::new(engine.clone() as Arc<dyn ContentEngine>, settings);

        Self {
            router: app(state),
            engine,
            admin_id,
            prefix,
            special_calls,
        }
    }

    /// Log the admin in through the router and return the token
    pub async fn login(&self) -> String {
        self.login_at(&format!("{}/users/login", self.prefix)).await
    }

    pub async fn login_at(&self, path: &str) -> String {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }).to_string(),
            ))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "login failed");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["token"].as_str().expect("login returns a token").to_string()
    }

    /// Insert posts directly through the engine as the admin
    pub async fn seed_posts(&self, titles: &[&str]) {
        let admin = json!({ "id": self.admin_id, "email": ADMIN_EMAIL });
        let req = RequestContext::new(Some(AuthenticatedUser::new("users", admin)), Default::default());

        for title in titles {
            self.engine
                .create(CreateArgs {
                    collection: "posts".to_string(),
                    data: json!({ "title": title }),
                    req: req.clone(),
                })
                .await
                .expect("failed to seed post");
        }
    }

    /// How many times GET /special ran
    pub fn special_calls(&self) -> usize {
        self.special_calls.load(Ordering::SeqCst)
    }
}

fn test_engine(special_calls: Arc<AtomicUsize>) -> MemoryEngine {
    MemoryEngine::new(TEST_SECRET)
        .with_collection(CollectionConfig::auth("users"))
        .with_collection(CollectionConfig::new("posts").required("title"))
        .with_endpoint(Endpoint::new("/special", "GET", move |req: EndpointRequest| {
            let calls = special_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EngineError>(EndpointResponse::with_json(
                    StatusCode::OK,
                    &json!({ "special": true, "query": req.query }),
                ))
            }
        }))
        .with_endpoint(Endpoint::new("/whoami", "get", |req: EndpointRequest| async move {
            let email = req
                .user
                .as_ref()
                .and_then(|u| u.doc.get("email").cloned())
                .unwrap_or(Value::Null);
            Ok::<_, EngineError>(EndpointResponse::with_json(StatusCode::OK, &json!({ "email": email })))
        }))
        .with_endpoint(Endpoint::new("/go", "GET", |_req: EndpointRequest| async {
            EndpointResponse::redirect(StatusCode::FOUND, "/api/special")
        }))
}

/// Valid token for a user id in the `users` collection
pub fn token_for(id: &str) -> String {
    token_signed_with(TEST_SECRET, id)
}

pub fn token_signed_with(secret: &str, id: &str) -> String {
    issue_token(secret, &Claims::new(id, "users", 1).unwrap()).unwrap()
}

pub fn expired_token(id: &str) -> String {
    let mut claims = Claims::new(id, "users", 1).unwrap();
    claims.exp = chrono::Utc::now().timestamp() - 3600;
    issue_token(TEST_SECRET, &claims).unwrap()
}
