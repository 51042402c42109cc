#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use collection_rest::engine::{
    CollectionConfig, ContentEngine, EngineError, Endpoint, EndpointRequest, EndpointResponse, MemoryEngine,
};
use collection_rest::{app, AdapterSettings, AppState};

pub const SECRET: &str = "integration-secret";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "integration-password";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub engine: Arc<MemoryEngine>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Engine with `users` (auth), `posts` (title required) and a few custom endpoints
pub fn engine() -> MemoryEngine {
    MemoryEngine::new(SECRET)
        .with_collection(CollectionConfig::auth("users"))
        .with_collection(CollectionConfig::new("posts").required("title"))
        .with_endpoint(Endpoint::new("/special", "GET", |req: EndpointRequest| async move {
            Ok::<_, EngineError>(EndpointResponse::with_json(
                StatusCode::OK,
                &json!({ "special": true, "path": req.path, "query": req.query }),
            ))
        }))
        .with_endpoint(Endpoint::new("/teapot", "POST", |req: EndpointRequest| async move {
            let body = req.json_body()?;
            Ok::<_, EngineError>(EndpointResponse::with_json(
                StatusCode::IM_A_TEAPOT,
                &json!({ "brewed": false, "received": body }),
            ))
        }))
        .with_endpoint(Endpoint::new("/docs", "GET", |_req: EndpointRequest| async {
            EndpointResponse::redirect(StatusCode::TEMPORARY_REDIRECT, "/api/special")
        }))
}

/// Serve the router on a free port with a seeded admin user
pub async fn spawn_server() -> Result<TestServer> {
    spawn_with(AdapterSettings::default()).await
}

pub async fn spawn_with(settings: AdapterSettings) -> Result<TestServer> {
    let engine = Arc::new(engine());
    engine
        .seed_user("users", ADMIN_EMAIL, ADMIN_PASSWORD, json!({ "name": "Admin" }))
        .await
        .context("failed to seed admin")?;

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let state = AppState::new(engine.clone() as Arc<dyn ContentEngine>, settings);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    let server = TestServer { port, base_url, engine };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// Log the seeded admin in and return the bearer token
pub async fn login(server: &TestServer, client: &reqwest::Client) -> Result<String> {
    let res = client
        .post(server.url("/api/users/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

    let body = res.json::<Value>().await?;
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no token")
}

pub async fn create_post(server: &TestServer, client: &reqwest::Client, token: &str, data: Value) -> Result<Value> {
    let res = client
        .post(server.url("/api/posts"))
        .bearer_auth(token)
        .json(&data)
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());
    Ok(res.json::<Value>().await?)
}
