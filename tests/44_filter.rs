mod common;

use anyhow::Result;
use collection_rest::AdapterSettings;
use reqwest::StatusCode;
use serde_json::{json, Value};

// Query strings go through the normalizer before reaching the engine, so
// numeric and boolean filter values compare against typed document fields.

async fn seeded() -> Result<(common::TestServer, reqwest::Client, String)> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let token = common::login(&server, &client).await?;

    let posts = [
        json!({ "title": "Intro to Rust", "views": 120, "published": true }),
        json!({ "title": "Async in depth", "views": 45, "published": true }),
        json!({ "title": "Draft notes", "views": 3, "published": false }),
    ];
    for post in posts {
        common::create_post(&server, &client, &token, post).await?;
    }
    Ok((server, client, token))
}

async fn find(server: &common::TestServer, client: &reqwest::Client, token: &str, query: &str) -> Result<Value> {
    let res = client
        .get(server.url(&format!("/api/posts?{}", query)))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "query {:?}", query);
    Ok(res.json::<Value>().await?)
}

fn titles(body: &Value) -> Vec<String> {
    body["docs"]
        .as_array()
        .map(|docs| docs.iter().filter_map(|d| d["title"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn boolean_and_numeric_filters() -> Result<()> {
    let (server, client, token) = seeded().await?;

    let body = find(&server, &client, &token, "where[published][equals]=false").await?;
    assert_eq!(titles(&body), vec!["Draft notes"]);

    let body = find(&server, &client, &token, "where[views][greater_than]=40&sort=-views").await?;
    assert_eq!(titles(&body), vec!["Intro to Rust", "Async in depth"]);
    Ok(())
}

#[tokio::test]
async fn or_branches_from_indexed_keys() -> Result<()> {
    let (server, client, token) = seeded().await?;

    let body = find(
        &server,
        &client,
        &token,
        "where[or][0][views][less_than]=10&where[or][1][title][like]=rust&sort=title",
    )
    .await?;
    assert_eq!(titles(&body), vec!["Draft notes", "Intro to Rust"]);
    Ok(())
}

#[tokio::test]
async fn pagination_envelope() -> Result<()> {
    let (server, client, token) = seeded().await?;

    let body = find(&server, &client, &token, "limit=2&page=2&sort=views").await?;
    assert_eq!(body["totalDocs"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["hasPrevPage"], true);
    assert_eq!(body["hasNextPage"], false);
    assert_eq!(titles(&body), vec!["Intro to Rust"]);
    Ok(())
}

#[tokio::test]
async fn invalid_sort_is_a_validation_error() -> Result<()> {
    let (server, client, token) = seeded().await?;

    let res = client
        .get(server.url("/api/posts?sort=-"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["data"][0]["field"], "sort");
    Ok(())
}

#[tokio::test]
async fn simple_mode_returns_documents_only() -> Result<()> {
    let server = common::spawn_with(AdapterSettings {
        simple_find: true,
        ..AdapterSettings::default()
    })
    .await?;
    let client = reqwest::Client::new();
    let token = common::login(&server, &client).await?;
    common::create_post(&server, &client, &token, json!({ "title": "only" })).await?;

    let res = client
        .get(server.url("/api/posts"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    let docs = body.as_array().cloned().unwrap_or_default();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["title"], "only");
    Ok(())
}
