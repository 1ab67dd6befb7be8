use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use broadcast::{
    CompletionError, FactCompletion, PushError, PushSender,
    openrouter::{DEFAULT_BASE_URL, DEFAULT_MODEL},
    push::PushReport,
};
use server::{app, config::Config, state::AppState};
use store::{FactStore, memory::MemoryStore, models::NewFact};

struct FixedCompletion {
    reply: String,
}

#[async_trait]
impl FactCompletion for FixedCompletion {
    async fn complete(&self, _category: &str) -> Result<String, CompletionError> {
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
struct RecordingPush {
    sent: Mutex<Vec<(String, String, Vec<String>)>>,
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send_multicast(
        &self,
        title: &str,
        body: &str,
        tokens: &[String],
    ) -> Result<PushReport, PushError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string(), tokens.to_vec()));
        Ok(PushReport {
            success_count: tokens.len() as u32,
            failure_count: 0,
        })
    }
}

fn test_config() -> Config {
    Config {
        port: 0,
        redis_url: String::new(),
        openrouter_url: DEFAULT_BASE_URL.to_string(),
        openrouter_model: DEFAULT_MODEL.to_string(),
        openrouter_api_key: String::new(),
        push_endpoint: String::new(),
        push_api_key: String::new(),
    }
}

fn test_app(
    store: Arc<MemoryStore>,
    push: Arc<RecordingPush>,
) -> Router {
    let state = Arc::new(AppState {
        config: test_config(),
        store,
        ai: Arc::new(FixedCompletion {
            reply: "Fact: Helium was found on the sun first.\nExplanation: Spectroscopy."
                .to_string(),
        }),
        push,
    });

    app(state)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

fn new_fact(text: &str, category: &str) -> NewFact {
    NewFact {
        fact: text.to_string(),
        explanation: String::new(),
        category: category.to_string(),
        raw_ai: String::new(),
        full_fact: None,
    }
}

#[tokio::test]
async fn save_token_then_broadcast_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store.clone(), push.clone());

    let (status, body) = post_json(
        &router,
        "/api/saveToken",
        json!({ "token": "abc", "category": "Science" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Token saved successfully");

    // Token state does not affect the archive.
    let (status, body) = get(&router, "/api/getFacts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["facts"].as_array().unwrap().len(), 0);

    let (status, body) = post_json(&router, "/api/sendDailyFact", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["category"], "Science");
    assert_eq!(results[0]["success"], 1);
    assert_eq!(results[0]["failure"], 0);

    let (status, body) = get(&router, "/api/getFacts").await;
    assert_eq!(status, StatusCode::OK);
    let facts = body["facts"].as_array().unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0]["category"], "Science");
    assert_eq!(facts[0]["fact"], "Helium was found on the sun first.");

    let sent = push.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, vec!["abc".to_string()]);
}

#[tokio::test]
async fn broadcast_without_subscribers_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store, push.clone());

    let (status, body) = post_json(&router, "/api/sendDailyFact", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No subscribers found.");
    assert!(push.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn save_token_requires_a_token() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store, push);

    let (status, body) = post_json(&router, "/api/saveToken", json!({ "category": "Science" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("token"));
}

#[tokio::test]
async fn mutations_reject_non_post() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store, push);

    for uri in [
        "/api/saveToken",
        "/api/saveFavorite",
        "/api/removeFavorite",
        "/api/sendDailyFact",
    ] {
        let (status, _) = get(&router, uri).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
    }
}

#[tokio::test]
async fn favorites_require_identifying_params() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store, push);

    let (status, _) = get(&router, "/api/getFavorites").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&router, "/api/getSharedFavorites").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(&router, "/api/saveFavorite", json!({ "token": "abc" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("factId"));
}

#[tokio::test]
async fn favorite_save_list_share_remove_flow() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store, push);

    let (status, _) = post_json(
        &router,
        "/api/saveFavorite",
        json!({
            "token": "abc",
            "factId": "f1",
            "fact": "Bananas are berries",
            "explanation": "Botany",
            "category": "Science",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&router, "/api/getFavorites?token=abc").await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "f1");

    let (status, body) = get(&router, "/api/getFavorites?token=abc&q=spoons").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let (status, body) = get(&router, "/api/getSharedFavorites?user=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorites"].as_array().unwrap().len(), 1);

    let (status, _) = post_json(
        &router,
        "/api/removeFavorite",
        json!({ "token": "abc", "factId": "f1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&router, "/api/getFavorites?token=abc").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn facts_paginate_without_overlap() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..5 {
        store
            .insert_fact(new_fact(&format!("fact {i}"), "Science"))
            .await
            .unwrap();
    }
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store, push);

    let (status, body) = get(&router, "/api/getFacts?pageSize=2").await;
    assert_eq!(status, StatusCode::OK);
    let first: Vec<String> = body["facts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["fact"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(first, ["fact 4", "fact 3"]);

    let cursor = body["nextCursor"].as_i64().unwrap();
    let (_, body) = get(&router, &format!("/api/getFacts?pageSize=2&cursor={cursor}")).await;
    let second: Vec<String> = body["facts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["fact"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(second, ["fact 2", "fact 1"]);
}

#[tokio::test]
async fn latest_fact_is_null_when_empty() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPush::default());
    let router = test_app(store.clone(), push);

    let (status, body) = get(&router, "/api/getLatestFact").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["fact"].is_null());

    store.insert_fact(new_fact("newest", "Science")).await.unwrap();
    let (_, body) = get(&router, "/api/getLatestFact").await;
    assert_eq!(body["fact"], "newest");
    assert!(body["id"].is_string());
}
