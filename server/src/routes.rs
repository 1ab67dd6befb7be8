use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use broadcast::BroadcastOutcome;
use store::models::{ErrorEntry, Favorite, now_ms};

use crate::{
    error::AppError,
    state::AppState,
    utils::{filter_by_query, next_cursor},
};

const FACTS_PAGE_SIZE: usize = 20;
const FAVORITES_PAGE_SIZE: usize = 10;
const DEFAULT_CATEGORY: &str = "Random";

fn require(value: Option<String>, name: &'static str) -> Result<String, AppError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(AppError::MissingParam(name))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactsParams {
    category: Option<String>,
    cursor: Option<i64>,
    page_size: Option<usize>,
}

pub async fn get_facts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FactsParams>,
) -> Result<Json<Value>, AppError> {
    // "All" means no filter, matching the frontend's default tab.
    let category = params
        .category
        .filter(|category| !category.is_empty() && category != "All");
    let page_size = params.page_size.unwrap_or(FACTS_PAGE_SIZE);

    let facts = state
        .store
        .facts_page(category.as_deref(), params.cursor, page_size)
        .await?;

    let cursor = next_cursor(
        facts.last().map(|fact| fact.created_at),
        facts.len(),
        page_size,
    );

    Ok(Json(json!({ "facts": facts, "nextCursor": cursor })))
}

pub async fn get_latest_fact(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    match state.store.latest_fact().await? {
        Some(fact) => Ok(Json(json!(fact))),
        None => Ok(Json(json!({ "fact": null }))),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesParams {
    token: Option<String>,
    category: Option<String>,
    cursor: Option<i64>,
    page_size: Option<usize>,
    q: Option<String>,
}

pub async fn get_favorites(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FavoritesParams>,
) -> Result<Json<Value>, AppError> {
    let token = require(params.token, "token")?;
    let category = params.category.filter(|category| !category.is_empty());
    let page_size = params.page_size.unwrap_or(FAVORITES_PAGE_SIZE);

    let page = state
        .store
        .favorites_page(&token, category.as_deref(), params.cursor, page_size)
        .await?;

    let cursor = next_cursor(
        page.last().map(|favorite| favorite.saved_at),
        page.len(),
        page_size,
    );

    let items = match params.q {
        Some(query) => filter_by_query(page, &query),
        None => page,
    };

    Ok(Json(json!({ "items": items, "nextCursor": cursor })))
}

#[derive(Deserialize)]
pub struct SharedFavoritesParams {
    user: Option<String>,
}

pub async fn get_shared_favorites(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SharedFavoritesParams>,
) -> Result<Json<Value>, AppError> {
    let user = require(params.user, "user")?;
    let favorites = state.store.all_favorites(&user).await?;

    Ok(Json(json!({ "favorites": favorites })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFavoriteBody {
    token: Option<String>,
    fact_id: Option<String>,
    fact: Option<String>,
    explanation: Option<String>,
    category: Option<String>,
}

pub async fn save_favorite(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveFavoriteBody>,
) -> Result<Json<Value>, AppError> {
    let token = require(body.token, "token")?;
    let fact_id = require(body.fact_id, "factId")?;
    let fact = require(body.fact, "fact")?;

    let favorite = Favorite {
        id: fact_id,
        fact,
        explanation: body.explanation.unwrap_or_default(),
        category: body.category.unwrap_or_default(),
        saved_at: now_ms(),
    };

    state.store.save_favorite(&token, favorite).await?;

    Ok(Json(json!({ "message": "Favorite saved" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFavoriteBody {
    token: Option<String>,
    fact_id: Option<String>,
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RemoveFavoriteBody>,
) -> Result<Json<Value>, AppError> {
    let token = require(body.token, "token")?;
    let fact_id = require(body.fact_id, "factId")?;

    state.store.remove_favorite(&token, &fact_id).await?;

    Ok(Json(json!({ "message": "Favorite removed" })))
}

#[derive(Deserialize)]
pub struct SaveTokenBody {
    token: Option<String>,
    category: Option<String>,
}

pub async fn save_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveTokenBody>,
) -> Result<Json<Value>, AppError> {
    let token = require(body.token, "token")?;
    let category = body
        .category
        .filter(|category| !category.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    state.store.save_token(&token, &category).await?;

    Ok(Json(json!({ "message": "Token saved successfully" })))
}

pub async fn send_daily_fact(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let outcome = broadcast::run(
        state.store.as_ref(),
        state.ai.as_ref(),
        state.push.as_ref(),
    )
    .await;

    match outcome {
        Ok(BroadcastOutcome::NoSubscribers) => {
            Ok(Json(json!({ "message": "No subscribers found." })))
        }
        Ok(BroadcastOutcome::Completed(results)) => Ok(Json(json!({ "results": results }))),
        Err(err) => {
            let entry = ErrorEntry::new("send_daily_fact", err.to_string());
            if let Err(log_err) = state.store.log_error(entry).await {
                warn!("failed to write error log: {log_err}");
            }
            Err(err.into())
        }
    }
}
