//! # Redis
//!
//! Document store for the fact app.
//!
//! ## Schema
//!
//! - `facts` hash: fact id → JSON [`Fact`]
//! - `facts:by_time` zset: fact id scored by `createdAt` (ms)
//! - `facts:{category}:by_time` zset: same, per category
//! - `favorites:{token}` hash: fact id → JSON [`Favorite`]
//! - `favorites:{token}:by_time` zset: fact id scored by `savedAt` (ms)
//! - `favorites:{token}:{category}:by_time` zset: same, per category
//! - `tokens` hash: push token → JSON [`SubscriberToken`]
//! - `error_logs` list: JSON [`ErrorEntry`], newest first
//!
//! Pages come out of the zsets with `ZREVRANGEBYSCORE ... LIMIT`, cursor as
//! an exclusive max score. Documents are JSON strings in the hashes, fetched
//! by id after the zset read.

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use uuid::Uuid;

use crate::{
    FactStore, StoreError,
    models::{ErrorEntry, Fact, Favorite, NewFact, SubscriberToken, now_ms},
};

pub const FACTS_HASH: &str = "facts";
pub const FACTS_BY_TIME: &str = "facts:by_time";
pub const TOKENS_HASH: &str = "tokens";
pub const ERROR_LOG: &str = "error_logs";

fn facts_category_zset(category: &str) -> String {
    format!("facts:{category}:by_time")
}

fn favorites_hash(token: &str) -> String {
    format!("favorites:{token}")
}

fn favorites_zset(token: &str) -> String {
    format!("favorites:{token}:by_time")
}

fn favorites_category_zset(token: &str, category: &str) -> String {
    format!("favorites:{token}:{category}:by_time")
}

/// Redis treats a negative LIMIT count as "all elements", so an oversized
/// page size must saturate instead of wrapping through the cast.
fn limit_count(page_size: usize) -> isize {
    isize::try_from(page_size).unwrap_or(isize::MAX)
}

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();
    let connection_manager = client
        .get_connection_manager_with_config(config)
        .await
        .unwrap();

    connection_manager
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    async fn zset_page(
        &self,
        key: &str,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut con = self.connection.clone();
        let max = match cursor {
            Some(cursor) => format!("({cursor}"),
            None => "+inf".to_string(),
        };

        let ids: Vec<String> = con
            .zrevrangebyscore_limit(key, max, "-inf", 0, limit_count(page_size))
            .await?;

        Ok(ids)
    }

    async fn facts_by_ids(&self, ids: &[String]) -> Result<Vec<Fact>, StoreError> {
        let mut con = self.connection.clone();
        let mut facts = Vec::with_capacity(ids.len());

        for id in ids {
            let raw: Option<String> = con.hget(FACTS_HASH, id).await?;
            if let Some(raw) = raw {
                facts.push(serde_json::from_str(&raw)?);
            }
        }

        Ok(facts)
    }

    async fn favorites_by_ids(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<Vec<Favorite>, StoreError> {
        let mut con = self.connection.clone();
        let hash = favorites_hash(token);
        let mut favorites = Vec::with_capacity(ids.len());

        for id in ids {
            let raw: Option<String> = con.hget(&hash, id).await?;
            if let Some(raw) = raw {
                favorites.push(serde_json::from_str(&raw)?);
            }
        }

        Ok(favorites)
    }
}

#[async_trait]
impl FactStore for RedisStore {
    async fn recent_facts(&self, limit: usize) -> Result<Vec<Fact>, StoreError> {
        self.facts_page(None, None, limit).await
    }

    async fn facts_page(
        &self,
        category: Option<&str>,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<Fact>, StoreError> {
        let key = match category {
            Some(category) => facts_category_zset(category),
            None => FACTS_BY_TIME.to_string(),
        };

        let ids = self.zset_page(&key, cursor, page_size).await?;
        self.facts_by_ids(&ids).await
    }

    async fn latest_fact(&self) -> Result<Option<Fact>, StoreError> {
        let mut con = self.connection.clone();
        let ids: Vec<String> = con.zrevrange(FACTS_BY_TIME, 0, 0).await?;

        Ok(self.facts_by_ids(&ids).await?.into_iter().next())
    }

    async fn insert_fact(&self, fact: NewFact) -> Result<Fact, StoreError> {
        let record = Fact {
            id: Uuid::new_v4().to_string(),
            fact: fact.fact,
            explanation: fact.explanation,
            category: fact.category,
            created_at: now_ms(),
            raw_ai: fact.raw_ai,
            full_fact: fact.full_fact,
        };

        let mut con = self.connection.clone();
        let raw = serde_json::to_string(&record)?;

        let _: () = con.hset(FACTS_HASH, &record.id, raw).await?;
        let _: () = con
            .zadd(FACTS_BY_TIME, &record.id, record.created_at)
            .await?;

        if !record.category.is_empty() {
            let _: () = con
                .zadd(
                    facts_category_zset(&record.category),
                    &record.id,
                    record.created_at,
                )
                .await?;
        }

        Ok(record)
    }

    async fn favorites_page(
        &self,
        token: &str,
        category: Option<&str>,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<Favorite>, StoreError> {
        let key = match category {
            Some(category) => favorites_category_zset(token, category),
            None => favorites_zset(token),
        };

        let ids = self.zset_page(&key, cursor, page_size).await?;
        self.favorites_by_ids(token, &ids).await
    }

    async fn all_favorites(&self, token: &str) -> Result<Vec<Favorite>, StoreError> {
        let mut con = self.connection.clone();
        let ids: Vec<String> = con.zrevrange(favorites_zset(token), 0, -1).await?;

        self.favorites_by_ids(token, &ids).await
    }

    async fn save_favorite(&self, token: &str, favorite: Favorite) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let raw = serde_json::to_string(&favorite)?;

        // A re-save may change the category; drop the old index entry so the
        // per-category zsets never disagree with the stored document.
        let existing: Option<String> = con.hget(favorites_hash(token), &favorite.id).await?;
        if let Some(existing) = existing {
            let previous: Favorite = serde_json::from_str(&existing)?;
            if !previous.category.is_empty() && previous.category != favorite.category {
                let _: () = con
                    .zrem(
                        favorites_category_zset(token, &previous.category),
                        &favorite.id,
                    )
                    .await?;
            }
        }

        let _: () = con.hset(favorites_hash(token), &favorite.id, raw).await?;
        let _: () = con
            .zadd(favorites_zset(token), &favorite.id, favorite.saved_at)
            .await?;

        if !favorite.category.is_empty() {
            let _: () = con
                .zadd(
                    favorites_category_zset(token, &favorite.category),
                    &favorite.id,
                    favorite.saved_at,
                )
                .await?;
        }

        Ok(())
    }

    async fn remove_favorite(&self, token: &str, fact_id: &str) -> Result<(), StoreError> {
        let mut con = self.connection.clone();

        let raw: Option<String> = con.hget(favorites_hash(token), fact_id).await?;
        let _: () = con.hdel(favorites_hash(token), fact_id).await?;
        let _: () = con.zrem(favorites_zset(token), fact_id).await?;

        if let Some(raw) = raw {
            let favorite: Favorite = serde_json::from_str(&raw)?;
            if !favorite.category.is_empty() {
                let _: () = con
                    .zrem(favorites_category_zset(token, &favorite.category), fact_id)
                    .await?;
            }
        }

        Ok(())
    }

    async fn save_token(&self, token: &str, category: &str) -> Result<(), StoreError> {
        let record = SubscriberToken {
            token: token.to_string(),
            category: category.to_string(),
            updated_at: now_ms(),
        };

        let mut con = self.connection.clone();
        let raw = serde_json::to_string(&record)?;
        let _: () = con.hset(TOKENS_HASH, token, raw).await?;

        Ok(())
    }

    async fn subscriber_tokens(&self) -> Result<Vec<SubscriberToken>, StoreError> {
        let mut con = self.connection.clone();
        let entries: std::collections::HashMap<String, String> =
            con.hgetall(TOKENS_HASH).await?;

        let mut tokens = Vec::with_capacity(entries.len());
        for raw in entries.into_values() {
            tokens.push(serde_json::from_str(&raw)?);
        }

        Ok(tokens)
    }

    async fn log_error(&self, entry: ErrorEntry) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let raw = serde_json::to_string(&entry)?;
        let _: () = con.lpush(ERROR_LOG, raw).await?;

        Ok(())
    }
}
