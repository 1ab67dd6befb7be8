//! # Store
//!
//! Persistence layer for facts, favorites, subscriber tokens and the error
//! log. Everything sits behind the [`FactStore`] trait so handlers and the
//! broadcast job receive an injected capability instead of reaching for a
//! global client.
//!
//! Two backends:
//! - [`database::RedisStore`]: the production backend.
//! - [`memory::MemoryStore`]: in-memory, for tests and local runs without a
//!   Redis instance.

use async_trait::async_trait;
use thiserror::Error;

pub mod database;
pub mod memory;
pub mod models;

use models::{ErrorEntry, Fact, Favorite, NewFact, SubscriberToken};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redis::RedisError),

    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Document-store operations used by the HTTP handlers and the broadcast job.
///
/// Pagination contract: pages are ordered by timestamp descending and the
/// cursor is exclusive, so passing the last item's timestamp returns the
/// following page with no overlap.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Newest facts first, at most `limit` of them.
    async fn recent_facts(&self, limit: usize) -> Result<Vec<Fact>, StoreError>;

    /// One page of facts, optionally restricted to a category.
    async fn facts_page(
        &self,
        category: Option<&str>,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<Fact>, StoreError>;

    async fn latest_fact(&self) -> Result<Option<Fact>, StoreError>;

    /// Assigns an id and creation timestamp, persists, returns the record.
    async fn insert_fact(&self, fact: NewFact) -> Result<Fact, StoreError>;

    async fn favorites_page(
        &self,
        token: &str,
        category: Option<&str>,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<Favorite>, StoreError>;

    /// Every favorite for a token, newest first. Used by the share view.
    async fn all_favorites(&self, token: &str) -> Result<Vec<Favorite>, StoreError>;

    /// Keyed by token + fact id, so re-saving is an upsert.
    async fn save_favorite(&self, token: &str, favorite: Favorite) -> Result<(), StoreError>;

    async fn remove_favorite(&self, token: &str, fact_id: &str) -> Result<(), StoreError>;

    async fn save_token(&self, token: &str, category: &str) -> Result<(), StoreError>;

    async fn subscriber_tokens(&self) -> Result<Vec<SubscriberToken>, StoreError>;

    /// Append-only diagnostic record.
    async fn log_error(&self, entry: ErrorEntry) -> Result<(), StoreError>;
}
