//! In-memory [`FactStore`] backend. No persistence, no external process;
//! used by tests and local runs. Creation timestamps are forced strictly
//! monotonic so descending order is total even within one millisecond.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    FactStore, StoreError,
    models::{ErrorEntry, Fact, Favorite, NewFact, SubscriberToken, now_ms},
};

#[derive(Default)]
struct Inner {
    facts: Vec<Fact>,
    favorites: HashMap<String, Vec<Favorite>>,
    tokens: HashMap<String, SubscriberToken>,
    errors: Vec<ErrorEntry>,
    last_ts: i64,
}

impl Inner {
    fn next_ts(&mut self) -> i64 {
        let ts = now_ms().max(self.last_ts + 1);
        self.last_ts = ts;
        ts
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_entries(&self) -> Vec<ErrorEntry> {
        self.inner.lock().unwrap().errors.clone()
    }
}

fn page<T: Clone>(
    items: impl Iterator<Item = T>,
    timestamp: impl Fn(&T) -> i64,
    cursor: Option<i64>,
    page_size: usize,
) -> Vec<T> {
    let mut matching: Vec<T> = items
        .filter(|item| cursor.is_none_or(|cursor| timestamp(item) < cursor))
        .collect();
    matching.sort_by_key(|item| std::cmp::Reverse(timestamp(item)));
    matching.truncate(page_size);
    matching
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn recent_facts(&self, limit: usize) -> Result<Vec<Fact>, StoreError> {
        self.facts_page(None, None, limit).await
    }

    async fn facts_page(
        &self,
        category: Option<&str>,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<Fact>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let facts = inner
            .facts
            .iter()
            .filter(|fact| category.is_none_or(|category| fact.category == category))
            .cloned();

        Ok(page(facts, |fact| fact.created_at, cursor, page_size))
    }

    async fn latest_fact(&self) -> Result<Option<Fact>, StoreError> {
        Ok(self.facts_page(None, None, 1).await?.into_iter().next())
    }

    async fn insert_fact(&self, fact: NewFact) -> Result<Fact, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = Fact {
            id: Uuid::new_v4().to_string(),
            fact: fact.fact,
            explanation: fact.explanation,
            category: fact.category,
            created_at: inner.next_ts(),
            raw_ai: fact.raw_ai,
            full_fact: fact.full_fact,
        };

        inner.facts.push(record.clone());
        Ok(record)
    }

    async fn favorites_page(
        &self,
        token: &str,
        category: Option<&str>,
        cursor: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<Favorite>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let favorites = inner
            .favorites
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|favorite| category.is_none_or(|category| favorite.category == category))
            .cloned();

        Ok(page(favorites, |favorite| favorite.saved_at, cursor, page_size))
    }

    async fn all_favorites(&self, token: &str) -> Result<Vec<Favorite>, StoreError> {
        self.favorites_page(token, None, None, usize::MAX).await
    }

    async fn save_favorite(&self, token: &str, favorite: Favorite) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let favorites = inner.favorites.entry(token.to_string()).or_default();

        favorites.retain(|existing| existing.id != favorite.id);
        favorites.push(favorite);

        Ok(())
    }

    async fn remove_favorite(&self, token: &str, fact_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(favorites) = inner.favorites.get_mut(token) {
            favorites.retain(|favorite| favorite.id != fact_id);
        }

        Ok(())
    }

    async fn save_token(&self, token: &str, category: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let ts = inner.next_ts();

        inner.tokens.insert(
            token.to_string(),
            SubscriberToken {
                token: token.to_string(),
                category: category.to_string(),
                updated_at: ts,
            },
        );

        Ok(())
    }

    async fn subscriber_tokens(&self) -> Result<Vec<SubscriberToken>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut tokens: Vec<SubscriberToken> = inner.tokens.values().cloned().collect();
        tokens.sort_by(|a, b| a.token.cmp(&b.token));

        Ok(tokens)
    }

    async fn log_error(&self, entry: ErrorEntry) -> Result<(), StoreError> {
        self.inner.lock().unwrap().errors.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    async fn facts_page_returns_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert_fact(new_fact(&format!("fact {i}"), "Science")).await.unwrap();
        }

        let facts = store.facts_page(None, None, 3).await.unwrap();
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].fact, "fact 4");
        assert!(facts[0].created_at > facts[1].created_at);
        assert!(facts[1].created_at > facts[2].created_at);
    }

    #[tokio::test]
    async fn cursor_at_last_item_gives_next_page_without_overlap() {
        let store = MemoryStore::new();
        for i in 0..6 {
            store.insert_fact(new_fact(&format!("fact {i}"), "")).await.unwrap();
        }

        let first = store.facts_page(None, None, 3).await.unwrap();
        let cursor = first.last().unwrap().created_at;
        let second = store.facts_page(None, Some(cursor), 3).await.unwrap();

        assert_eq!(second.len(), 3);
        let first_ids: Vec<&str> = first.iter().map(|f| f.id.as_str()).collect();
        assert!(second.iter().all(|f| !first_ids.contains(&f.id.as_str())));
        assert_eq!(second[0].fact, "fact 2");
    }

    #[tokio::test]
    async fn facts_page_filters_by_category() {
        let store = MemoryStore::new();
        store.insert_fact(new_fact("a", "Science")).await.unwrap();
        store.insert_fact(new_fact("b", "History")).await.unwrap();
        store.insert_fact(new_fact("c", "Science")).await.unwrap();

        let facts = store.facts_page(Some("Science"), None, 10).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.category == "Science"));
    }

    #[tokio::test]
    async fn save_favorite_is_an_upsert() {
        let store = MemoryStore::new();
        let favorite = Favorite {
            id: "f1".to_string(),
            fact: "first".to_string(),
            explanation: String::new(),
            category: String::new(),
            saved_at: 1,
        };

        store.save_favorite("abc", favorite.clone()).await.unwrap();
        store
            .save_favorite("abc", Favorite { fact: "second".to_string(), saved_at: 2, ..favorite })
            .await
            .unwrap();

        let favorites = store.all_favorites("abc").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].fact, "second");

        store.remove_favorite("abc", "f1").await.unwrap();
        assert!(store.all_favorites("abc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_changing_resave_leaves_no_stale_filter_match() {
        let store = MemoryStore::new();
        let favorite = Favorite {
            id: "f1".to_string(),
            fact: "movable".to_string(),
            explanation: String::new(),
            category: "Science".to_string(),
            saved_at: 1,
        };

        store.save_favorite("abc", favorite.clone()).await.unwrap();
        store
            .save_favorite(
                "abc",
                Favorite { category: "History".to_string(), saved_at: 2, ..favorite },
            )
            .await
            .unwrap();

        let science = store
            .favorites_page("abc", Some("Science"), None, 10)
            .await
            .unwrap();
        assert!(science.is_empty());

        let history = store
            .favorites_page("abc", Some("History"), None, 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "f1");
    }

    #[tokio::test]
    async fn save_token_overwrites_category() {
        let store = MemoryStore::new();
        store.save_token("abc", "Random").await.unwrap();
        store.save_token("abc", "Science").await.unwrap();

        let tokens = store.subscriber_tokens().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].category, "Science");
    }
}
