use chrono::Utc;
use serde::{Deserialize, Serialize};

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A stored fact. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub id: String,
    pub fact: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub category: String,
    pub created_at: i64,
    #[serde(rename = "rawAI", default)]
    pub raw_ai: String,
    /// Untruncated text, present only when the short form was cut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_fact: Option<String>,
}

/// Input for [`crate::FactStore::insert_fact`]; id and timestamp are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewFact {
    pub fact: String,
    pub explanation: String,
    pub category: String,
    pub raw_ai: String,
    pub full_fact: Option<String>,
}

/// A user-scoped saved fact. `id` is the fact id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub fact: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub category: String,
    pub saved_at: i64,
}

/// A push destination with its preferred category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberToken {
    pub token: String,
    pub category: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub context: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: i64,
}

impl ErrorEntry {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
            detail: None,
            created_at: now_ms(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
