//! # Broadcast
//!
//! The daily-fact job: group subscriber tokens by preferred category,
//! generate one fact per category through the completion endpoint, persist
//! accepted facts and send a multicast push to each category group.
//!
//! The run is sequential by design: categories one at a time, every external
//! call awaited in order, with the duplicate window rebuilt fresh from the
//! store at the start of each run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub mod dedup;
pub mod generator;
pub mod openrouter;
pub mod parser;
pub mod push;

use store::{
    FactStore, StoreError,
    models::{ErrorEntry, NewFact},
};

use dedup::RecentFacts;
use generator::{GenerationOutcome, MAX_ATTEMPTS, generate_for_category};
use push::PushReport;

/// Number of recent facts held in the duplicate window.
pub const DUPLICATE_LOOKBACK: usize = 200;

const NOTIFICATION_TITLE: &str = "🚂 Train of Enlightenment";
const DEFAULT_CATEGORY: &str = "Random";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("push endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// External chat-completion endpoint. Returns the raw completion text.
#[async_trait]
pub trait FactCompletion: Send + Sync {
    async fn complete(&self, category: &str) -> Result<String, CompletionError>;
}

/// External push-delivery endpoint.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_multicast(
        &self,
        title: &str,
        body: &str,
        tokens: &[String],
    ) -> Result<PushReport, PushError>;
}

/// One category's entry in the job result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOutcome {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryOutcome {
    fn delivered(category: String, fact: String, explanation: String, report: PushReport) -> Self {
        Self {
            category,
            fact: Some(fact),
            explanation: Some(explanation),
            success: Some(report.success_count),
            failure: Some(report.failure_count),
            error: None,
        }
    }

    fn undelivered(category: String, fact: String, explanation: String, error: String) -> Self {
        Self {
            category,
            fact: Some(fact),
            explanation: Some(explanation),
            success: None,
            failure: None,
            error: Some(error),
        }
    }

    fn failed(category: String, error: String) -> Self {
        Self {
            category,
            fact: None,
            explanation: None,
            success: None,
            failure: None,
            error: Some(error),
        }
    }
}

#[derive(Debug)]
pub enum BroadcastOutcome {
    NoSubscribers,
    Completed(Vec<CategoryOutcome>),
}

async fn log_error(store: &dyn FactStore, entry: ErrorEntry) {
    if let Err(err) = store.log_error(entry).await {
        warn!("failed to write error log: {err}");
    }
}

/// One full job run. Only store failures outside the per-category loop
/// (subscriber read, duplicate-window seed) abort the run; everything inside
/// is downgraded to a per-category result entry.
pub async fn run(
    store: &dyn FactStore,
    ai: &dyn FactCompletion,
    push: &dyn PushSender,
) -> Result<BroadcastOutcome, StoreError> {
    let subscribers = store.subscriber_tokens().await?;
    if subscribers.is_empty() {
        info!("no subscribers, nothing to do");
        return Ok(BroadcastOutcome::NoSubscribers);
    }

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for subscriber in subscribers {
        let category = if subscriber.category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            subscriber.category
        };
        groups.entry(category).or_default().push(subscriber.token);
    }

    let mut recent = RecentFacts::new(DUPLICATE_LOOKBACK);
    let seed = store.recent_facts(DUPLICATE_LOOKBACK).await?;
    recent.seed(seed.iter().map(|fact| fact.fact.as_str()));

    let mut results = Vec::with_capacity(groups.len());

    for (category, tokens) in groups {
        info!(%category, subscribers = tokens.len(), "generating fact");

        let generated = match generate_for_category(ai, store, &mut recent, &category).await {
            GenerationOutcome::Accepted(generated) => generated,
            GenerationOutcome::Exhausted { attempts } => {
                let message = format!(
                    "Failed to generate unique valid fact for category \"{category}\" \
                     after {attempts} attempts."
                );
                warn!(%category, "{message}");
                log_error(
                    store,
                    ErrorEntry::new("ai_generation_failed", message.clone())
                        .with_detail(format!("attempts={MAX_ATTEMPTS}")),
                )
                .await;
                results.push(CategoryOutcome::failed(category, message));
                continue;
            }
        };

        let inserted = store
            .insert_fact(NewFact {
                fact: generated.fact.clone(),
                explanation: generated.explanation.clone(),
                category: category.clone(),
                raw_ai: generated.raw.clone(),
                full_fact: generated.full_fact.clone(),
            })
            .await;

        if let Err(err) = inserted {
            warn!(%category, "failed to store fact: {err}");
            log_error(
                store,
                ErrorEntry::new("fact_persist", err.to_string())
                    .with_detail(format!("category={category}")),
            )
            .await;
            results.push(CategoryOutcome::failed(
                category,
                "Failed to store generated fact.".to_string(),
            ));
            continue;
        }

        let title = format!("{NOTIFICATION_TITLE} — {category}");
        match push.send_multicast(&title, &generated.fact, &tokens).await {
            Ok(report) => {
                info!(
                    %category,
                    success = report.success_count,
                    failure = report.failure_count,
                    "push sent"
                );
                results.push(CategoryOutcome::delivered(
                    category,
                    generated.fact,
                    generated.explanation,
                    report,
                ));
            }
            Err(err) => {
                warn!(%category, "push send failed: {err}");
                log_error(
                    store,
                    ErrorEntry::new("push_send", err.to_string())
                        .with_detail(format!("category={category}")),
                )
                .await;
                results.push(CategoryOutcome::undelivered(
                    category,
                    generated.fact,
                    generated.explanation,
                    "Push send failed".to_string(),
                ));
            }
        }
    }

    Ok(BroadcastOutcome::Completed(results))
}
