//! Bounded-attempt fact generation for one category.

use tracing::warn;

use store::{FactStore, models::ErrorEntry};

use crate::{
    FactCompletion,
    dedup::RecentFacts,
    parser::parse_completion,
};

pub const MAX_FACT_CHARS: usize = 300;
pub const MAX_ATTEMPTS: usize = 5;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone)]
pub struct GeneratedFact {
    pub fact: String,
    /// Untruncated text when the short form was cut.
    pub full_fact: Option<String>,
    pub explanation: String,
    pub raw: String,
}

/// Tagged result of one category's generation loop. Exhaustion is an
/// expected outcome, not an error.
#[derive(Debug)]
pub enum GenerationOutcome {
    Accepted(GeneratedFact),
    Exhausted { attempts: usize },
}

/// Facts over the cap keep the original as the full form; the short form is
/// cut to cap − 1 chars plus an ellipsis, so it never exceeds the cap.
fn truncate_fact(fact: &str) -> (String, Option<String>) {
    if fact.chars().count() <= MAX_FACT_CHARS {
        return (fact.to_string(), None);
    }

    let cut: String = fact.chars().take(MAX_FACT_CHARS - 1).collect();
    let mut short = cut.trim_end().to_string();
    short.push(ELLIPSIS);

    (short, Some(fact.to_string()))
}

/// Up to [`MAX_ATTEMPTS`] calls to the completion endpoint. Empty parses and
/// duplicates consume an attempt silently; a failed call is logged to the
/// error log and also consumes an attempt.
pub async fn generate_for_category(
    ai: &dyn FactCompletion,
    store: &dyn FactStore,
    recent: &mut RecentFacts,
    category: &str,
) -> GenerationOutcome {
    for attempt in 1..=MAX_ATTEMPTS {
        let raw = match ai.complete(category).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(category, attempt, "completion call failed: {err}");
                let entry = ErrorEntry::new("openrouter_call", err.to_string())
                    .with_detail(format!("category={category} attempt={attempt}"));
                if let Err(log_err) = store.log_error(entry).await {
                    warn!("failed to write error log: {log_err}");
                }
                continue;
            }
        };

        let parsed = parse_completion(&raw);
        if parsed.fact.is_empty() {
            continue;
        }

        let (fact, full_fact) = truncate_fact(&parsed.fact);
        if recent.is_duplicate(&fact, full_fact.as_deref()) {
            continue;
        }

        recent.register(&fact);
        return GenerationOutcome::Accepted(GeneratedFact {
            fact,
            full_fact,
            explanation: parsed.explanation,
            raw,
        });
    }

    GenerationOutcome::Exhausted {
        attempts: MAX_ATTEMPTS,
    }
}
