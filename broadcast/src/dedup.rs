//! Bounded recent-history duplicate filter.
//!
//! Best-effort only: the window holds the newest `cap` normalized fact
//! strings, so repeats older than the window are possible by design.

use std::collections::VecDeque;

/// Collapse whitespace, trim, lowercase.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Most-recent-first list of normalized fact strings, capped at `cap`.
pub struct RecentFacts {
    entries: VecDeque<String>,
    cap: usize,
}

impl RecentFacts {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Seeds from stored facts, newest first. Stops at the cap.
    pub fn seed<'a>(&mut self, facts: impl IntoIterator<Item = &'a str>) {
        for fact in facts {
            if self.entries.len() >= self.cap {
                break;
            }
            self.entries.push_back(normalize(fact));
        }
    }

    /// A candidate is a duplicate when its normalized short or full form is
    /// already in the window.
    pub fn is_duplicate(&self, short: &str, full: Option<&str>) -> bool {
        let short = normalize(short);
        let full = full.map(normalize).unwrap_or_else(|| short.clone());

        self.entries
            .iter()
            .any(|entry| *entry == short || *entry == full)
    }

    /// Pushes an accepted fact to the front and truncates to the cap.
    pub fn register(&mut self, fact: &str) {
        self.entries.push_front(normalize(fact));
        self.entries.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{RecentFacts, normalize};

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Bananas   ARE\n berries  "), "bananas are berries");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn second_registration_is_rejected() {
        let mut recent = RecentFacts::new(10);
        assert!(!recent.is_duplicate("Bananas are berries", None));

        recent.register("Bananas are berries");
        assert!(recent.is_duplicate("bananas  ARE berries", None));
    }

    #[test]
    fn full_form_match_counts_as_duplicate() {
        let mut recent = RecentFacts::new(10);
        recent.register("the long original fact");

        assert!(recent.is_duplicate("the long orig…", Some("the long original fact")));
    }

    #[test]
    fn window_is_bounded() {
        let mut recent = RecentFacts::new(3);
        for i in 0..5 {
            recent.register(&format!("fact {i}"));
        }

        assert_eq!(recent.len(), 3);
        assert!(recent.is_duplicate("fact 4", None));
        assert!(!recent.is_duplicate("fact 0", None));
    }

    #[test]
    fn seed_preserves_newest_first_and_respects_cap() {
        let mut recent = RecentFacts::new(2);
        recent.seed(["newest", "older", "oldest"]);

        assert_eq!(recent.len(), 2);
        assert!(recent.is_duplicate("newest", None));
        assert!(!recent.is_duplicate("oldest", None));
    }
}
