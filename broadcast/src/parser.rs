//! Splits a raw completion into a fact and an explanation.
//!
//! The model is asked to prefix with `Fact:` / `Explanation:` but does not
//! always comply, so extraction falls back from labels, to the first
//! blank-line paragraph boundary, to the whole text.

use std::sync::LazyLock;

use regex::Regex;

static FACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)fact\s*:\s*(.*?)(?:explanation\s*:|$)").unwrap());

static EXPLANATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)explanation\s*:\s*(.*)").unwrap());

static PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCompletion {
    pub fact: String,
    pub explanation: String,
}

/// Never yields both fields empty unless the input is empty.
pub fn parse_completion(content: &str) -> ParsedCompletion {
    let mut fact = FACT_RE
        .captures(content)
        .map(|captures| captures[1].trim().to_string())
        .filter(|fact| !fact.is_empty());

    let mut explanation = EXPLANATION_RE
        .captures(content)
        .map(|captures| captures[1].trim().to_string());

    // No label found: first paragraph is the fact, the rest the explanation.
    if fact.is_none() && !content.is_empty() {
        let mut parts = PARAGRAPH_RE.splitn(content, 2);
        fact = parts.next().map(|part| part.trim().to_string());
        explanation = Some(parts.next().unwrap_or_default().trim().to_string());
    }

    ParsedCompletion {
        fact: fact.unwrap_or_else(|| content.trim().to_string()),
        explanation: explanation.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_completion;

    #[test]
    fn labeled_fact_and_explanation() {
        let parsed = parse_completion("Fact: Bananas are berries.\nExplanation: Botanically they qualify.");
        assert_eq!(parsed.fact, "Bananas are berries.");
        assert_eq!(parsed.explanation, "Botanically they qualify.");
    }

    #[test]
    fn labels_are_case_insensitive_and_tolerate_spacing() {
        let parsed = parse_completion("FACT : one thing\nexplanation:   because reasons  ");
        assert_eq!(parsed.fact, "one thing");
        assert_eq!(parsed.explanation, "because reasons");
    }

    #[test]
    fn multiline_fact_stops_at_explanation_label() {
        let parsed = parse_completion("Fact: line one\nline two\nExplanation: why");
        assert_eq!(parsed.fact, "line one\nline two");
        assert_eq!(parsed.explanation, "why");
    }

    #[test]
    fn unlabeled_paragraphs_split_on_blank_line() {
        let parsed = parse_completion("Octopuses have three hearts.\n\nTwo pump blood to the gills.");
        assert_eq!(parsed.fact, "Octopuses have three hearts.");
        assert_eq!(parsed.explanation, "Two pump blood to the gills.");
    }

    #[test]
    fn single_paragraph_becomes_the_fact() {
        let parsed = parse_completion("Honey never spoils.");
        assert_eq!(parsed.fact, "Honey never spoils.");
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn empty_input_yields_empty_parts() {
        let parsed = parse_completion("");
        assert_eq!(parsed.fact, "");
        assert_eq!(parsed.explanation, "");
    }
}
