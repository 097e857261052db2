// Response Metrics and Similarity Utilities
//
// Heuristic helpers the collaboration engine builds on: longest-response
// consensus, token-overlap agreement, validation marker scanning, plus
// quality/cost/key helpers exposed to callers.
//
// The consensus and confidence measures are deliberately simple string
// heuristics, not semantic similarity.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::collaboration::CollaborationResult;
use crate::domain::llm::ChatResponse;
use crate::domain::provider_config::ProviderKind;

/// Tokens that mark a validator's verdict. Positive markers take
/// precedence when both appear in one response.
const POSITIVE_MARKERS: [&str; 3] = ["correct", "accurate", "valid"];
const NEGATIVE_MARKERS: [&str; 3] = ["incorrect", "issue", "problem"];

/// Agreement threshold for token overlap
const AGREEMENT_THRESHOLD: f64 = 0.3;

/// Confidence reported when there are not enough responses to compare
const SINGLE_RESPONSE_CONFIDENCE: f64 = 0.7;

/// Approximate USD cost per 1k tokens (input, output) by model
const MODEL_COSTS: [(&str, f64, f64); 9] = [
    ("gpt-4", 0.03, 0.06),
    ("gpt-4-turbo", 0.01, 0.03),
    ("gpt-3.5-turbo", 0.0005, 0.0015),
    ("claude-3-opus", 0.015, 0.075),
    ("claude-3-sonnet", 0.003, 0.015),
    ("claude-3-haiku", 0.00025, 0.00125),
    ("gemini-pro", 0.000125, 0.000375),
    ("llama2", 0.0, 0.0),
    ("llama3", 0.0, 0.0),
];

/// Lowercased word tokens longer than three characters
fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() > 3)
        .map(|w| w.to_string())
        .collect()
}

/// Fraction of shared tokens relative to the larger response
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = tokens(a);
    let tokens_b = tokens(b);

    let larger = tokens_a.len().max(tokens_b.len());
    if larger == 0 {
        return 0.0;
    }

    let set_b: HashSet<&str> = tokens_b.iter().map(String::as_str).collect();
    let common = tokens_a
        .iter()
        .filter(|w| set_b.contains(w.as_str()))
        .count();

    common as f64 / larger as f64
}

/// Two responses "agree" when enough of their vocabulary overlaps
pub fn responses_agree(a: &str, b: &str) -> bool {
    token_overlap(a, b) > AGREEMENT_THRESHOLD
}

/// Longest of the given texts; ties go to the earliest position
pub fn longest_response<'a>(texts: &[&'a str]) -> Option<&'a str> {
    let mut best: Option<&'a str> = None;
    for text in texts {
        if best.map_or(true, |b| text.len() > b.len()) {
            best = Some(text);
        }
    }
    best
}

/// Agreement-based confidence: the first response is the reference and
/// always counts as agreeing with itself
pub fn agreement_confidence(texts: &[&str]) -> f64 {
    if texts.len() < 2 {
        return SINGLE_RESPONSE_CONFIDENCE;
    }

    let reference = texts[0];
    let mut agreeing = 1usize;
    for other in &texts[1..] {
        if responses_agree(reference, other) {
            agreeing += 1;
        }
    }

    agreeing as f64 / texts.len() as f64
}

/// Confidence derived from validator verdicts by marker scan
///
/// A response with a positive marker is counted as approval even when a
/// negative marker also appears; with no negative verdicts at all the
/// confidence defaults to 0.8, otherwise 1 - negatives/validators,
/// floored at 0.1.
pub fn validation_confidence(validations: &[&str]) -> f64 {
    let mut negatives = 0usize;
    let mut has_negative = false;

    for validation in validations {
        let content = validation.to_lowercase();
        if POSITIVE_MARKERS.iter().any(|m| content.contains(m)) {
            // counted as approval
        } else if NEGATIVE_MARKERS.iter().any(|m| content.contains(m)) {
            negatives += 1;
            has_negative = true;
        }
    }

    if has_negative {
        (1.0 - negatives as f64 / validations.len() as f64).max(0.1)
    } else {
        0.8
    }
}

/// Simple quality metrics for a single response
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetrics {
    pub word_count: usize,
    pub char_count: usize,
    pub avg_word_length: f64,
}

pub fn response_metrics(response: &ChatResponse) -> ResponseMetrics {
    let content = response.text();
    let words: Vec<&str> = content.split_whitespace().collect();

    let word_count = words.len();
    let avg_word_length = if word_count > 0 {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count as f64
    } else {
        0.0
    };

    ResponseMetrics {
        word_count,
        char_count: content.chars().count(),
        avg_word_length,
    }
}

/// Sentence-level comparison of two responses
#[derive(Debug, Clone, Serialize)]
pub struct ResponseComparison {
    pub similarity_score: f64,
    pub common_phrases: Vec<String>,
    pub diff_phrases: Vec<String>,
}

pub fn compare_responses(a: &ChatResponse, b: &ChatResponse) -> ResponseComparison {
    let content_a = a.text().to_lowercase();
    let content_b = b.text().to_lowercase();

    let phrases_a: Vec<&str> = split_phrases(&content_a);
    let phrases_b: Vec<&str> = split_phrases(&content_b);

    let common_phrases: Vec<String> = phrases_a
        .iter()
        .filter(|p| phrases_b.iter().any(|q| q.contains(**p) || p.contains(q)))
        .map(|p| p.to_string())
        .collect();

    let total = phrases_a.len().max(phrases_b.len());
    let similarity_score = if total > 0 {
        common_phrases.len() as f64 / total as f64
    } else {
        0.0
    };

    let diff_phrases = phrases_a
        .iter()
        .chain(phrases_b.iter())
        .filter(|p| !common_phrases.iter().any(|c| c.as_str() == **p))
        .map(|p| p.to_string())
        .collect();

    ResponseComparison {
        similarity_score,
        common_phrases,
        diff_phrases,
    }
}

fn split_phrases(content: &str) -> Vec<&str> {
    content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Approximate USD cost of a call from the static price table; unknown
/// models are billed at the gpt-3.5-turbo rate
pub fn estimate_api_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let (input_rate, output_rate) = MODEL_COSTS
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or((0.0005, 0.0015));

    (input_tokens as f64 / 1000.0) * input_rate + (output_tokens as f64 / 1000.0) * output_rate
}

/// Shallow format check for an API key of the given backend
pub fn is_valid_api_key(api_key: &str, kind: ProviderKind) -> bool {
    // Ollama runs without auth
    if kind == ProviderKind::Ollama {
        return true;
    }
    if api_key.is_empty() {
        return false;
    }

    match kind {
        ProviderKind::Openai => api_key.starts_with("sk-") && api_key.len() >= 40,
        ProviderKind::Anthropic => api_key.starts_with("sk-ant-") && api_key.len() >= 50,
        ProviderKind::Google => {
            api_key.len() >= 30
                && api_key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        ProviderKind::AzureOpenai => api_key.len() >= 32,
        ProviderKind::Ollama => true,
    }
}

/// Human-readable report of a collaboration run
pub fn format_collaboration_result(result: &CollaborationResult) -> String {
    let mut output = String::from("AI Collaboration Results:\n");
    output.push_str(&"=".repeat(50));
    output.push_str("\n\n");

    if let Some(primary) = &result.primary_response {
        output.push_str(&format!("Primary AI ({}):\n", primary.model));
        output.push_str(primary.text());
        output.push_str("\n\n");
    }

    if !result.secondary_responses.is_empty() {
        output.push_str(&format!(
            "Secondary AI Responses ({}):\n",
            result.secondary_responses.len()
        ));
        for (idx, response) in result.secondary_responses.iter().enumerate() {
            output.push_str(&format!("\n[{}] Model: {}\n", idx + 1, response.model));
            output.push_str(response.text());
            output.push('\n');
        }
        output.push('\n');
    }

    if let Some(consensus) = &result.consensus {
        output.push_str("Consensus/Synthesized Response:\n");
        output.push_str(consensus);
        output.push_str("\n\n");
    }

    if let Some(confidence) = result.confidence {
        output.push_str(&format!("Confidence Score: {:.1}%\n\n", confidence * 100.0));
    }

    if !result.errors.is_empty() {
        output.push_str("Errors Encountered:\n");
        let mut providers: Vec<&String> = result.errors.keys().collect();
        providers.sort();
        for provider in providers {
            output.push_str(&format!("- {}: {}\n", provider, result.errors[provider]));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{Choice, FinishReason, Message};

    fn response(model: &str, text: &str) -> ChatResponse {
        ChatResponse {
            id: "chatcmpl-test".to_string(),
            choices: vec![Choice {
                message: Message::assistant(text),
                finish_reason: FinishReason::Stop,
                index: 0,
            }],
            created: 1_700_000_000,
            model: model.to_string(),
            usage: None,
        }
    }

    #[test]
    fn longest_response_wins_consensus() {
        assert_eq!(
            longest_response(&["ab", "abcdef", "abc"]),
            Some("abcdef")
        );
    }

    #[test]
    fn consensus_tie_goes_to_earliest() {
        assert_eq!(longest_response(&["aaa", "bbb", "cc"]), Some("aaa"));
        assert_eq!(longest_response(&[]), None);
    }

    #[test]
    fn identical_texts_have_full_confidence() {
        let text = "The capital of France is Paris";
        assert_eq!(agreement_confidence(&[text, text]), 1.0);
    }

    #[test]
    fn disjoint_texts_halve_confidence() {
        // No shared tokens longer than three characters
        assert_eq!(
            agreement_confidence(&["alpha bravo charlie", "delta echo foxtrot"]),
            0.5
        );
    }

    #[test]
    fn single_response_defaults_confidence() {
        assert_eq!(agreement_confidence(&["anything"]), 0.7);
        assert_eq!(agreement_confidence(&[]), 0.7);
    }

    #[test]
    fn short_tokens_do_not_count_as_overlap() {
        // "is" and "the" are too short to be tokens at all
        assert!(!responses_agree("is the cat", "is the dog"));
    }

    #[test]
    fn validation_confidence_defaults_without_negatives() {
        assert_eq!(
            validation_confidence(&["The answer is accurate", "Looks valid to me"]),
            0.8
        );
        assert_eq!(validation_confidence(&[]), 0.8);
    }

    #[test]
    fn negative_verdicts_lower_confidence_with_floor() {
        let conf = validation_confidence(&["There is an issue here", "No concerns whatsoever"]);
        assert!((conf - 0.5).abs() < 1e-9);

        // Every validator objecting hits the floor
        assert_eq!(
            validation_confidence(&["big problem", "another issue"]),
            0.1
        );
    }

    #[test]
    fn positive_marker_takes_precedence_in_one_response() {
        // "accurate" wins over "issue" within the same verdict
        assert_eq!(
            validation_confidence(&["accurate overall, one minor issue"]),
            0.8
        );
    }

    #[test]
    fn metrics_count_words_and_chars() {
        let metrics = response_metrics(&response("gpt-4", "one two three"));
        assert_eq!(metrics.word_count, 3);
        assert_eq!(metrics.char_count, 13);
        assert!((metrics.avg_word_length - 11.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn comparison_finds_common_phrases() {
        let a = response("gpt-4", "Paris is the capital. It is in France.");
        let b = response("llama2", "Paris is the capital. France is in Europe.");

        let cmp = compare_responses(&a, &b);
        assert!(cmp.common_phrases.contains(&"paris is the capital".to_string()));
        assert!(cmp.similarity_score > 0.0);
        assert!(!cmp.diff_phrases.is_empty());
    }

    #[test]
    fn cost_table_lookup_and_fallback() {
        // 1000 input + 1000 output tokens of gpt-4
        assert!((estimate_api_cost("gpt-4", 1000, 1000) - 0.09).abs() < 1e-9);
        // Local models are free
        assert_eq!(estimate_api_cost("llama3", 5000, 5000), 0.0);
        // Unknown models fall back to gpt-3.5-turbo pricing
        assert!((estimate_api_cost("mystery-model", 1000, 1000) - 0.002).abs() < 1e-9);
    }

    #[test]
    fn api_key_format_checks_per_kind() {
        let long_sk = format!("sk-{}", "a".repeat(48));
        assert!(is_valid_api_key(&long_sk, ProviderKind::Openai));
        assert!(!is_valid_api_key("sk-short", ProviderKind::Openai));

        let ant = format!("sk-ant-{}", "b".repeat(50));
        assert!(is_valid_api_key(&ant, ProviderKind::Anthropic));
        assert!(!is_valid_api_key(&long_sk, ProviderKind::Anthropic));

        assert!(is_valid_api_key(&"c".repeat(39), ProviderKind::Google));
        assert!(!is_valid_api_key("with spaces not allowed!!", ProviderKind::Google));

        assert!(is_valid_api_key(&"d".repeat(32), ProviderKind::AzureOpenai));
        assert!(!is_valid_api_key(&"d".repeat(10), ProviderKind::AzureOpenai));

        // Ollama never needs a key
        assert!(is_valid_api_key("", ProviderKind::Ollama));
    }

    #[test]
    fn formatted_report_contains_every_section() {
        let mut result = CollaborationResult::empty();
        result.primary_response = Some(response("gpt-4", "Primary answer"));
        result.secondary_responses = vec![response("llama2", "Secondary answer")];
        result.consensus = Some("Primary answer".to_string());
        result.confidence = Some(0.875);
        result
            .errors
            .insert("offline".to_string(), "Provider not found".to_string());

        let report = format_collaboration_result(&result);
        assert!(report.contains("Primary AI (gpt-4):"));
        assert!(report.contains("Secondary AI Responses (1):"));
        assert!(report.contains("[1] Model: llama2"));
        assert!(report.contains("Consensus/Synthesized Response:"));
        assert!(report.contains("Confidence Score: 87.5%"));
        assert!(report.contains("- offline: Provider not found"));
    }
}
