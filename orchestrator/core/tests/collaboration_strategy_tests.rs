// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the four collaboration strategies:
//! - Sequential: refinement chaining, fatal primary, tolerant secondaries
//! - Parallel: fan-out isolation, timeouts, consensus and confidence
//! - Ensemble: labeled synthesis of every successful answer
//! - Validation: validator fan-out and marker-scan confidence
//!
//! Providers here are scripted in-memory implementations so the tests
//! exercise orchestration behavior only, never the network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use chorus_core::application::CollaborationEngine;
use chorus_core::domain::collaboration::{
    CollaborationConfig, CollaborationError, CollaborationStrategy,
};
use chorus_core::domain::llm::{
    ChatProvider, ChatRequest, ChatResponse, Choice, FinishReason, Message, ProviderError, Role,
};
use chorus_core::infrastructure::llm::ProviderRegistry;

/// Scripted provider: canned reply, optional delay, optional failure,
/// and a log of every request it received
struct ScriptedProvider {
    id: String,
    reply: String,
    delay: Option<Duration>,
    fail: bool,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    fn replying(id: &str, reply: &str) -> Self {
        Self {
            id: id.to_string(),
            reply: reply.to_string(),
            delay: None,
            fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(id: &str) -> Self {
        Self {
            fail: true,
            ..Self::replying(id, "")
        }
    }

    fn slow(id: &str, reply: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(id, reply)
        }
    }

    fn request_log(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Transport {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }

        Ok(ChatResponse {
            id: format!("chatcmpl-{}", self.id),
            choices: vec![Choice {
                message: Message::assistant(self.reply.clone()),
                finish_reason: FinishReason::Stop,
                index: 0,
            }],
            created: 1_700_000_000,
            model: self.id.clone(),
            usage: None,
        })
    }
}

fn engine_with(providers: Vec<ScriptedProvider>) -> CollaborationEngine {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider.id.clone(), Arc::new(provider));
    }
    CollaborationEngine::new(Arc::new(registry))
}

fn config(
    strategy: CollaborationStrategy,
    primary: &str,
    secondaries: &[&str],
) -> CollaborationConfig {
    CollaborationConfig {
        primary_provider: primary.to_string(),
        secondary_providers: secondaries.iter().map(|s| s.to_string()).collect(),
        strategy,
        timeout_ms: None,
    }
}

/// Last assistant-role message of a recorded refinement request: the
/// "previous output" that stage was asked to improve
fn previous_output(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.clone())
        .expect("refinement request carries an assistant message")
}

#[tokio::test]
async fn parallel_with_zero_secondaries_defaults_confidence() {
    let engine = engine_with(vec![ScriptedProvider::replying("primary", "only answer")]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Parallel, "primary", &[]),
        )
        .await
        .unwrap();

    assert_eq!(result.primary_response.unwrap().text(), "only answer");
    assert!(result.secondary_responses.is_empty());
    assert!(result.consensus.is_none());
    assert_eq!(result.confidence, Some(0.7));
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn timed_out_provider_lands_in_errors_exactly_once() {
    let engine = engine_with(vec![
        ScriptedProvider::replying("fast", "quick answer"),
        ScriptedProvider::slow("sluggish", "late answer", Duration::from_millis(500)),
    ]);

    let mut collab = config(CollaborationStrategy::Parallel, "fast", &["sluggish"]);
    collab.timeout_ms = Some(50);

    let result = engine
        .collaborate(&ChatRequest::from_prompt("question"), &collab)
        .await
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors["sluggish"],
        "Provider 'sluggish' timed out after 50ms"
    );
    assert!(result.secondary_responses.is_empty());
    assert_eq!(result.primary_response.unwrap().text(), "quick answer");
}

#[tokio::test]
async fn parallel_primary_failure_is_recorded_not_fatal() {
    let engine = engine_with(vec![
        ScriptedProvider::failing("primary"),
        ScriptedProvider::replying("backup", "still here"),
    ]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Parallel, "primary", &["backup"]),
        )
        .await
        .unwrap();

    assert!(result.primary_response.is_none());
    assert_eq!(result.secondary_responses.len(), 1);
    assert!(result.errors["primary"].contains("HTTP 500"));
    assert!(result.errors["primary"].contains("upstream exploded"));
}

#[tokio::test]
async fn unregistered_secondary_yields_not_found_entry() {
    // End-to-end shape: primary succeeds, "ollama" was never registered
    let engine = engine_with(vec![ScriptedProvider::replying(
        "openai",
        "Paris is the capital.",
    )]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("What is the capital of France?"),
            &config(CollaborationStrategy::Parallel, "openai", &["ollama"]),
        )
        .await
        .unwrap();

    assert_eq!(
        result.primary_response.unwrap().text(),
        "Paris is the capital."
    );
    assert!(result.secondary_responses.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors["ollama"], "Provider not found");
    assert_eq!(result.confidence, Some(0.7));
}

#[tokio::test]
async fn consensus_is_the_longest_successful_response() {
    let engine = engine_with(vec![
        ScriptedProvider::replying("a", "ab"),
        ScriptedProvider::replying("b", "abcdef"),
        ScriptedProvider::replying("c", "abc"),
    ]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Parallel, "a", &["b", "c"]),
        )
        .await
        .unwrap();

    assert_eq!(result.consensus.as_deref(), Some("abcdef"));
}

#[tokio::test]
async fn identical_answers_have_full_confidence() {
    let text = "The Eiffel Tower stands in Paris";
    let engine = engine_with(vec![
        ScriptedProvider::replying("one", text),
        ScriptedProvider::replying("two", text),
    ]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Parallel, "one", &["two"]),
        )
        .await
        .unwrap();

    assert_eq!(result.confidence, Some(1.0));
}

#[tokio::test]
async fn disagreeing_answers_halve_confidence() {
    // No shared tokens longer than three characters
    let engine = engine_with(vec![
        ScriptedProvider::replying("one", "alpha bravo charlie"),
        ScriptedProvider::replying("two", "delta echo foxtrot"),
    ]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Parallel, "one", &["two"]),
        )
        .await
        .unwrap();

    assert_eq!(result.confidence, Some(0.5));
}

#[tokio::test]
async fn sequential_refines_through_secondaries_in_order() {
    let primary = ScriptedProvider::replying("primary", "draft answer");
    let first = ScriptedProvider::replying("first", "improved answer");
    let second = ScriptedProvider::replying("second", "final answer");
    let first_log = first.request_log();
    let second_log = second.request_log();

    let engine = engine_with(vec![primary, first, second]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(
                CollaborationStrategy::Sequential,
                "primary",
                &["first", "second"],
            ),
        )
        .await
        .unwrap();

    // Each stage saw the previous stage's output
    assert_eq!(previous_output(&first_log.lock().unwrap()[0]), "draft answer");
    assert_eq!(
        previous_output(&second_log.lock().unwrap()[0]),
        "improved answer"
    );
    assert_eq!(result.secondary_responses.len(), 2);
}

#[tokio::test]
async fn sequential_order_changes_refinement_history() {
    let primary = ScriptedProvider::replying("primary", "draft answer");
    let first = ScriptedProvider::replying("first", "improved answer");
    let second = ScriptedProvider::replying("second", "final answer");
    let first_log = first.request_log();
    let second_log = second.request_log();

    let engine = engine_with(vec![primary, first, second]);

    engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(
                CollaborationStrategy::Sequential,
                "primary",
                &["second", "first"],
            ),
        )
        .await
        .unwrap();

    // Reversed order: "second" now refines the draft, "first" refines
    // second's output
    assert_eq!(
        previous_output(&second_log.lock().unwrap()[0]),
        "draft answer"
    );
    assert_eq!(previous_output(&first_log.lock().unwrap()[0]), "final answer");
}

#[tokio::test]
async fn sequential_primary_failure_is_fatal() {
    let primary = ScriptedProvider::failing("primary");
    let secondary = ScriptedProvider::replying("secondary", "never used");
    let secondary_log = secondary.request_log();

    let engine = engine_with(vec![primary, secondary]);

    let err = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Sequential, "primary", &["secondary"]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CollaborationError::PrimaryProvider { ref provider, .. } if provider == "primary"
    ));
    // The chain never started
    assert!(secondary_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sequential_failed_stage_reuses_last_good_output() {
    let primary = ScriptedProvider::replying("primary", "draft answer");
    let broken = ScriptedProvider::failing("broken");
    let closer = ScriptedProvider::replying("closer", "final answer");
    let closer_log = closer.request_log();

    let engine = engine_with(vec![primary, broken, closer]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(
                CollaborationStrategy::Sequential,
                "primary",
                &["broken", "closer"],
            ),
        )
        .await
        .unwrap();

    // The broken stage is recorded and skipped; the next stage refines
    // the draft, not a missing output
    assert!(result.errors.contains_key("broken"));
    assert_eq!(result.secondary_responses.len(), 1);
    assert_eq!(previous_output(&closer_log.lock().unwrap()[0]), "draft answer");
}

#[tokio::test]
async fn ensemble_labels_every_successful_answer() {
    let engine = engine_with(vec![
        ScriptedProvider::replying("lead", "the lead answer"),
        ScriptedProvider::replying("backer", "a supporting answer"),
    ]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Ensemble, "lead", &["backer"]),
        )
        .await
        .unwrap();

    let consensus = result.consensus.unwrap();
    assert!(consensus.contains("Primary AI Response:"));
    assert!(consensus.contains("the lead answer"));
    assert!(consensus.contains("Secondary AI 1 Response:"));
    assert!(consensus.contains("a supporting answer"));

    // Individual responses are preserved alongside the synthesis
    assert_eq!(result.primary_response.unwrap().text(), "the lead answer");
    assert_eq!(result.secondary_responses.len(), 1);
    assert!(result.confidence.is_some());
}

#[tokio::test]
async fn validation_without_validators_fails_before_any_call() {
    let primary = ScriptedProvider::replying("primary", "an answer");
    let primary_log = primary.request_log();

    let engine = engine_with(vec![primary]);

    let err = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Validation, "primary", &[]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CollaborationError::NoValidators));
    assert!(primary_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn validation_keeps_primary_answer_and_scores_verdicts() {
    let primary = ScriptedProvider::replying("primary", "Water boils at 100C at sea level.");
    let approver = ScriptedProvider::replying("approver", "This is accurate.");
    let objector = ScriptedProvider::replying("objector", "There is an issue with the units.");
    let approver_log = approver.request_log();

    let engine = engine_with(vec![primary, approver, objector]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("At what temperature does water boil?"),
            &config(
                CollaborationStrategy::Validation,
                "primary",
                &["approver", "objector"],
            ),
        )
        .await
        .unwrap();

    // One objection out of two validators
    assert_eq!(result.confidence, Some(0.5));
    // No automatic correction: the consensus is the unmodified primary
    assert_eq!(
        result.consensus.as_deref(),
        Some("Water boils at 100C at sea level.")
    );
    assert_eq!(result.secondary_responses.len(), 2);

    // Validators were asked to validate the primary answer
    let validator_request = &approver_log.lock().unwrap()[0];
    assert_eq!(
        previous_output(validator_request),
        "Water boils at 100C at sea level."
    );
    assert!(validator_request
        .messages
        .last()
        .unwrap()
        .content
        .contains("validate the previous response"));
}

#[tokio::test]
async fn validation_primary_failure_is_fatal() {
    let engine = engine_with(vec![
        ScriptedProvider::failing("primary"),
        ScriptedProvider::replying("validator", "accurate"),
    ]);

    let err = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Validation, "primary", &["validator"]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CollaborationError::PrimaryProvider { .. }));
}

#[tokio::test]
async fn validation_tolerates_a_missing_validator() {
    let engine = engine_with(vec![
        ScriptedProvider::replying("primary", "an answer"),
        ScriptedProvider::replying("validator", "valid"),
    ]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(
                CollaborationStrategy::Validation,
                "primary",
                &["validator", "ghost"],
            ),
        )
        .await
        .unwrap();

    assert_eq!(result.errors["ghost"], "Provider not found");
    assert_eq!(result.secondary_responses.len(), 1);
    // The surviving validator approved, no negatives seen
    assert_eq!(result.confidence, Some(0.8));
}

#[tokio::test]
async fn collaboration_result_serializes_for_external_consumers() {
    let engine = engine_with(vec![ScriptedProvider::replying("primary", "answer")]);

    let result = engine
        .collaborate(
            &ChatRequest::from_prompt("question"),
            &config(CollaborationStrategy::Parallel, "primary", &[]),
        )
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json["primaryResponse"]["choices"][0]["message"]["content"],
        "answer"
    );
    assert_eq!(json["confidence"], 0.7);
}
