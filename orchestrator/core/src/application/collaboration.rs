// Multi-Provider Collaboration Engine
//
// Dispatches one chat request across several registered providers under
// a configured strategy and folds the outcomes into a single
// CollaborationResult. Fan-out strategies settle every branch before
// aggregating (full barrier, not first-response-wins); no call is ever
// retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::application::response_metrics::{
    agreement_confidence, longest_response, validation_confidence,
};
use crate::domain::collaboration::{
    CollaborationConfig, CollaborationError, CollaborationResult, CollaborationStrategy,
};
use crate::domain::llm::{ChatRequest, ChatResponse, Message, ProviderError};
use crate::infrastructure::llm::ProviderRegistry;

const REFINEMENT_PROMPT: &str = "Please refine, fact-check, or enhance the previous response. \
     Focus on accuracy and completeness.";

const VALIDATION_PROMPT: &str = "Please validate the previous response. Check for factual \
     accuracy, logical consistency, and completeness. Point out any issues and suggest \
     improvements.";

pub struct CollaborationEngine {
    registry: Arc<ProviderRegistry>,
}

impl CollaborationEngine {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Run one collaboration under the configured strategy
    pub async fn collaborate(
        &self,
        request: &ChatRequest,
        config: &CollaborationConfig,
    ) -> Result<CollaborationResult, CollaborationError> {
        match config.strategy {
            CollaborationStrategy::Sequential => self.sequential(request, config).await,
            CollaborationStrategy::Parallel => self.parallel(request, config).await,
            CollaborationStrategy::Ensemble => self.ensemble(request, config).await,
            CollaborationStrategy::Validation => self.validation(request, config).await,
        }
    }

    /// Primary answers first, then each secondary refines the running
    /// answer in the configured order. A failed secondary is recorded
    /// and the chain continues from the last good output.
    async fn sequential(
        &self,
        request: &ChatRequest,
        config: &CollaborationConfig,
    ) -> Result<CollaborationResult, CollaborationError> {
        let mut result = CollaborationResult::empty();

        let primary_response = self.call_primary(request, config).await?;
        let mut current_text = primary_response.text().to_string();
        result.primary_response = Some(primary_response);

        for name in &config.secondary_providers {
            let Some(provider) = self.registry.get(name) else {
                result
                    .errors
                    .insert(name.clone(), ProviderError::NotFound.to_string());
                continue;
            };

            let refinement = build_followup_request(request, &current_text, REFINEMENT_PROMPT);
            match provider.chat_completion(&refinement).await {
                Ok(response) => {
                    current_text = response.text().to_string();
                    result.secondary_responses.push(response);
                }
                Err(e) => {
                    warn!("Secondary provider '{}' failed: {}", name, e);
                    result.errors.insert(name.clone(), e.to_string());
                }
            }
        }

        Ok(result)
    }

    /// Primary and all secondaries answer the same request
    /// concurrently; every branch settles before aggregation
    async fn parallel(
        &self,
        request: &ChatRequest,
        config: &CollaborationConfig,
    ) -> Result<CollaborationResult, CollaborationError> {
        let mut result = CollaborationResult::empty();

        let mut branches = vec![config.primary_provider.clone()];
        branches.extend(config.secondary_providers.iter().cloned());

        for (name, outcome) in self.fan_out(&branches, request, config.timeout_ms).await {
            match outcome {
                Ok(response) if name == config.primary_provider => {
                    result.primary_response = Some(response);
                }
                Ok(response) => result.secondary_responses.push(response),
                Err(e) => {
                    result.errors.insert(name, e.to_string());
                }
            }
        }

        let (consensus, confidence) = consensus_and_confidence(&result);
        result.consensus = consensus;
        result.confidence = confidence;

        Ok(result)
    }

    /// Parallel fan-out, then a labeled synthesis of every successful
    /// answer alongside the individual responses
    async fn ensemble(
        &self,
        request: &ChatRequest,
        config: &CollaborationConfig,
    ) -> Result<CollaborationResult, CollaborationError> {
        let mut result = self.parallel(request, config).await?;

        if let Some(synthesis) = ensemble_synthesis(&result) {
            result.consensus = Some(synthesis);
        }

        Ok(result)
    }

    /// Primary answers, then every secondary critiques that answer
    /// concurrently. The returned consensus is the unmodified primary
    /// output: validator feedback informs the confidence score only, no
    /// automatic correction is applied.
    async fn validation(
        &self,
        request: &ChatRequest,
        config: &CollaborationConfig,
    ) -> Result<CollaborationResult, CollaborationError> {
        if config.secondary_providers.is_empty() {
            return Err(CollaborationError::NoValidators);
        }

        let primary_response = self.call_primary(request, config).await?;
        let primary_text = primary_response.text().to_string();

        let validation_request = build_followup_request(request, &primary_text, VALIDATION_PROMPT);

        let mut result = CollaborationResult::empty();
        for (name, outcome) in self
            .fan_out(&config.secondary_providers, &validation_request, None)
            .await
        {
            match outcome {
                Ok(response) => result.secondary_responses.push(response),
                Err(e) => {
                    result.errors.insert(name, e.to_string());
                }
            }
        }

        let confidence = {
            let verdicts: Vec<&str> = result
                .secondary_responses
                .iter()
                .map(|r| r.text())
                .collect();
            validation_confidence(&verdicts)
        };
        result.confidence = Some(confidence);
        result.consensus = Some(primary_text);
        result.primary_response = Some(primary_response);

        Ok(result)
    }

    /// Resolve and invoke the primary provider; any failure here is
    /// fatal to the strategies that call this
    async fn call_primary(
        &self,
        request: &ChatRequest,
        config: &CollaborationConfig,
    ) -> Result<ChatResponse, CollaborationError> {
        let provider = self.registry.get(&config.primary_provider).ok_or_else(|| {
            CollaborationError::PrimaryProvider {
                provider: config.primary_provider.clone(),
                source: ProviderError::NotFound,
            }
        })?;

        provider.chat_completion(request).await.map_err(|source| {
            CollaborationError::PrimaryProvider {
                provider: config.primary_provider.clone(),
                source,
            }
        })
    }

    /// Issue one spawned call per provider name and wait for all of
    /// them to settle. Outcomes come back in branch order.
    async fn fan_out(
        &self,
        names: &[String],
        request: &ChatRequest,
        timeout_ms: Option<u64>,
    ) -> Vec<(String, Result<ChatResponse, ProviderError>)> {
        let mut handles = Vec::new();
        for name in names {
            let registry = Arc::clone(&self.registry);
            let request = request.clone();
            let task_name = name.clone();

            let handle = tokio::spawn(async move {
                call_provider(&registry, &task_name, &request, timeout_ms).await
            });
            handles.push((name.clone(), handle));
        }

        let mut outcomes = Vec::new();
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Provider task for '{}' failed to join: {}", name, e);
                    Err(ProviderError::Network(format!("Task failed: {}", e)))
                }
            };
            outcomes.push((name, outcome));
        }

        outcomes
    }
}

/// Invoke one provider, optionally racing it against a deadline.
///
/// On timeout the branch future is dropped, which also aborts the
/// in-flight HTTP request; a timed-out call does not keep running.
async fn call_provider(
    registry: &ProviderRegistry,
    name: &str,
    request: &ChatRequest,
    timeout_ms: Option<u64>,
) -> Result<ChatResponse, ProviderError> {
    let provider = registry.get(name).ok_or(ProviderError::NotFound)?;

    match timeout_ms {
        None => provider.chat_completion(request).await,
        Some(ms) => {
            match tokio::time::timeout(Duration::from_millis(ms), provider.chat_completion(request))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout {
                    provider: name.to_string(),
                    timeout_ms: ms,
                }),
            }
        }
    }
}

/// Original conversation plus the previous answer and a follow-up
/// instruction, for refinement and validation turns
fn build_followup_request(
    original: &ChatRequest,
    previous_output: &str,
    instruction: &str,
) -> ChatRequest {
    let mut request = original.clone();
    request.messages.push(Message::assistant(previous_output));
    request.messages.push(Message::user(instruction));
    request
}

/// Labeled concatenation of several answers; a single answer passes
/// through unlabeled
fn combine_responses(labeled: &[(String, &str)]) -> String {
    if labeled.len() == 1 {
        return labeled[0].1.to_string();
    }

    let mut combined = String::from("Multiple AI collaboration:\n\n");
    for (label, text) in labeled {
        combined.push_str(&format!("**{} Response:**\n{}\n\n", label, text));
    }
    combined.push_str("**Synthesized Summary:**\n");
    combined
}

fn collect_texts(result: &CollaborationResult) -> Vec<&str> {
    let mut texts = Vec::new();
    if let Some(primary) = &result.primary_response {
        texts.push(primary.text());
    }
    texts.extend(result.secondary_responses.iter().map(|r| r.text()));
    texts
}

/// Longest-response consensus (when at least two answers succeeded) and
/// token-overlap confidence (when at least one did)
fn consensus_and_confidence(result: &CollaborationResult) -> (Option<String>, Option<f64>) {
    let texts = collect_texts(result);

    let consensus = if texts.len() >= 2 {
        longest_response(&texts).map(str::to_string)
    } else {
        None
    };
    let confidence = if texts.is_empty() {
        None
    } else {
        Some(agreement_confidence(&texts))
    };

    (consensus, confidence)
}

/// Labeled synthesis of every successful answer, or None when nothing
/// succeeded
fn ensemble_synthesis(result: &CollaborationResult) -> Option<String> {
    let mut labeled: Vec<(String, &str)> = Vec::new();
    if let Some(primary) = &result.primary_response {
        labeled.push(("Primary AI".to_string(), primary.text()));
    }
    for (idx, response) in result.secondary_responses.iter().enumerate() {
        labeled.push((format!("Secondary AI {}", idx + 1), response.text()));
    }

    if labeled.is_empty() {
        None
    } else {
        Some(combine_responses(&labeled))
    }
}
