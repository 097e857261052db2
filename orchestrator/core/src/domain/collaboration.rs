// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Collaboration Domain Types
//
// Configuration and result model for multi-provider collaboration runs.
// The engine in application/collaboration.rs produces one
// CollaborationResult per invocation; the result is caller-owned and
// never shared or mutated after return.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::llm::{ChatResponse, ProviderError};

/// How multiple providers' outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationStrategy {
    /// Primary answers, secondaries refine the answer in order
    Sequential,
    /// All providers answer the same request concurrently
    Parallel,
    /// Parallel, plus a labeled synthesis of every successful answer
    Ensemble,
    /// Primary answers, secondaries critique the answer concurrently
    Validation,
}

impl std::str::FromStr for CollaborationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(CollaborationStrategy::Sequential),
            "parallel" => Ok(CollaborationStrategy::Parallel),
            "ensemble" => Ok(CollaborationStrategy::Ensemble),
            "validation" => Ok(CollaborationStrategy::Validation),
            _ => Err(format!("Unknown collaboration strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for CollaborationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollaborationStrategy::Sequential => write!(f, "sequential"),
            CollaborationStrategy::Parallel => write!(f, "parallel"),
            CollaborationStrategy::Ensemble => write!(f, "ensemble"),
            CollaborationStrategy::Validation => write!(f, "validation"),
        }
    }
}

/// Configuration for one collaboration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationConfig {
    pub primary_provider: String,

    /// Order matters: the sequential strategy folds through these in
    /// the given order
    #[serde(default)]
    pub secondary_providers: Vec<String>,

    pub strategy: CollaborationStrategy,

    /// Per-branch deadline for parallel fan-out; chained sequential
    /// calls are never raced against a timer
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timeout_ms: Option<u64>,
}

/// Outcome of a collaboration run
///
/// Invariant: a provider name appears in `errors` exactly when its call
/// contributed nothing to `primary_response`/`secondary_responses`.
/// `confidence`, when present, lies in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationResult {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub primary_response: Option<ChatResponse>,

    #[serde(default)]
    pub secondary_responses: Vec<ChatResponse>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub consensus: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f64>,

    /// Provider name -> failure message for every branch that failed
    #[serde(default)]
    pub errors: HashMap<String, String>,
}

impl CollaborationResult {
    pub fn empty() -> Self {
        Self {
            primary_response: None,
            secondary_responses: Vec::new(),
            consensus: None,
            confidence: None,
            errors: HashMap::new(),
        }
    }
}

/// Failures that abort a collaboration run outright
///
/// Secondary/validator failures never surface here; they accumulate in
/// [`CollaborationResult::errors`] instead.
#[derive(Debug, thiserror::Error)]
pub enum CollaborationError {
    #[error("Primary provider '{provider}' failed: {source}")]
    PrimaryProvider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("Validation collaboration requires at least one secondary provider")]
    NoValidators,
}
