// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Configuration Types
//
// Defines the configuration schema for chat providers and the YAML
// collaboration manifest consumed by the CLI and service bootstrap:
// - Typed provider configuration (key, endpoint, model, sampling)
// - Closed provider-kind vocabulary with string parsing
// - Manifest loading with env-var key indirection left to the registry

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::collaboration::CollaborationConfig;

/// Closed set of supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Openai,
    Anthropic,
    Google,
    Ollama,
    AzureOpenai,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::Openai),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "google" => Ok(ProviderKind::Google),
            "ollama" => Ok(ProviderKind::Ollama),
            "azure-openai" => Ok(ProviderKind::AzureOpenai),
            _ => Err(format!("Unknown provider kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::AzureOpenai => write!(f, "azure-openai"),
        }
    }
}

/// Configuration for a single provider entry
///
/// `kind` stays a raw string here so a manifest carrying an unrecognized
/// backend still parses; the registry factory parses it into
/// [`ProviderKind`] and skips unknown values with a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub kind: String,

    /// API key, either literal or "env:VAR_NAME" indirection
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,

    /// Endpoint override; each backend has its own default
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none", default)]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_tokens: Option<u32>,
}

impl ProviderConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            api_key: None,
            base_url: None,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Top-level YAML manifest: named provider configs plus an optional
/// default collaboration setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationManifest {
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub collaboration: Option<CollaborationConfig>,
}

impl CollaborationManifest {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse collaboration manifest")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }
}
