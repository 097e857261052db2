// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Chat Provider Registry - Provider Construction and Lookup
//
// Owns the name -> adapter map. Built once at bootstrap from typed
// configs, then shared immutably (behind an Arc) with the collaboration
// engine; reads never take a lock.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::llm::{ChatProvider, ProviderError};
use crate::domain::provider_config::{ProviderConfig, ProviderKind};

use super::anthropic::AnthropicAdapter;
use super::azure_openai::AzureOpenAiAdapter;
use super::google::GoogleAdapter;
use super::ollama::OllamaAdapter;
use super::openai::OpenAiAdapter;

/// Registry of named chat providers
///
/// Names are caller-chosen ("prod-gpt4"), distinct from the adapters'
/// canonical vendor identifiers. Inserting an existing name replaces
/// the previous adapter.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from named configs
    ///
    /// Per-entry failures (unknown kind, missing key material) are
    /// logged and skipped; one bad entry never takes down the rest.
    pub fn from_configs(configs: &HashMap<String, ProviderConfig>) -> Self {
        let mut registry = Self::new();

        info!("Initializing chat provider registry");

        for (name, config) in configs {
            match Self::create_provider(config) {
                Ok(provider) => {
                    info!("Registered provider '{}' ({})", name, provider.name());
                    registry.register(name.clone(), provider);
                }
                Err(e) => {
                    warn!("Skipping provider '{}': {}", name, e);
                }
            }
        }

        if registry.providers.is_empty() {
            warn!("No chat providers configured - collaboration will not be available");
        }

        registry
    }

    /// Construct an adapter from a single config, dispatching on the
    /// closed provider-kind set
    fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        let kind = ProviderKind::from_str(&config.kind).map_err(ProviderError::Config)?;
        let api_key = Self::resolve_api_key(&config.api_key)?;

        let provider: Arc<dyn ChatProvider> = match kind {
            ProviderKind::Openai => Arc::new(OpenAiAdapter::new(config, api_key)),
            ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(config, api_key)),
            ProviderKind::Google => Arc::new(GoogleAdapter::new(config, api_key)),
            ProviderKind::Ollama => Arc::new(OllamaAdapter::new(config)),
            ProviderKind::AzureOpenai => {
                let base_url = config.base_url.clone().ok_or_else(|| {
                    ProviderError::Config("azure-openai requires a baseURL".to_string())
                })?;
                Arc::new(AzureOpenAiAdapter::new(config, api_key, base_url))
            }
        };

        Ok(provider)
    }

    /// Resolve an API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> Result<String, ProviderError> {
        match key {
            Some(k) if k.starts_with("env:") => {
                let var_name = k.trim_start_matches("env:");
                std::env::var(var_name).map_err(|_| {
                    ProviderError::Config(format!("Environment variable not set: {}", var_name))
                })
            }
            Some(k) => Ok(k.clone()),
            // Local providers run without auth
            None => Ok(String::new()),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Model ids per provider; a provider that fails to answer is
    /// recorded with an empty list so the listing never aborts
    pub async fn list_all_models(&self) -> HashMap<String, Vec<String>> {
        let mut result = HashMap::new();

        for (name, provider) in &self.providers {
            match provider.list_models().await {
                Ok(models) => {
                    result.insert(name.clone(), models);
                }
                Err(e) => {
                    warn!("Listing models for provider '{}' failed: {}", name, e);
                    result.insert(name.clone(), Vec::new());
                }
            }
        }

        result
    }
}
