// Ollama Chat Provider Adapter
//
// Anti-Corruption Layer for Ollama local models
// Supports air-gapped deployments with local LLMs; no API key required.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::llm::{
    ChatProvider, ChatRequest, ChatResponse, Choice, FinishReason, Message, ProviderError, Role,
    TextStream, Usage,
};
use crate::domain::provider_config::ProviderConfig;
use crate::infrastructure::llm::shared::{
    self, join_url, synthesize_response_id, transport_error, unix_timestamp, RequestDefaults,
};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama2";

pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    defaults: RequestDefaults,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: OllamaResponseMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Default, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaAdapter {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            defaults: RequestDefaults::new(
                config.model.clone(),
                config.temperature,
                config.max_tokens,
                DEFAULT_MODEL,
            ),
        }
    }

    async fn post_chat(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = OllamaRequest {
            model: self.defaults.model(request),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            options: OllamaOptions {
                temperature: self.defaults.temperature(request),
                num_predict: self.defaults.max_tokens(request),
            },
            stream,
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "/api/chat"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self.post_chat(request, false).await?;

        let wire: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(ChatResponse {
            id: synthesize_response_id(),
            choices: vec![Choice {
                message: Message::assistant(wire.message.content),
                finish_reason: if wire.done {
                    FinishReason::Stop
                } else {
                    FinishReason::Length
                },
                index: 0,
            }],
            created: unix_timestamp(),
            model: if wire.model.is_empty() {
                self.defaults.model(request).to_string()
            } else {
                wire.model
            },
            usage: Some(Usage {
                prompt_tokens: wire.prompt_eval_count,
                completion_tokens: wire.eval_count,
                total_tokens: wire.prompt_eval_count + wire.eval_count,
            }),
        })
    }

    async fn stream_completion(&self, request: &ChatRequest) -> Result<TextStream, ProviderError> {
        let response = self.post_chat(request, true).await?;
        Ok(shared::ndjson_text_stream(response))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        #[derive(Deserialize)]
        struct TagList {
            #[serde(default)]
            models: Vec<TagEntry>,
        }
        #[derive(Deserialize)]
        struct TagEntry {
            #[serde(default)]
            name: String,
        }

        let response = self
            .client
            .get(join_url(&self.base_url, "/api/tags"))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        let tags: TagList = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_flag_drives_finish_reason() {
        let wire: OllamaResponse =
            serde_json::from_str(r#"{"message":{"content":"hi"},"done":true}"#).unwrap();
        assert!(wire.done);

        let partial: OllamaResponse =
            serde_json::from_str(r#"{"message":{"content":"hi"},"done":false}"#).unwrap();
        assert!(!partial.done);
    }

    #[test]
    fn missing_counts_zero_fill() {
        let wire: OllamaResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(wire.prompt_eval_count, 0);
        assert_eq!(wire.eval_count, 0);
        assert_eq!(wire.message.content, "");
    }
}
