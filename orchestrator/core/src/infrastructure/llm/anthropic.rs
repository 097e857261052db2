// Anthropic Chat Provider Adapter
//
// Anti-Corruption Layer for the Anthropic Claude Messages API
//
// Anthropic differs from the canonical schema in two ways: the system
// prompt travels as a separate field (not a message), and content is a
// list of typed blocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::llm::{
    ChatProvider, ChatRequest, ChatResponse, Choice, FinishReason, Message, ProviderError, Role,
    Usage,
};
use crate::domain::provider_config::ProviderConfig;
use crate::infrastructure::llm::shared::{
    join_url, synthesize_response_id, transport_error, unix_timestamp, RequestDefaults,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    defaults: RequestDefaults,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: Role,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Serialize, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicAdapter {
    pub fn new(config: &ProviderConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            defaults: RequestDefaults::new(
                config.model.clone(),
                config.temperature,
                config.max_tokens,
                DEFAULT_MODEL,
            ),
        }
    }

    /// Pull the system prompt out of the history and convert what is
    /// left into Anthropic's block format
    fn translate_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let translated = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: m.role,
                content: vec![AnthropicContentBlock {
                    block_type: "text".to_string(),
                    text: m.content.clone(),
                }],
            })
            .collect();

        (system, translated)
    }

    fn map_stop_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("max_tokens") => FinishReason::Length,
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            _ => FinishReason::Stop,
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let (system, messages) = Self::translate_messages(&request.messages);

        let body = AnthropicRequest {
            model: self.defaults.model(request).to_string(),
            messages,
            max_tokens: self.defaults.max_tokens(request),
            temperature: self.defaults.temperature(request),
            system,
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "/v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        let wire: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let text = wire
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();

        Ok(ChatResponse {
            id: synthesize_response_id(),
            choices: vec![Choice {
                message: Message::assistant(text),
                finish_reason: Self::map_stop_reason(wire.stop_reason.as_deref()),
                index: 0,
            }],
            created: unix_timestamp(),
            model: if wire.model.is_empty() {
                self.defaults.model(request).to_string()
            } else {
                wire.model
            },
            usage: wire.usage.map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
        })
    }
}
