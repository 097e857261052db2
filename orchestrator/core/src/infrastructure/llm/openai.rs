// OpenAI Chat Provider Adapter
//
// Anti-Corruption Layer for the OpenAI API
// Also works with OpenAI-compatible APIs (LM Studio, vLLM, etc.)

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

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub struct OpenAiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    defaults: RequestDefaults,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [serde_json::Value]>,
}

/// Wire response shared with the Azure adapter; every field defaults so
/// a malformed payload is zero-filled instead of failing
#[derive(Deserialize)]
pub(crate) struct OpenAiWireResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    choices: Vec<OpenAiWireChoice>,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<OpenAiWireUsage>,
}

#[derive(Deserialize)]
struct OpenAiWireChoice {
    #[serde(default)]
    message: OpenAiWireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    index: u32,
}

#[derive(Default, Deserialize)]
struct OpenAiWireMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OpenAiWireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiModelList {
    #[serde(default)]
    data: Vec<OpenAiModelEntry>,
}

#[derive(Deserialize)]
struct OpenAiModelEntry {
    #[serde(default)]
    id: String,
}

impl OpenAiWireResponse {
    /// Translate into the canonical response, synthesizing anything the
    /// vendor omitted
    pub(crate) fn into_chat_response(self, fallback_model: &str) -> ChatResponse {
        let mut choices: Vec<Choice> = self
            .choices
            .into_iter()
            .map(|c| Choice {
                message: Message {
                    role: Role::Assistant,
                    content: c.message.content,
                    name: None,
                },
                finish_reason: map_finish_reason(c.finish_reason.as_deref()),
                index: c.index,
            })
            .collect();
        if choices.is_empty() {
            choices.push(Choice {
                message: Message::assistant(""),
                finish_reason: FinishReason::Stop,
                index: 0,
            });
        }

        ChatResponse {
            id: if self.id.is_empty() {
                synthesize_response_id()
            } else {
                self.id
            },
            choices,
            created: if self.created == 0 {
                unix_timestamp()
            } else {
                self.created
            },
            model: if self.model.is_empty() {
                fallback_model.to_string()
            } else {
                self.model
            },
            usage: self.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        }
    }
}

pub(crate) fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

impl OpenAiAdapter {
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

    async fn post_completion(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = OpenAiRequest {
            model: self.defaults.model(request),
            messages: &request.messages,
            temperature: self.defaults.temperature(request),
            max_tokens: self.defaults.max_tokens(request),
            stream: stream.then_some(true),
            functions: request.functions.as_deref(),
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
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
impl ChatProvider for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self.post_completion(request, false).await?;

        let wire: OpenAiWireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(wire.into_chat_response(self.defaults.model(request)))
    }

    async fn stream_completion(&self, request: &ChatRequest) -> Result<TextStream, ProviderError> {
        let response = self.post_completion(request, true).await?;
        Ok(shared::sse_text_stream(response))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "/models"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        let list: OpenAiModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}
