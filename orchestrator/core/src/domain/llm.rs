// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Chat Provider Domain Interface (Anti-Corruption Layer)
//
// Defines the canonical chat-completion schema and the provider contract
// every vendor adapter implements. Prevents vendor lock-in by keeping
// business logic on this schema only.
//
// Implementations in infrastructure/llm/ directory.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Function,
}

/// A single message in an ordered conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    pub content: String,

    /// Set for function-call messages
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }
}

/// Canonical chat-completion request
///
/// Vendor adapters translate this into their own wire format. `functions`
/// is passed through verbatim for OpenAI-style backends; no tool-calling
/// semantics are interpreted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub functions: Option<Vec<serde_json::Value>>,
}

impl ChatRequest {
    /// Request with a single user message and defaults everywhere else
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            ..Self::default()
        }
    }
}

/// Why generation stopped, mapped onto the canonical vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural completion (model decided to stop)
    Stop,

    /// Hit the max-tokens limit
    Length,

    /// Blocked by a vendor content filter
    ContentFilter,
}

/// One generated completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: Message,
    pub finish_reason: FinishReason,
    pub index: u32,
}

/// Token accounting as reported (or estimated) by the vendor
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Canonical chat-completion response (OpenAI-compatible JSON shape)
///
/// Invariant: `choices` is non-empty on success. Adapters synthesize `id`
/// and `created` when the vendor omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<Choice>,
    pub created: i64,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Content of the first choice, or "" when the response is degenerate
    pub fn text(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }
}

/// Errors that can occur talking to a chat provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx HTTP response; carries the status and the raw body
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("Provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

/// Lazy sequence of streamed text deltas. Finite, not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Capability contract for a chat-completion backend
///
/// Each vendor adapter implements this independently; shared behavior
/// lives in helper functions, not a base type.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Canonical identifier ("openai", "anthropic", ...)
    fn name(&self) -> &str;

    /// Perform a blocking chat completion
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Stream text deltas for a completion
    ///
    /// Default falls back to a blocking completion and yields the full
    /// text once; adapters with native streaming override this.
    async fn stream_completion(&self, request: &ChatRequest) -> Result<TextStream, ProviderError> {
        let response = self.chat_completion(request).await?;
        let text = response.text().to_string();
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<String, ProviderError>(text)
        })))
    }

    /// Model identifiers this provider can serve
    ///
    /// Default reports the provider name itself; adapters with a listing
    /// endpoint override this.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![self.name().to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn message_serializes_openai_compatible() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn request_uses_camel_case_contract() {
        let request = ChatRequest {
            max_tokens: Some(256),
            ..ChatRequest::from_prompt("hello")
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["maxTokens"], 256);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn finish_reason_canonical_strings() {
        assert_eq!(
            serde_json::to_value(FinishReason::ContentFilter).unwrap(),
            serde_json::json!("content_filter")
        );
        assert_eq!(
            serde_json::to_value(FinishReason::Stop).unwrap(),
            serde_json::json!("stop")
        );
    }

    #[test]
    fn response_text_handles_missing_choices() {
        let response = ChatResponse {
            id: "chatcmpl-x".into(),
            choices: vec![],
            created: 0,
            model: "gpt-4".into(),
            usage: None,
        };
        assert_eq!(response.text(), "");
    }
}
