// Google Gemini Chat Provider Adapter
//
// Anti-Corruption Layer for the Generative Language API
//
// Gemini's schema renames the assistant role to "model" and wraps text
// in a parts array; the API key travels as a query parameter.

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Blocking thresholds sent with every request
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GoogleAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    defaults: RequestDefaults,
}

#[derive(Serialize)]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GoogleGenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<GoogleSafetySetting>,
}

#[derive(Serialize, Deserialize, Default)]
struct GoogleContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Serialize, Deserialize, Default)]
struct GooglePart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GoogleGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GoogleSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize, Default)]
struct GoogleCandidate {
    #[serde(default)]
    content: GoogleContent,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

impl GoogleAdapter {
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

    /// Gemini's role vocabulary: assistant turns are "model", everything
    /// else keeps its canonical name
    fn role_name(role: Role) -> &'static str {
        match role {
            Role::Assistant => "model",
            Role::User => "user",
            Role::System => "system",
            Role::Function => "function",
        }
    }

    fn translate_messages(messages: &[Message]) -> Vec<GoogleContent> {
        messages
            .iter()
            .map(|m| GoogleContent {
                role: Self::role_name(m.role).to_string(),
                parts: vec![GooglePart {
                    text: m.content.clone(),
                }],
            })
            .collect()
    }

    fn map_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

#[async_trait]
impl ChatProvider for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = self.defaults.model(request).to_string();

        let body = GoogleRequest {
            contents: Self::translate_messages(&request.messages),
            generation_config: GoogleGenerationConfig {
                temperature: self.defaults.temperature(request),
                max_output_tokens: self.defaults.max_tokens(request),
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| GoogleSafetySetting {
                    category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
        };

        let url = join_url(&self.base_url, &format!("/models/{}:generateContent", model));

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        let wire: GoogleResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let candidate = wire.candidates.into_iter().next().unwrap_or_default();
        let text = candidate
            .content
            .parts
            .first()
            .map(|p| p.text.clone())
            .unwrap_or_default();

        Ok(ChatResponse {
            id: synthesize_response_id(),
            choices: vec![Choice {
                message: Message::assistant(text),
                finish_reason: Self::map_finish_reason(candidate.finish_reason.as_deref()),
                index: 0,
            }],
            created: unix_timestamp(),
            model,
            // Token accounting is not reliably reported on this endpoint
            usage: Some(Usage::default()),
        })
    }
}
