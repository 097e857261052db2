// Azure OpenAI Chat Provider Adapter
//
// Anti-Corruption Layer for Azure-hosted OpenAI deployments
//
// Azure speaks the OpenAI response dialect but authenticates with an
// `api-key` header (not a Bearer token) and routes per deployment:
// {base}/openai/deployments/{deployment}/chat/completions?api-version=...
// The deployment name doubles as the model identifier.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::llm::{
    ChatProvider, ChatRequest, ChatResponse, Message, ProviderError, TextStream,
};
use crate::domain::provider_config::ProviderConfig;
use crate::infrastructure::llm::openai::OpenAiWireResponse;
use crate::infrastructure::llm::shared::{self, join_url, transport_error, RequestDefaults};

const DEFAULT_DEPLOYMENT: &str = "gpt-35-turbo";
const API_VERSION: &str = "2023-05-15";

pub struct AzureOpenAiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    defaults: RequestDefaults,
}

/// Azure derives the model from the URL, so the body carries no model
/// field
#[derive(Serialize)]
struct AzureRequest<'a> {
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [serde_json::Value]>,
}

impl AzureOpenAiAdapter {
    /// `base_url` is required for Azure; the registry rejects configs
    /// without one before constructing this adapter
    pub fn new(config: &ProviderConfig, api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            defaults: RequestDefaults::new(
                config.model.clone(),
                config.temperature,
                config.max_tokens,
                DEFAULT_DEPLOYMENT,
            ),
        }
    }

    async fn post_completion(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let deployment = self.defaults.model(request);
        let url = join_url(
            &self.base_url,
            &format!("/openai/deployments/{}/chat/completions", deployment),
        );

        let body = AzureRequest {
            messages: &request.messages,
            temperature: self.defaults.temperature(request),
            max_tokens: self.defaults.max_tokens(request),
            stream: stream.then_some(true),
            functions: request.functions.as_deref(),
        };

        let response = self
            .client
            .post(url)
            .query(&[("api-version", API_VERSION)])
            .header("api-key", &self.api_key)
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
impl ChatProvider for AzureOpenAiAdapter {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self.post_completion(request, false).await?;

        let wire: OpenAiWireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        // Report the deployment name as the model, whatever the payload
        // claims
        let deployment = self.defaults.model(request).to_string();
        let mut chat_response = wire.into_chat_response(&deployment);
        chat_response.model = deployment;
        Ok(chat_response)
    }

    async fn stream_completion(&self, request: &ChatRequest) -> Result<TextStream, ProviderError> {
        let response = self.post_completion(request, true).await?;
        Ok(shared::sse_text_stream(response))
    }
}
