// Adapter Helper Module
//
// Shared building blocks for the vendor adapters: request/config merge,
// URL joining, response-id synthesis, and the two streaming body
// framings (SSE "data:" lines and raw NDJSON). Adapters compose these;
// there is no base provider type.

use futures::StreamExt;

use crate::domain::llm::{ChatRequest, ProviderError, TextStream};

/// Effective generation parameters: request value, else configured
/// value, else the vendor default
#[derive(Debug, Clone)]
pub struct RequestDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl RequestDefaults {
    pub fn new(
        model: Option<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        default_model: &str,
    ) -> Self {
        Self {
            model: model.unwrap_or_else(|| default_model.to_string()),
            temperature: temperature.unwrap_or(0.7),
            max_tokens: max_tokens.unwrap_or(1024),
        }
    }

    pub fn model<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.model)
    }

    pub fn temperature(&self, request: &ChatRequest) -> f32 {
        request.temperature.unwrap_or(self.temperature)
    }

    pub fn max_tokens(&self, request: &ChatRequest) -> u32 {
        request.max_tokens.unwrap_or(self.max_tokens)
    }
}

/// Join an endpoint base with a path, tolerating trailing slashes
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Response id in the canonical "chatcmpl-..." form, for vendors that
/// do not send one
pub fn synthesize_response_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Map a non-2xx response into the transport error carrying status and
/// raw body
pub async fn transport_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Transport { status, body }
}

/// Stream of text deltas from an SSE-style body: newline-delimited
/// `data: {json}` lines terminated by `data: [DONE]`, content at
/// `choices[0].delta.content` (OpenAI and Azure OpenAI share this
/// framing). Malformed lines are skipped.
pub fn sse_text_stream(response: reqwest::Response) -> TextStream {
    let mut bytes = response.bytes_stream();
    Box::pin(async_stream::stream! {
        let mut buffer = String::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(ProviderError::Network(e.to_string()));
                    return;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                if let Some(data) = line.strip_prefix("data: ") {
                    if data == "[DONE]" {
                        return;
                    }
                    if let Ok(json) = serde_json::from_str::<serde_json::Value>(data) {
                        if let Some(content) = json["choices"][0]["delta"]["content"].as_str() {
                            if !content.is_empty() {
                                yield Ok(content.to_string());
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Stream of text deltas from Ollama's NDJSON body: one raw JSON object
/// per line, content at `message.content`, terminated by stream close.
pub fn ndjson_text_stream(response: reqwest::Response) -> TextStream {
    let mut bytes = response.bytes_stream();
    Box::pin(async_stream::stream! {
        let mut buffer = String::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(ProviderError::Network(e.to_string()));
                    return;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                if line.is_empty() {
                    continue;
                }
                if let Ok(json) = serde_json::from_str::<serde_json::Value>(&line) {
                    if let Some(content) = json["message"]["content"].as_str() {
                        if !content.is_empty() {
                            yield Ok(content.to_string());
                        }
                    }
                }
            }
        }
    })
}
