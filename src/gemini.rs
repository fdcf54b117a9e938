//! Gemini `generateContent` wire format and HTTP transport
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! The API key travels as the `key` query parameter and is never logged.

use crate::error::AnalysisError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

//
// ================= Request =================
//

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl GenerateContentRequest {
    /// One text part followed by one inline-data part per payload, in order
    pub fn prompt_with_documents<'a>(
        prompt: &str,
        payloads: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];

        parts.extend(payloads.into_iter().map(|(mime_type, data)| Part::InlineData {
            inline_data: Blob {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            },
        }));

        Self {
            contents: vec![Content { parts }],
        }
    }
}

//
// ================= Response =================
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ErrorEnvelope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

/// Raw HTTP reply; non-2xx bodies are kept so error envelopes can be reported
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Extract `candidates[0].content.parts[0].text`; anything else is an invalid response
pub fn extract_text(response: &RawResponse) -> Result<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(&response.body).map_err(|e| {
        AnalysisError::InvalidResponse(format!(
            "malformed JSON (HTTP {}): {}",
            response.status, e
        ))
    })?;

    if let Some(envelope) = parsed.error {
        return Err(AnalysisError::InvalidResponse(format!(
            "{} {}: {}",
            envelope.code.unwrap_or(response.status),
            envelope.status.unwrap_or_else(|| "ERROR".to_string()),
            envelope.message.unwrap_or_default()
        )));
    }

    if !response.is_success() {
        return Err(AnalysisError::InvalidResponse(format!(
            "HTTP {}",
            response.status
        )));
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("no candidates (blocked: {})", r))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(AnalysisError::InvalidResponse(reason));
    };

    candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| {
            AnalysisError::InvalidResponse(format!(
                "candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })
}

//
// ================= Transport =================
//

/// One POST to the model endpoint
#[async_trait]
pub trait GeminiTransport: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<RawResponse>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AnalysisError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint_url(base_url, model),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn endpoint_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

#[async_trait]
impl GeminiTransport for GeminiClient {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<RawResponse> {
        debug!(endpoint = %self.endpoint, "Calling Gemini API");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                // Strip the URL: it carries the API key.
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                if e.is_timeout() {
                    AnalysisError::Timeout(self.timeout)
                } else {
                    AnalysisError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to read Gemini response body: {}", e);
            if e.is_timeout() {
                AnalysisError::Timeout(self.timeout)
            } else {
                AnalysisError::Network(e.to_string())
            }
        })?;

        if !(200..300).contains(&status) {
            warn!(status, "Gemini API returned an error status");
        }

        Ok(RawResponse { status, body })
    }
}
