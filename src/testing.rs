//! Test doubles shared by the unit test suites

use crate::analysis::Analyzer;
use crate::documents::DocumentSet;
use crate::error::AnalysisError;
use crate::gemini::{GenerateContentRequest, GeminiTransport, RawResponse};
use crate::models::{FeatureKind, PromptContext};
use crate::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

pub fn success_body(text: &str) -> RawResponse {
    RawResponse::ok(
        serde_json::json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
            .to_string(),
    )
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub request: GenerateContentRequest,
}

/// Transport that records every call and replies with a canned response
pub struct RecordingTransport {
    response: RawResponse,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    pub fn replying(response: RawResponse) -> Self {
        Self {
            response,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GeminiTransport for RecordingTransport {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            api_key: api_key.to_string(),
            request: request.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.response.clone())
    }
}

struct GatedCall {
    feature: FeatureKind,
    set_id: Uuid,
    release: Option<oneshot::Sender<Result<String>>>,
}

/// Analyzer whose calls block until the test releases them, so completion
/// order can be chosen independently of trigger order.
#[derive(Default)]
pub struct GatedAnalyzer {
    calls: Mutex<Vec<GatedCall>>,
}

impl GatedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call(&self, index: usize) -> (FeatureKind, Uuid) {
        let calls = self.calls.lock().unwrap();
        (calls[index].feature, calls[index].set_id)
    }

    /// Wait until at least `count` calls have arrived
    pub async fn wait_for_calls(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.call_count() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {} analyzer calls",
                count
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn release(&self, index: usize, result: Result<String>) {
        let sender = self.calls.lock().unwrap()[index]
            .release
            .take()
            .expect("call already released");
        let _ = sender.send(result);
    }
}

#[async_trait]
impl Analyzer for GatedAnalyzer {
    async fn analyze(
        &self,
        documents: &DocumentSet,
        feature: FeatureKind,
        _context: &PromptContext,
    ) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().unwrap().push(GatedCall {
            feature,
            set_id: documents.set_id,
            release: Some(tx),
        });

        rx.await
            .unwrap_or_else(|_| Err(AnalysisError::Network("gate dropped".to_string())))
    }
}
