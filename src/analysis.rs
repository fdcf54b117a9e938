//! Analysis client
//!
//! Turns one (document set, feature) pair into exactly one Gemini call.
//! No retries, no caching, no deduplication: every invocation hits the
//! network once, and the model's prose is returned untouched.

use crate::credentials::{self, CredentialStore};
use crate::documents::{DocumentReader, DocumentSet};
use crate::error::AnalysisError;
use crate::gemini::{extract_text, GenerateContentRequest, GeminiTransport};
use crate::models::{FeatureKind, PromptContext};
use crate::prompts::PromptCatalog;
use crate::Result;
use async_trait::async_trait;
use base64::Engine as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Fully assembled request; built fresh per call and never stored
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document_set: DocumentSet,
    pub feature: FeatureKind,
    pub prompt_text: String,
    /// Base64 payloads in document order
    pub payloads: Vec<String>,
}

impl AnalysisRequest {
    pub fn to_wire(&self) -> GenerateContentRequest {
        GenerateContentRequest::prompt_with_documents(
            &self.prompt_text,
            self.document_set
                .documents()
                .iter()
                .zip(&self.payloads)
                .map(|(doc, data)| (doc.mime_type.as_str(), data.as_str())),
        )
    }
}

/// Anything that can produce an analysis for a feature
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        documents: &DocumentSet,
        feature: FeatureKind,
        context: &PromptContext,
    ) -> Result<String>;
}

pub struct AnalysisClient {
    credentials: Arc<dyn CredentialStore>,
    reader: Arc<dyn DocumentReader>,
    catalog: Arc<PromptCatalog>,
    transport: Arc<dyn GeminiTransport>,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        reader: Arc<dyn DocumentReader>,
        catalog: Arc<PromptCatalog>,
        transport: Arc<dyn GeminiTransport>,
    ) -> Self {
        Self {
            credentials,
            reader,
            catalog,
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read documents, encode them and render the prompt
    pub async fn prepare(
        &self,
        documents: &DocumentSet,
        feature: FeatureKind,
        context: &PromptContext,
    ) -> Result<AnalysisRequest> {
        if documents.is_empty() {
            return Err(AnalysisError::EmptyDocumentSet);
        }

        let mut payloads = Vec::with_capacity(documents.len());
        for doc in documents.documents() {
            let bytes = self.reader.read(doc).await?;
            payloads.push(base64::engine::general_purpose::STANDARD.encode(bytes));
        }

        let prompt_text = self.catalog.render(feature, context, &documents.names())?;

        Ok(AnalysisRequest {
            document_set: documents.clone(),
            feature,
            prompt_text,
            payloads,
        })
    }

    async fn submit(&self, api_key: &str, request: &AnalysisRequest) -> Result<String> {
        let wire = request.to_wire();

        let response = tokio::time::timeout(
            self.timeout,
            self.transport.generate_content(api_key, &wire),
        )
        .await
        .map_err(|_| AnalysisError::Timeout(self.timeout))??;

        extract_text(&response)
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    async fn analyze(
        &self,
        documents: &DocumentSet,
        feature: FeatureKind,
        context: &PromptContext,
    ) -> Result<String> {
        // Credential first: a missing key must never cost a file read or a request.
        let api_key = credentials::api_key(self.credentials.as_ref())?
            .ok_or(AnalysisError::MissingCredential)?;

        let start = Instant::now();
        let request = self.prepare(documents, feature, context).await?;

        debug!(
            feature = %feature,
            documents = request.payloads.len(),
            prompt_chars = request.prompt_text.len(),
            "Analysis request prepared"
        );

        match self.submit(&api_key, &request).await {
            Ok(text) => {
                info!(
                    feature = %feature,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    response_chars = text.len(),
                    "Analysis completed"
                );
                Ok(text)
            }
            Err(e) => {
                warn!(feature = %feature, error = %e, "Analysis failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InMemoryCredentialStore;
    use crate::documents::{DocumentHandle, InMemoryDocumentReader};
    use crate::gemini::RawResponse;
    use crate::testing::{success_body, RecordingTransport};
    use serde_json::json;

    fn reader_with(docs: &[(&str, &str)]) -> Arc<InMemoryDocumentReader> {
        let reader = InMemoryDocumentReader::new();
        for (uri, contents) in docs {
            reader.insert(*uri, contents.as_bytes().to_vec());
        }
        Arc::new(reader)
    }

    fn client(
        credentials: InMemoryCredentialStore,
        reader: Arc<InMemoryDocumentReader>,
        transport: Arc<RecordingTransport>,
    ) -> AnalysisClient {
        AnalysisClient::new(
            Arc::new(credentials),
            reader,
            Arc::new(PromptCatalog::builtin()),
            transport,
        )
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let transport = Arc::new(RecordingTransport::replying(success_body("unused")));
        // No document registered: a read attempt would fail with DocumentRead.
        let client = client(
            InMemoryCredentialStore::new(),
            reader_with(&[]),
            transport.clone(),
        );
        let set = DocumentSet::single(DocumentHandle::pdf("s.pdf", "mem://s"));

        let err = client
            .analyze(&set, FeatureKind::Budget, &PromptContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::MissingCredential));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_returns_text_verbatim() {
        let transport = Arc::new(RecordingTransport::replying(success_body("Plan A")));
        let client = client(
            InMemoryCredentialStore::with_api_key("secret"),
            reader_with(&[("mem://s", "%PDF")]),
            transport.clone(),
        );
        let set = DocumentSet::single(DocumentHandle::pdf("s.pdf", "mem://s"));

        let text = client
            .analyze(&set, FeatureKind::Savings, &PromptContext::default())
            .await
            .unwrap();

        assert_eq!(text, "Plan A");
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key, "secret");

        let body = serde_json::to_value(&calls[0].request).unwrap();
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "JVBERg==");
    }

    #[tokio::test]
    async fn test_three_payslips_make_one_call_in_order() {
        let transport = Arc::new(RecordingTransport::replying(success_body("ok")));
        let client = client(
            InMemoryCredentialStore::with_api_key("secret"),
            reader_with(&[
                ("mem://jan.pdf", "jan"),
                ("mem://feb.pdf", "feb"),
                ("mem://mar.pdf", "mar"),
            ]),
            transport.clone(),
        );
        let set = DocumentSet::new(
            vec![
                DocumentHandle::pdf("jan.pdf", "mem://jan.pdf"),
                DocumentHandle::pdf("feb.pdf", "mem://feb.pdf"),
                DocumentHandle::pdf("mar.pdf", "mem://mar.pdf"),
            ],
            3,
        )
        .unwrap();

        client
            .analyze(&set, FeatureKind::Payslip, &PromptContext::default())
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);

        let body = serde_json::to_value(&calls[0].request).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 4);
        assert!(parts[0]["text"].as_str().unwrap().contains("jan.pdf, feb.pdf, mar.pdf"));

        let payloads: Vec<_> = parts[1..]
            .iter()
            .map(|p| {
                assert_eq!(p["inlineData"]["mimeType"], "application/pdf");
                p["inlineData"]["data"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(payloads, vec!["amFu", "ZmVi", "bWFy"]);
    }

    #[tokio::test]
    async fn test_document_read_failure_skips_network() {
        let transport = Arc::new(RecordingTransport::replying(success_body("unused")));
        let client = client(
            InMemoryCredentialStore::with_api_key("secret"),
            reader_with(&[]),
            transport.clone(),
        );
        let set = DocumentSet::single(DocumentHandle::pdf("gone.pdf", "mem://gone"));

        let err = client
            .analyze(&set, FeatureKind::Spending, &PromptContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::DocumentRead { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_object_is_invalid_response() {
        let transport = Arc::new(RecordingTransport::replying(RawResponse::ok("{}")));
        let client = client(
            InMemoryCredentialStore::with_api_key("secret"),
            reader_with(&[("mem://s", "%PDF")]),
            transport.clone(),
        );
        let set = DocumentSet::single(DocumentHandle::pdf("s.pdf", "mem://s"));

        let err = client
            .analyze(&set, FeatureKind::Budget, &PromptContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let transport = Arc::new(
            RecordingTransport::replying(RawResponse::ok(json!({}).to_string()))
                .with_delay(Duration::from_secs(5)),
        );
        let client = client(
            InMemoryCredentialStore::with_api_key("secret"),
            reader_with(&[("mem://s", "%PDF")]),
            transport,
        )
        .with_timeout(Duration::from_millis(50));
        let set = DocumentSet::single(DocumentHandle::pdf("s.pdf", "mem://s"));

        let err = client
            .analyze(&set, FeatureKind::Budget, &PromptContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Timeout(d) if d == Duration::from_millis(50)));
    }
}
