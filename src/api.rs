//! REST API for the presentation layer
//!
//! Exposes the orchestrator snapshot plus the document, context, trigger
//! and credential entry points. Analyses run in the background; clients
//! poll `/api/state` for outcomes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::credentials::{api_key, CredentialStore, GEMINI_API_KEY_SLOT};
use crate::documents::DocumentHandle;
use crate::error::AnalysisError;
use crate::models::{FeatureKind, PromptContext};
use crate::orchestrator::{Dispatch, Orchestrator};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct DocumentSetRequest {
    pub documents: Vec<DocumentHandle>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(status: StatusCode, data: T) -> ApiResult {
    (status, Json(ApiResponse::success(data)))
}

fn failure(err: &AnalysisError) -> ApiResult {
    let status = if err.is_user_recoverable() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::error(err.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub credentials: Arc<dyn CredentialStore>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_state(State(state): State<ApiState>) -> ApiResult {
    ok(StatusCode::OK, state.orchestrator.snapshot().await)
}

async fn get_documents(State(state): State<ApiState>) -> ApiResult {
    ok(StatusCode::OK, state.orchestrator.current_document_set().await)
}

async fn set_documents(
    State(state): State<ApiState>,
    Json(req): Json<DocumentSetRequest>,
) -> ApiResult {
    info!(documents = req.documents.len(), "Received document selection");

    match state.orchestrator.select_documents(req.documents).await {
        Ok(generation) => ok(
            StatusCode::OK,
            serde_json::json!({
                "generation": generation,
                "document_set": state.orchestrator.current_document_set().await,
            }),
        ),
        Err(e) => failure(&e),
    }
}

async fn set_context(
    State(state): State<ApiState>,
    Json(context): Json<PromptContext>,
) -> ApiResult {
    state.orchestrator.set_prompt_context(context.clone()).await;
    ok(StatusCode::OK, context)
}

async fn trigger_analysis(
    State(state): State<ApiState>,
    Path(feature): Path<String>,
) -> ApiResult {
    let feature: FeatureKind = match feature.parse() {
        Ok(feature) => feature,
        Err(e) => return failure(&e),
    };

    match state.orchestrator.trigger(feature).await {
        Ok(Dispatch::Started(task)) => ok(
            StatusCode::ACCEPTED,
            serde_json::json!({
                "feature": feature,
                "generation": task.generation,
                "status": "loading",
            }),
        ),
        Ok(Dispatch::AlreadyInFlight) => ok(
            StatusCode::ACCEPTED,
            serde_json::json!({
                "feature": feature,
                "status": "already_in_flight",
            }),
        ),
        Err(e) => failure(&e),
    }
}

/// Reports whether a key is stored; the key itself is never returned
async fn get_credential(State(state): State<ApiState>) -> ApiResult {
    match api_key(state.credentials.as_ref()) {
        Ok(key) => ok(StatusCode::OK, serde_json::json!({ "configured": key.is_some() })),
        Err(e) => failure(&e),
    }
}

async fn set_credential(
    State(state): State<ApiState>,
    Json(req): Json<CredentialRequest>,
) -> ApiResult {
    if req.api_key.trim().is_empty() {
        return failure(&AnalysisError::MissingCredential);
    }

    match state.credentials.set(GEMINI_API_KEY_SLOT, req.api_key.trim()) {
        Ok(()) => ok(StatusCode::OK, serde_json::json!({ "configured": true })),
        Err(e) => failure(&e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(
    orchestrator: Arc<Orchestrator>,
    credentials: Arc<dyn CredentialStore>,
) -> Router {
    let state = ApiState {
        orchestrator,
        credentials,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/documents", get(get_documents).post(set_documents))
        .route("/api/context", post(set_context))
        .route("/api/analyses/:feature", post(trigger_analysis))
        .route("/api/credential", get(get_credential).put(set_credential))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    credentials: Arc<dyn CredentialStore>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator, credentials);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InMemoryCredentialStore;
    use crate::models::Variant;
    use crate::testing::GatedAnalyzer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        analyzer: Arc<GatedAnalyzer>,
        credentials: Arc<InMemoryCredentialStore>,
    }

    fn harness() -> Harness {
        let analyzer = Arc::new(GatedAnalyzer::new());
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let orchestrator = Arc::new(Orchestrator::new(analyzer.clone(), Variant::Payslip));
        Harness {
            router: create_router(orchestrator, credentials.clone()),
            analyzer,
            credentials,
        }
    }

    async fn send(router: &Router, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, ApiResponse) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_trigger_without_documents_is_bad_request() {
        let h = harness();
        let (status, body) = send(&h.router, "POST", "/api/analyses/payslip", serde_json::json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(h.analyzer.call_count(), 0);

        let (_, state) = send(&h.router, "GET", "/api/state", serde_json::Value::Null).await;
        let data = state.data.unwrap();
        assert_eq!(data["error"], "Please upload a document first");
        assert_eq!(data["outcomes"]["payslip"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_documents_then_trigger_reports_loading() {
        let h = harness();
        let (status, _) = send(
            &h.router,
            "POST",
            "/api/documents",
            serde_json::json!({ "documents": [
                { "name": "jan.pdf", "uri": "/p/jan.pdf" },
                { "name": "feb.pdf", "uri": "/p/feb.pdf" }
            ]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&h.router, "POST", "/api/analyses/payslip", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body.data.unwrap()["status"], "loading");

        let (_, state) = send(&h.router, "GET", "/api/state", serde_json::Value::Null).await;
        let data = state.data.unwrap();
        assert_eq!(data["outcomes"]["payslip"]["status"], "loading");
        assert_eq!(data["document_set"]["documents"][1]["mime_type"], "application/pdf");

        h.analyzer.wait_for_calls(1).await;
        h.analyzer.release(0, Ok("done".into()));
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_unknown_input() {
        let h = harness();
        let docs: Vec<_> = (0..4)
            .map(|i| serde_json::json!({ "name": format!("{}.pdf", i), "uri": format!("/p/{}.pdf", i) }))
            .collect();
        let (status, _) = send(&h.router, "POST", "/api/documents", serde_json::json!({ "documents": docs })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, state) = send(&h.router, "GET", "/api/state", serde_json::Value::Null).await;
        assert!(state.data.unwrap()["error"].as_str().unwrap().contains("Too many documents"));

        let (status, body) = send(&h.router, "POST", "/api/analyses/crypto", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.unwrap().contains("crypto"));
    }

    #[tokio::test]
    async fn test_non_pdf_location_is_rejected() {
        let h = harness();
        let (status, body) = send(
            &h.router,
            "POST",
            "/api/documents",
            serde_json::json!({ "documents": [{ "name": "passwd", "uri": "/etc/passwd" }] }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.unwrap().contains("not a PDF"));

        let (_, state) = send(&h.router, "GET", "/api/state", serde_json::Value::Null).await;
        let data = state.data.unwrap();
        assert!(data["document_set"].is_null());
        assert_eq!(data["error"], "'passwd' is not a PDF document");
        assert_eq!(h.analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_set_credential() {
        let h = harness();
        let (_, body) = send(&h.router, "GET", "/api/credential", serde_json::Value::Null).await;
        assert_eq!(body.data.unwrap()["configured"], false);

        let (status, _) = send(&h.router, "PUT", "/api/credential", serde_json::json!({ "api_key": "  abc  " })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(api_key(h.credentials.as_ref()).unwrap().as_deref(), Some("abc"));

        let (status, body) = send(&h.router, "GET", "/api/credential", serde_json::Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data, serde_json::json!({ "configured": true }));
        assert!(!data.to_string().contains("abc"));

        let (status, _) = send(&h.router, "PUT", "/api/credential", serde_json::json!({ "api_key": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
