//! Component wiring shared by the CLI and the API server

use crate::analysis::AnalysisClient;
use crate::config::AppConfig;
use crate::credentials::{self, CredentialStore, FileCredentialStore, GEMINI_API_KEY_SLOT};
use crate::documents::FsDocumentReader;
use crate::gemini::GeminiClient;
use crate::orchestrator::Orchestrator;
use crate::prompts::PromptCatalog;
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub struct App {
    pub config: AppConfig,
    pub credentials: Arc<dyn CredentialStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl App {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = FileCredentialStore::open(&config.credentials_path)?;
        Self::with_credentials(config, Arc::new(store))
    }

    pub fn with_credentials(config: AppConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        if let Some(key) = &config.api_key {
            if credentials::api_key(credentials.as_ref())?.is_none() {
                credentials.set(GEMINI_API_KEY_SLOT, key)?;
                info!("Seeded credential store from GEMINI_API_KEY");
            }
        }

        let transport = GeminiClient::new(&config.base_url, &config.model, config.request_timeout)?;
        let client = AnalysisClient::new(
            Arc::clone(&credentials),
            Arc::new(FsDocumentReader),
            Arc::new(PromptCatalog::builtin()),
            Arc::new(transport),
        )
        .with_timeout(config.request_timeout);

        let orchestrator = Orchestrator::new(Arc::new(client), config.variant)
            .with_in_flight_guard(config.dedupe_in_flight);

        info!(
            variant = %config.variant,
            model = %config.model,
            timeout_secs = config.request_timeout.as_secs(),
            "Analysis orchestrator initialized"
        );

        Ok(Self {
            config,
            credentials,
            orchestrator: Arc::new(orchestrator),
        })
    }
}
