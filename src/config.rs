//! Runtime configuration
//!
//! Read from the process environment (after `.env` is loaded by the binary).

use crate::analysis::DEFAULT_TIMEOUT;
use crate::error::AnalysisError;
use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::models::Variant;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CREDENTIALS_PATH: &str = ".finsight/credentials.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Seeds the credential store when it holds no key yet
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub variant: Variant,
    pub dedupe_in_flight: bool,
    pub credentials_path: PathBuf,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            variant: Variant::default(),
            dedupe_in_flight: false,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let request_timeout = match get("ANALYSIS_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                AnalysisError::Configuration(format!("ANALYSIS_TIMEOUT_SECS: {}", e))
            })?),
            None => defaults.request_timeout,
        };

        let variant = match get("ANALYSIS_VARIANT") {
            Some(raw) => raw.parse()?,
            None => defaults.variant,
        };

        let dedupe_in_flight = match get("DEDUPE_IN_FLIGHT") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| AnalysisError::Configuration(format!("DEDUPE_IN_FLIGHT: '{}'", raw)))?,
            None => defaults.dedupe_in_flight,
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AnalysisError::Configuration(format!("PORT: {}", e)))?,
            None => defaults.port,
        };

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            request_timeout,
            variant,
            dedupe_in_flight,
            credentials_path: get("CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            port,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
