//! Error types for the document analysis orchestrator

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {

    // =============================
    // Analysis Pipeline Errors
    // =============================

    #[error("API key not found: configure a Gemini API key first")]
    MissingCredential,

    #[error("Failed to read document '{name}': {reason}")]
    DocumentRead { name: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from Gemini API: {0}")]
    InvalidResponse(String),

    #[error("Gemini API did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =============================
    // Precondition Errors
    // =============================

    #[error("Please upload a document first")]
    NoDocumentSet,

    #[error("A document set needs at least one document")]
    EmptyDocumentSet,

    #[error("Too many documents: {given} selected, at most {limit} allowed")]
    TooManyDocuments { given: usize, limit: usize },

    #[error("'{name}' is not a PDF document")]
    NotPdf { name: String },

    #[error("Feature '{0}' is not available in this deployment")]
    UnsupportedFeature(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of a failure, as reported to the presentation layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    DocumentReadError,
    NetworkError,
    InvalidResponse,
    Timeout,
    ConfigurationError,
    Precondition,
    Internal,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::MissingCredential => ErrorKind::MissingCredential,
            AnalysisError::DocumentRead { .. } => ErrorKind::DocumentReadError,
            AnalysisError::Network(_) => ErrorKind::NetworkError,
            AnalysisError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            AnalysisError::Timeout(_) => ErrorKind::Timeout,
            AnalysisError::Configuration(_) => ErrorKind::ConfigurationError,
            AnalysisError::NoDocumentSet
            | AnalysisError::EmptyDocumentSet
            | AnalysisError::TooManyDocuments { .. }
            | AnalysisError::NotPdf { .. }
            | AnalysisError::UnsupportedFeature(_)
            | AnalysisError::UnknownFeature(_) => ErrorKind::Precondition,
            AnalysisError::CredentialStore(_)
            | AnalysisError::SerializationError(_)
            | AnalysisError::IoError(_) => ErrorKind::Internal,
        }
    }

    /// Whether the user can fix this by re-selecting documents or configuring a key
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingCredential | ErrorKind::DocumentReadError | ErrorKind::Precondition
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AnalysisError::MissingCredential.kind(), ErrorKind::MissingCredential);
        assert_eq!(
            AnalysisError::InvalidResponse("no candidates".into()).kind(),
            ErrorKind::InvalidResponse
        );
        assert_eq!(
            AnalysisError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
        assert!(AnalysisError::NoDocumentSet.is_user_recoverable());
        assert!(AnalysisError::NotPdf { name: "passwd".into() }.is_user_recoverable());
        assert!(!AnalysisError::Network("reset".into()).is_user_recoverable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DocumentReadError).unwrap();
        assert_eq!(json, "\"document_read_error\"");
    }
}
