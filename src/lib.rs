//! Financial Document Analysis Orchestrator
//!
//! Backend for a client that uploads bank statements and payslips and asks
//! Gemini for feature-specific financial analyses:
//! - Static prompt catalog per analysis feature
//! - One remote call per (document set, feature), PDFs sent inline as base64
//! - Per-feature outcome tracking with concurrent, independent triggers
//! - Stale responses dropped after the document set changes
//!
//! FLOW:
//! SELECT DOCUMENTS → TRIGGER FEATURE → LOADING → SUCCEEDED | FAILED

pub mod analysis;
pub mod api;
pub mod app;
pub mod config;
pub mod credentials;
pub mod documents;
pub mod error;
pub mod gemini;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use analysis::{AnalysisClient, Analyzer};
pub use documents::{DocumentHandle, DocumentSet};
pub use orchestrator::{Dispatch, Orchestrator};
