//! Analysis orchestrator
//!
//! Coordinates independently triggered analyses against one shared
//! document set. Each feature's lifecycle is independent:
//!
//! PENDING → LOADING → SUCCEEDED | FAILED
//!
//! Failures are contained to the feature that produced them. The
//! top-level error slot only records synchronous precondition failures.

use crate::analysis::Analyzer;
use crate::documents::{DocumentHandle, DocumentSet};
use crate::error::{AnalysisError, ErrorKind};
use crate::models::{AnalysisOutcome, FailureReason, FeatureKind, PromptContext, Variant};
use crate::state::{OrchestrationSnapshot, OrchestrationState};
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Handle to a spawned analysis
#[derive(Debug)]
pub struct AnalysisTask {
    pub feature: FeatureKind,
    pub generation: u64,
    handle: JoinHandle<()>,
}

impl AnalysisTask {
    /// Wait until the outcome has been committed (or dropped as stale)
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            error!(feature = %self.feature, "Analysis task aborted: {}", e);
        }
    }
}

/// Result of a trigger that passed its preconditions
#[derive(Debug)]
pub enum Dispatch {
    Started(AnalysisTask),
    /// In-flight guard is on and this feature is already loading
    AlreadyInFlight,
}

impl Dispatch {
    pub async fn wait(self) {
        if let Dispatch::Started(task) = self {
            task.wait().await;
        }
    }
}

pub struct Orchestrator {
    analyzer: Arc<dyn Analyzer>,
    state: Arc<RwLock<OrchestrationState>>,
    dedupe_in_flight: bool,
}

impl Orchestrator {
    pub fn new(analyzer: Arc<dyn Analyzer>, variant: Variant) -> Self {
        Self {
            analyzer,
            state: Arc::new(RwLock::new(OrchestrationState::new(variant))),
            dedupe_in_flight: false,
        }
    }

    /// Ignore triggers for a feature that is already loading.
    /// Off by default: concurrent triggers race and the last response wins.
    pub fn with_in_flight_guard(mut self, enabled: bool) -> Self {
        self.dedupe_in_flight = enabled;
        self
    }

    pub async fn variant(&self) -> Variant {
        self.state.read().await.variant()
    }

    /// Replace the active documents and reset every outcome to pending.
    /// Responses still in flight for the previous set are discarded.
    pub async fn set_document_set(&self, set: DocumentSet) -> Result<u64> {
        let mut state = self.state.write().await;

        let limit = state.variant().max_documents();
        if set.len() > limit {
            let err = AnalysisError::TooManyDocuments {
                given: set.len(),
                limit,
            };
            state.set_error(err.to_string());
            return Err(err);
        }

        let set_id = set.set_id;
        let documents = set.len();
        let generation = state.replace_document_set(set);

        info!(
            set_id = %set_id,
            documents,
            generation,
            "Document set replaced, outcomes reset"
        );

        Ok(generation)
    }

    /// Build a document set from picked handles and make it active.
    /// A selection that is empty, too large or not all PDFs goes to the
    /// error slot and leaves the current set in place.
    pub async fn select_documents(&self, documents: Vec<DocumentHandle>) -> Result<u64> {
        let limit = self.variant().await.max_documents();

        match DocumentSet::new(documents, limit) {
            Ok(set) => self.set_document_set(set).await,
            Err(err) => {
                warn!(error = %err, "Rejected document selection");
                self.state.write().await.set_error(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn current_document_set(&self) -> Option<DocumentSet> {
        self.state.read().await.document_set().cloned()
    }

    /// Update the free-text goals/situation used by parameterized prompts.
    /// Existing outcomes are kept.
    pub async fn set_prompt_context(&self, context: PromptContext) {
        self.state.write().await.set_context(context);
    }

    pub async fn snapshot(&self) -> OrchestrationSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn outcome(&self, feature: FeatureKind) -> Option<AnalysisOutcome> {
        self.state.read().await.outcome(feature).cloned()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.clear_error();
    }

    /// Start an analysis for `feature`.
    ///
    /// Precondition failures (no document set, feature not offered by this
    /// variant) are written to the top-level error slot and returned; the
    /// analyzer is not called and no outcome changes. Everything after that
    /// is reported through the feature's outcome only.
    pub async fn trigger(&self, feature: FeatureKind) -> Result<Dispatch> {
        let (documents, context, generation) = {
            let mut state = self.state.write().await;

            if !state.variant().supports(feature) {
                let err = AnalysisError::UnsupportedFeature(feature.to_string());
                warn!(feature = %feature, variant = %state.variant(), "Rejected trigger");
                state.set_error(err.to_string());
                return Err(err);
            }

            let Some(documents) = state.document_set().cloned() else {
                let err = AnalysisError::NoDocumentSet;
                warn!(feature = %feature, "Trigger without a document set");
                state.set_error(err.to_string());
                return Err(err);
            };

            if self.dedupe_in_flight && state.in_flight(feature) > 0 {
                debug!(feature = %feature, "Analysis already in flight, ignoring trigger");
                return Ok(Dispatch::AlreadyInFlight);
            }

            let generation = state.begin(feature);
            (documents, state.context().clone(), generation)
        };

        info!(
            feature = %feature,
            generation,
            documents = documents.len(),
            "Analysis triggered"
        );

        let analyzer = Arc::clone(&self.analyzer);
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            // Inner task: a panic comes back as a JoinError, not a stuck Loading.
            let analysis = tokio::spawn(async move {
                analyzer.analyze(&documents, feature, &context).await
            });

            let outcome = match analysis.await {
                Ok(Ok(text)) => AnalysisOutcome::Succeeded(text),
                Ok(Err(e)) => AnalysisOutcome::Failed(FailureReason::from(&e)),
                Err(join_err) => {
                    error!(feature = %feature, "Analysis panicked: {}", join_err);
                    AnalysisOutcome::Failed(FailureReason {
                        kind: ErrorKind::Internal,
                        message: format!("Error analyzing {}", feature),
                    })
                }
            };

            let committed = state.write().await.commit(feature, generation, outcome);
            if !committed {
                debug!(
                    feature = %feature,
                    generation,
                    "Dropping stale analysis result"
                );
            }
        });

        Ok(Dispatch::Started(AnalysisTask {
            feature,
            generation,
            handle,
        }))
    }
}
