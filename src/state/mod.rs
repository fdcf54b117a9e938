//! Orchestration state
//!
//! Keyed outcome store owned by the orchestrator. Every mutation goes
//! through a method here; callers never hold references into the map.
//!
//! The generation counter is bumped on every document set change, and a
//! completion is only committed when it carries the current generation.

use crate::documents::DocumentSet;
use crate::models::{AnalysisOutcome, FeatureKind, PromptContext, Variant};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Read-only copy handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationSnapshot {
    pub variant: Variant,
    pub generation: u64,
    pub document_set: Option<DocumentSet>,
    pub fingerprint: Option<String>,
    pub outcomes: BTreeMap<FeatureKind, AnalysisOutcome>,
    pub error: Option<String>,
    pub context: PromptContext,
}

impl OrchestrationSnapshot {
    pub fn outcome(&self, feature: FeatureKind) -> Option<&AnalysisOutcome> {
        self.outcomes.get(&feature)
    }
}

#[derive(Debug)]
pub struct OrchestrationState {
    variant: Variant,
    generation: u64,
    document_set: Option<DocumentSet>,
    outcomes: BTreeMap<FeatureKind, AnalysisOutcome>,
    in_flight: HashMap<FeatureKind, usize>,
    error: Option<String>,
    context: PromptContext,
}

fn pending_outcomes(variant: Variant) -> BTreeMap<FeatureKind, AnalysisOutcome> {
    variant
        .features()
        .iter()
        .map(|&f| (f, AnalysisOutcome::Pending))
        .collect()
}

impl OrchestrationState {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            generation: 0,
            document_set: None,
            outcomes: pending_outcomes(variant),
            in_flight: HashMap::new(),
            error: None,
            context: PromptContext::default(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn document_set(&self) -> Option<&DocumentSet> {
        self.document_set.as_ref()
    }

    pub fn context(&self) -> &PromptContext {
        &self.context
    }

    pub fn set_context(&mut self, context: PromptContext) {
        self.context = context;
    }

    pub fn outcome(&self, feature: FeatureKind) -> Option<&AnalysisOutcome> {
        self.outcomes.get(&feature)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Requests currently outstanding for `feature` in this generation
    pub fn in_flight(&self, feature: FeatureKind) -> usize {
        self.in_flight.get(&feature).copied().unwrap_or(0)
    }

    /// Install a new document set; returns the new generation
    pub fn replace_document_set(&mut self, set: DocumentSet) -> u64 {
        self.generation += 1;
        self.document_set = Some(set);
        self.outcomes = pending_outcomes(self.variant);
        self.in_flight.clear();
        self.error = None;
        self.generation
    }

    /// Mark `feature` loading; returns the generation the request belongs to
    pub fn begin(&mut self, feature: FeatureKind) -> u64 {
        self.outcomes.insert(feature, AnalysisOutcome::Loading);
        *self.in_flight.entry(feature).or_insert(0) += 1;
        self.generation
    }

    /// Store a completion. Returns false (and changes nothing) when the
    /// request belongs to an earlier generation.
    pub fn commit(&mut self, feature: FeatureKind, generation: u64, outcome: AnalysisOutcome) -> bool {
        if generation != self.generation {
            return false;
        }

        if let Some(count) = self.in_flight.get_mut(&feature) {
            *count = count.saturating_sub(1);
        }
        self.outcomes.insert(feature, outcome);
        true
    }

    pub fn snapshot(&self) -> OrchestrationSnapshot {
        OrchestrationSnapshot {
            variant: self.variant,
            generation: self.generation,
            document_set: self.document_set.clone(),
            fingerprint: self.document_set.as_ref().map(DocumentSet::fingerprint),
            outcomes: self.outcomes.clone(),
            error: self.error.clone(),
            context: self.context.clone(),
        }
    }
}
