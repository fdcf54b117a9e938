//! Core data models for document analysis

use crate::error::{AnalysisError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//
// ================= Features =================
//

/// Analysis type the user can request against an uploaded document set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Spending,
    Savings,
    Investment,
    Budget,
    Budgeting,
    Investing,
    Debt,
    Payslip,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 8] = [
        FeatureKind::Spending,
        FeatureKind::Savings,
        FeatureKind::Investment,
        FeatureKind::Budget,
        FeatureKind::Budgeting,
        FeatureKind::Investing,
        FeatureKind::Debt,
        FeatureKind::Payslip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Spending => "spending",
            FeatureKind::Savings => "savings",
            FeatureKind::Investment => "investment",
            FeatureKind::Budget => "budget",
            FeatureKind::Budgeting => "budgeting",
            FeatureKind::Investing => "investing",
            FeatureKind::Debt => "debt",
            FeatureKind::Payslip => "payslip",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeatureKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        FeatureKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| AnalysisError::UnknownFeature(s.to_string()))
    }
}

//
// ================= Deployment Variant =================
//

/// Which feature set and document limit a deployment exposes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Bank statement home screen: spending, savings, investment, budget
    #[default]
    Statement,
    /// Bank statement planner: budgeting, savings, investing, debt
    Planning,
    /// Up to three payslips analysed together
    Payslip,
}

const STATEMENT_FEATURES: &[FeatureKind] = &[
    FeatureKind::Spending,
    FeatureKind::Savings,
    FeatureKind::Investment,
    FeatureKind::Budget,
];

const PLANNING_FEATURES: &[FeatureKind] = &[
    FeatureKind::Budgeting,
    FeatureKind::Savings,
    FeatureKind::Investing,
    FeatureKind::Debt,
];

const PAYSLIP_FEATURES: &[FeatureKind] = &[FeatureKind::Payslip];

impl Variant {
    pub fn features(&self) -> &'static [FeatureKind] {
        match self {
            Variant::Statement => STATEMENT_FEATURES,
            Variant::Planning => PLANNING_FEATURES,
            Variant::Payslip => PAYSLIP_FEATURES,
        }
    }

    pub fn supports(&self, feature: FeatureKind) -> bool {
        self.features().contains(&feature)
    }

    /// Maximum number of documents the picker may return for this flow
    pub fn max_documents(&self) -> usize {
        match self {
            Variant::Statement | Variant::Planning => 1,
            Variant::Payslip => 3,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Variant::Statement => "statement",
            Variant::Planning => "planning",
            Variant::Payslip => "payslip",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Variant {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "statement" | "home" => Ok(Variant::Statement),
            "planning" | "planner" => Ok(Variant::Planning),
            "payslip" | "payslips" => Ok(Variant::Payslip),
            other => Err(AnalysisError::Configuration(format!(
                "unknown analysis variant '{}'",
                other
            ))),
        }
    }
}

//
// ================= Prompt Context =================
//

/// Free-text user fields interpolated into planning and payslip prompts.
///
/// These are forwarded to the remote model verbatim. No sanitization is
/// applied; the model is trusted with whatever the user typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptContext {
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub situation: Option<String>,
}

//
// ================= Outcomes =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for FailureReason {
    fn from(err: &AnalysisError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Per-feature result state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Pending,
    Loading,
    Succeeded(String),
    Failed(FailureReason),
}

impl AnalysisOutcome {
    pub fn is_loading(&self) -> bool {
        matches!(self, AnalysisOutcome::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisOutcome::Succeeded(_) | AnalysisOutcome::Failed(_))
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            AnalysisOutcome::Failed(reason) => Some(reason.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_parsing() {
        assert_eq!("Budget".parse::<FeatureKind>().unwrap(), FeatureKind::Budget);
        assert_eq!(" debt ".parse::<FeatureKind>().unwrap(), FeatureKind::Debt);
        assert!(matches!(
            "crypto".parse::<FeatureKind>(),
            Err(AnalysisError::UnknownFeature(_))
        ));
    }

    #[test]
    fn test_variant_feature_sets() {
        assert_eq!(Variant::Statement.features().len(), 4);
        assert!(Variant::Planning.supports(FeatureKind::Debt));
        assert!(!Variant::Statement.supports(FeatureKind::Debt));
        assert_eq!(Variant::Payslip.max_documents(), 3);
        assert_eq!(Variant::Statement.max_documents(), 1);
        assert_eq!("planner".parse::<Variant>().unwrap(), Variant::Planning);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(AnalysisOutcome::Succeeded("Plan A".into())).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["detail"], "Plan A");

        let json = serde_json::to_value(AnalysisOutcome::Pending).unwrap();
        assert_eq!(json["status"], "pending");
    }
}
