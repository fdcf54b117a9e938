//! Prompt catalog
//!
//! Static mapping from feature to instruction template. Templates are
//! compiled into the binary and cannot be edited at runtime.
//!
//! Planning and payslip templates interpolate user-supplied free text
//! (`{goals}`, `{situation}`) and document names (`{documents}`) verbatim.
//! Nothing is escaped: what the user types is what the model reads.

use crate::error::AnalysisError;
use crate::models::{FeatureKind, PromptContext};
use crate::Result;
use std::collections::HashMap;

const NOT_PROVIDED: &str = "Not provided";

const SPENDING_PROMPT: &str = r#"Analyze this bank statement and break down the spending patterns:
        1. Categorize Every Expense:
           - Group transactions into housing, food, transport, utilities, subscriptions and discretionary
           - Show the total and share of income for each category
        2. Identify Recurring Charges:
           - List subscriptions and standing orders with their monthly cost
           - Flag duplicate or unused services
        3. Spot Spending Trends:
           - Compare week-over-week and month-over-month totals
           - Highlight unusually large or frequent purchases
        4. Optimization Opportunities:
           - Name the three categories with the most room to cut
           - Estimate the monthly amount freed by each change

        Format the response with clear sections and specific dollar amounts."#;

const SAVINGS_PROMPT: &str = r#"Analyze this bank statement and create a detailed savings plan:
        1. Pay Yourself First Strategy:
           - Recommend optimal automatic savings amount
           - Suggest timing based on income patterns
        2. Emergency Fund Planning:
           - Calculate recommended fund size
           - Suggest monthly contribution amount
        3. Savings Challenges:
           - Customize a 52-week savings plan
           - Identify potential no-spend categories
        4. High-Yield Savings Opportunities:
           - Calculate potential interest earnings
           - Recommend allocation between accounts

        Provide specific numbers and actionable steps."#;

const INVESTMENT_PROMPT: &str = r#"Review the cash flow in this bank statement and give investment insights:
        1. Investable Surplus:
           - Calculate average monthly income minus essential expenses
           - Recommend a safe monthly amount to invest
        2. Readiness Check:
           - Confirm whether an emergency fund and debt payoff should come first
           - Note any irregular income that affects investing capacity
        3. Allocation Suggestions:
           - Propose a starter allocation across retirement accounts, index funds and cash
           - Explain the risk level of each option
        4. Next Steps:
           - List concrete actions for the next 30, 90 and 365 days

        Include specific amounts and practical implementation steps."#;

const BUDGET_PROMPT: &str = r#"Analyze this bank statement and build a monthly budget:
        1. Apply the 50/30/20 Rule:
           - Calculate exact amounts for needs (50%)
           - Calculate exact amounts for wants (30%)
           - Calculate exact amounts for savings/debt (20%)
        2. Compare Against Actual Spending:
           - Show where current spending exceeds each target
           - Show where there is unused headroom
        3. Monthly Budget Table:
           - One row per category with target, actual and difference

        Format the response with clear sections and specific dollar amounts."#;

const BUDGETING_PROMPT: &str = r#"Analyze this bank statement and provide a comprehensive budgeting plan:
        1. Apply the 50/30/20 Rule:
           - Calculate exact amounts for needs (50%)
           - Calculate exact amounts for wants (30%)
           - Calculate exact amounts for savings/debt (20%)
        2. Create a Zero-Based Budget:
           - List all income sources
           - Categorize all expenses
           - Show how every dollar should be allocated
        3. Suggest envelope system categories based on spending patterns

        The user's financial goals: {goals}
        The user's current situation: {situation}

        Format the response with clear sections and specific dollar amounts."#;

const INVESTING_PROMPT: &str = r#"Create an investment plan based on this bank statement:
        1. Dollar-Cost Averaging Strategy:
           - Calculate recommended monthly investment amount
           - Suggest optimal investment timing
        2. Investment Vehicle Recommendations:
           - Analyze retirement account potential
           - Suggest robo-advisor allocations
        3. Risk Assessment:
           - Evaluate investment capacity
           - Recommend portfolio allocation
        4. Timeline Planning:
           - Short-term investment opportunities
           - Long-term investment strategy

        The user's financial goals: {goals}
        The user's current situation: {situation}

        Include specific amounts and practical implementation steps."#;

const DEBT_PROMPT: &str = r#"Analyze this bank statement for debt management:
        1. Debt Snowball Analysis:
           - List debts from smallest to largest
           - Calculate accelerated payment plan
        2. Debt Avalanche Strategy:
           - Order debts by interest rate
           - Calculate potential interest savings
        3. Consolidation Opportunities:
           - Evaluate consolidation potential
           - Calculate monthly payment impact
        4. Debt-Free Timeline:
           - Project debt-free date
           - Suggest payment optimization

        The user's financial goals: {goals}
        The user's current situation: {situation}

        Provide specific numbers and monthly action plans."#;

const PAYSLIP_PROMPT: &str = r#"Analyze the attached payslips ({documents}) and provide personalized financial insights:
        1. Income Summary:
           - Gross pay, net pay and pay frequency for each payslip
           - Month-over-month changes in earnings
        2. Deductions Breakdown:
           - Tax, pension, insurance and other deductions with amounts
           - Flag any deduction that looks unusual or inconsistent
        3. Take-Home Planning:
           - Suggest a monthly budget based on average net pay
           - Recommend a savings rate and emergency fund target
        4. Optimization:
           - Identify tax-advantaged contributions worth increasing
           - List questions the user should raise with their employer

        The user's financial goals: {goals}
        The user's current situation: {situation}

        Provide specific numbers and actionable steps."#;

/// Immutable prompt text for one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub feature: FeatureKind,
    pub body: &'static str,
}

impl PromptTemplate {
    /// True when the template takes user text or document names
    pub fn is_parameterized(&self) -> bool {
        ["{goals}", "{situation}", "{documents}"]
            .iter()
            .any(|p| self.body.contains(p))
    }

    /// Fill placeholders. User fields are inserted as-is.
    pub fn render(&self, context: &PromptContext, document_names: &[&str]) -> String {
        if !self.is_parameterized() {
            return self.body.to_string();
        }

        let documents = if document_names.is_empty() {
            NOT_PROVIDED.to_string()
        } else {
            document_names.join(", ")
        };

        self.body
            .replace("{documents}", &documents)
            .replace("{goals}", field_or_default(&context.goals))
            .replace("{situation}", field_or_default(&context.situation))
    }
}

fn field_or_default(field: &Option<String>) -> &str {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => NOT_PROVIDED,
    }
}

fn builtin_body(feature: FeatureKind) -> &'static str {
    match feature {
        FeatureKind::Spending => SPENDING_PROMPT,
        FeatureKind::Savings => SAVINGS_PROMPT,
        FeatureKind::Investment => INVESTMENT_PROMPT,
        FeatureKind::Budget => BUDGET_PROMPT,
        FeatureKind::Budgeting => BUDGETING_PROMPT,
        FeatureKind::Investing => INVESTING_PROMPT,
        FeatureKind::Debt => DEBT_PROMPT,
        FeatureKind::Payslip => PAYSLIP_PROMPT,
    }
}

/// Feature → template lookup
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    templates: HashMap<FeatureKind, PromptTemplate>,
}

impl PromptCatalog {
    /// Catalog with a template for every feature
    pub fn builtin() -> Self {
        Self::from_templates(FeatureKind::ALL.iter().map(|&feature| PromptTemplate {
            feature,
            body: builtin_body(feature),
        }))
    }

    pub fn from_templates(templates: impl IntoIterator<Item = PromptTemplate>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.feature, t)).collect(),
        }
    }

    pub fn template_for(&self, feature: FeatureKind) -> Result<&PromptTemplate> {
        self.templates.get(&feature).ok_or_else(|| {
            AnalysisError::Configuration(format!("no prompt template for feature '{}'", feature))
        })
    }

    /// Resolve and render in one step
    pub fn render(
        &self,
        feature: FeatureKind,
        context: &PromptContext,
        document_names: &[&str],
    ) -> Result<String> {
        Ok(self.template_for(feature)?.render(context, document_names))
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
