//! Churn-risk ranking for human review.
//!
//! Risk level is a four-tier cascade over the classifier's output plus
//! payment health. Sort priority is
//! `tierWeight x (100 - normalizedMRR) x (100 - score) / 1000`, ascending:
//! high-value, low-health accounts sort first.

use serde::{Deserialize, Serialize};

use crate::providers::PaymentStatus;
use crate::types::{Classification, HealthCategory, RiskLevel};

/// Per-account input assembled by the caller from classifier output and
/// raw signals.
#[derive(Debug, Clone)]
pub struct ChurnInput {
    pub account_id: String,
    pub company_name: String,
    pub mrr: f64,
    pub payment_status: PaymentStatus,
    pub has_contract_ending_soon: bool,
    pub classification: Classification,
}

/// One ranked report row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnRiskAccount {
    pub account_id: String,
    pub company_name: String,
    pub mrr: f64,
    pub risk_level: RiskLevel,
    pub score: u8,
    pub priority: f64,
    pub recommendations: Vec<String>,
}

const MAX_RECOMMENDATIONS: usize = 5;

// ---------------------------------------------------------------------------
// Risk tiers
// ---------------------------------------------------------------------------

fn risk_level(input: &ChurnInput) -> RiskLevel {
    let c = &input.classification;
    let risks = c.risk_signals.len();

    if c.category == HealthCategory::Red
        || input.payment_status == PaymentStatus::Failed
        || risks >= 3
    {
        return RiskLevel::Critical;
    }
    if c.category == HealthCategory::Yellow
        && (input.payment_status == PaymentStatus::AtRisk || risks >= 2)
    {
        return RiskLevel::High;
    }
    if c.category == HealthCategory::Yellow || risks >= 1 || c.score < 70 {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// Dominant risk family behind an account's signals. The aggregated
/// record carries no support-ticket source, so there is no support
/// domain; support-driven churn surfaces as `Mixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RiskDomain {
    Payment,
    Engagement,
    Contract,
    Mixed,
}

fn classify_signal(signal: &str) -> Option<RiskDomain> {
    let lower = signal.to_ascii_lowercase();
    if lower.contains("payment") || lower.contains("disputed") {
        Some(RiskDomain::Payment)
    } else if lower.contains("login") || lower.contains("inactive") || lower.contains("activity")
        || lower.contains("used") || lower.contains("churn")
    {
        Some(RiskDomain::Engagement)
    } else {
        None
    }
}

fn dominant_domain(input: &ChurnInput) -> RiskDomain {
    let mut payment = 0usize;
    let mut engagement = 0usize;
    for signal in &input.classification.risk_signals {
        match classify_signal(signal) {
            Some(RiskDomain::Payment) => payment += 1,
            Some(RiskDomain::Engagement) => engagement += 1,
            _ => {}
        }
    }

    if input.has_contract_ending_soon && payment == 0 && engagement == 0 {
        return RiskDomain::Contract;
    }
    match (payment, engagement) {
        (0, 0) => RiskDomain::Mixed,
        (p, e) if p > e => RiskDomain::Payment,
        (p, e) if e > p => RiskDomain::Engagement,
        _ => RiskDomain::Mixed,
    }
}

fn recommendations_for(domain: RiskDomain, input: &ChurnInput) -> Vec<String> {
    let mut recs: Vec<String> = match domain {
        RiskDomain::Payment => vec![
            "Reach out about the failed or at-risk payment".to_string(),
            "Confirm billing contact and card details are current".to_string(),
            "Offer an invoice review call".to_string(),
        ],
        RiskDomain::Engagement => vec![
            "Schedule a re-engagement check-in call".to_string(),
            "Share a feature walkthrough tailored to their fleet".to_string(),
            "Identify the account's active champion".to_string(),
        ],
        RiskDomain::Contract => vec![
            "Start the renewal conversation early".to_string(),
            "Prepare a value-recap deck for the renewal call".to_string(),
        ],
        RiskDomain::Mixed => vec![
            "Run a full account review with the owner".to_string(),
            "Schedule a re-engagement check-in call".to_string(),
            "Confirm billing contact and card details are current".to_string(),
        ],
    };

    if input.has_contract_ending_soon && domain != RiskDomain::Contract {
        recs.push("Start the renewal conversation early".to_string());
    }

    recs.dedup();
    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Rank a portfolio for churn review. MRR is normalized to 0-100 against
/// the portfolio's largest account so the priority formula weighs value
/// consistently across portfolios of any size.
pub fn rank_accounts(inputs: &[ChurnInput]) -> Vec<ChurnRiskAccount> {
    let max_mrr = inputs.iter().map(|i| i.mrr).fold(0.0f64, f64::max);

    let mut rows: Vec<ChurnRiskAccount> = inputs
        .iter()
        .map(|input| {
            let level = risk_level(input);
            let normalized_mrr = if max_mrr > 0.0 {
                (input.mrr / max_mrr) * 100.0
            } else {
                0.0
            };
            let score = input.classification.score;
            let priority =
                level.weight() * (100.0 - normalized_mrr) * (100.0 - score as f64) / 1000.0;
            let domain = dominant_domain(input);
            ChurnRiskAccount {
                account_id: input.account_id.clone(),
                company_name: input.company_name.clone(),
                mrr: input.mrr,
                risk_level: level,
                score,
                priority,
                recommendations: recommendations_for(domain, input),
            }
        })
        .collect();

    rows.sort_by(|a, b| a.priority.partial_cmp(&b.priority).unwrap_or(std::cmp::Ordering::Equal));
    rows
}
