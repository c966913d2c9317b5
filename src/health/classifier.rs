//! Health classification rules.
//!
//! This is the one canonical copy of the rule set. Predicates are ordered,
//! additive, and independent: each one fires or not on its own, so a record
//! can carry one risk signal and several positive signals at once. Category
//! assignment is a priority cascade over the fired signals, first match
//! wins. The numeric score is derived from the category band afterward so
//! the two can never diverge.

use crate::providers::PaymentStatus;
use crate::signals::SignalRecord;
use crate::types::{Classification, HealthCategory};

// ---------------------------------------------------------------------------
// Signal strings
// ---------------------------------------------------------------------------

pub const SIGNAL_CHURNED: &str = "Churned";
pub const SIGNAL_INACTIVE_6_MONTHS: &str = "Inactive 6+ months";
pub const SIGNAL_NO_LOGIN_60_DAYS: &str = "No login in 60+ days";
pub const SIGNAL_PAYMENT_FAILED: &str = "Payment failed";
pub const SIGNAL_PAYMENT_AT_RISK: &str = "Payment at risk";
pub const SIGNAL_DISPUTED_CHARGE: &str = "Disputed charge";
pub const SIGNAL_NEVER_USED_PAID: &str = "Never used product on paid plan";
pub const SIGNAL_USAGE_STALLED: &str = "No activity in last 30 days";

pub const SIGNAL_RECENT_LOGIN: &str = "Recent login";
pub const SIGNAL_ACTIVE_USAGE: &str = "Active usage";
pub const SIGNAL_PAYING_CUSTOMER: &str = "Paying customer";
pub const SIGNAL_HIGH_VALUE: &str = "High value";
pub const SIGNAL_HEALTHY_PAYMENTS: &str = "Healthy payments";
pub const SIGNAL_FEATURE_ADOPTION: &str = "Strong feature adoption";

/// Risk signals that force `red` on their own.
const CRITICAL_RISK_SIGNALS: &[&str] = &[
    SIGNAL_CHURNED,
    SIGNAL_INACTIVE_6_MONTHS,
    SIGNAL_NO_LOGIN_60_DAYS,
];

pub fn is_critical_risk(signal: &str) -> bool {
    CRITICAL_RISK_SIGNALS.contains(&signal)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn risk_signals(record: &SignalRecord) -> Vec<String> {
    let mut signals = Vec::new();
    let usage = &record.usage;
    let lifecycle = &record.lifecycle;

    if lifecycle
        .stage
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("churned"))
    {
        signals.push(SIGNAL_CHURNED.to_string());
    }
    if let Some(days) = usage.days_since_last_login {
        if days >= 180 {
            signals.push(SIGNAL_INACTIVE_6_MONTHS.to_string());
        }
        if days > 60 {
            signals.push(SIGNAL_NO_LOGIN_60_DAYS.to_string());
        }
    }
    if record.payment.status == PaymentStatus::Failed {
        signals.push(SIGNAL_PAYMENT_FAILED.to_string());
    }
    if record.payment.status == PaymentStatus::AtRisk || record.payment.recent_failure {
        signals.push(SIGNAL_PAYMENT_AT_RISK.to_string());
    }
    if record.payment.disputed {
        signals.push(SIGNAL_DISPUTED_CHARGE.to_string());
    }
    if usage.total_events == 0 && lifecycle.mrr > 0.0 {
        signals.push(SIGNAL_NEVER_USED_PAID.to_string());
    }
    if usage.total_events > 0 && usage.events_30d == 0 {
        signals.push(SIGNAL_USAGE_STALLED.to_string());
    }

    signals
}

fn positive_signals(record: &SignalRecord) -> Vec<String> {
    let mut signals = Vec::new();
    let usage = &record.usage;
    let lifecycle = &record.lifecycle;

    if usage.days_since_last_login.is_some_and(|d| d <= 7) {
        signals.push(SIGNAL_RECENT_LOGIN.to_string());
    }
    if usage.total_events >= 100 {
        signals.push(SIGNAL_ACTIVE_USAGE.to_string());
    }
    if lifecycle
        .stage
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("customer"))
        && lifecycle.mrr > 0.0
    {
        signals.push(SIGNAL_PAYING_CUSTOMER.to_string());
    }
    if lifecycle.mrr >= 500.0 {
        signals.push(SIGNAL_HIGH_VALUE.to_string());
    }
    if record.payment.status == PaymentStatus::Healthy {
        signals.push(SIGNAL_HEALTHY_PAYMENTS.to_string());
    }
    if usage.feature_adoption_count >= 3 {
        signals.push(SIGNAL_FEATURE_ADOPTION.to_string());
    }

    signals
}

// ---------------------------------------------------------------------------
// Category cascade and score
// ---------------------------------------------------------------------------

fn assign_category(record: &SignalRecord, risks: &[String], positives: &[String]) -> HealthCategory {
    // 1. Any critical risk signal wins outright.
    if risks.iter().any(|s| is_critical_risk(s)) {
        return HealthCategory::Red;
    }
    // 2. Two or more risk signals.
    if risks.len() >= 2 {
        return HealthCategory::Red;
    }
    // 3. One risk signal without strong positives.
    if risks.len() == 1 && positives.len() < 2 {
        return HealthCategory::Yellow;
    }
    // 4./5. Positive signals with zero risks.
    if risks.is_empty() && !positives.is_empty() {
        return HealthCategory::Green;
    }
    // 6. Fallback heuristic when no discrete signals fired.
    if risks.is_empty()
        && positives.is_empty()
        && record.usage.total_events > 10
        && record.lifecycle.mrr > 0.0
    {
        return HealthCategory::Green;
    }
    // 7. Nothing observed at all.
    if risks.is_empty() && positives.is_empty() {
        return HealthCategory::Unknown;
    }
    // 8. One risk signal offset by two or more positives.
    HealthCategory::Yellow
}

/// Score within the category's band. Band edges: red <30, yellow 30-69,
/// green >=70, unknown fixed at the neutral midpoint.
fn score_for(category: HealthCategory, risks: &[String], positives: &[String]) -> u8 {
    match category {
        HealthCategory::Unknown => 50,
        HealthCategory::Red => {
            let base = 25i64 - 5 * (risks.len() as i64 - 1);
            base.clamp(0, 29) as u8
        }
        HealthCategory::Yellow => {
            let base = 50i64 - 5 * risks.len() as i64 + 5 * positives.len() as i64;
            base.clamp(30, 69) as u8
        }
        HealthCategory::Green => {
            let base = 75i64 + 5 * positives.len() as i64;
            base.clamp(70, 100) as u8
        }
    }
}

/// Classify one signal record. Pure: no I/O, deterministic for a given
/// input.
pub fn classify(record: &SignalRecord) -> Classification {
    let risks = risk_signals(record);
    let positives = positive_signals(record);
    let category = assign_category(record, &risks, &positives);
    let score = score_for(category, &risks, &positives);
    Classification {
        category,
        score,
        risk_signals: risks,
        positive_signals: positives,
    }
}
