//! Expansion opportunity scoring.
//!
//! Candidate signals contribute 5/15/25 points by strength plus a 5-point
//! bonus per distinct signal type. An account qualifies with at least two
//! signal types and a total score of 50 or more. The opportunity type is
//! picked by fixed precedence (upsell, then cross-sell, then upgrade) over
//! which signal types fired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::PaymentStatus;
use crate::signals::SignalRecord;

pub const TYPE_USAGE_GROWTH: &str = "usage_growth";
pub const TYPE_HIGH_ENGAGEMENT: &str = "high_engagement";
pub const TYPE_LARGE_FLEET: &str = "large_fleet";
pub const TYPE_HIGH_SETUP: &str = "high_setup_completion";
pub const TYPE_RELIABLE_PAYMENTS: &str = "reliable_payments";
pub const TYPE_APPROACHING_RENEWAL: &str = "approaching_renewal";

const QUALIFY_MIN_TYPES: usize = 2;
const QUALIFY_MIN_SCORE: i32 = 50;
const TYPE_BONUS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

impl SignalStrength {
    pub fn points(&self) -> i32 {
        match self {
            SignalStrength::Weak => 5,
            SignalStrength::Moderate => 15,
            SignalStrength::Strong => 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionSignal {
    pub signal_type: String,
    pub strength: SignalStrength,
}

/// A qualified expansion candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionCandidate {
    pub account_id: String,
    pub opportunity_type: String,
    pub score: i32,
    pub signals: Vec<ExpansionSignal>,
    pub potential_value: f64,
}

// ---------------------------------------------------------------------------
// Signal detection
// ---------------------------------------------------------------------------

fn tier(value: f64, weak: f64, moderate: f64, strong: f64) -> Option<SignalStrength> {
    if value >= strong {
        Some(SignalStrength::Strong)
    } else if value >= moderate {
        Some(SignalStrength::Moderate)
    } else if value >= weak {
        Some(SignalStrength::Weak)
    } else {
        None
    }
}

fn usage_growth_pct(record: &SignalRecord) -> f64 {
    let total = record.usage.total_events;
    let recent = record.usage.events_30d;
    if total <= recent || total < 12 {
        return 0.0;
    }
    // Compare the last 30 days against the account's trailing monthly
    // average, excluding the current month.
    let monthly_avg = (total - recent) as f64 / 11.0;
    if monthly_avg <= 0.0 {
        return 0.0;
    }
    (recent as f64 - monthly_avg) / monthly_avg * 100.0
}

fn days_until_renewal(record: &SignalRecord, now: DateTime<Utc>) -> Option<i64> {
    let end = record.lifecycle.contract_end.as_deref()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    let days = end.with_timezone(&Utc).signed_duration_since(now).num_days();
    (days >= 0).then_some(days)
}

fn detect_signals(record: &SignalRecord, now: DateTime<Utc>) -> Vec<ExpansionSignal> {
    let mut signals = Vec::new();
    let mut push = |signal_type: &str, strength: Option<SignalStrength>| {
        if let Some(strength) = strength {
            signals.push(ExpansionSignal {
                signal_type: signal_type.to_string(),
                strength,
            });
        }
    };

    push(
        TYPE_USAGE_GROWTH,
        tier(usage_growth_pct(record), 20.0, 50.0, 100.0),
    );
    push(
        TYPE_HIGH_ENGAGEMENT,
        tier(record.usage.events_30d as f64, 70.0, 100.0, 150.0),
    );
    push(
        TYPE_LARGE_FLEET,
        tier(record.usage.fleet_size as f64, 10.0, 25.0, 50.0),
    );
    push(
        TYPE_HIGH_SETUP,
        tier(record.usage.setup_completion as f64, 80.0, 90.0, 100.0),
    );
    if record.payment.status == PaymentStatus::Healthy && !record.payment.recent_failure {
        push(TYPE_RELIABLE_PAYMENTS, Some(SignalStrength::Moderate));
    }
    if let Some(days) = days_until_renewal(record, now) {
        if days <= 45 {
            push(TYPE_APPROACHING_RENEWAL, Some(SignalStrength::Strong));
        } else if days <= 90 {
            push(TYPE_APPROACHING_RENEWAL, Some(SignalStrength::Moderate));
        }
    }

    signals
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn opportunity_type(signals: &[ExpansionSignal]) -> &'static str {
    let has = |t: &str| signals.iter().any(|s| s.signal_type == t);
    // Fixed precedence: growth-style signals indicate room for a larger
    // plan (upsell); engagement/setup depth points at adjacent products
    // (cross-sell); otherwise a contract-level upgrade.
    if has(TYPE_USAGE_GROWTH) || has(TYPE_LARGE_FLEET) {
        "upsell"
    } else if has(TYPE_HIGH_ENGAGEMENT) || has(TYPE_HIGH_SETUP) {
        "cross_sell"
    } else {
        "upgrade"
    }
}

fn value_multiplier(opportunity_type: &str) -> f64 {
    match opportunity_type {
        "upsell" => 0.5,
        "cross_sell" => 0.3,
        _ => 0.25,
    }
}

/// Score one account. Returns `None` when the account does not qualify.
pub fn score_expansion(record: &SignalRecord, now: DateTime<Utc>) -> Option<ExpansionCandidate> {
    let signals = detect_signals(record, now);
    if signals.len() < QUALIFY_MIN_TYPES {
        return None;
    }

    let score: i32 = signals.iter().map(|s| s.strength.points()).sum::<i32>()
        + TYPE_BONUS * signals.len() as i32;
    if score < QUALIFY_MIN_SCORE {
        return None;
    }

    let opportunity = opportunity_type(&signals);
    Some(ExpansionCandidate {
        account_id: record.account_id.clone(),
        opportunity_type: opportunity.to_string(),
        score,
        potential_value: record.lifecycle.mrr * value_multiplier(opportunity),
        signals,
    })
}
