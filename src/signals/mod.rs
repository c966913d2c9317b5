//! Signal aggregation: one normalized record per account, merged from the
//! CRM, billing, and usage providers.

pub mod aggregator;

pub use aggregator::SignalAggregator;

use serde::{Deserialize, Serialize};

use crate::providers::PaymentStatus;
use crate::types::Segment;

/// Payment posture slice of the signal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSignals {
    pub status: PaymentStatus,
    pub recent_failure: bool,
    pub disputed: bool,
}

impl Default for PaymentSignals {
    fn default() -> Self {
        PaymentSignals {
            status: PaymentStatus::Unknown,
            recent_failure: false,
            disputed: false,
        }
    }
}

/// Usage slice of the signal record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSignals {
    pub total_events: i64,
    pub events_30d: i64,
    pub days_since_last_login: Option<i64>,
    pub feature_adoption_count: i64,
    pub setup_completion: i64,
    pub fleet_size: i64,
    pub user_count: i64,
    pub has_custom_domain: bool,
}

/// Lifecycle slice of the signal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleSignals {
    pub segment: Segment,
    pub stage: Option<String>,
    pub plan: Option<String>,
    pub mrr: f64,
    pub contract_end: Option<String>,
    pub created_at: Option<String>,
}

impl Default for LifecycleSignals {
    fn default() -> Self {
        LifecycleSignals {
            segment: Segment::Free,
            stage: None,
            plan: None,
            mrr: 0.0,
            contract_end: None,
            created_at: None,
        }
    }
}

/// One account's merged signal record. Input to the classifier and the
/// report scorers; produced only by [`SignalAggregator`] and test builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    pub account_id: String,
    pub company_name: String,
    pub payment: PaymentSignals,
    pub usage: UsageSignals,
    pub lifecycle: LifecycleSignals,
}

impl SignalRecord {
    /// Empty record for an account with no reachable providers. Every
    /// slice is at its unknown/zero default.
    pub fn empty(account_id: &str, company_name: &str) -> Self {
        SignalRecord {
            account_id: account_id.to_string(),
            company_name: company_name.to_string(),
            payment: PaymentSignals::default(),
            usage: UsageSignals::default(),
            lifecycle: LifecycleSignals::default(),
        }
    }
}
