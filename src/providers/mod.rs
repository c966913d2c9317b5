//! Abstract provider contracts.
//!
//! The engine depends on these traits only; concrete wire clients live
//! outside the core. `NotConfigured` implementations stand in when a
//! credential block is absent — the dependent feature then reports itself
//! as unavailable instead of failing the whole request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// Company record normalized from the CRM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmCompany {
    pub id: String,
    pub name: String,
    pub lifecycle_stage: Option<String>,
    pub plan: Option<String>,
    pub mrr: f64,
    pub owner: Option<String>,
    pub contract_end: Option<String>,
    pub created_at: Option<String>,
}

/// Payment posture normalized from the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Healthy,
    AtRisk,
    Failed,
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Healthy => "healthy",
            PaymentStatus::AtRisk => "at_risk",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummary {
    pub status: PaymentStatus,
    pub recent_failure: bool,
    pub disputed: bool,
}

/// Product usage counters for one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub total_events: i64,
    pub events_30d: i64,
    pub days_since_last_login: Option<i64>,
    pub feature_adoption_count: i64,
    /// 0–100 setup completion score.
    pub setup_completion: i64,
    pub fleet_size: i64,
    pub user_count: i64,
    pub has_custom_domain: bool,
}

/// Advisory prediction for one account's churn risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryPrediction {
    pub risk_score: u8,
    pub risk_level: String,
    pub reasoning: Option<String>,
    pub recommendations: Vec<String>,
}

impl AdvisoryPrediction {
    /// Fixed neutral fallback used when the advisory call fails or returns
    /// malformed output.
    pub fn neutral() -> Self {
        AdvisoryPrediction {
            risk_score: 50,
            risk_level: "medium".to_string(),
            reasoning: None,
            recommendations: vec![
                "Review recent account activity".to_string(),
                "Confirm primary contact is engaged".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CrmProvider: Send + Sync {
    async fn get_company(&self, id: &str) -> Result<CrmCompany, EngineError>;
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn get_billing_summary(&self, account_id: &str) -> Result<BillingSummary, EngineError>;
}

#[async_trait]
pub trait UsageProvider: Send + Sync {
    async fn get_usage(&self, account_id: &str) -> Result<UsageMetrics, EngineError>;
}

#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    async fn predict(
        &self,
        signals: &crate::signals::SignalRecord,
    ) -> Result<AdvisoryPrediction, EngineError>;
}

/// Best-effort mirror of task lifecycle into an external tracker.
/// Failures here are logged and never block core task persistence.
#[async_trait]
pub trait TaskTrackerMirror: Send + Sync {
    async fn mirror_task_created(&self, task: &crate::db::DbTask) -> Result<(), EngineError>;
    async fn mirror_task_updated(&self, task: &crate::db::DbTask) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// Not-configured placeholders
// ---------------------------------------------------------------------------

/// Stands in for any provider without credentials.
pub struct NotConfigured(pub &'static str);

#[async_trait]
impl CrmProvider for NotConfigured {
    async fn get_company(&self, _id: &str) -> Result<CrmCompany, EngineError> {
        Err(EngineError::not_configured(self.0, "no credentials"))
    }
}

#[async_trait]
impl BillingProvider for NotConfigured {
    async fn get_billing_summary(&self, _account_id: &str) -> Result<BillingSummary, EngineError> {
        Err(EngineError::not_configured(self.0, "no credentials"))
    }
}

#[async_trait]
impl UsageProvider for NotConfigured {
    async fn get_usage(&self, _account_id: &str) -> Result<UsageMetrics, EngineError> {
        Err(EngineError::not_configured(self.0, "no credentials"))
    }
}

#[async_trait]
impl AdvisoryProvider for NotConfigured {
    async fn predict(
        &self,
        _signals: &crate::signals::SignalRecord,
    ) -> Result<AdvisoryPrediction, EngineError> {
        Err(EngineError::not_configured(self.0, "no credentials"))
    }
}

#[async_trait]
impl TaskTrackerMirror for NotConfigured {
    async fn mirror_task_created(&self, _task: &crate::db::DbTask) -> Result<(), EngineError> {
        Err(EngineError::not_configured(self.0, "no credentials"))
    }

    async fn mirror_task_updated(&self, _task: &crate::db::DbTask) -> Result<(), EngineError> {
        Err(EngineError::not_configured(self.0, "no credentials"))
    }
}

#[cfg(test)]
pub mod test_doubles {
    //! In-memory providers for tests.

    use super::*;

    pub struct FixedCrm(pub CrmCompany);

    #[async_trait]
    impl CrmProvider for FixedCrm {
        async fn get_company(&self, _id: &str) -> Result<CrmCompany, EngineError> {
            Ok(self.0.clone())
        }
    }

    pub struct FixedBilling(pub BillingSummary);

    #[async_trait]
    impl BillingProvider for FixedBilling {
        async fn get_billing_summary(
            &self,
            _account_id: &str,
        ) -> Result<BillingSummary, EngineError> {
            Ok(self.0.clone())
        }
    }

    pub struct FixedUsage(pub UsageMetrics);

    #[async_trait]
    impl UsageProvider for FixedUsage {
        async fn get_usage(&self, _account_id: &str) -> Result<UsageMetrics, EngineError> {
            Ok(self.0.clone())
        }
    }

    pub struct FixedAdvisory(pub AdvisoryPrediction);

    #[async_trait]
    impl AdvisoryProvider for FixedAdvisory {
        async fn predict(
            &self,
            _signals: &crate::signals::SignalRecord,
        ) -> Result<AdvisoryPrediction, EngineError> {
            Ok(self.0.clone())
        }
    }

    pub struct FailingAdvisory;

    #[async_trait]
    impl AdvisoryProvider for FailingAdvisory {
        async fn predict(
            &self,
            _signals: &crate::signals::SignalRecord,
        ) -> Result<AdvisoryPrediction, EngineError> {
            Err(EngineError::Advisory("simulated outage".to_string()))
        }
    }

    pub struct FailingBilling;

    #[async_trait]
    impl BillingProvider for FailingBilling {
        async fn get_billing_summary(
            &self,
            _account_id: &str,
        ) -> Result<BillingSummary, EngineError> {
            Err(EngineError::integration("billing", "simulated outage"))
        }
    }

    pub fn sample_company(id: &str, name: &str) -> CrmCompany {
        CrmCompany {
            id: id.to_string(),
            name: name.to_string(),
            lifecycle_stage: Some("customer".to_string()),
            plan: Some("starter".to_string()),
            mrr: 250.0,
            owner: Some("jordan".to_string()),
            contract_end: None,
            created_at: Some("2026-01-01T00:00:00Z".to_string()),
        }
    }
}
