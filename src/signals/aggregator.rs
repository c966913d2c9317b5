//! Concurrent per-account signal aggregation.

use std::sync::Arc;

use crate::db::DbAccount;
use crate::error::EngineError;
use crate::providers::{BillingProvider, CrmProvider, PaymentStatus, UsageProvider};
use crate::types::Segment;

use super::{LifecycleSignals, PaymentSignals, SignalRecord, UsageSignals};

/// Queries the three signal sources concurrently and merges the results.
/// Source failures are isolated: a failed billing or usage lookup degrades
/// that slice to its unknown default, and a failed CRM lookup degrades the
/// lifecycle slice to the stored account projection. Aggregation only
/// errors when no source answered at all.
pub struct SignalAggregator {
    crm: Arc<dyn CrmProvider>,
    billing: Arc<dyn BillingProvider>,
    usage: Arc<dyn UsageProvider>,
}

impl SignalAggregator {
    pub fn new(
        crm: Arc<dyn CrmProvider>,
        billing: Arc<dyn BillingProvider>,
        usage: Arc<dyn UsageProvider>,
    ) -> Self {
        SignalAggregator { crm, billing, usage }
    }

    /// Build the merged record for one account. Each failed source is a
    /// missing signal, not an abort: the account is classified from
    /// whatever answered. The stored row backfills the lifecycle slice
    /// when the CRM is down (its stage stays unknown, so stage-dependent
    /// signals simply don't fire).
    pub async fn aggregate(&self, account: &DbAccount) -> Result<SignalRecord, EngineError> {
        let (company, billing, usage) = tokio::join!(
            self.crm.get_company(&account.id),
            self.billing.get_billing_summary(&account.id),
            self.usage.get_usage(&account.id),
        );

        let company = match company {
            Ok(company) => Some(company),
            Err(e) => {
                if billing.is_err() && usage.is_err() {
                    return Err(e);
                }
                log::warn!(
                    "crm lookup failed for {}, falling back to the stored account row: {}",
                    account.id,
                    e
                );
                None
            }
        };

        let payment = match billing {
            Ok(summary) => PaymentSignals {
                status: summary.status,
                recent_failure: summary.recent_failure,
                disputed: summary.disputed,
            },
            Err(e) => {
                log::warn!(
                    "billing lookup failed for {}, treating payment as unknown: {}",
                    account.id,
                    e
                );
                PaymentSignals {
                    status: PaymentStatus::Unknown,
                    recent_failure: false,
                    disputed: false,
                }
            }
        };

        let usage = match usage {
            Ok(metrics) => UsageSignals {
                total_events: metrics.total_events,
                events_30d: metrics.events_30d,
                days_since_last_login: metrics.days_since_last_login,
                feature_adoption_count: metrics.feature_adoption_count,
                setup_completion: metrics.setup_completion,
                fleet_size: metrics.fleet_size,
                user_count: metrics.user_count,
                has_custom_domain: metrics.has_custom_domain,
            },
            Err(e) => {
                log::warn!(
                    "usage lookup failed for {}, treating usage as empty: {}",
                    account.id,
                    e
                );
                UsageSignals::default()
            }
        };

        let (account_id, company_name, lifecycle) = match company {
            Some(company) => (
                company.id,
                company.name,
                LifecycleSignals {
                    segment: Segment::derive(company.mrr, company.plan.as_deref()),
                    stage: company.lifecycle_stage,
                    plan: company.plan,
                    mrr: company.mrr,
                    contract_end: company.contract_end,
                    created_at: company.created_at,
                },
            ),
            None => (
                account.id.clone(),
                account.name.clone(),
                LifecycleSignals {
                    segment: Segment::parse(&account.segment),
                    stage: None,
                    plan: account.plan.clone(),
                    mrr: account.mrr,
                    contract_end: None,
                    created_at: Some(account.created_at.clone()),
                },
            ),
        };

        Ok(SignalRecord {
            account_id,
            company_name,
            payment,
            usage,
            lifecycle,
        })
    }
}
