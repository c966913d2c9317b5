//! Batch job entry points.
//!
//! Jobs are invoked by an external scheduler and process the full account
//! list to completion. Provider fan-out runs on a bounded worker pool
//! (`batch_concurrency` permits); persistence and trigger evaluation then
//! run over the gathered results. One account's failure is logged and
//! counted, never aborts the run.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::db::snapshots::NewSnapshot;
use crate::db::{DbAccount, DbSnapshot, EngineDb};
use crate::error::EngineError;
use crate::health::{classifier, detect_transition};
use crate::onboarding::{MilestoneDetector, OnboardingMetrics, StallSeverity};
use crate::playbooks::{TriggerEngine, TriggerEvent};
use crate::providers::{AdvisoryPrediction, AdvisoryProvider, PaymentStatus};
use crate::reports::churn::{rank_accounts, ChurnInput, ChurnRiskAccount};
use crate::reports::expansion::score_expansion;
use crate::signals::{SignalAggregator, SignalRecord};
use crate::types::{Classification, Confidence, HealthCategory, TriggerKey};
use crate::util::days_between;

const INACTIVITY_TRIGGER_DAYS: i64 = 30;
const AI_HIGH_RISK_THRESHOLD: u8 = 70;
const AI_CRITICAL_RISK_THRESHOLD: u8 = 90;

/// Counts returned by every batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Rebuild a classification from the account's persisted health
/// projection, for accounts whose providers are unreachable.
fn stored_classification(account: &DbAccount) -> Classification {
    let parse_signals = |json: Option<&str>| -> Vec<String> {
        json.and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default()
    };
    Classification {
        category: HealthCategory::parse(&account.health),
        score: account.health_score.clamp(0, 100) as u8,
        risk_signals: parse_signals(account.risk_signals.as_deref()),
        positive_signals: parse_signals(account.positive_signals.as_deref()),
    }
}

pub struct JobRunner {
    db: EngineDb,
    aggregator: Arc<SignalAggregator>,
    advisory: Option<Arc<dyn AdvisoryProvider>>,
    concurrency: usize,
}

impl JobRunner {
    pub fn new(db: EngineDb, aggregator: Arc<SignalAggregator>, concurrency: usize) -> Self {
        JobRunner {
            db,
            aggregator,
            advisory: None,
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_advisory(mut self, advisory: Arc<dyn AdvisoryProvider>) -> Self {
        self.advisory = Some(advisory);
        self
    }

    pub fn db(&self) -> &EngineDb {
        &self.db
    }

    /// Aggregate signals for every account on the bounded pool, preserving
    /// account order. Results come back per-account so one provider outage
    /// fails only its own account.
    async fn gather_signals(
        &self,
        accounts: &[DbAccount],
    ) -> Vec<(DbAccount, Result<SignalRecord, EngineError>)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(accounts.len());

        for account in accounts {
            let aggregator = Arc::clone(&self.aggregator);
            let semaphore = Arc::clone(&semaphore);
            let account = account.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::integration("aggregator", "worker pool closed"))?;
                aggregator.aggregate(&account).await
            }));
        }

        let mut results = Vec::with_capacity(accounts.len());
        for (account, handle) in accounts.iter().cloned().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(EngineError::Integration {
                    provider: "aggregator",
                    detail: format!("worker panicked: {}", e),
                }),
            };
            results.push((account, result));
        }
        results
    }

    // -----------------------------------------------------------------------
    // Snapshot job
    // -----------------------------------------------------------------------

    /// Classify every account, append a snapshot, and raise trigger events
    /// for downgrades, inactivity, and AI-flagged risk.
    pub async fn run_snapshot_job(&self) -> Result<JobSummary, EngineError> {
        let accounts = self.db.get_all_accounts()?;
        let run_at = Utc::now().to_rfc3339();
        let mut summary = JobSummary {
            processed: accounts.len(),
            ..Default::default()
        };

        let results = self.gather_signals(&accounts).await;
        let triggers = TriggerEngine::new(&self.db);

        for (account, result) in results {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("snapshot: skipping {}: {}", account.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            if let Err(e) = self
                .snapshot_one(&triggers, &account, &record, &run_at, &mut summary)
                .await
            {
                if e.aborts_batch() {
                    return Err(e);
                }
                log::error!("snapshot: {} failed: {}", account.id, e);
                summary.failed += 1;
            }
        }

        log::info!(
            "snapshot job done: {} accounts, {} snapshots, {} failures",
            summary.processed,
            summary.created,
            summary.failed
        );
        Ok(summary)
    }

    async fn snapshot_one(
        &self,
        triggers: &TriggerEngine<'_>,
        account: &DbAccount,
        record: &SignalRecord,
        run_at: &str,
        summary: &mut JobSummary,
    ) -> Result<(), EngineError> {
        let classification = classifier::classify(record);

        if self.db.update_account_health(
            &account.id,
            classification.category.as_str(),
            classification.score as i32,
            &classification.risk_signals,
            &classification.positive_signals,
            record.payment.status.as_str(),
        )? {
            summary.updated += 1;
        }

        let prior = self.db.get_latest_snapshot_before(&account.id, run_at)?;

        let new_snapshot = NewSnapshot {
            account_id: account.id.clone(),
            category: classification.category.as_str().to_string(),
            score: classification.score as i32,
            mrr: record.lifecycle.mrr,
            usage_30d: record.usage.events_30d as i32,
            days_since_login: record.usage.days_since_last_login.map(|d| d as i32),
            risk_signals: Some(serde_json::to_string(&classification.risk_signals).unwrap_or_default()),
            positive_signals: Some(
                serde_json::to_string(&classification.positive_signals).unwrap_or_default(),
            ),
            created_at: run_at.to_string(),
        };
        let snapshot_id = self.db.insert_snapshot(&new_snapshot)?;
        summary.created += 1;

        let current = DbSnapshot {
            id: snapshot_id,
            account_id: new_snapshot.account_id.clone(),
            category: new_snapshot.category.clone(),
            score: new_snapshot.score,
            mrr: new_snapshot.mrr,
            usage_30d: new_snapshot.usage_30d,
            days_since_login: new_snapshot.days_since_login,
            risk_signals: new_snapshot.risk_signals.clone(),
            positive_signals: new_snapshot.positive_signals.clone(),
            created_at: new_snapshot.created_at.clone(),
        };

        // Downgrades into red/yellow raise the corresponding trigger.
        if let Some(transition) = detect_transition(prior.as_ref(), &current) {
            if transition.is_downgrade() {
                let trigger = match transition.to {
                    HealthCategory::Red => Some(TriggerKey::HealthDropsToRed),
                    HealthCategory::Yellow => Some(TriggerKey::HealthDropsToYellow),
                    _ => None,
                };
                if let Some(trigger) = trigger {
                    let mut event =
                        TriggerEvent::new(trigger, &account.id, &record.company_name, record.lifecycle.mrr);
                    event.risk_score = Some(classification.score);
                    triggers.handle_event(&event).await?;
                }
            }
        }

        if record
            .usage
            .days_since_last_login
            .is_some_and(|d| d >= INACTIVITY_TRIGGER_DAYS)
        {
            let mut event = TriggerEvent::new(
                TriggerKey::Inactive30Days,
                &account.id,
                &record.company_name,
                record.lifecycle.mrr,
            );
            event.risk_score = Some(classification.score);
            triggers.handle_event(&event).await?;
        }

        if let Some(advisory) = &self.advisory {
            self.run_advisory(triggers, account, record, advisory.as_ref())
                .await?;
        }

        Ok(())
    }

    async fn run_advisory(
        &self,
        triggers: &TriggerEngine<'_>,
        account: &DbAccount,
        record: &SignalRecord,
        advisory: &dyn AdvisoryProvider,
    ) -> Result<(), EngineError> {
        let prediction = match advisory.predict(record).await {
            Ok(prediction) => prediction,
            Err(e) => {
                log::warn!("advisory failed for {}, using neutral fallback: {}", account.id, e);
                AdvisoryPrediction::neutral()
            }
        };

        let trigger = if prediction.risk_score >= AI_CRITICAL_RISK_THRESHOLD {
            Some(TriggerKey::AiCriticalChurnRisk)
        } else if prediction.risk_score >= AI_HIGH_RISK_THRESHOLD {
            Some(TriggerKey::AiHighChurnRisk)
        } else {
            None
        };

        if let Some(trigger) = trigger {
            let mut event = TriggerEvent::new(
                trigger,
                &account.id,
                &record.company_name,
                record.lifecycle.mrr,
            );
            event.risk_score = Some(prediction.risk_score);
            triggers.handle_event(&event).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Milestone job
    // -----------------------------------------------------------------------

    /// Evaluate every account's onboarding checklist; surface stalled
    /// accounts as trigger events with the MRR at risk logged.
    pub async fn run_milestone_job(&self) -> Result<JobSummary, EngineError> {
        let accounts = self.db.get_all_accounts()?;
        let now = Utc::now().to_rfc3339();
        let mut summary = JobSummary {
            processed: accounts.len(),
            ..Default::default()
        };
        let mut mrr_at_risk = 0.0f64;

        let results = self.gather_signals(&accounts).await;
        let detector = MilestoneDetector::new(&self.db);
        let triggers = TriggerEngine::new(&self.db);

        for (account, result) in results {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("milestones: skipping {}: {}", account.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let metrics = OnboardingMetrics {
                fleet_size: record.usage.fleet_size,
                user_count: record.usage.user_count,
                trips_last_30: record.usage.events_30d,
                setup_score: record.usage.setup_completion,
                has_custom_domain: record.usage.has_custom_domain,
                days_since_signup: account
                    .signup_at
                    .as_deref()
                    .map(|s| days_between(s, &now))
                    .unwrap_or(0),
            };

            let evaluation = match detector.evaluate(
                &account.id,
                crate::types::Segment::parse(&account.segment),
                &metrics,
                Confidence::Medium,
            ) {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    if e.aborts_batch() {
                        return Err(e);
                    }
                    log::error!("milestones: {} failed: {}", account.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            summary.updated += evaluation.auto_completed.len();

            let trigger = match evaluation.severity {
                Some(StallSeverity::Critical) => Some(TriggerKey::OnboardingStalled),
                Some(StallSeverity::High) => Some(TriggerKey::MilestoneOverdue),
                _ => None,
            };
            match trigger {
                Some(trigger) => {
                    // Same MRR source as the event, so the logged total
                    // matches what lands in the templated tasks.
                    mrr_at_risk += record.lifecycle.mrr;
                    let mut event = TriggerEvent::new(
                        trigger,
                        &account.id,
                        &record.company_name,
                        record.lifecycle.mrr,
                    );
                    event.overdue_milestones = evaluation.overdue.clone();
                    let outcome = triggers.handle_event(&event).await?;
                    summary.created += outcome.tasks_created;
                }
                None => summary.skipped += 1,
            }
        }

        log::info!(
            "milestone job done: {} accounts, {} auto-completions, {} tasks, ${:.0} MRR at risk",
            summary.processed,
            summary.updated,
            summary.created,
            mrr_at_risk
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Churn report
    // -----------------------------------------------------------------------

    /// Rank the whole portfolio for churn review. Read-only: accounts
    /// whose signals cannot be gathered are classified from their last
    /// persisted projection instead of being dropped.
    pub async fn run_churn_report(&self) -> Result<Vec<ChurnRiskAccount>, EngineError> {
        let accounts = self.db.get_all_accounts()?;
        let now = Utc::now().to_rfc3339();
        let results = self.gather_signals(&accounts).await;

        let mut inputs = Vec::with_capacity(results.len());
        for (account, result) in results {
            let input = match result {
                Ok(record) => {
                    let classification = classifier::classify(&record);
                    let ending_soon = record
                        .lifecycle
                        .contract_end
                        .as_deref()
                        .map(|end| (0..=90).contains(&days_between(&now, end)))
                        .unwrap_or(false);
                    ChurnInput {
                        account_id: account.id,
                        company_name: record.company_name,
                        mrr: record.lifecycle.mrr,
                        payment_status: record.payment.status,
                        has_contract_ending_soon: ending_soon,
                        classification,
                    }
                }
                Err(e) => {
                    log::warn!(
                        "churn report: {} unreachable, using stored projection: {}",
                        account.id,
                        e
                    );
                    ChurnInput {
                        account_id: account.id.clone(),
                        company_name: account.name.clone(),
                        mrr: account.mrr,
                        payment_status: PaymentStatus::Unknown,
                        has_contract_ending_soon: false,
                        classification: stored_classification(&account),
                    }
                }
            };
            inputs.push(input);
        }

        Ok(rank_accounts(&inputs))
    }

    // -----------------------------------------------------------------------
    // Expansion job
    // -----------------------------------------------------------------------

    /// Score every account for expansion and persist qualifying
    /// opportunities.
    pub async fn run_expansion_job(&self) -> Result<JobSummary, EngineError> {
        let accounts = self.db.get_all_accounts()?;
        let now = Utc::now();
        let mut summary = JobSummary {
            processed: accounts.len(),
            ..Default::default()
        };

        let results = self.gather_signals(&accounts).await;

        for (account, result) in results {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("expansion: skipping {}: {}", account.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            match score_expansion(&record, now) {
                Some(candidate) => {
                    let signal_types: Vec<&str> = candidate
                        .signals
                        .iter()
                        .map(|s| s.signal_type.as_str())
                        .collect();
                    let signal_json = serde_json::to_string(&signal_types).unwrap_or_default();
                    if let Err(e) = self.db.upsert_expansion_opportunity(
                        &account.id,
                        &candidate.opportunity_type,
                        candidate.score,
                        &signal_json,
                        candidate.potential_value,
                    ) {
                        log::error!("expansion: {} failed: {}", account.id, e);
                        summary.failed += 1;
                        continue;
                    }
                    summary.created += 1;
                }
                None => summary.skipped += 1,
            }
        }

        log::info!(
            "expansion job done: {} accounts, {} opportunities, {} skipped",
            summary.processed,
            summary.created,
            summary.skipped
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::sample_account;
    use crate::db::playbooks::{sample_action, sample_playbook};
    use crate::db::test_utils::test_db;
    use crate::providers::test_doubles::{FixedBilling, FixedCrm, FixedUsage};
    use crate::providers::{BillingSummary, CrmCompany, PaymentStatus, UsageMetrics};

    fn company(id: &str, mrr: f64, stage: &str) -> CrmCompany {
        CrmCompany {
            id: id.to_string(),
            name: format!("{} Inc", id),
            lifecycle_stage: Some(stage.to_string()),
            plan: Some("starter".to_string()),
            mrr,
            owner: None,
            contract_end: None,
            created_at: Some("2026-01-01T00:00:00Z".to_string()),
        }
    }

    fn runner_with(db: EngineDb, crm: CrmCompany, usage: UsageMetrics) -> JobRunner {
        let aggregator = SignalAggregator::new(
            Arc::new(FixedCrm(crm)),
            Arc::new(FixedBilling(BillingSummary {
                status: PaymentStatus::Healthy,
                recent_failure: false,
                disputed: false,
            })),
            Arc::new(FixedUsage(usage)),
        );
        JobRunner::new(db, Arc::new(aggregator), 4)
    }

    fn active_usage() -> UsageMetrics {
        UsageMetrics {
            total_events: 200,
            events_30d: 30,
            days_since_last_login: Some(2),
            feature_adoption_count: 3,
            setup_completion: 85,
            fleet_size: 5,
            user_count: 3,
            has_custom_domain: false,
        }
    }

    #[tokio::test]
    async fn test_snapshot_job_writes_projection_and_snapshot() {
        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");

        let runner = runner_with(db, company("acme", 300.0, "customer"), active_usage());
        let summary = runner.run_snapshot_job().await.expect("run");

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);

        let account = runner.db().get_account("acme").expect("get").unwrap();
        assert_eq!(account.health, "green");
        assert_eq!(runner.db().count_snapshots("acme").expect("count"), 1);
    }

    #[tokio::test]
    async fn test_downgrade_between_runs_raises_red_trigger() {
        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");
        db.upsert_playbook(&sample_playbook("pb-red", "health_drops_to_red", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-red", 1))
            .expect("action");

        // Yesterday's snapshot was green.
        let yesterday = (Utc::now() - chrono::Duration::hours(20)).to_rfc3339();
        db.insert_snapshot(&crate::db::snapshots::sample_snapshot("acme", "green", &yesterday))
            .expect("seed snapshot");

        // Today the account looks lapsed: 75 days without a login.
        let mut usage = active_usage();
        usage.days_since_last_login = Some(75);
        usage.events_30d = 0;
        let runner = runner_with(db, company("acme", 500.0, "customer"), usage);
        runner.run_snapshot_job().await.expect("run");

        let tasks = runner.db().get_tasks_for_account("acme").expect("tasks");
        assert_eq!(tasks.len(), 1, "exactly one task for the red downgrade");
        assert_eq!(tasks[0].playbook_id.as_deref(), Some("pb-red"));
        assert!(tasks[0].provenance.contains("health_drops_to_red"));
    }

    #[tokio::test]
    async fn test_inactivity_raises_trigger_without_downgrade() {
        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");
        db.upsert_playbook(&sample_playbook("pb-inactive", "inactive_30_days", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-inactive", 1))
            .expect("action");

        let mut usage = active_usage();
        usage.days_since_last_login = Some(35);
        let runner = runner_with(db, company("acme", 300.0, "customer"), usage);
        runner.run_snapshot_job().await.expect("run");

        let tasks = runner.db().get_tasks_for_account("acme").expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].provenance.contains("inactive_30_days"));
    }

    #[tokio::test]
    async fn test_milestone_job_auto_completes_and_escalates() {
        let db = test_db();
        let mut account = sample_account("acme", "Acme");
        // Signed up 40 days ago: SMB checklist is fully past due.
        account.signup_at = Some((Utc::now() - chrono::Duration::days(40)).to_rfc3339());
        db.upsert_account(&account).expect("account");
        db.upsert_playbook(&sample_playbook("pb-stalled", "onboarding_stalled", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-stalled", 1))
            .expect("action");

        // No fleet, no team, no trips: all three SMB milestones stay open.
        let mut usage = active_usage();
        usage.fleet_size = 0;
        usage.user_count = 1;
        usage.events_30d = 0;
        let runner = runner_with(db, company("acme", 300.0, "customer"), usage);
        let summary = runner.run_milestone_job().await.expect("run");

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 1, "onboarding_stalled task created");

        let tasks = runner.db().get_tasks_for_account("acme").expect("tasks");
        assert!(tasks[0].provenance.contains("onboarding_stalled"));
    }

    #[tokio::test]
    async fn test_crm_outage_still_classifies_from_live_signals() {
        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");

        let aggregator = SignalAggregator::new(
            Arc::new(crate::providers::NotConfigured("crm")),
            Arc::new(FixedBilling(BillingSummary {
                status: PaymentStatus::Healthy,
                recent_failure: false,
                disputed: false,
            })),
            Arc::new(FixedUsage(active_usage())),
        );
        let runner = JobRunner::new(db, Arc::new(aggregator), 2);
        let summary = runner.run_snapshot_job().await.expect("run");

        // Billing and usage answered: the account is classified from
        // those plus the stored lifecycle, not skipped.
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.created, 1);
        let account = runner.db().get_account("acme").expect("get").unwrap();
        assert_eq!(account.health, "green");
        assert_eq!(runner.db().count_snapshots("acme").expect("count"), 1);
    }

    #[tokio::test]
    async fn test_milestone_escalation_carries_live_mrr() {
        let db = test_db();
        let mut account = sample_account("acme", "Acme");
        account.signup_at = Some((Utc::now() - chrono::Duration::days(40)).to_rfc3339());
        // Stored projection lags the CRM figure.
        account.mrr = 250.0;
        db.upsert_account(&account).expect("account");
        db.upsert_playbook(&sample_playbook("pb-stalled", "onboarding_stalled", true))
            .expect("playbook");
        let mut action = sample_action("act-1", "pb-stalled", 1);
        action.title_template = "Rescue {companyName} (${mrr} MRR)".to_string();
        db.upsert_playbook_action(&action).expect("action");

        let mut usage = active_usage();
        usage.fleet_size = 0;
        usage.user_count = 1;
        usage.events_30d = 0;
        let runner = runner_with(db, company("acme", 900.0, "customer"), usage);
        runner.run_milestone_job().await.expect("run");

        let tasks = runner.db().get_tasks_for_account("acme").expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].title.contains("$900 MRR"), "title: {}", tasks[0].title);
    }

    #[tokio::test]
    async fn test_advisory_critical_score_raises_trigger() {
        use crate::providers::test_doubles::FixedAdvisory;

        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");
        db.upsert_playbook(&sample_playbook("pb-ai", "ai_critical_churn_risk", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-ai", 1))
            .expect("action");

        let runner = runner_with(db, company("acme", 300.0, "customer"), active_usage())
            .with_advisory(Arc::new(FixedAdvisory(AdvisoryPrediction {
                risk_score: 93,
                risk_level: "critical".to_string(),
                reasoning: Some("usage cliff after champion departure".to_string()),
                recommendations: vec![],
            })));
        runner.run_snapshot_job().await.expect("run");

        let tasks = runner.db().get_tasks_for_account("acme").expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].provenance.contains("ai_critical_churn_risk"));
    }

    #[tokio::test]
    async fn test_advisory_failure_falls_back_to_neutral() {
        use crate::providers::test_doubles::FailingAdvisory;

        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");
        db.upsert_playbook(&sample_playbook("pb-ai", "ai_high_churn_risk", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-ai", 1))
            .expect("action");

        let runner = runner_with(db, company("acme", 300.0, "customer"), active_usage())
            .with_advisory(Arc::new(FailingAdvisory));
        let summary = runner.run_snapshot_job().await.expect("run");

        // Neutral fallback scores 50: below both thresholds, no task.
        assert_eq!(summary.failed, 0);
        assert!(runner.db().get_tasks_for_account("acme").expect("tasks").is_empty());
    }

    #[tokio::test]
    async fn test_churn_report_ranks_live_classification() {
        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");

        let runner = runner_with(db, company("acme", 300.0, "customer"), active_usage());
        let report = runner.run_churn_report().await.expect("report");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].risk_level, crate::types::RiskLevel::Low);
        assert!(report[0].score >= 70);
    }

    #[tokio::test]
    async fn test_churn_report_uses_stored_projection_when_unreachable() {
        let db = test_db();
        let mut account = sample_account("acme", "Acme");
        account.health = "red".to_string();
        account.health_score = 20;
        account.mrr = 900.0;
        account.risk_signals = Some(r#"["Payment failed","No login in 60+ days"]"#.to_string());
        db.upsert_account(&account).expect("account");

        let aggregator = SignalAggregator::new(
            Arc::new(crate::providers::NotConfigured("crm")),
            Arc::new(crate::providers::NotConfigured("billing")),
            Arc::new(crate::providers::NotConfigured("usage")),
        );
        let runner = JobRunner::new(db, Arc::new(aggregator), 2);

        let report = runner.run_churn_report().await.expect("report");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].risk_level, crate::types::RiskLevel::Critical);
        assert_eq!(report[0].mrr, 900.0);
    }

    #[tokio::test]
    async fn test_expansion_job_persists_qualifying_accounts() {
        let db = test_db();
        db.upsert_account(&sample_account("acme", "Acme")).expect("account");
        db.upsert_account(&sample_account("tiny", "Tiny")).expect("account");

        // Strong growth + engagement + fleet: qualifies comfortably.
        let usage = UsageMetrics {
            total_events: 650,
            events_30d: 160,
            days_since_last_login: Some(1),
            feature_adoption_count: 5,
            setup_completion: 95,
            fleet_size: 30,
            user_count: 10,
            has_custom_domain: true,
        };
        let runner = runner_with(db, company("acme", 800.0, "customer"), usage);
        let summary = runner.run_expansion_job().await.expect("run");

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 2);

        let opportunities = runner.db().get_expansion_opportunities().expect("query");
        assert_eq!(opportunities.len(), 2);
        assert_eq!(opportunities[0].opportunity_type, "upsell");
    }
}
