//! Playbook trigger engine.
//!
//! A raised event (health downgrade, inactivity, stalled onboarding, AI
//! risk flag) is matched against active playbooks with the same trigger
//! key; each matched playbook's actions run in definition order. Task
//! creation dedups through the store's conditional insert: at most one
//! non-terminal task per (account, playbook). Every evaluation writes an
//! activity row whether or not a task was created, and per-action failures
//! are logged and counted, never propagated.

pub mod template;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::tasks::NewTask;
use crate::db::EngineDb;
use crate::error::EngineError;
use crate::providers::TaskTrackerMirror;
use crate::types::{Provenance, TriggerKey};

/// A triggering event with the account context actions may template from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub trigger: TriggerKey,
    pub account_id: String,
    pub company_name: String,
    pub mrr: f64,
    pub risk_score: Option<u8>,
    /// Names of overdue milestones, for onboarding triggers.
    pub overdue_milestones: Vec<String>,
}

impl TriggerEvent {
    pub fn new(trigger: TriggerKey, account_id: &str, company_name: &str, mrr: f64) -> Self {
        TriggerEvent {
            trigger,
            account_id: account_id.to_string(),
            company_name: company_name.to_string(),
            mrr,
            risk_score: None,
            overdue_milestones: Vec::new(),
        }
    }

    fn template_context(&self) -> HashMap<&'static str, String> {
        let mut ctx = HashMap::new();
        ctx.insert("companyName", self.company_name.clone());
        ctx.insert("mrr", format!("{:.0}", self.mrr));
        ctx.insert("triggerKey", self.trigger.as_str().to_string());
        if let Some(score) = self.risk_score {
            ctx.insert("riskScore", score.to_string());
        }
        if !self.overdue_milestones.is_empty() {
            ctx.insert("milestones", self.overdue_milestones.join(", "));
        }
        ctx
    }
}

/// Counts from one event evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub matched_playbooks: usize,
    pub tasks_created: usize,
    pub deduped: usize,
    pub failed: usize,
}

pub struct TriggerEngine<'a> {
    db: &'a EngineDb,
    mirror: Option<Arc<dyn TaskTrackerMirror>>,
}

impl<'a> TriggerEngine<'a> {
    pub fn new(db: &'a EngineDb) -> Self {
        TriggerEngine { db, mirror: None }
    }

    pub fn with_mirror(db: &'a EngineDb, mirror: Arc<dyn TaskTrackerMirror>) -> Self {
        TriggerEngine {
            db,
            mirror: Some(mirror),
        }
    }

    /// Evaluate one event against all matching active playbooks.
    pub async fn handle_event(&self, event: &TriggerEvent) -> Result<TriggerOutcome, EngineError> {
        let playbooks = self
            .db
            .get_active_playbooks_for_trigger(event.trigger.as_str())?;

        let mut outcome = TriggerOutcome {
            matched_playbooks: playbooks.len(),
            ..Default::default()
        };
        let context = event.template_context();

        for playbook in &playbooks {
            let actions = match self.db.get_playbook_actions(&playbook.id) {
                Ok(actions) => actions,
                Err(e) => {
                    log::error!(
                        "failed to load actions for playbook {}: {}",
                        playbook.id,
                        e
                    );
                    outcome.failed += 1;
                    continue;
                }
            };

            for action in &actions {
                if action.action_type != "create_task" {
                    log::warn!(
                        "playbook {} action {} has unsupported type {}, skipping",
                        playbook.id,
                        action.id,
                        action.action_type
                    );
                    continue;
                }
                match self.run_create_task(event, &playbook.id, action, &context).await {
                    Ok(Some(_)) => outcome.tasks_created += 1,
                    Ok(None) => outcome.deduped += 1,
                    Err(e) => {
                        log::error!(
                            "action {} of playbook {} failed for {}: {}",
                            action.id,
                            playbook.id,
                            event.account_id,
                            e
                        );
                        outcome.failed += 1;
                    }
                }
            }
        }

        // Audit the evaluation regardless of what the actions did.
        let detail = serde_json::to_string(&serde_json::json!({
            "trigger": event.trigger.as_str(),
            "matchedPlaybooks": outcome.matched_playbooks,
            "tasksCreated": outcome.tasks_created,
            "deduped": outcome.deduped,
        }))
        .unwrap_or_default();
        self.db
            .log_activity(&event.account_id, "trigger_evaluated", Some(&detail))?;

        Ok(outcome)
    }

    async fn run_create_task(
        &self,
        event: &TriggerEvent,
        playbook_id: &str,
        action: &crate::db::DbPlaybookAction,
        context: &HashMap<&'static str, String>,
    ) -> Result<Option<String>, EngineError> {
        let due_in_days = action
            .due_in_days
            .unwrap_or_else(|| event.trigger.default_due_in_days());
        let due_date = (Utc::now() + Duration::days(due_in_days)).to_rfc3339();

        let provenance = Provenance::PlaybookTriggered {
            trigger_key: event.trigger,
            risk_score: event.risk_score,
            mrr: Some(event.mrr),
        };
        let provenance_json = serde_json::to_string(&provenance)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let task = NewTask {
            account_id: event.account_id.clone(),
            playbook_id: Some(playbook_id.to_string()),
            title: template::render(&action.title_template, context),
            description: action
                .description_template
                .as_deref()
                .map(|t| template::render(t, context)),
            priority: action.priority.clone(),
            due_date: Some(due_date),
            provenance: provenance_json,
        };

        let created = self.db.create_task_if_no_open(&task)?;

        if let (Some(task_id), Some(mirror)) = (created.as_deref(), self.mirror.as_ref()) {
            if let Some(db_task) = self.db.get_task(task_id)? {
                // Best effort: a mirror outage never blocks task persistence.
                if let Err(e) = mirror.mirror_task_created(&db_task).await {
                    log::warn!("task tracker mirror failed for {}: {}", task_id, e);
                }
            }
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::playbooks::{sample_action, sample_playbook};
    use crate::db::test_utils::test_db;
    use crate::types::TaskStatus;

    fn red_drop_event() -> TriggerEvent {
        let mut event = TriggerEvent::new(
            TriggerKey::HealthDropsToRed,
            "acme",
            "Acme Fleet",
            500.0,
        );
        event.risk_score = Some(22);
        event
    }

    #[tokio::test]
    async fn test_matched_playbook_creates_templated_task() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-1", "health_drops_to_red", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-1", 1))
            .expect("action");

        let engine = TriggerEngine::new(&db);
        let outcome = engine.handle_event(&red_drop_event()).await.expect("event");
        assert_eq!(outcome.matched_playbooks, 1);
        assert_eq!(outcome.tasks_created, 1);
        assert_eq!(outcome.failed, 0);

        let tasks = db.get_tasks_for_account("acme").expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Check in with Acme Fleet");
        assert_eq!(
            tasks[0].description.as_deref(),
            Some("Health dropped, score 22")
        );
        assert_eq!(tasks[0].status, "pending");
        assert!(tasks[0].due_date.is_some());
        assert!(tasks[0].provenance.contains("playbook_triggered"));
    }

    #[tokio::test]
    async fn test_second_trigger_dedups() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-1", "health_drops_to_red", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-1", 1))
            .expect("action");

        let engine = TriggerEngine::new(&db);
        let first = engine.handle_event(&red_drop_event()).await.expect("first");
        let second = engine.handle_event(&red_drop_event()).await.expect("second");

        assert_eq!(first.tasks_created, 1);
        assert_eq!(second.tasks_created, 0);
        assert_eq!(second.deduped, 1);
        assert_eq!(db.get_tasks_for_account("acme").expect("tasks").len(), 1);
    }

    #[tokio::test]
    async fn test_dedup_window_reopens_after_completion() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-1", "health_drops_to_red", true))
            .expect("playbook");
        db.upsert_playbook_action(&sample_action("act-1", "pb-1", 1))
            .expect("action");

        let engine = TriggerEngine::new(&db);
        engine.handle_event(&red_drop_event()).await.expect("first");

        let task_id = db.get_tasks_for_account("acme").expect("tasks")[0].id.clone();
        db.transition_task(&task_id, TaskStatus::Completed)
            .expect("complete");

        let again = engine.handle_event(&red_drop_event()).await.expect("again");
        assert_eq!(again.tasks_created, 1);
    }

    #[tokio::test]
    async fn test_inactive_playbooks_and_other_triggers_ignored() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-off", "health_drops_to_red", false))
            .expect("playbook");
        db.upsert_playbook(&sample_playbook("pb-other", "inactive_30_days", true))
            .expect("playbook");

        let engine = TriggerEngine::new(&db);
        let outcome = engine.handle_event(&red_drop_event()).await.expect("event");
        assert_eq!(outcome.matched_playbooks, 0);
        assert!(db.get_tasks_for_account("acme").expect("tasks").is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_audited_even_without_tasks() {
        let db = test_db();
        let engine = TriggerEngine::new(&db);
        engine.handle_event(&red_drop_event()).await.expect("event");

        let activity = db.get_activity_for_account("acme", 10).expect("activity");
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].kind, "trigger_evaluated");
        assert!(activity[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("health_drops_to_red"));
    }

    #[tokio::test]
    async fn test_due_date_falls_back_to_trigger_default() {
        let db = test_db();
        db.upsert_playbook(&sample_playbook("pb-1", "health_drops_to_red", true))
            .expect("playbook");
        let mut action = sample_action("act-1", "pb-1", 1);
        action.due_in_days = None;
        db.upsert_playbook_action(&action).expect("action");

        let engine = TriggerEngine::new(&db);
        engine.handle_event(&red_drop_event()).await.expect("event");

        let tasks = db.get_tasks_for_account("acme").expect("tasks");
        let due = chrono::DateTime::parse_from_rfc3339(tasks[0].due_date.as_deref().unwrap())
            .expect("parse due");
        let days_out = (due.with_timezone(&Utc) - Utc::now()).num_hours();
        // health_drops_to_red defaults to 1 day out
        assert!((20..=28).contains(&days_out));
    }
}
