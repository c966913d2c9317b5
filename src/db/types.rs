//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Invalid row data: {0}")]
    InvalidRow(String),

    #[error("Illegal task transition: {0}")]
    IllegalTransition(String),
}

/// A row from the `accounts` table. Timestamps are RFC3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAccount {
    pub id: String,
    pub external_crm_id: Option<String>,
    pub name: String,
    pub segment: String,
    pub mrr: f64,
    pub plan: Option<String>,
    pub owner: Option<String>,
    pub health: String,
    pub health_score: i32,
    /// JSON array of risk signal strings.
    pub risk_signals: Option<String>,
    /// JSON array of positive signal strings.
    pub positive_signals: Option<String>,
    pub payment_health: String,
    pub signup_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub archived: bool,
}

/// A row from `health_snapshots`. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSnapshot {
    pub id: String,
    pub account_id: String,
    pub category: String,
    pub score: i32,
    pub mrr: f64,
    pub usage_30d: i32,
    pub days_since_login: Option<i32>,
    pub risk_signals: Option<String>,
    pub positive_signals: Option<String>,
    pub created_at: String,
}

/// A row from `playbooks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPlaybook {
    pub id: String,
    pub name: String,
    pub trigger_key: String,
    pub active: bool,
    pub created_at: String,
}

/// A row from `playbook_actions`, ordered by `position` within a playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPlaybookAction {
    pub id: String,
    pub playbook_id: String,
    pub position: i32,
    pub action_type: String,
    pub title_template: String,
    pub description_template: Option<String>,
    pub priority: String,
    pub due_in_days: Option<i64>,
}

/// A row from `tasks`. `provenance` holds the serialized tagged variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTask {
    pub id: String,
    pub account_id: String,
    pub playbook_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<String>,
    pub provenance: String,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

/// A row from `onboarding_milestones`, keyed by (account, milestone).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMilestone {
    pub account_id: String,
    pub milestone_id: String,
    pub segment: String,
    pub target_days: i64,
    pub completed_at: Option<String>,
    pub is_overdue: bool,
    /// Serialized completion provenance, null until completed.
    pub completion: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from `activity_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbActivity {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub detail: Option<String>,
    pub created_at: String,
}

/// A row from `expansion_opportunities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbExpansionOpportunity {
    pub id: String,
    pub account_id: String,
    pub opportunity_type: String,
    pub score: i32,
    /// JSON array of the signal types that qualified the account.
    pub signal_types: String,
    pub potential_value: f64,
    pub detected_at: String,
}
