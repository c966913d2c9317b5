//! Onboarding milestone detection.
//!
//! Each segment carries a fixed ordered checklist of milestones with
//! target-day counts. Milestones complete either manually (explicit call)
//! or automatically when a detection rule at or above the requested
//! confidence tier fires against current metrics. The overdue flag is
//! recomputed from its defining condition on every evaluation, never set
//! independently.

use serde::{Deserialize, Serialize};

use crate::db::{DbError, EngineDb};
use crate::error::EngineError;
use crate::types::{Confidence, Provenance, Segment};

// ---------------------------------------------------------------------------
// Metrics and checklists
// ---------------------------------------------------------------------------

/// Inputs to auto-detection, derived from usage signals and the signup date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingMetrics {
    pub fleet_size: i64,
    pub user_count: i64,
    pub trips_last_30: i64,
    pub setup_score: i64,
    pub has_custom_domain: bool,
    pub days_since_signup: i64,
}

/// One detection rule: fires when the predicate holds, at a fixed
/// confidence tier. Milestones without a rule are manual-only.
struct DetectionRule {
    confidence: Confidence,
    reason: &'static str,
    predicate: fn(&OnboardingMetrics) -> bool,
}

/// A checklist entry: milestone id, target-day count, optional rule.
pub struct MilestoneDef {
    pub id: &'static str,
    pub target_days: i64,
    detection: Option<DetectionRule>,
}

const FLEET_CONFIGURED: MilestoneDef = MilestoneDef {
    id: "fleet_configured",
    target_days: 7,
    detection: Some(DetectionRule {
        confidence: Confidence::High,
        reason: "at least one vehicle registered",
        predicate: |m| m.fleet_size >= 1,
    }),
};

const TEAM_INVITED: MilestoneDef = MilestoneDef {
    id: "team_invited",
    target_days: 14,
    detection: Some(DetectionRule {
        confidence: Confidence::High,
        reason: "two or more users on the account",
        predicate: |m| m.user_count >= 2,
    }),
};

const FIRST_BOOKING: MilestoneDef = MilestoneDef {
    id: "first_booking",
    target_days: 21,
    detection: Some(DetectionRule {
        // Trip counts only cover the last 30 days, so an early booking
        // outside that window would be missed: medium confidence.
        confidence: Confidence::Medium,
        reason: "trips recorded in the last 30 days",
        predicate: |m| m.trips_last_30 >= 1,
    }),
};

const SETUP_COMPLETE: MilestoneDef = MilestoneDef {
    id: "setup_complete",
    target_days: 30,
    detection: Some(DetectionRule {
        confidence: Confidence::Medium,
        reason: "setup score at or above 80",
        predicate: |m| m.setup_score >= 80,
    }),
};

const CUSTOM_DOMAIN: MilestoneDef = MilestoneDef {
    id: "custom_domain",
    target_days: 45,
    detection: Some(DetectionRule {
        confidence: Confidence::High,
        reason: "custom domain configured",
        predicate: |m| m.has_custom_domain,
    }),
};

const KICKOFF_CALL: MilestoneDef = MilestoneDef {
    id: "kickoff_call",
    target_days: 7,
    detection: None,
};

const FREE_CHECKLIST: &[MilestoneDef] = &[FIRST_BOOKING, SETUP_COMPLETE];
const SMB_CHECKLIST: &[MilestoneDef] = &[FLEET_CONFIGURED, FIRST_BOOKING, TEAM_INVITED];
const MID_MARKET_CHECKLIST: &[MilestoneDef] = &[
    FLEET_CONFIGURED,
    TEAM_INVITED,
    FIRST_BOOKING,
    CUSTOM_DOMAIN,
];
const ENTERPRISE_CHECKLIST: &[MilestoneDef] = &[
    KICKOFF_CALL,
    FLEET_CONFIGURED,
    TEAM_INVITED,
    SETUP_COMPLETE,
    CUSTOM_DOMAIN,
];

pub fn checklist_for(segment: Segment) -> &'static [MilestoneDef] {
    match segment {
        Segment::Free => FREE_CHECKLIST,
        Segment::Smb => SMB_CHECKLIST,
        Segment::MidMarket => MID_MARKET_CHECKLIST,
        Segment::Enterprise => ENTERPRISE_CHECKLIST,
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Escalation severity from the overdue-milestone count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StallSeverity {
    Medium,
    High,
    Critical,
}

impl StallSeverity {
    pub fn from_overdue_count(count: usize) -> Option<StallSeverity> {
        match count {
            0 => None,
            1 => Some(StallSeverity::Medium),
            2 => Some(StallSeverity::High),
            _ => Some(StallSeverity::Critical),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StallSeverity::Medium => "medium",
            StallSeverity::High => "high",
            StallSeverity::Critical => "critical",
        }
    }
}

/// Result of one evaluation pass over an account's checklist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneEvaluation {
    pub auto_completed: Vec<String>,
    pub overdue: Vec<String>,
    pub severity: Option<StallSeverity>,
}

pub struct MilestoneDetector<'a> {
    db: &'a EngineDb,
}

impl<'a> MilestoneDetector<'a> {
    pub fn new(db: &'a EngineDb) -> Self {
        MilestoneDetector { db }
    }

    /// Mark one milestone complete now, regardless of detection heuristics.
    pub fn complete_manual(
        &self,
        account_id: &str,
        milestone_id: &str,
        note: Option<&str>,
    ) -> Result<bool, EngineError> {
        let provenance = Provenance::Manual {
            note: note.map(|s| s.to_string()),
        };
        let json = serde_json::to_string(&provenance)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let completed = self.db.complete_milestone(account_id, milestone_id, &json)?;
        if completed {
            self.db
                .log_activity(account_id, "milestone_completed", Some(milestone_id))?;
        }
        Ok(completed)
    }

    /// Run one evaluation pass: seed missing checklist rows, auto-complete
    /// milestones whose rules fire at or above `threshold`, and recompute
    /// the overdue flag for every incomplete milestone. The whole pass is
    /// one transaction, so a failure mid-checklist leaves no half-updated
    /// overdue flags behind.
    pub fn evaluate(
        &self,
        account_id: &str,
        segment: Segment,
        metrics: &OnboardingMetrics,
        threshold: Confidence,
    ) -> Result<MilestoneEvaluation, EngineError> {
        let checklist = checklist_for(segment);

        let mut evaluation = self.db.with_transaction(|db| {
            let mut evaluation = MilestoneEvaluation::default();

            for def in checklist {
                db.ensure_milestone(account_id, def.id, segment.as_str(), def.target_days)?;

                let row = db
                    .get_milestone(account_id, def.id)?
                    .ok_or_else(|| DbError::InvalidRow(format!("milestone {} missing", def.id)))?;

                let mut completed = row.completed_at.is_some();

                if !completed {
                    if let Some(rule) = &def.detection {
                        if rule.confidence >= threshold && (rule.predicate)(metrics) {
                            let provenance = Provenance::AutoDetected {
                                rule: def.id.to_string(),
                                reason: rule.reason.to_string(),
                                confidence: rule.confidence,
                            };
                            let json = serde_json::to_string(&provenance)
                                .map_err(|e| DbError::InvalidRow(e.to_string()))?;
                            if db.complete_milestone(account_id, def.id, &json)? {
                                db.log_activity(account_id, "milestone_completed", Some(def.id))?;
                                evaluation.auto_completed.push(def.id.to_string());
                                completed = true;
                            }
                        }
                    }
                }

                // isOverdue == past target && still incomplete. The stored
                // target wins over the current def: it was fixed at creation.
                let is_overdue = !completed && metrics.days_since_signup > row.target_days;
                db.set_milestone_overdue(account_id, def.id, is_overdue)?;
                if is_overdue {
                    evaluation.overdue.push(def.id.to_string());
                }
            }

            Ok(evaluation)
        })?;

        evaluation.severity = StallSeverity::from_overdue_count(evaluation.overdue.len());
        Ok(evaluation)
    }
}
