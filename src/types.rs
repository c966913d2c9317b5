//! Shared domain types for the health engine.
//!
//! Everything here is serde-serializable with camelCase/snake_case renames so
//! the same structs can be persisted, logged, and returned from API surfaces
//! without translation layers.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Categorical account health. Ordinal values are used by the trend
/// detector: green=3, yellow=2, red=1, unknown=0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    Green,
    Yellow,
    Red,
    Unknown,
}

impl HealthCategory {
    pub fn ordinal(&self) -> i32 {
        match self {
            HealthCategory::Green => 3,
            HealthCategory::Yellow => 2,
            HealthCategory::Red => 1,
            HealthCategory::Unknown => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCategory::Green => "green",
            HealthCategory::Yellow => "yellow",
            HealthCategory::Red => "red",
            HealthCategory::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> HealthCategory {
        match s {
            "green" => HealthCategory::Green,
            "yellow" => HealthCategory::Yellow,
            "red" => HealthCategory::Red,
            _ => HealthCategory::Unknown,
        }
    }
}

/// Output of the health classifier: category, band-consistent numeric
/// score, and the discrete signals that produced both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: HealthCategory,
    pub score: u8,
    pub risk_signals: Vec<String>,
    pub positive_signals: Vec<String>,
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Customer-size segment, derived from MRR or plan code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Free,
    Smb,
    MidMarket,
    Enterprise,
}

impl Segment {
    /// Derive the segment from MRR, falling back to the plan code when MRR
    /// is zero (trial plans carry a plan string before first payment).
    pub fn derive(mrr: f64, plan: Option<&str>) -> Segment {
        if mrr >= 2_000.0 {
            return Segment::Enterprise;
        }
        if mrr >= 500.0 {
            return Segment::MidMarket;
        }
        if mrr > 0.0 {
            return Segment::Smb;
        }
        match plan.map(|p| p.to_ascii_lowercase()) {
            Some(p) if p.contains("enterprise") => Segment::Enterprise,
            Some(p) if p.contains("pro") || p.contains("growth") => Segment::MidMarket,
            Some(p) if !p.is_empty() && p != "free" => Segment::Smb,
            _ => Segment::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Free => "free",
            Segment::Smb => "smb",
            Segment::MidMarket => "mid_market",
            Segment::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Segment {
        match s {
            "enterprise" => Segment::Enterprise,
            "mid_market" => Segment::MidMarket,
            "smb" => Segment::Smb,
            _ => Segment::Free,
        }
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Event keys that activate playbooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKey {
    HealthDropsToRed,
    HealthDropsToYellow,
    Inactive30Days,
    OnboardingStalled,
    MilestoneOverdue,
    AiHighChurnRisk,
    AiCriticalChurnRisk,
}

impl TriggerKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKey::HealthDropsToRed => "health_drops_to_red",
            TriggerKey::HealthDropsToYellow => "health_drops_to_yellow",
            TriggerKey::Inactive30Days => "inactive_30_days",
            TriggerKey::OnboardingStalled => "onboarding_stalled",
            TriggerKey::MilestoneOverdue => "milestone_overdue",
            TriggerKey::AiHighChurnRisk => "ai_high_churn_risk",
            TriggerKey::AiCriticalChurnRisk => "ai_critical_churn_risk",
        }
    }

    pub fn parse(s: &str) -> Option<TriggerKey> {
        match s {
            "health_drops_to_red" => Some(TriggerKey::HealthDropsToRed),
            "health_drops_to_yellow" => Some(TriggerKey::HealthDropsToYellow),
            "inactive_30_days" => Some(TriggerKey::Inactive30Days),
            "onboarding_stalled" => Some(TriggerKey::OnboardingStalled),
            "milestone_overdue" => Some(TriggerKey::MilestoneOverdue),
            "ai_high_churn_risk" => Some(TriggerKey::AiHighChurnRisk),
            "ai_critical_churn_risk" => Some(TriggerKey::AiCriticalChurnRisk),
            _ => None,
        }
    }

    /// Default due-in-days for tasks created without an explicit offset.
    pub fn default_due_in_days(&self) -> i64 {
        match self {
            TriggerKey::HealthDropsToRed => 1,
            TriggerKey::HealthDropsToYellow => 3,
            TriggerKey::OnboardingStalled | TriggerKey::MilestoneOverdue => 2,
            TriggerKey::Inactive30Days
            | TriggerKey::AiHighChurnRisk
            | TriggerKey::AiCriticalChurnRisk => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Task lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Pending => matches!(
                next,
                TaskStatus::InProgress | TaskStatus::Cancelled | TaskStatus::Completed
            ),
            TaskStatus::InProgress => {
                matches!(next, TaskStatus::Completed | TaskStatus::Cancelled)
            }
            TaskStatus::Completed | TaskStatus::Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> TaskPriority {
        match s {
            "urgent" => TaskPriority::Urgent,
            "high" => TaskPriority::High,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Medium,
        }
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Closed provenance variant carried by tasks and milestone completions.
/// One tagged type per origin kind, each carrying only the fields relevant
/// to that kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Manual {
        note: Option<String>,
    },
    AutoDetected {
        rule: String,
        reason: String,
        confidence: Confidence,
    },
    PlaybookTriggered {
        trigger_key: TriggerKey,
        risk_score: Option<u8>,
        mrr: Option<f64>,
    },
    AiFlagged {
        risk_score: u8,
        reasoning: Option<String>,
    },
}

/// Confidence tier for milestone auto-detection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

// ---------------------------------------------------------------------------
// Risk tiers
// ---------------------------------------------------------------------------

/// Four-tier churn risk level used by the report scorers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Sort weight for the churn priority formula — lower sorts first.
    pub fn weight(&self) -> f64 {
        match self {
            RiskLevel::Critical => 1.0,
            RiskLevel::High => 2.0,
            RiskLevel::Medium => 3.0,
            RiskLevel::Low => 4.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_from_mrr() {
        assert_eq!(Segment::derive(5_000.0, None), Segment::Enterprise);
        assert_eq!(Segment::derive(800.0, None), Segment::MidMarket);
        assert_eq!(Segment::derive(99.0, None), Segment::Smb);
        assert_eq!(Segment::derive(0.0, None), Segment::Free);
    }

    #[test]
    fn test_segment_from_plan_when_no_mrr() {
        assert_eq!(
            Segment::derive(0.0, Some("enterprise-annual")),
            Segment::Enterprise
        );
        assert_eq!(Segment::derive(0.0, Some("pro")), Segment::MidMarket);
        assert_eq!(Segment::derive(0.0, Some("starter")), Segment::Smb);
        assert_eq!(Segment::derive(0.0, Some("free")), Segment::Free);
    }

    #[test]
    fn test_terminal_statuses_cannot_transition() {
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn test_trigger_key_round_trip() {
        for key in [
            TriggerKey::HealthDropsToRed,
            TriggerKey::HealthDropsToYellow,
            TriggerKey::Inactive30Days,
            TriggerKey::OnboardingStalled,
            TriggerKey::MilestoneOverdue,
            TriggerKey::AiHighChurnRisk,
            TriggerKey::AiCriticalChurnRisk,
        ] {
            assert_eq!(TriggerKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(TriggerKey::parse("bogus"), None);
    }

    #[test]
    fn test_ordinal_ordering() {
        assert!(HealthCategory::Green.ordinal() > HealthCategory::Yellow.ordinal());
        assert!(HealthCategory::Yellow.ordinal() > HealthCategory::Red.ordinal());
        assert!(HealthCategory::Red.ordinal() > HealthCategory::Unknown.ordinal());
    }

    #[test]
    fn test_provenance_serializes_tagged() {
        let p = Provenance::PlaybookTriggered {
            trigger_key: TriggerKey::HealthDropsToRed,
            risk_score: Some(22),
            mrr: Some(500.0),
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"kind\":\"playbook_triggered\""));
        assert!(json.contains("health_drops_to_red"));
        let back: Provenance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
