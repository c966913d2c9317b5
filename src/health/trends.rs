//! Trend and transition detection over the append-only snapshot sequence.
//!
//! All functions here are read-only over snapshots ordered by creation
//! time; nothing in this module writes.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::db::DbSnapshot;
use crate::types::HealthCategory;

/// How far back a prior snapshot still counts for transition detection.
const TRANSITION_LOOKBACK_HOURS: i64 = 24;

/// Averages closer than this are reported as stable.
const TREND_EPSILON: f64 = 0.3;

/// A detected category change between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub account_id: String,
    pub from: HealthCategory,
    pub to: HealthCategory,
    pub at: String,
}

impl Transition {
    /// A downgrade is any decrease in ordinal value.
    pub fn is_downgrade(&self) -> bool {
        self.to.ordinal() < self.from.ordinal()
    }

    pub fn is_upgrade(&self) -> bool {
        self.to.ordinal() > self.from.ordinal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
    #[default]
    Unknown,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Improving => "improving",
            TrendLabel::Declining => "declining",
            TrendLabel::Stable => "stable",
            TrendLabel::Unknown => "unknown",
        }
    }
}

/// Compare a freshly written snapshot against the account's most recent
/// prior one. A prior snapshot older than 24h is too stale to call the
/// change a transition.
pub fn detect_transition(
    prior: Option<&DbSnapshot>,
    current: &DbSnapshot,
) -> Option<Transition> {
    let prior = prior?;
    let prior_at = DateTime::parse_from_rfc3339(&prior.created_at).ok()?;
    let current_at = DateTime::parse_from_rfc3339(&current.created_at).ok()?;
    let age = current_at.signed_duration_since(prior_at);
    if age.num_hours() >= TRANSITION_LOOKBACK_HOURS {
        return None;
    }

    let from = HealthCategory::parse(&prior.category);
    let to = HealthCategory::parse(&current.category);
    if from == to {
        return None;
    }
    Some(Transition {
        account_id: current.account_id.clone(),
        from,
        to,
        at: current.created_at.clone(),
    })
}

fn ordinal_average(snapshots: &[&DbSnapshot]) -> f64 {
    if snapshots.is_empty() {
        return 0.0;
    }
    let sum: i32 = snapshots
        .iter()
        .map(|s| HealthCategory::parse(&s.category).ordinal())
        .sum();
    sum as f64 / snapshots.len() as f64
}

/// Trend over one account's snapshot window, oldest first. The last 7
/// entries form the recent sub-window; up to 7 entries before those form
/// the older one.
pub fn windowed_trend(snapshots: &[DbSnapshot]) -> TrendLabel {
    if snapshots.len() < 2 {
        return TrendLabel::Unknown;
    }

    let recent_start = snapshots.len().saturating_sub(7);
    let older_start = recent_start.saturating_sub(7);
    let recent: Vec<&DbSnapshot> = snapshots[recent_start..].iter().collect();
    let older: Vec<&DbSnapshot> = if recent_start > 0 {
        snapshots[older_start..recent_start].iter().collect()
    } else {
        // Short history: compare the newer half against the older half.
        let mid = snapshots.len() / 2;
        return compare_averages(
            ordinal_average(&snapshots[mid..].iter().collect::<Vec<_>>()),
            ordinal_average(&snapshots[..mid].iter().collect::<Vec<_>>()),
        );
    };

    compare_averages(ordinal_average(&recent), ordinal_average(&older))
}

fn compare_averages(recent: f64, older: f64) -> TrendLabel {
    if recent - older > TREND_EPSILON {
        TrendLabel::Improving
    } else if older - recent > TREND_EPSILON {
        TrendLabel::Declining
    } else {
        TrendLabel::Stable
    }
}

/// All transitions within one account's snapshot sequence, scanning
/// consecutive pairs under the same 24h rule as [`detect_transition`].
pub fn transitions_in_sequence(snapshots: &[DbSnapshot]) -> Vec<Transition> {
    snapshots
        .windows(2)
        .filter_map(|pair| detect_transition(Some(&pair[0]), &pair[1]))
        .collect()
}

/// Portfolio-wide trend over a period's transitions: improving when
/// upgrades exceed downgrades by 50%, symmetric for declining.
pub fn portfolio_trend(transitions: &[Transition]) -> TrendLabel {
    let upgrades = transitions.iter().filter(|t| t.is_upgrade()).count() as f64;
    let downgrades = transitions.iter().filter(|t| t.is_downgrade()).count() as f64;

    if upgrades > downgrades * 1.5 {
        TrendLabel::Improving
    } else if downgrades > upgrades * 1.5 {
        TrendLabel::Declining
    } else {
        TrendLabel::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(account_id: &str, category: &str, created_at: &str) -> DbSnapshot {
        DbSnapshot {
            id: format!("snap-{}-{}", account_id, created_at),
            account_id: account_id.to_string(),
            category: category.to_string(),
            score: 50,
            mrr: 500.0,
            usage_30d: 10,
            days_since_login: Some(1),
            risk_signals: Some("[]".to_string()),
            positive_signals: Some("[]".to_string()),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_transition_detected_within_24h() {
        let prior = snapshot("acme", "green", "2026-03-01T09:00:00Z");
        let current = snapshot("acme", "red", "2026-03-02T08:00:00Z");
        let transition = detect_transition(Some(&prior), &current).expect("transition");
        assert_eq!(transition.from, HealthCategory::Green);
        assert_eq!(transition.to, HealthCategory::Red);
        assert!(transition.is_downgrade());
    }

    #[test]
    fn test_stale_prior_snapshot_is_ignored() {
        let prior = snapshot("acme", "green", "2026-03-01T09:00:00Z");
        let current = snapshot("acme", "red", "2026-03-03T10:00:00Z");
        assert!(detect_transition(Some(&prior), &current).is_none());
    }

    #[test]
    fn test_no_transition_when_category_unchanged() {
        let prior = snapshot("acme", "yellow", "2026-03-01T09:00:00Z");
        let current = snapshot("acme", "yellow", "2026-03-02T08:00:00Z");
        assert!(detect_transition(Some(&prior), &current).is_none());
        assert!(detect_transition(None, &current).is_none());
    }

    #[test]
    fn test_improving_sequence() {
        // red, red, yellow, yellow, green — strictly improving ordinals.
        let snapshots: Vec<DbSnapshot> = ["red", "red", "yellow", "yellow", "green"]
            .iter()
            .enumerate()
            .map(|(i, c)| snapshot("acme", c, &format!("2026-03-0{}T09:00:00Z", i + 1)))
            .collect();
        assert_eq!(windowed_trend(&snapshots), TrendLabel::Improving);
    }

    #[test]
    fn test_declining_sequence() {
        let snapshots: Vec<DbSnapshot> = ["green", "green", "yellow", "red", "red"]
            .iter()
            .enumerate()
            .map(|(i, c)| snapshot("acme", c, &format!("2026-03-0{}T09:00:00Z", i + 1)))
            .collect();
        assert_eq!(windowed_trend(&snapshots), TrendLabel::Declining);
    }

    #[test]
    fn test_flat_sequence_is_stable() {
        let snapshots: Vec<DbSnapshot> = (1..=6)
            .map(|i| snapshot("acme", "yellow", &format!("2026-03-0{}T09:00:00Z", i)))
            .collect();
        assert_eq!(windowed_trend(&snapshots), TrendLabel::Stable);
    }

    #[test]
    fn test_single_snapshot_is_unknown() {
        let snapshots = vec![snapshot("acme", "green", "2026-03-01T09:00:00Z")];
        assert_eq!(windowed_trend(&snapshots), TrendLabel::Unknown);
        assert_eq!(windowed_trend(&[]), TrendLabel::Unknown);
    }

    #[test]
    fn test_long_history_uses_sub_windows() {
        // 14 entries: 7 old reds then 7 recent greens.
        let mut snapshots = Vec::new();
        for i in 0..7 {
            snapshots.push(snapshot("acme", "red", &format!("2026-03-{:02}T09:00:00Z", i + 1)));
        }
        for i in 7..14 {
            snapshots.push(snapshot("acme", "green", &format!("2026-03-{:02}T09:00:00Z", i + 1)));
        }
        assert_eq!(windowed_trend(&snapshots), TrendLabel::Improving);
    }

    #[test]
    fn test_transitions_in_sequence_respects_gap_rule() {
        let snapshots = vec![
            snapshot("acme", "green", "2026-03-01T09:00:00Z"),
            snapshot("acme", "yellow", "2026-03-02T08:00:00Z"),
            // Three-day gap: yellow -> red is too stale to count.
            snapshot("acme", "red", "2026-03-05T08:00:00Z"),
            snapshot("acme", "yellow", "2026-03-06T07:00:00Z"),
        ];
        let transitions = transitions_in_sequence(&snapshots);
        assert_eq!(transitions.len(), 2);
        assert!(transitions[0].is_downgrade());
        assert!(transitions[1].is_upgrade());
    }

    fn transition(from: HealthCategory, to: HealthCategory) -> Transition {
        Transition {
            account_id: "acme".to_string(),
            from,
            to,
            at: "2026-03-01T09:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_portfolio_trend_labels() {
        use HealthCategory::{Green, Red, Yellow};

        let up = transition(Yellow, Green);
        let down = transition(Green, Red);

        // 2 upgrades vs 1 downgrade clears the 50% margin (2 > 1.5)
        assert_eq!(
            portfolio_trend(&[up.clone(), up.clone(), down.clone()]),
            TrendLabel::Improving
        );
        assert_eq!(
            portfolio_trend(&[down.clone(), down.clone(), up.clone()]),
            TrendLabel::Declining
        );
        assert_eq!(portfolio_trend(&[up, down]), TrendLabel::Stable);
        assert_eq!(portfolio_trend(&[]), TrendLabel::Stable);
    }
}
