//! Small shared helpers.

/// Days between two RFC3339 timestamps, truncated toward zero.
/// Returns 0 when either side fails to parse.
pub fn days_between(earlier_iso: &str, later_iso: &str) -> i64 {
    let parse = |s: &str| {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .ok()
    };
    match (parse(earlier_iso), parse(later_iso)) {
        (Some(a), Some(b)) => (b - a).num_days(),
        _ => 0,
    }
}
