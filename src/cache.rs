//! One-slot TTL cache for the dashboard aggregation.
//!
//! The clock is injected so expiry is testable without sleeping. The cache
//! is process-local; horizontally-scaled instances each hold their own
//! slot and may briefly disagree within one TTL.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Time source abstraction. Production uses [`SystemClock`]; tests inject
/// a manually-advanced clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct Slot<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

pub struct TtlCache<T> {
    slot: Mutex<Option<Slot<T>>>,
    ttl: Duration,
}

pub const DASHBOARD_TTL_SECONDS: i64 = 60;

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// The cached value, if present and not expired at `clock.now()`.
    pub fn get(&self, clock: &dyn Clock) -> Option<T> {
        let slot = self.slot.lock();
        let entry = slot.as_ref()?;
        if clock.now().signed_duration_since(entry.stored_at) < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, value: T, clock: &dyn Clock) {
        *self.slot.lock() = Some(Slot {
            value,
            stored_at: clock.now(),
        });
    }

    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    struct ManualClock {
        now: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        fn at(iso: &str) -> Self {
            ManualClock {
                now: RwLock::new(
                    DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Utc),
                ),
            }
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.write();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.read()
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = ManualClock::at("2026-03-01T00:00:00Z");
        let cache = TtlCache::new(Duration::seconds(60));

        assert!(cache.get(&clock).is_none());
        cache.put(42, &clock);
        clock.advance(59);
        assert_eq!(cache.get(&clock), Some(42));
    }

    #[test]
    fn test_expires_at_ttl() {
        let clock = ManualClock::at("2026-03-01T00:00:00Z");
        let cache = TtlCache::new(Duration::seconds(60));

        cache.put(42, &clock);
        clock.advance(60);
        assert!(cache.get(&clock).is_none());
    }

    #[test]
    fn test_put_refreshes_expiry() {
        let clock = ManualClock::at("2026-03-01T00:00:00Z");
        let cache = TtlCache::new(Duration::seconds(60));

        cache.put(1, &clock);
        clock.advance(50);
        cache.put(2, &clock);
        clock.advance(50);
        assert_eq!(cache.get(&clock), Some(2));
    }

    #[test]
    fn test_invalidate() {
        let clock = ManualClock::at("2026-03-01T00:00:00Z");
        let cache = TtlCache::new(Duration::seconds(60));
        cache.put(1, &clock);
        cache.invalidate();
        assert!(cache.get(&clock).is_none());
    }
}
