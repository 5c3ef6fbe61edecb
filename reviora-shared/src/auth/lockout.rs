/// Failed-login lockout tracking for admin accounts
///
/// Counts consecutive failed login attempts per key (the lowercased account
/// email) inside a fixed window. Once the threshold is reached the key is
/// locked for the remainder of the window and login handlers respond with
/// 429 plus a `Retry-After` header. A successful login clears the counter.
///
/// State is kept in-process; windows are short enough that losing them on
/// restart is acceptable. Stale windows are dropped lazily on access and by
/// [`LockoutTracker::sweep`].
///
/// # Example
///
/// ```
/// use reviora_shared::auth::lockout::{LockoutPolicy, LockoutStatus, LockoutTracker};
///
/// let tracker = LockoutTracker::new(LockoutPolicy::default());
///
/// for _ in 0..4 {
///     tracker.record_failure("admin@example.com");
/// }
/// assert_eq!(tracker.check("admin@example.com"), LockoutStatus::Clear);
///
/// // Fifth failure trips the lock
/// let status = tracker.record_failure("admin@example.com");
/// assert!(matches!(status, LockoutStatus::Locked { .. }));
///
/// tracker.clear("admin@example.com");
/// assert_eq!(tracker.check("admin@example.com"), LockoutStatus::Clear);
/// ```
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lockout thresholds
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Failures within the window that trip the lock
    pub max_failures: u32,

    /// Window length, measured from the first failure
    pub window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        LockoutPolicy {
            max_failures: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Result of a lockout check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutStatus {
    /// Attempts are allowed
    Clear,

    /// Locked; retry after the given number of seconds
    Locked { retry_after_secs: u64 },
}

impl LockoutStatus {
    /// Whether this status blocks the attempt
    pub fn is_locked(&self) -> bool {
        matches!(self, LockoutStatus::Locked { .. })
    }
}

#[derive(Debug)]
struct FailureWindow {
    failures: u32,
    started: Instant,
}

/// In-process failed-attempt counter with fixed windows
#[derive(Debug)]
pub struct LockoutTracker {
    policy: LockoutPolicy,
    entries: Mutex<HashMap<String, FailureWindow>>,
}

impl LockoutTracker {
    /// Creates an empty tracker with the given policy
    pub fn new(policy: LockoutPolicy) -> Self {
        LockoutTracker {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether the key is currently locked
    ///
    /// Expired windows are removed on the way through.
    pub fn check(&self, key: &str) -> LockoutStatus {
        self.check_at(key, Instant::now())
    }

    /// Records a failed attempt and returns the resulting status
    ///
    /// A failure after the previous window expired starts a fresh window.
    pub fn record_failure(&self, key: &str) -> LockoutStatus {
        self.record_failure_at(key, Instant::now())
    }

    /// Clears the counter for a key after a successful login
    pub fn clear(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Drops expired windows and returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, window| !self.is_stale(window, now));
        before - entries.len()
    }

    fn check_at(&self, key: &str, now: Instant) -> LockoutStatus {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(window) if self.is_stale(window, now) => {
                entries.remove(key);
                LockoutStatus::Clear
            }
            Some(window) if window.failures >= self.policy.max_failures => {
                LockoutStatus::Locked {
                    retry_after_secs: self.remaining_secs(window, now),
                }
            }
            _ => LockoutStatus::Clear,
        }
    }

    fn record_failure_at(&self, key: &str, now: Instant) -> LockoutStatus {
        let mut entries = self.entries.lock().unwrap();
        let window = entries
            .entry(key.to_string())
            .or_insert_with(|| FailureWindow {
                failures: 0,
                started: now,
            });

        if now.duration_since(window.started) > self.policy.window {
            window.failures = 0;
            window.started = now;
        }

        window.failures += 1;

        if window.failures >= self.policy.max_failures {
            tracing::warn!(key, failures = window.failures, "Account locked out");
            LockoutStatus::Locked {
                retry_after_secs: self.remaining_secs(window, now),
            }
        } else {
            LockoutStatus::Clear
        }
    }

    fn is_stale(&self, window: &FailureWindow, now: Instant) -> bool {
        now.duration_since(window.started) > self.policy.window
    }

    fn remaining_secs(&self, window: &FailureWindow, now: Instant) -> u64 {
        let remaining = self
            .policy
            .window
            .saturating_sub(now.duration_since(window.started));
        // Round up so Retry-After never says 0 while still locked
        if remaining.subsec_nanos() > 0 {
            remaining.as_secs() + 1
        } else {
            remaining.as_secs().max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LockoutTracker {
        LockoutTracker::new(LockoutPolicy::default())
    }

    #[test]
    fn test_below_threshold_stays_clear() {
        let tracker = tracker();
        for _ in 0..4 {
            assert_eq!(
                tracker.record_failure("admin@example.com"),
                LockoutStatus::Clear
            );
        }
        assert_eq!(tracker.check("admin@example.com"), LockoutStatus::Clear);
    }

    #[test]
    fn test_fifth_failure_locks() {
        let tracker = tracker();
        let mut status = LockoutStatus::Clear;
        for _ in 0..5 {
            status = tracker.record_failure("admin@example.com");
        }

        match status {
            LockoutStatus::Locked { retry_after_secs } => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= 15 * 60);
            }
            LockoutStatus::Clear => panic!("expected lock after five failures"),
        }

        assert!(tracker.check("admin@example.com").is_locked());
    }

    #[test]
    fn test_clear_resets_counter() {
        let tracker = tracker();
        for _ in 0..5 {
            tracker.record_failure("admin@example.com");
        }
        assert!(tracker.check("admin@example.com").is_locked());

        tracker.clear("admin@example.com");

        assert_eq!(tracker.check("admin@example.com"), LockoutStatus::Clear);
        assert_eq!(
            tracker.record_failure("admin@example.com"),
            LockoutStatus::Clear
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = tracker();
        for _ in 0..5 {
            tracker.record_failure("first@example.com");
        }

        assert!(tracker.check("first@example.com").is_locked());
        assert_eq!(tracker.check("second@example.com"), LockoutStatus::Clear);
    }

    #[test]
    fn test_expired_window_unlocks() {
        let tracker = tracker();
        let t0 = Instant::now();
        for _ in 0..5 {
            tracker.record_failure_at("admin@example.com", t0);
        }
        assert!(tracker.check_at("admin@example.com", t0).is_locked());

        let later = t0 + Duration::from_secs(16 * 60);
        assert_eq!(
            tracker.check_at("admin@example.com", later),
            LockoutStatus::Clear
        );
    }

    #[test]
    fn test_stale_window_restarts_count() {
        let tracker = tracker();
        let t0 = Instant::now();
        for _ in 0..4 {
            tracker.record_failure_at("admin@example.com", t0);
        }

        // A failure after the window expired starts over at one
        let later = t0 + Duration::from_secs(16 * 60);
        assert_eq!(
            tracker.record_failure_at("admin@example.com", later),
            LockoutStatus::Clear
        );

        for _ in 0..3 {
            assert_eq!(
                tracker.record_failure_at("admin@example.com", later),
                LockoutStatus::Clear
            );
        }
        assert!(tracker
            .record_failure_at("admin@example.com", later)
            .is_locked());
    }

    #[test]
    fn test_retry_after_shrinks_over_time() {
        let tracker = tracker();
        let t0 = Instant::now();
        for _ in 0..5 {
            tracker.record_failure_at("admin@example.com", t0);
        }

        let mid = t0 + Duration::from_secs(10 * 60);
        match tracker.check_at("admin@example.com", mid) {
            LockoutStatus::Locked { retry_after_secs } => {
                assert!(retry_after_secs <= 5 * 60);
                assert!(retry_after_secs >= 4 * 60);
            }
            LockoutStatus::Clear => panic!("expected lock at ten minutes"),
        }
    }

    #[test]
    fn test_sweep_drops_stale_windows() {
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record_failure_at("old@example.com", t0);
        tracker.record_failure("fresh@example.com");

        // Backdate the first window past expiry
        {
            let mut entries = tracker.entries.lock().unwrap();
            let window = entries.get_mut("old@example.com").unwrap();
            window.started = t0
                .checked_sub(Duration::from_secs(20 * 60))
                .unwrap_or(window.started);
        }

        let removed = tracker.sweep();
        assert!(removed <= 1);
        assert_eq!(tracker.check("fresh@example.com"), LockoutStatus::Clear);
    }
}
