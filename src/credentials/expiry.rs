//! Expiration tracking with a safety window.

use chrono::{DateTime, Duration, Utc};

/// Margin subtracted from a reported expiration so credentials are refreshed
/// before they actually lapse (5 minutes).
pub const DEFAULT_EXPIRATION_WINDOW_SECS: i64 = 300;

/// [`DEFAULT_EXPIRATION_WINDOW_SECS`] as a duration.
pub fn default_expiration_window() -> Duration {
    Duration::seconds(DEFAULT_EXPIRATION_WINDOW_SECS)
}

/// Tracks when the currently held credential stops being usable.
///
/// The tracker stores the effective expiry, `expiration - window`, and
/// reports the credential as expired from that instant onwards. A tracker
/// that has never been given an expiration reports expired, since it holds
/// nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryTracker {
    expiration: Option<DateTime<Utc>>,
    window: Duration,
}

impl ExpiryTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            expiration: None,
            window: Duration::zero(),
        }
    }

    /// Record `expiration` as the absolute expiry, minus `window`.
    pub fn set_expiration(&mut self, expiration: DateTime<Utc>, window: Duration) {
        self.expiration = Some(expiration - window);
        self.window = window;
    }

    /// Returns true iff `now >= expiration - window`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(effective) => now >= effective,
            None => true,
        }
    }

    /// Same as [`is_expired_at`](Self::is_expired_at) with the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The effective expiry (reported expiration minus the window).
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// The window given to the last `set_expiration` call.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Forget the tracked expiration.
    pub fn clear(&mut self) {
        self.expiration = None;
    }
}

impl Default for ExpiryTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_tracker_is_expired() {
        let tracker = ExpiryTracker::new();
        assert!(tracker.is_expired());
        assert!(tracker.expiration().is_none());
    }

    #[test]
    fn test_boundary() {
        let mut tracker = ExpiryTracker::new();
        tracker.set_expiration(instant(), default_expiration_window());

        let edge = instant() - default_expiration_window();
        assert!(tracker.is_expired_at(edge));
        assert!(!tracker.is_expired_at(edge - Duration::seconds(1)));
        assert!(!tracker.is_expired_at(edge - Duration::nanoseconds(1)));
    }

    #[test]
    fn test_expired_for_all_later_instants() {
        let mut tracker = ExpiryTracker::new();
        let window = Duration::seconds(90);
        tracker.set_expiration(instant(), window);

        for offset in [-3600, -91, -90, -1, 0, 1, 3600] {
            let now = instant() + Duration::seconds(offset);
            assert_eq!(
                tracker.is_expired_at(now),
                now >= instant() - window,
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_expiration_reports_effective_instant() {
        let mut tracker = ExpiryTracker::new();
        tracker.set_expiration(instant(), default_expiration_window());

        assert_eq!(
            tracker.expiration(),
            Some(instant() - Duration::minutes(5))
        );
        assert_eq!(tracker.window(), Duration::minutes(5));

        tracker.clear();
        assert!(tracker.is_expired_at(instant() - Duration::hours(1)));
    }

    #[test]
    fn test_future_expiration_not_expired_now() {
        let mut tracker = ExpiryTracker::new();
        tracker.set_expiration(Utc::now() + Duration::hours(1), default_expiration_window());
        assert!(!tracker.is_expired());
    }
}
