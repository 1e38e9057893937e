use crate::config::ThrottleConfig;
use std::time::{Duration, Instant};

/// Shared request-pacing state of the rate-limited client
///
/// The minimum spacing between two requests is `base_delay + adaptive_delay`.
/// The adaptive part starts at `base_delay` and widens as anti-bot responses
/// (HTTP 406/429) are observed, then relaxes again as clean responses accumulate.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    /// Fixed per-run base delay
    pub base_delay: Duration,

    /// Current adaptive component of the spacing
    pub adaptive_delay: Duration,

    /// Ceiling for `adaptive_delay`
    pub max_adaptive_delay: Duration,

    /// Anti-bot responses observed since the last decay
    pub recent_violation_count: u32,

    /// Clean responses observed over the lifetime of the client
    pub success_count: u64,

    /// Total anti-bot responses ever observed
    pub total_violations: u64,

    /// When the last request was issued
    pub last_request_time: Option<Instant>,

    decay_interval: u32,
    decay_amount: u32,
}

impl ThrottleState {
    /// Creates throttle state from configuration
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            base_delay: config.base_delay(),
            adaptive_delay: config.base_delay(),
            max_adaptive_delay: config.max_adaptive_delay(),
            recent_violation_count: 0,
            success_count: 0,
            total_violations: 0,
            last_request_time: None,
            decay_interval: config.decay_interval.max(1),
            decay_amount: config.decay_amount,
        }
    }

    /// Minimum spacing currently enforced between requests
    pub fn required_interval(&self) -> Duration {
        self.base_delay + self.adaptive_delay
    }

    /// Checks whether a request may be issued at `now`
    pub fn can_request(&self, now: Instant) -> bool {
        self.time_until_next_request(now).is_none()
    }

    /// Time left before the next request may be issued
    ///
    /// Returns None if a request can be made now.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        let required = self.required_interval();
        if elapsed < required {
            Some(required - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was issued
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Records an anti-bot response and widens the adaptive delay
    pub fn record_violation(&mut self) {
        self.recent_violation_count += 1;
        self.total_violations += 1;
        self.recompute();
        tracing::debug!(
            "Throttle widened: {} recent violations, adaptive delay {:?}",
            self.recent_violation_count,
            self.adaptive_delay
        );
    }

    /// Records a clean response; every `decay_interval` of them relaxes the throttle
    pub fn record_success(&mut self) {
        self.success_count += 1;
        if self.success_count % u64::from(self.decay_interval) == 0 {
            self.recent_violation_count =
                self.recent_violation_count.saturating_sub(self.decay_amount);
            self.recompute();
        }
    }

    /// Returns true if anti-bot responses were seen since the last decay
    pub fn has_recent_violations(&self) -> bool {
        self.recent_violation_count > 0
    }

    fn recompute(&mut self) {
        self.adaptive_delay =
            adaptive_delay_for(self.base_delay, self.recent_violation_count, self.max_adaptive_delay);
    }
}

/// `min(base * (1 + min(violations * 0.5, 4.0)), max)`
///
/// Computed in half-steps so the result is exact.
pub fn adaptive_delay_for(base: Duration, violations: u32, max: Duration) -> Duration {
    let half_steps = 2 + violations.min(8);
    (base * half_steps / 2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_ms: u64, max_ms: u64) -> ThrottleConfig {
        ThrottleConfig {
            request_delay_ms: base_ms,
            max_adaptive_delay_ms: max_ms,
            decay_interval: 100,
            decay_amount: 2,
        }
    }

    #[test]
    fn test_new_state() {
        let state = ThrottleState::new(&config(500, 5_000));
        assert_eq!(state.adaptive_delay, Duration::from_millis(500));
        assert_eq!(state.required_interval(), Duration::from_millis(1_000));
        assert!(state.can_request(Instant::now()));
    }

    #[test]
    fn test_spacing_enforced() {
        let mut state = ThrottleState::new(&config(500, 5_000));
        let now = Instant::now();
        state.record_request(now);

        assert!(!state.can_request(now + Duration::from_millis(999)));
        assert!(state.can_request(now + Duration::from_millis(1_000)));

        let wait = state
            .time_until_next_request(now + Duration::from_millis(400))
            .unwrap();
        assert_eq!(wait, Duration::from_millis(600));
    }

    #[test]
    fn test_violation_adjustment() {
        let mut state = ThrottleState::new(&config(500, 5_000));

        state.record_violation();
        assert_eq!(state.adaptive_delay, Duration::from_millis(750));

        state.record_violation();
        assert_eq!(state.adaptive_delay, Duration::from_millis(1_000));

        for _ in 0..10 {
            state.record_violation();
        }
        // factor is capped at 5x
        assert_eq!(state.adaptive_delay, Duration::from_millis(2_500));
    }

    #[test]
    fn test_adaptive_ceiling() {
        let mut state = ThrottleState::new(&config(1_000, 2_000));
        for _ in 0..8 {
            state.record_violation();
        }
        assert_eq!(state.adaptive_delay, Duration::from_millis(2_000));
    }

    #[test]
    fn test_decay_after_hundred_successes() {
        let mut state = ThrottleState::new(&config(500, 5_000));
        for _ in 0..3 {
            state.record_violation();
        }
        assert_eq!(state.recent_violation_count, 3);

        for _ in 0..99 {
            state.record_success();
        }
        assert_eq!(state.recent_violation_count, 3);

        state.record_success();
        assert_eq!(state.recent_violation_count, 1);
        assert_eq!(state.adaptive_delay, Duration::from_millis(750));

        for _ in 0..100 {
            state.record_success();
        }
        assert_eq!(state.recent_violation_count, 0);
        assert_eq!(state.adaptive_delay, Duration::from_millis(500));
        assert!(!state.has_recent_violations());
    }

    #[test]
    fn test_adaptive_delay_for() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(10);
        assert_eq!(adaptive_delay_for(base, 0, max), Duration::from_millis(100));
        assert_eq!(adaptive_delay_for(base, 4, max), Duration::from_millis(300));
        assert_eq!(adaptive_delay_for(base, 100, max), Duration::from_millis(500));
    }
}
