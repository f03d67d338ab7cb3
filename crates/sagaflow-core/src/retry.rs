//! Retry timing between step attempts.

use std::time::Duration;

/// Delay policy applied between failed attempts of a step.
///
/// The delay is fixed; jitter, when enabled, adds up to 25% on top.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Fixed delay without jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay, jitter: false }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after a failed attempt.
    pub fn next_delay(&self) -> Duration {
        if !self.jitter {
            return self.delay;
        }
        let base = self.delay.as_millis() as f64;
        Duration::from_millis((base + rand_jitter(base * 0.25)) as u64)
    }
}

/// Simple jitter in `[0, max)` using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / 1_000_000_000.0) * max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert!(!policy.jitter);
    }

    #[test]
    fn test_fixed_delay_does_not_escalate() {
        let policy = RetryPolicy::fixed(Duration::from_millis(200));
        for _ in 0..5 {
            assert_eq!(policy.next_delay(), Duration::from_millis(200));
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::fixed(Duration::from_millis(1000)).with_jitter(true);
        for _ in 0..20 {
            let delay = policy.next_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[test]
    fn test_rand_jitter_range() {
        for _ in 0..50 {
            let j = rand_jitter(100.0);
            assert!((0.0..100.0).contains(&j));
        }
    }
}
