//! Backoff schedule shared by the HTTP client and the scheduler.
//!
//! Delay for failure `n` (1-based) is `initial * multiplier^(n-1)`, capped at
//! `max`. With `max_retries: None` the schedule never runs out.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Failures tolerated before giving up. `None` = never give up.
    pub max_retries: Option<u32>,
    pub initial: Duration,
    pub max: Duration,
    /// `1.0` keeps the delay fixed.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(3),
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Same delay every time, retried forever.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_retries: None,
            initial: delay,
            max: delay,
            multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay after the `failures`-th consecutive failure, or `None` once
    /// the budget is spent.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if !self.should_retry(failures) {
            return None;
        }
        // exponent capped so unbounded schedules stay finite
        let exp = failures.saturating_sub(1).min(64) as i32;
        let grown = self.config.initial.as_secs_f64() * self.config.multiplier.powi(exp);
        let secs = grown.min(self.config.max.as_secs_f64());
        Some(Duration::from_millis((secs * 1_000.0).round() as u64))
    }

    pub fn should_retry(&self, failures: u32) -> bool {
        match self.config.max_retries {
            Some(max) => failures <= max,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_budget_spent() {
        let policy = RetryPolicy::new(BackoffConfig {
            max_retries: Some(3),
            initial: Duration::from_millis(100),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        });
        let delays: Vec<_> = (1..=4).map(|n| policy.next_delay(n)).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_millis(100)),
                Some(Duration::from_millis(200)),
                Some(Duration::from_millis(400)),
                None
            ]
        );
    }

    #[test]
    fn growth_stops_at_max() {
        let policy = RetryPolicy::new(BackoffConfig {
            max_retries: Some(10),
            initial: Duration::from_millis(100),
            max: Duration::from_millis(500),
            multiplier: 10.0,
        });
        assert_eq!(policy.next_delay(5), Some(Duration::from_millis(500)));
    }

    #[test]
    fn fixed_schedule_is_unbounded() {
        let policy = RetryPolicy::new(BackoffConfig::fixed(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(10_000), Some(Duration::from_secs(2)));
        assert!(policy.should_retry(u32::MAX));
    }

    #[test]
    fn huge_failure_count_stays_capped() {
        let policy = RetryPolicy::new(BackoffConfig {
            max_retries: None,
            max: Duration::from_secs(60),
            ..Default::default()
        });
        assert_eq!(policy.next_delay(u32::MAX), Some(Duration::from_secs(60)));
    }
}
