//! Per-caller request throttling.
//!
//! Sliding window rate limiter keyed by caller identity (client address or
//! forwarded-for header). Consulted by the HTTP façade before a request ever
//! reaches the engine; the engine itself performs no throttling.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

use crate::types::{Error, Result, ThrottleConfig};

/// Burst accounting covers the most recent 10 seconds.
const BURST_WINDOW_SECONDS: i64 = 10;

/// Sliding window for tracking one caller's requests.
#[derive(Debug)]
struct SlidingWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
        }
    }

    /// Check the request against both limits and record it if allowed.
    fn check_and_record(&mut self, now: DateTime<Utc>, config: &ThrottleConfig) -> Result<()> {
        // Drop timestamps outside the minute window
        let minute_ago = now - Duration::minutes(1);
        while let Some(&ts) = self.timestamps.front() {
            if ts < minute_ago {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= config.requests_per_minute as usize {
            return Err(Error::quota_exceeded(format!(
                "rate limit exceeded: {} requests per minute",
                config.requests_per_minute
            )));
        }

        let burst_cutoff = now - Duration::seconds(BURST_WINDOW_SECONDS);
        let burst_count = self
            .timestamps
            .iter()
            .filter(|&&ts| ts >= burst_cutoff)
            .count();

        if burst_count >= config.burst_size as usize {
            return Err(Error::quota_exceeded(format!(
                "burst limit exceeded: {} requests per {} seconds",
                config.burst_size, BURST_WINDOW_SECONDS
            )));
        }

        self.timestamps.push_back(now);
        Ok(())
    }
}

/// Rate limiter - enforces per-caller request limits.
///
/// Not shared state by itself; the façade wraps it in a mutex.
#[derive(Debug)]
pub struct RateLimiter {
    config: ThrottleConfig,
    windows: HashMap<String, SlidingWindow>,
}

impl RateLimiter {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Check the caller's limits and record the request if allowed.
    pub fn allow(&mut self, caller: &str) -> Result<()> {
        let now = Utc::now();
        let window = self
            .windows
            .entry(caller.to_string())
            .or_insert_with(SlidingWindow::new);
        window.check_and_record(now, &self.config)
    }

    /// Requests recorded for a caller within the last minute.
    pub fn current_rate(&self, caller: &str) -> usize {
        match self.windows.get(caller) {
            Some(window) => {
                let minute_ago = Utc::now() - Duration::minutes(1);
                window
                    .timestamps
                    .iter()
                    .filter(|&&ts| ts >= minute_ago)
                    .count()
            }
            None => 0,
        }
    }

    /// Evict windows with no activity in the last minute. Returns the number
    /// of callers evicted.
    pub fn cleanup_expired(&mut self) -> usize {
        let minute_ago = Utc::now() - Duration::minutes(1);
        let before = self.windows.len();
        self.windows
            .retain(|_, window| window.timestamps.back().is_some_and(|&ts| ts >= minute_ago));
        before - self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rpm: u32, burst: u32) -> RateLimiter {
        RateLimiter::new(ThrottleConfig {
            requests_per_minute: rpm,
            burst_size: burst,
        })
    }

    #[test]
    fn test_allows_up_to_burst_then_rejects() {
        let mut limiter = limiter(100, 3);
        for _ in 0..3 {
            limiter.allow("10.0.0.1").unwrap();
        }
        let err = limiter.allow("10.0.0.1").unwrap_err();
        assert!(err.to_string().contains("burst limit exceeded"));
    }

    #[test]
    fn test_minute_limit_applies_before_burst_math() {
        let mut limiter = limiter(2, 100);
        limiter.allow("10.0.0.1").unwrap();
        limiter.allow("10.0.0.1").unwrap();
        let err = limiter.allow("10.0.0.1").unwrap_err();
        assert!(err.to_string().contains("requests per minute"));
    }

    #[test]
    fn test_callers_are_isolated() {
        let mut limiter = limiter(100, 1);
        limiter.allow("10.0.0.1").unwrap();
        limiter.allow("10.0.0.2").unwrap();
        assert!(limiter.allow("10.0.0.1").is_err());
        assert_eq!(limiter.current_rate("10.0.0.1"), 1);
        assert_eq!(limiter.current_rate("10.0.0.2"), 1);
        assert_eq!(limiter.current_rate("10.0.0.3"), 0);
    }

    #[test]
    fn test_cleanup_evicts_stale_windows_only() {
        let mut limiter = limiter(100, 10);
        limiter.allow("fresh").unwrap();

        // Hand-age a second caller's window past the minute boundary.
        let mut stale = SlidingWindow::new();
        stale
            .timestamps
            .push_back(Utc::now() - Duration::minutes(5));
        limiter.windows.insert("stale".to_string(), stale);

        assert_eq!(limiter.cleanup_expired(), 1);
        assert!(limiter.windows.contains_key("fresh"));
        assert!(!limiter.windows.contains_key("stale"));
    }
}
