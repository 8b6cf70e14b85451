//! Sliding-window rate limiter keyed by client identity
//!
//! Tracks request timestamps per client and admits or rejects against a
//! quota. Checking is a pure read (plus lazy pruning of stale entries);
//! usage is recorded separately, exactly once per admitted operation and
//! never on denial. Two independently configured instances exist in the
//! service: one for acquisition and a stricter one for stem separation.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use mediastem_common::types::LimitStatus;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    /// Per-client timestamp windows, sorted ascending, lazily pruned.
    /// The map-level mutex is held only for the short prune/append.
    windows: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Current status for a client. Prunes entries older than the
    /// window but does not count as usage.
    pub fn check(&self, client_key: &str) -> LimitStatus {
        let now = Utc::now();
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");
        let timestamps = windows.entry(client_key.to_string()).or_default();
        prune(timestamps, now, self.window);

        let used = timestamps.len() as u32;
        let reset_at = match timestamps.first() {
            Some(oldest) => *oldest + self.window,
            None => now + self.window,
        };

        LimitStatus {
            allowed: used < self.max_requests,
            remaining: self.max_requests.saturating_sub(used),
            total: self.max_requests,
            reset_at,
        }
    }

    /// Record one admitted operation for a client. Callers must have
    /// admitted the request via `check` first.
    pub fn record(&self, client_key: &str) {
        let now = Utc::now();
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");
        let timestamps = windows.entry(client_key.to_string()).or_default();
        prune(timestamps, now, self.window);
        timestamps.push(now);
    }
}

/// Drop entries older than `now - window`; retains ascending order.
fn prune(timestamps: &mut Vec<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
    let cutoff = now - window;
    timestamps.retain(|ts| *ts > cutoff);
}

/// Derive the rate-limit bucketing key for a request: the first entry of
/// `X-Forwarded-For` when present (the service commonly sits behind a
/// proxy), otherwise the socket peer address.
pub fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_after_quota_within_window() {
        let limiter = SlidingWindowLimiter::new(3, Duration::hours(1));

        for _ in 0..3 {
            assert!(limiter.check("203.0.113.5").allowed);
            limiter.record("203.0.113.5");
        }

        let status = limiter.check("203.0.113.5");
        assert!(!status.allowed);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.total, 3);
    }

    #[test]
    fn check_does_not_consume_quota() {
        let limiter = SlidingWindowLimiter::new(2, Duration::hours(1));
        for _ in 0..10 {
            assert!(limiter.check("client").allowed);
        }
        assert_eq!(limiter.check("client").remaining, 2);
    }

    #[test]
    fn window_elapse_restores_quota() {
        let limiter = SlidingWindowLimiter::new(2, Duration::milliseconds(50));
        limiter.record("client");
        limiter.record("client");
        assert!(!limiter.check("client").allowed);

        std::thread::sleep(std::time::Duration::from_millis(80));

        let status = limiter.check("client");
        assert!(status.allowed);
        assert_eq!(status.remaining, 2);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::hours(1));
        limiter.record("a");
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn reset_at_is_oldest_plus_window() {
        let limiter = SlidingWindowLimiter::new(10, Duration::hours(24));

        let before = Utc::now();
        for _ in 0..10 {
            limiter.record("203.0.113.5");
        }
        let after = Utc::now();

        let status = limiter.check("203.0.113.5");
        assert!(!status.allowed);
        assert_eq!(status.remaining, 0);
        // reset_at is the first recorded timestamp plus 24h
        assert!(status.reset_at >= before + Duration::hours(24));
        assert!(status.reset_at <= after + Duration::hours(24));
    }

    #[test]
    fn empty_window_resets_a_full_window_from_now() {
        let limiter = SlidingWindowLimiter::new(5, Duration::hours(1));
        let before = Utc::now();
        let status = limiter.check("fresh");
        let after = Utc::now();
        assert!(status.reset_at >= before + Duration::hours(1));
        assert!(status.reset_at <= after + Duration::hours(1));
    }

    #[test]
    fn concurrent_same_key_recording_keeps_count() {
        use std::sync::Arc;
        let limiter = Arc::new(SlidingWindowLimiter::new(1000, Duration::hours(1)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        limiter.record("shared");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(limiter.check("shared").remaining, 1000 - 400);
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let peer: SocketAddr = "192.0.2.1:4242".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.5, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, peer), "203.0.113.5");

        let empty = HeaderMap::new();
        assert_eq!(client_key(&empty, peer), "192.0.2.1");
    }
}
