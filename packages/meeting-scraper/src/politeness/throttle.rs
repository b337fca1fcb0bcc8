//! Per-host minimum request interval.
//!
//! One governor limiter per host, shared by every source and agenda download
//! that targets that host.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use governor::{Quota, RateLimiter};
use tracing::debug;

use crate::config::SourceConfig;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Interval and limiter for one host. No limiter means no waiting.
#[derive(Clone)]
struct HostLimit {
    interval: Duration,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl HostLimit {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            limiter: limiter_for(interval),
        }
    }
}

/// Enforces a minimum interval between requests to the same host.
pub struct HostThrottle {
    limiters: Mutex<HashMap<String, HostLimit>>,
    /// Interval for hosts no source declared (agenda CDNs, document hosts)
    fallback_interval: Duration,
}

impl HostThrottle {
    pub fn new(fallback_interval: Duration) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            fallback_interval,
        }
    }

    /// No waiting at all. Useful in tests.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Build from configured sources. Hosts shared by several sources get the
    /// largest interval any of them asks for.
    pub fn from_sources(sources: &[SourceConfig]) -> Self {
        let mut intervals: HashMap<String, Duration> = HashMap::new();
        for source in sources {
            if let Some(host) = source.host() {
                let interval = Duration::from_millis(source.min_request_interval_ms);
                let entry = intervals.entry(host).or_insert(interval);
                *entry = (*entry).max(interval);
            }
        }

        let fallback = intervals.values().copied().max().unwrap_or(Duration::from_secs(1));
        let throttle = Self::new(fallback);
        {
            let mut limiters = throttle.lock();
            for (host, interval) in intervals {
                limiters.insert(host, HostLimit::new(interval));
            }
        }
        throttle
    }

    /// Wait until a request to `host` may be sent.
    pub async fn wait(&self, host: &str) {
        let limiter = self
            .lock()
            .entry(host.to_ascii_lowercase())
            .or_insert_with(|| HostLimit::new(self.fallback_interval))
            .limiter
            .clone();

        if let Some(limiter) = limiter {
            limiter.until_ready().await;
        }
    }

    /// Lengthen a host's interval (robots.txt `Crawl-delay`). Never shortens it.
    pub fn raise_interval(&self, host: &str, interval: Duration) {
        let mut limiters = self.lock();
        let entry = limiters
            .entry(host.to_ascii_lowercase())
            .or_insert_with(|| HostLimit::new(self.fallback_interval));
        if interval > entry.interval {
            debug!(host = %host, interval_ms = interval.as_millis() as u64, "Host interval raised");
            *entry = HostLimit::new(interval);
        }
    }

    /// Current interval for `host`, if it has been seen.
    pub fn interval(&self, host: &str) -> Option<Duration> {
        self.lock().get(&host.to_ascii_lowercase()).map(|l| l.interval)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, HostLimit>> {
        self.limiters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One permit per `interval`, no burst. Zero means unlimited.
fn limiter_for(interval: Duration) -> Option<Arc<DirectRateLimiter>> {
    Quota::with_period(interval)
        .map(|quota| quota.allow_burst(NonZeroU32::MIN))
        .map(|quota| Arc::new(RateLimiter::direct(quota)))
}
