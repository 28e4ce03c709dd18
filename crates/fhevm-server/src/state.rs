//! Server state: rate limiter and metrics handle

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::{RateLimitConfig, ServerConfig};

/// Per-client sliding-window limiter
///
/// Each client keeps the instants of its requests inside the window. A
/// request is admitted while fewer than `max_requests` remain.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    /// Idle clients are swept once this many are tracked
    prune_threshold: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

const DEFAULT_PRUNE_THRESHOLD: usize = 4096;

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Record a request from `client`; false when the client is over the limit
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if hits.len() >= self.prune_threshold && !hits.contains_key(client) {
            Self::retain_active(&mut hits, now, self.window);
        }
        let entry = hits.entry(client.to_string()).or_default();

        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) >= self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() >= self.max_requests {
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Drop clients with no requests inside the window
    pub fn prune(&self) {
        let now = Instant::now();
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::retain_active(&mut hits, now, self.window);
    }

    fn retain_active(hits: &mut HashMap<String, VecDeque<Instant>>, now: Instant, window: Duration) {
        hits.retain(|_, times| {
            times
                .back()
                .is_some_and(|last| now.duration_since(*last) < window)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.lock().map(|h| h.len()).unwrap_or(0)
    }
}

pub struct ServerState {
    pub config: ServerConfig,
    pub rate_limiter: Option<RateLimiter>,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::from_config(&config.rate_limit));

        Self {
            config,
            rate_limiter,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

pub type SharedState = Arc<ServerState>;

pub fn create_shared_state(config: ServerConfig) -> SharedState {
    Arc::new(ServerState::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_client() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));

        assert!(limiter.check_at("b", now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("a", start + Duration::from_secs(5)));
        assert!(!limiter.check_at("a", start + Duration::from_secs(9)));
        // first hit has aged out
        assert!(limiter.check_at("a", start + Duration::from_secs(10)));
        assert!(!limiter.check_at("a", start + Duration::from_secs(11)));
    }

    #[test]
    fn test_prune_keeps_active_clients() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        limiter.check("a");
        limiter.check("b");
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 2);

        let short = RateLimiter::new(5, Duration::ZERO);
        short.check("a");
        short.prune();
        assert_eq!(short.tracked_clients(), 0);
    }

    #[test]
    fn test_idle_clients_swept_without_prune_loop() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(10));
        limiter.prune_threshold = 3;
        let start = Instant::now();

        for client in ["a", "b", "c"] {
            assert!(limiter.check_at(client, start));
        }
        assert_eq!(limiter.tracked_clients(), 3);

        // a new client after the window has passed sweeps the stale ones
        assert!(limiter.check_at("d", start + Duration::from_secs(11)));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_disabled_limit_has_no_limiter() {
        let mut config = ServerConfig::default();
        config.rate_limit.enabled = false;
        assert!(ServerState::new(config).rate_limiter.is_none());
        assert!(ServerState::new(ServerConfig::default()).rate_limiter.is_some());
    }
}
