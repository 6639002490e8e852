//! Per-IP connection-attempt limiting.
//!
//! Fixed-window counter per client IP, checked before the gatekeeper runs.
//! Keeps credential-guessing reconnect loops from hammering the revocation
//! store and the user directory.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

struct WindowSlot {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct AdmissionLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, WindowSlot>>>,
    window: Duration,
    max_attempts: u32,
}

impl AdmissionLimiter {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_attempts,
        }
    }

    /// Record one connection attempt.  Returns `false` once the IP has used
    /// up its window budget.
    pub async fn allow(&self, ip: IpAddr) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let slot = windows.entry(ip).or_insert(WindowSlot {
            started: now,
            count: 0,
        });

        if now.duration_since(slot.started) >= self.window {
            slot.started = now;
            slot.count = 0;
        }

        slot.count += 1;
        if slot.count > self.max_attempts {
            warn!(ip = %ip, attempts = slot.count, "connection attempts rate limited");
            false
        } else {
            true
        }
    }

    /// Drop windows that have fully elapsed.
    pub async fn purge_stale(&self) {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        let now = Instant::now();
        windows.retain(|_, slot| now.duration_since(slot.started) < self.window);
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, "purged stale rate-limit windows");
        }
    }
}

impl Default for AdmissionLimiter {
    fn default() -> Self {
        // 60 attempts per 15 minutes, same window the platform uses for
        // auth endpoints.
        Self::new(Duration::from_secs(15 * 60), 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_budget() {
        let limiter = AdmissionLimiter::new(Duration::from_secs(60), 3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(limiter.allow(ip).await);
        }
        assert!(!limiter.allow(ip).await);
    }

    #[tokio::test]
    async fn ips_are_counted_independently() {
        let limiter = AdmissionLimiter::new(Duration::from_secs(60), 1);
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.allow(ip1).await);
        assert!(!limiter.allow(ip1).await);
        assert!(limiter.allow(ip2).await);
    }

    #[tokio::test]
    async fn elapsed_window_resets_the_count() {
        let limiter = AdmissionLimiter::new(Duration::from_millis(10), 1);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        assert!(limiter.allow(ip).await);
        assert!(!limiter.allow(ip).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(limiter.allow(ip).await);
    }

    #[tokio::test]
    async fn purge_drops_elapsed_windows() {
        let limiter = AdmissionLimiter::new(Duration::from_millis(10), 5);
        let ip: IpAddr = "10.1.1.1".parse().unwrap();
        limiter.allow(ip).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        limiter.purge_stale().await;

        assert!(limiter.windows.lock().await.is_empty());
    }
}
