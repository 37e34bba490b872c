use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window request counter keyed by client address. In-process only, so
/// limits are per server instance.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request for `key` and reports whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Rate limiter lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        // Drop expired windows so the map does not grow without bound.
        windows.retain(|_, w| w.reset_at > now);

        let window = windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            reset_at: now + self.window,
        });

        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_and_resets_after_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("1.2.3.4", start));
        assert!(limiter.check_at("1.2.3.4", start));
        assert!(!limiter.check_at("1.2.3.4", start));
        assert!(limiter.check_at("5.6.7.8", start));

        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("1.2.3.4", later));
    }
}
