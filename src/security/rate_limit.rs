//! Fixed-window rate limiting keyed by client identity.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::error::PipelineError;

/// Length of a counting window in seconds.
pub const WINDOW_SECS: u64 = 60;

/// Request count for one client within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Window start, aligned to a multiple of the window length.
    pub started_at: u64,
    pub count: u32,
}

/// Counts requests per client key in fixed, non-overlapping windows.
///
/// The increment-and-compare for a key runs while holding that key's map
/// shard, so concurrent requests from one client are never undercounted.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    ceiling: u32,
    window_secs: u64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// A limiter allowing `ceiling` requests per minute.
    pub fn new(ceiling: u32, clock: Arc<dyn Clock>) -> Self {
        Self::with_window(ceiling, WINDOW_SECS, clock)
    }

    pub fn with_window(ceiling: u32, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            ceiling,
            window_secs: window_secs.max(1),
            clock,
        }
    }

    fn window_start(&self, now: u64) -> u64 {
        now - now % self.window_secs
    }

    /// Count a request for `key`, failing once the ceiling is passed.
    pub fn check(&self, key: &str) -> Result<(), PipelineError> {
        let now = self.clock.now();
        let start = self.window_start(now);

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert(RateWindow {
                started_at: start,
                count: 0,
            });
        if window.started_at != start {
            *window = RateWindow {
                started_at: start,
                count: 0,
            };
        }
        window.count = window.count.saturating_add(1);

        if window.count > self.ceiling {
            Err(PipelineError::RateLimitExceeded {
                retry_after_secs: start + self.window_secs - now,
            })
        } else {
            Ok(())
        }
    }

    /// Current window for `key`, if one is tracked.
    pub fn window(&self, key: &str) -> Option<RateWindow> {
        self.windows.get(key).map(|r| *r.value())
    }

    /// Drop windows that ended before the current one. Returns how many.
    pub fn purge_expired(&self) -> usize {
        let start = self.window_start(self.clock.now());
        let before = self.windows.len();
        self.windows.retain(|_, window| window.started_at >= start);
        before - self.windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Purge stale windows once per window until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.window_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let purged = self.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = self.tracked_keys(), "Purged rate windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(ceiling: u32, start: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (RateLimiter::new(ceiling, clock.clone()), clock)
    }

    #[test]
    fn rejects_after_ceiling_until_window_rolls() {
        let (limiter, clock) = limiter(3, 600);

        for _ in 0..3 {
            assert!(limiter.check("ip:1.2.3.4").is_ok());
        }
        clock.advance(Duration::from_secs(20));
        assert_eq!(
            limiter.check("ip:1.2.3.4"),
            Err(PipelineError::RateLimitExceeded { retry_after_secs: 40 })
        );
        // every later request in the window is rejected too
        clock.advance(Duration::from_secs(39));
        assert!(limiter.check("ip:1.2.3.4").is_err());

        clock.advance(Duration::from_secs(1));
        assert!(limiter.check("ip:1.2.3.4").is_ok());
        assert_eq!(
            limiter.window("ip:1.2.3.4"),
            Some(RateWindow { started_at: 660, count: 1 })
        );
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _) = limiter(1, 0);
        assert!(limiter.check("ip:a").is_ok());
        assert!(limiter.check("ip:a").is_err());
        assert!(limiter.check("user:7").is_ok());
    }

    #[test]
    fn purges_stale_windows() {
        let (limiter, clock) = limiter(10, 0);
        limiter.check("a").unwrap();
        limiter.check("b").unwrap();
        clock.advance(Duration::from_secs(60));
        limiter.check("b").unwrap();

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.window("a").is_none());
    }

    #[test]
    fn concurrent_bursts_are_counted_exactly() {
        let (limiter, _) = limiter(200, 0);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..50).filter(|_| limiter.check("hot").is_ok()).count())
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(allowed, 200);
        assert_eq!(limiter.window("hot").unwrap().count, 400);
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let (limiter, _) = limiter(1, 0);
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(Arc::new(limiter).run_sweeper(rx));
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
