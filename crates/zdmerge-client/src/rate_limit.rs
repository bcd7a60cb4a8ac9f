//! Call-budget enforcement for the Zendesk gateway.
//!
//! Three limits compose, all tuned to the support system's published API
//! quota:
//! - a concurrency cap (one call in flight, by default),
//! - a minimum gap between consecutive call admissions,
//! - a replenishing reservoir of calls per fixed window.
//!
//! Admission is FIFO: the semaphore is fair, and a call that would exceed
//! the reservoir or violate the spacing waits its turn, it is never
//! rejected. Time is read from the tokio clock so the limiter can be
//! exercised under `tokio::time::pause`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

/// Configuration for the shared call budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum gap between call admissions, in milliseconds (default: 600).
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Maximum calls in flight (default: 1).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,

    /// Calls admitted per window (default: 100).
    #[serde(default = "default_reservoir")]
    pub reservoir: u32,

    /// Window length in seconds (default: 60).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_min_interval_ms() -> u64 {
    600
}

fn default_max_concurrent() -> u32 {
    1
}

fn default_reservoir() -> u32 {
    100
}

fn default_refresh_interval_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            max_concurrent: default_max_concurrent(),
            reservoir: default_reservoir(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Set the minimum gap between call admissions.
    #[must_use]
    pub fn with_min_interval_ms(mut self, ms: u64) -> Self {
        self.min_interval_ms = ms;
        self
    }

    /// Set the reservoir size.
    #[must_use]
    pub fn with_reservoir(mut self, calls: u32) -> Self {
        self.reservoir = calls;
        self
    }

    /// Set the window length.
    #[must_use]
    pub fn with_refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Budget accounting shared by all callers.
struct BudgetState {
    /// Admission time of the most recent call.
    last_admitted: Option<Instant>,
    /// Start of the current reservoir window.
    window_start: Instant,
    /// Calls admitted in the current window.
    used_in_window: u32,
}

/// FIFO rate limiter combining a fair concurrency semaphore with spacing
/// and reservoir accounting.
pub struct RateLimiter {
    config: RateLimitConfig,
    semaphore: Arc<Semaphore>,
    state: Arc<Mutex<BudgetState>>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent as usize));
        let state = Arc::new(Mutex::new(BudgetState {
            last_admitted: None,
            window_start: Instant::now(),
            used_in_window: 0,
        }));
        Self {
            config,
            semaphore,
            state,
        }
    }

    /// Wait for admission. The returned guard holds the concurrency permit
    /// for the duration of the call; drop it when the call completes.
    pub async fn acquire(&self) -> Result<RateLimitGuard, RateLimitError> {
        // Fair semaphore: waiters are admitted in submission order.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RateLimitError::SemaphoreClosed)?;

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                if now.duration_since(state.window_start) >= self.config.refresh_interval() {
                    state.window_start = now;
                    state.used_in_window = 0;
                }

                let mut wait = Duration::ZERO;
                if state.used_in_window >= self.config.reservoir {
                    let window_end = state.window_start + self.config.refresh_interval();
                    wait = window_end.saturating_duration_since(now);
                }
                if let Some(last) = state.last_admitted {
                    let gap_end = last + self.config.min_interval();
                    wait = wait.max(gap_end.saturating_duration_since(now));
                }

                if wait.is_zero() {
                    state.used_in_window += 1;
                    state.last_admitted = Some(now);
                    trace!(
                        used_in_window = state.used_in_window,
                        "call admitted"
                    );
                    return Ok(RateLimitGuard { _permit: permit });
                }
                wait
            };

            debug!(wait_ms = wait.as_millis() as u64, "call budget exhausted, waiting");
            sleep(wait).await;
        }
    }

    /// Snapshot of the limiter state, for logging and tests.
    pub async fn stats(&self) -> RateLimitStats {
        let state = self.state.lock().await;
        RateLimitStats {
            available_permits: self.semaphore.available_permits() as u32,
            used_in_window: state.used_in_window,
        }
    }
}

/// Guard returned on admission; releases the concurrency permit on drop.
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

/// Limiter snapshot.
#[derive(Debug, Clone)]
pub struct RateLimitStats {
    /// Concurrency permits not currently held.
    pub available_permits: u32,
    /// Calls admitted in the current window.
    pub used_in_window: u32,
}

/// Limiter failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The semaphore was closed while a call was queued.
    #[error("rate limiter semaphore was closed")]
    SemaphoreClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex as AsyncMutex;

    fn fast_config() -> RateLimitConfig {
        RateLimitConfig::default()
            .with_min_interval_ms(0)
            .with_reservoir(10_000)
    }

    #[test]
    fn test_config_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.min_interval_ms, 600);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.reservoir, 100);
        assert_eq!(config.refresh_interval_secs, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_admissions() {
        let limiter = RateLimiter::new(
            RateLimitConfig::default()
                .with_min_interval_ms(600)
                .with_reservoir(10_000),
        );

        let mut admissions = Vec::new();
        for _ in 0..5 {
            let guard = limiter.acquire().await.unwrap();
            admissions.push(Instant::now());
            drop(guard);
        }

        for pair in admissions.windows(2) {
            assert!(
                pair[1].duration_since(pair[0]) >= Duration::from_millis(600),
                "admissions closer than the configured spacing"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservoir_caps_window() {
        let limiter = RateLimiter::new(
            RateLimitConfig::default()
                .with_min_interval_ms(0)
                .with_reservoir(3)
                .with_refresh_interval_secs(60),
        );

        let start = Instant::now();
        for _ in 0..3 {
            drop(limiter.acquire().await.unwrap());
        }
        // Reservoir drained within the same instant.
        assert!(Instant::now().duration_since(start) < Duration::from_secs(1));

        // The fourth call must wait for the next window.
        drop(limiter.acquire().await.unwrap());
        assert!(Instant::now().duration_since(start) >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_holds_during_call() {
        let limiter = Arc::new(RateLimiter::new(fast_config()));

        let first = limiter.acquire().await.unwrap();
        assert_eq!(limiter.stats().await.available_permits, 0);

        let contender = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let guard = limiter.acquire().await.unwrap();
                let at = Instant::now();
                drop(guard);
                at
            })
        };

        // Simulated call time while the permit is held.
        let release_at = Instant::now() + Duration::from_secs(5);
        sleep(Duration::from_secs(5)).await;
        drop(first);

        let admitted_at = contender.await.unwrap();
        assert!(admitted_at >= release_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_admission_order() {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitConfig::default()
                .with_min_interval_ms(100)
                .with_reservoir(10_000),
        ));
        let order = Arc::new(AsyncMutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for i in 0..4u32 {
            let limiter = limiter.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                // Stagger submissions so the queue order is deterministic.
                sleep(Duration::from_millis(u64::from(i))).await;
                let guard = limiter.acquire().await.unwrap();
                order.lock().await.push(i);
                drop(guard);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(*order.lock().await, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_reflect_window_usage() {
        let limiter = RateLimiter::new(fast_config());
        drop(limiter.acquire().await.unwrap());
        drop(limiter.acquire().await.unwrap());

        let stats = limiter.stats().await;
        assert_eq!(stats.used_in_window, 2);
        assert_eq!(stats.available_permits, 1);
    }
}
