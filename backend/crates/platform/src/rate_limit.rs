//! Rate Limiting Infrastructure
//!
//! Fixed-window counters behind a storage trait, so the in-process
//! implementation can be swapped for a shared external store in
//! multi-instance deployments.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Rate limit configuration for one window
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Result of a counter increment
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Attempts recorded in the current window, including this one
    pub count: u32,
    /// Remaining window time in seconds, ceiling-rounded
    pub retry_after_secs: u64,
}

/// Trait for rate limit storage backends
///
/// Implementations must make the per-key increment atomic; concurrent
/// attempts must never undercount.
#[trait_variant::make(CounterStore: Send)]
pub trait LocalCounterStore {
    /// Increment the counter for `key` and report whether the attempt
    /// falls within the window limit.
    async fn increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now_ms: i64,
    ) -> RateLimitResult;
}

/// Increments between opportunistic eviction sweeps
const PRUNE_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at_ms: i64,
    /// Window length the key was counted under; elapsed entries are
    /// eviction candidates
    window_ms: i64,
}

/// In-process counter store
///
/// Fixed-window semantics: a counter resets to 1 the moment
/// `now - window_start >= window`. A burst straddling a window boundary can
/// see up to twice the limit; that imprecision is accepted, the counters are
/// a best-effort defense with no persistence guarantee.
///
/// Keys arrive from untrusted input (emails, forwarded origins), so elapsed
/// windows are swept out every [`PRUNE_EVERY`] increments; the map never
/// grows past the set of keys active inside their own windows.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<String, Window>>,
    increments: AtomicU64,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every window that elapsed before `now_ms`.
    ///
    /// Evicting an elapsed window is equivalent to the reset the next
    /// increment would perform, so this never loosens a live limit.
    pub fn prune(&self, now_ms: i64) {
        let mut counters = self.counters.lock().expect("counter lock poisoned");
        counters.retain(|_, w| now_ms - w.started_at_ms < w.window_ms);
    }

    /// Number of keys currently tracked (diagnostics)
    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().expect("counter lock poisoned").len()
    }
}

impl CounterStore for InMemoryCounterStore {
    async fn increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now_ms: i64,
    ) -> RateLimitResult {
        // Amortized eviction keeps the map bounded under attacker-chosen keys
        if self.increments.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune(now_ms);
        }

        let mut counters = self.counters.lock().expect("counter lock poisoned");

        let window = counters
            .entry(key.to_string())
            .and_modify(|w| {
                if now_ms - w.started_at_ms >= config.window_ms() {
                    // Window elapsed; this attempt starts a fresh one
                    w.count = 1;
                    w.started_at_ms = now_ms;
                    w.window_ms = config.window_ms();
                } else {
                    w.count = w.count.saturating_add(1);
                }
            })
            .or_insert(Window {
                count: 1,
                started_at_ms: now_ms,
                window_ms: config.window_ms(),
            });

        let remaining_ms = (window.started_at_ms + config.window_ms() - now_ms).max(0);

        RateLimitResult {
            allowed: window.count <= config.max_requests,
            count: window.count,
            retry_after_secs: ((remaining_ms + 999) / 1000) as u64,
        }
    }
}
