//! Per-tenant rate limiting for the retrieval stage.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use governor::Quota;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::{NoOpMiddleware, StateInformationMiddleware};
use governor::state::keyed::DefaultKeyedStateStore;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Checks between sweeps of keys whose state has fully replenished.
const SWEEP_EVERY: u64 = 1024;

type KeyedState<C> =
    governor::RateLimiter<String, DefaultKeyedStateStore<String>, C, StateInformationMiddleware>;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request was counted; `remaining` more fit in the current burst.
    Allowed { remaining: u32 },
    /// The key is out of capacity until `retry_after` elapses.
    Limited { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Decides whether a keyed request may proceed, counting it if so.
pub trait RateLimiter: Send + Sync {
    fn check_and_increment(&self, key: &str) -> Decision;
}

/// Allows bursts of `max_requests` per key, replenished evenly over `window`.
///
/// A key that stays idle for `window` gets its full burst back. Keys in that
/// state carry no information and are dropped every few checks, so the
/// state map only holds tenants that were active within the last window.
///
/// `max_requests == 0` refuses every request.
pub struct KeyedLimiter<C: Clock = DefaultClock> {
    state: Option<KeyedState<C>>,
    window: Duration,
    clock: C,
    checks: AtomicU64,
}

impl KeyedLimiter<DefaultClock> {
    /// Create a limiter on the process clock.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, DefaultClock::default())
    }

    /// Create a limiter from configuration.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }
}

impl<C: Clock> KeyedLimiter<C> {
    /// Create a limiter on an injected clock.
    pub fn with_clock(max_requests: u32, window: Duration, clock: C) -> Self {
        let state = NonZeroU32::new(max_requests).and_then(|burst| {
            let period = (window / burst.get()).max(Duration::from_nanos(1));
            Quota::with_period(period).map(|quota| {
                governor::RateLimiter::<_, _, C, NoOpMiddleware<C::Instant>>::new(
                    quota.allow_burst(burst),
                    DefaultKeyedStateStore::default(),
                    &clock,
                )
                .with_middleware::<StateInformationMiddleware>()
            })
        });

        Self {
            state,
            window,
            clock,
            checks: AtomicU64::new(0),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Drop keys whose capacity has fully replenished.
    pub fn retain_recent(&self) {
        if let Some(state) = &self.state {
            state.retain_recent();
            state.shrink_to_fit();
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.len())
    }
}

impl<C> RateLimiter for KeyedLimiter<C>
where
    C: Clock + Send + Sync,
    C::Instant: Send + Sync,
{
    fn check_and_increment(&self, key: &str) -> Decision {
        let Some(state) = &self.state else {
            debug!("Rate limited {key}: no requests allowed");
            return Decision::Limited {
                retry_after: self.window,
            };
        };

        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            state.retain_recent();
        }

        match state.check_key(&key.to_string()) {
            Ok(snapshot) => Decision::Allowed {
                remaining: snapshot.remaining_burst_capacity(),
            },
            Err(not_until) => {
                let retry_after = not_until.wait_time_from(self.clock.now());
                debug!("Rate limited {key} for {}ms", retry_after.as_millis());
                Decision::Limited { retry_after }
            }
        }
    }
}

/// A limiter that never limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn check_and_increment(&self, _key: &str) -> Decision {
        Decision::Allowed { remaining: u32::MAX }
    }
}
