//! Fixed-window rate limiting keyed by client IP.

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::ChainConfig;
use crate::core::{FilterContext, Response};

use super::RequestFilter;

/// Outcome of a rate limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u64,
    /// Seconds until the current window resets.
    pub reset_after: u64,
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    hits: u64,
}

impl Window {
    fn open(now: Instant) -> Self {
        Self { opened: now, hits: 0 }
    }

    fn expired(&self, now: Instant, period: Duration) -> bool {
        now.saturating_duration_since(self.opened) >= period
    }

    fn hit(&mut self, now: Instant, limit: u64, period: Duration) -> Decision {
        if self.expired(now, period) {
            *self = Self::open(now);
        }

        let left = period.saturating_sub(now.saturating_duration_since(self.opened));
        let reset_after = left.as_secs().max(1);

        if self.hits >= limit {
            return Decision {
                allowed: false,
                remaining: 0,
                reset_after,
            };
        }

        self.hits += 1;
        Decision {
            allowed: true,
            remaining: limit - self.hits,
            reset_after,
        }
    }
}

struct Windows {
    by_client: HashMap<IpAddr, Window>,
    last_sweep: Instant,
}

impl Windows {
    /// Drop expired windows, at most once per `period`.
    fn sweep(&mut self, now: Instant, period: Duration) -> usize {
        if now.saturating_duration_since(self.last_sweep) < period {
            return 0;
        }
        self.last_sweep = now;

        let before = self.by_client.len();
        self.by_client.retain(|_, w| !w.expired(now, period));
        before - self.by_client.len()
    }
}

/// Request counters per client, one window each.
///
/// Clients whose window ran out are forgotten lazily as requests come in.
pub struct RateLimiter {
    windows: Mutex<Windows>,
    limit: u64,
    period: Duration,
}

impl RateLimiter {
    pub fn new(limit: u64, period: Duration) -> Self {
        Self {
            windows: Mutex::new(Windows {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            limit,
            period,
        }
    }

    /// Count a request from `ip` and decide whether it may proceed.
    pub fn check(&self, ip: IpAddr) -> Decision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Decision {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let dropped = windows.sweep(now, self.period);
        if dropped > 0 {
            tracing::trace!(dropped, "expired rate limit windows dropped");
        }

        windows
            .by_client
            .entry(ip)
            .or_insert_with(|| Window::open(now))
            .hit(now, self.limit, self.period)
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_client
            .len()
    }
}

/// Answers 429 once a client goes over `limit` requests in a window.
///
/// `X-RateLimit-*` headers are queued on every request, allowed or not.
pub struct RateLimitFilter {
    limiter: RateLimiter,
    limit: u64,
}

impl RateLimitFilter {
    pub fn new(limit: u64, window_secs: u64) -> Self {
        Self {
            limiter: RateLimiter::new(limit, Duration::from_secs(window_secs)),
            limit,
        }
    }

    /// `None` when `RATE_LIMIT` is unset.
    pub fn from_config(config: &ChainConfig) -> Option<Self> {
        let limit = config.rate_limit?;
        Some(Self::new(limit, config.rate_window))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl RequestFilter for RateLimitFilter {
    fn pre_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        let decision = self.limiter.check(ctx.client_ip);

        ctx.set_response_header("X-RateLimit-Limit", self.limit);
        ctx.set_response_header("X-RateLimit-Remaining", decision.remaining);
        ctx.set_response_header("X-RateLimit-Reset", decision.reset_after);

        if !decision.allowed {
            tracing::debug!(
                ip = %ctx.client_ip,
                limit = self.limit,
                reset = decision.reset_after,
                "rate limit exceeded"
            );
            ctx.set_response(Response::too_many_requests(decision.reset_after));
        }

        Ok(())
    }
}
