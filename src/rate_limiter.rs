// src/rate_limiter.rs
//! Sliding-window limiter for outbound JSON-RPC calls.
//!
//! Every permitted request leaves a timestamp in the window. Callers that find
//! the window full are delayed until the oldest timestamp ages out, never
//! rejected. One instance is shared (behind an `Arc`) by every transport that
//! talks to the same provider.

use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStats {
    pub remaining: usize,
    pub time_until_reset_ms: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    /// A capacity of zero would never admit anything, so it is raised to one.
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.timestamps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(window: Duration, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time left until `oldest` leaves the window.
    fn wait_for(&self, timestamps: &VecDeque<Instant>, now: Instant) -> Duration {
        match timestamps.front() {
            Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
            None => Duration::ZERO,
        }
    }

    /// Prunes expired timestamps and reports whether another request fits.
    pub fn can_admit(&self) -> bool {
        let mut timestamps = self.lock();
        Self::prune(self.window, &mut timestamps, Instant::now());
        timestamps.len() < self.capacity
    }

    /// Marks one request as issued now.
    pub fn record(&self) {
        self.lock().push_back(Instant::now());
    }

    /// Reserve-and-record in one critical section. On a full window returns
    /// how long the caller should sleep before trying again.
    fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut timestamps = self.lock();
        Self::prune(self.window, &mut timestamps, now);
        if timestamps.len() < self.capacity {
            timestamps.push_back(now);
            Ok(())
        } else {
            Err(self.wait_for(&timestamps, now))
        }
    }

    /// Waits until `can_admit` holds. Does not record; concurrent callers
    /// that also observed a free slot may overshoot by one until the next
    /// prune. Use [`RateLimiter::acquire`] to reserve atomically.
    pub async fn await_slot(&self) {
        loop {
            let wait = {
                let now = Instant::now();
                let mut timestamps = self.lock();
                Self::prune(self.window, &mut timestamps, now);
                if timestamps.len() < self.capacity {
                    return;
                }
                self.wait_for(&timestamps, now)
            };
            if !wait.is_zero() {
                debug!("rate limit reached, waiting {:?}", wait);
                sleep(wait).await;
            }
        }
    }

    /// Waits for a free slot and records it before any other caller can
    /// claim the same slot.
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) if !wait.is_zero() => {
                    debug!("rate limit reached, waiting {:?}", wait);
                    sleep(wait).await;
                }
                Err(_) => {}
            }
        }
    }

    pub fn remaining_quota(&self) -> usize {
        let mut timestamps = self.lock();
        Self::prune(self.window, &mut timestamps, Instant::now());
        self.capacity.saturating_sub(timestamps.len())
    }

    /// Zero when nothing has been recorded, otherwise the time until the
    /// oldest recorded request leaves the window.
    pub fn time_until_reset(&self) -> Duration {
        let timestamps = self.lock();
        self.wait_for(&timestamps, Instant::now())
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            remaining: self.remaining_quota(),
            time_until_reset_ms: self.time_until_reset().as_millis() as u64,
        }
    }

    /// Runs `request` once a slot has been reserved. The request's output,
    /// errors included, is returned untouched.
    pub async fn gated_fetch<F, Fut>(&self, request: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        self.acquire().await;
        request().await
    }
}
