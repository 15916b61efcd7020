/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Computes how long to wait before dispatching the next attempt.

use crate::context::AttemptContext;
use std::fmt::Debug;
use std::time::Duration;

/// A strategy for computing the delay before the next retry attempt.
pub trait BackoffStrategy: Debug + Send + Sync {
    /// The delay to wait before dispatching the attempt described by `ctx`.
    fn compute_delay_before_next_retry(&self, ctx: &AttemptContext) -> Duration;
}

/// Never waits. Useful for `RetryPolicy::none()` and for tests that want deterministic timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl BackoffStrategy for NoBackoff {
    fn compute_delay_before_next_retry(&self, _ctx: &AttemptContext) -> Duration {
        Duration::ZERO
    }
}

/// Exponential backoff with full jitter: `delay = uniform(0, min(cap, base * 2^retries))`.
///
/// `fastrand`'s thread-local generator is used for the jitter draw, so this type is cheap to
/// share across attempts without coordinating a shared RNG.
#[derive(Debug, Clone, Copy)]
pub struct FullJitterBackoff {
    base: Duration,
    cap: Duration,
}

impl FullJitterBackoff {
    /// Build a backoff strategy with an explicit base and cap.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// The default backoff used for ordinary (non-throttling) retries: 100ms base, 20s cap.
    pub fn default_retry() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(20))
    }

    /// The default backoff used for throttling retries: 500ms base, 20s cap.
    pub fn default_throttling_retry() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(20))
    }
}

impl BackoffStrategy for FullJitterBackoff {
    fn compute_delay_before_next_retry(&self, ctx: &AttemptContext) -> Duration {
        // Exponent is `retries_attempted()` (1 on the first retry), one step more aggressive
        // than an exponent based on completed attempts minus one. Both read "prior attempts" at
        // the point the delay is computed; this crate counts from retries, not attempts.
        let retries = ctx.retries_attempted();
        let exponential = self
            .base
            .checked_mul(1u32.checked_shl(retries).unwrap_or(u32::MAX))
            .unwrap_or(self.cap);
        let bound = exponential.min(self.cap);
        let jittered_millis = fastrand::u64(0..=bound.as_millis() as u64);
        Duration::from_millis(jittered_millis)
    }
}
