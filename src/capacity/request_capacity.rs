/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Admission control: should this attempt be dispatched at all, independent of whether the
//! previous failure is itself classified retryable.

use crate::capacity::atomic::AtomicCapacity;
use crate::capacity::cost::ExceptionCostCalculator;
use crate::context::{AttemptContext, LAST_ACQUIRED_KEY};
use std::fmt::Debug;
use std::sync::Arc;

/// A "credit" released to the bucket when a request succeeds without ever needing a retry.
const SUCCESS_ON_FIRST_TRY_REFILL_AMOUNT: u64 = 1;

/// Admission-control policy bound to a [`RetryPolicy`](crate::policy::RetryPolicy).
///
/// The first attempt of every request is always admitted without consulting the bucket; only
/// retries (`attempt_number > 1`) are subject to admission control.
pub trait RequestCapacity: Debug + Send + Sync {
    /// Decide whether the attempt recorded in `ctx` may be dispatched, deducting capacity as a
    /// side effect when it is a retry and capacity is available.
    fn should_attempt_request(&self, ctx: &mut AttemptContext) -> bool;

    /// Called once a request completes successfully; releases capacity back to the bucket.
    fn request_succeeded(&self, ctx: &AttemptContext);

    /// The capacity remaining right now, or `None` if this policy is unbounded. Used to populate
    /// the retry-info header's third field.
    fn remaining_capacity(&self) -> Option<u64>;
}

/// Token-bucket backed admission control: attempt 1 is free, retries cost
/// [`ExceptionCostCalculator::cost_of`] units drawn from a shared [`AtomicCapacity`].
#[derive(Debug, Clone)]
pub struct TokenBucketCapacity {
    bucket: Arc<AtomicCapacity>,
    cost_calculator: ExceptionCostCalculator,
}

impl TokenBucketCapacity {
    /// Build a token-bucket capacity policy over a bucket of size `max`.
    pub fn new(max: u64, cost_calculator: ExceptionCostCalculator) -> Self {
        Self {
            bucket: Arc::new(AtomicCapacity::new(max)),
            cost_calculator,
        }
    }

    /// Build over an existing, possibly shared, bucket.
    pub fn with_bucket(bucket: Arc<AtomicCapacity>, cost_calculator: ExceptionCostCalculator) -> Self {
        Self { bucket, cost_calculator }
    }

    /// The bucket backing this policy, for diagnostics or sharing across policies.
    pub fn bucket(&self) -> &Arc<AtomicCapacity> {
        &self.bucket
    }
}

impl RequestCapacity for TokenBucketCapacity {
    fn should_attempt_request(&self, ctx: &mut AttemptContext) -> bool {
        if ctx.attempt_number() == 1 {
            return true;
        }

        let cost = ctx
            .last_failure()
            .map(|failure| self.cost_calculator.cost_of(failure))
            .unwrap_or(0);

        match self.bucket.try_acquire(cost) {
            Ok(Some(acquisition)) => {
                ctx.attributes_mut().put(LAST_ACQUIRED_KEY, acquisition.acquired);
                tracing::debug!(
                    attempt = ctx.attempt_number(),
                    cost,
                    remaining = acquisition.remaining,
                    "admission granted"
                );
                true
            }
            Ok(None) => {
                tracing::debug!(attempt = ctx.attempt_number(), cost, "admission denied: insufficient capacity");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "admission check failed");
                false
            }
        }
    }

    fn request_succeeded(&self, ctx: &AttemptContext) {
        let acquired = ctx.attributes().get::<u64>(LAST_ACQUIRED_KEY).copied();
        match acquired {
            None | Some(0) => {
                let _ = self.bucket.release(SUCCESS_ON_FIRST_TRY_REFILL_AMOUNT);
            }
            Some(amount) => {
                let _ = self.bucket.release(amount);
            }
        }
    }

    fn remaining_capacity(&self) -> Option<u64> {
        Some(self.bucket.current_capacity())
    }
}

/// A capacity policy with no bound: every attempt is admitted and successes are a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlimitedCapacity;

impl RequestCapacity for UnlimitedCapacity {
    fn should_attempt_request(&self, _ctx: &mut AttemptContext) -> bool {
        true
    }

    fn request_succeeded(&self, _ctx: &AttemptContext) {}

    fn remaining_capacity(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{DefaultFailureClassifier, Failure, FailureKind};
    use crate::mode::RetryMode;

    fn bucket_capacity(max: u64, mode: RetryMode) -> TokenBucketCapacity {
        TokenBucketCapacity::new(
            max,
            ExceptionCostCalculator::for_mode(mode, Arc::new(DefaultFailureClassifier::new())),
        )
    }

    #[test]
    fn first_attempt_is_always_free() {
        let capacity = bucket_capacity(0, RetryMode::Standard);
        let mut ctx = AttemptContext::new();
        assert_eq!(ctx.attempt_number(), 1);
        assert!(capacity.should_attempt_request(&mut ctx));
        assert_eq!(capacity.remaining_capacity(), Some(0));
    }

    #[test]
    fn retry_draws_from_bucket() {
        let capacity = bucket_capacity(10, RetryMode::Standard);
        let mut ctx = AttemptContext::new();
        ctx.begin_next_attempt();
        ctx.record_failure(Failure::new(FailureKind::ServiceTransient, "x"));
        assert!(capacity.should_attempt_request(&mut ctx));
        assert_eq!(capacity.remaining_capacity(), Some(5));
    }

    #[test]
    fn retry_denied_when_bucket_empty() {
        let capacity = bucket_capacity(3, RetryMode::Standard);
        let mut ctx = AttemptContext::new();
        ctx.begin_next_attempt();
        ctx.record_failure(Failure::new(FailureKind::ServiceTransient, "x"));
        assert!(!capacity.should_attempt_request(&mut ctx));
        assert_eq!(capacity.remaining_capacity(), Some(3));
    }

    #[test]
    fn success_after_retry_releases_acquired_amount() {
        let capacity = bucket_capacity(10, RetryMode::Standard);
        let mut ctx = AttemptContext::new();
        ctx.begin_next_attempt();
        ctx.record_failure(Failure::new(FailureKind::ServiceTransient, "x"));
        assert!(capacity.should_attempt_request(&mut ctx));
        ctx.record_success(Some(200));
        capacity.request_succeeded(&ctx);
        assert_eq!(capacity.remaining_capacity(), Some(10));
    }

    #[test]
    fn first_attempt_success_credits_one_token() {
        let capacity = bucket_capacity(10, RetryMode::Standard);
        let mut ctx = AttemptContext::new();
        // draw the bucket down so the credit is observable
        capacity.bucket.try_acquire(5).unwrap();
        assert!(capacity.should_attempt_request(&mut ctx));
        ctx.record_success(Some(200));
        capacity.request_succeeded(&ctx);
        assert_eq!(capacity.remaining_capacity(), Some(6));
    }

    #[test]
    fn legacy_mode_throttling_never_drains_bucket() {
        let capacity = bucket_capacity(500, RetryMode::Legacy);
        let mut ctx = AttemptContext::new();
        for _ in 0..1000 {
            ctx.begin_next_attempt();
            ctx.record_failure(Failure::new(FailureKind::ServiceThrottling, "slow down"));
            assert!(capacity.should_attempt_request(&mut ctx));
        }
        assert_eq!(capacity.remaining_capacity(), Some(500));
    }

    #[test]
    fn unlimited_capacity_always_admits() {
        let capacity = UnlimitedCapacity;
        let mut ctx = AttemptContext::new();
        ctx.begin_next_attempt();
        assert!(capacity.should_attempt_request(&mut ctx));
        assert_eq!(capacity.remaining_capacity(), None);
    }
}
