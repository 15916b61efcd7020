/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! An immutable, shareable bundle of the components that together decide whether, and how, to
//! retry a request.

use crate::backoff::{BackoffStrategy, FullJitterBackoff, NoBackoff};
use crate::capacity::{ExceptionCostCalculator, RequestCapacity, TokenBucketCapacity, UnlimitedCapacity};
use crate::condition::{And, DefaultClassifierCondition, MaxNumberOfRetries, Never, RetryCondition};
use crate::failure::{DefaultFailureClassifier, FailureClassifier};
use crate::mode::RetryMode;
use std::sync::Arc;

/// The default size of the shared token bucket backing a mode-derived policy's capacity.
const DEFAULT_INITIAL_CAPACITY: u64 = 500;

/// An immutable bundle of a retry condition, backoff strategies, and an admission-control
/// policy, built once and shared (via `Arc`) across every request a client issues.
#[derive(Clone)]
pub struct RetryPolicy {
    num_retries: u32,
    retry_condition: Arc<dyn RetryCondition>,
    backoff: Arc<dyn BackoffStrategy>,
    throttling_backoff: Arc<dyn BackoffStrategy>,
    capacity: Arc<dyn RequestCapacity>,
    mode: RetryMode,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("num_retries", &self.num_retries)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Two policies are equal if their externally observable scalar configuration matches. The
/// trait-object fields are not compared: two policies built with equivalent but distinct
/// collaborator instances (e.g. two separate `DefaultFailureClassifier`s) are still the same
/// policy in every way a caller can observe.
impl PartialEq for RetryPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.num_retries == other.num_retries && self.mode == other.mode
    }
}

impl RetryPolicy {
    /// Start building a policy for `mode`, pre-populated with that mode's defaults.
    pub fn builder(mode: RetryMode) -> RetryPolicyBuilder {
        RetryPolicyBuilder::new(mode)
    }

    /// A policy that never retries and never admits a retry attempt.
    pub fn none() -> Self {
        Self {
            num_retries: 0,
            retry_condition: Arc::new(Never),
            backoff: Arc::new(NoBackoff),
            throttling_backoff: Arc::new(NoBackoff),
            capacity: Arc::new(UnlimitedCapacity),
            mode: RetryMode::Legacy,
        }
    }

    /// The maximum number of retries (attempts beyond the first) this policy permits.
    pub fn num_retries(&self) -> u32 {
        self.num_retries
    }

    /// The condition deciding whether a failed attempt should be retried at all.
    pub fn retry_condition(&self) -> &Arc<dyn RetryCondition> {
        &self.retry_condition
    }

    /// The backoff strategy used for ordinary (non-throttling) retries.
    pub fn backoff(&self) -> &Arc<dyn BackoffStrategy> {
        &self.backoff
    }

    /// The backoff strategy used for throttling retries.
    pub fn throttling_backoff(&self) -> &Arc<dyn BackoffStrategy> {
        &self.throttling_backoff
    }

    /// The admission-control policy gating whether a retry may be dispatched at all.
    pub fn capacity(&self) -> &Arc<dyn RequestCapacity> {
        &self.capacity
    }

    /// The retry mode this policy was built for.
    pub fn mode(&self) -> RetryMode {
        self.mode
    }
}

/// Builds a [`RetryPolicy`], defaulting every component to what `mode` prescribes and allowing
/// each to be overridden individually.
pub struct RetryPolicyBuilder {
    mode: RetryMode,
    num_retries: Option<u32>,
    classifier: Arc<dyn FailureClassifier>,
    extra_condition: Option<Arc<dyn RetryCondition>>,
    backoff: Option<Arc<dyn BackoffStrategy>>,
    throttling_backoff: Option<Arc<dyn BackoffStrategy>>,
    capacity: Option<Arc<dyn RequestCapacity>>,
}

impl RetryPolicyBuilder {
    fn new(mode: RetryMode) -> Self {
        Self {
            mode,
            num_retries: None,
            classifier: Arc::new(DefaultFailureClassifier::new()),
            extra_condition: None,
            backoff: None,
            throttling_backoff: None,
            capacity: None,
        }
    }

    /// Override the maximum number of retries. Defaults to `mode.default_max_retries()`.
    pub fn num_retries(mut self, num_retries: u32) -> Self {
        self.num_retries = Some(num_retries);
        self
    }

    /// Override the failure classifier used by the default retry condition and the cost
    /// calculator. Defaults to [`DefaultFailureClassifier::new`].
    pub fn classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Add an additional condition that must also agree a failure is retryable, evaluated after
    /// the default classifier condition.
    pub fn extra_condition(mut self, condition: Arc<dyn RetryCondition>) -> Self {
        self.extra_condition = Some(condition);
        self
    }

    /// Override the ordinary-retry backoff strategy.
    pub fn backoff(mut self, backoff: Arc<dyn BackoffStrategy>) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Override the throttling-retry backoff strategy.
    pub fn throttling_backoff(mut self, backoff: Arc<dyn BackoffStrategy>) -> Self {
        self.throttling_backoff = Some(backoff);
        self
    }

    /// Override the admission-control policy. Defaults to a [`TokenBucketCapacity`] sized and
    /// costed per `mode`.
    pub fn capacity(mut self, capacity: Arc<dyn RequestCapacity>) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Finish building the policy.
    pub fn build(self) -> RetryPolicy {
        let num_retries = self.num_retries.unwrap_or_else(|| self.mode.default_max_retries());

        let mut conditions: Vec<Arc<dyn RetryCondition>> = vec![
            Arc::new(MaxNumberOfRetries(num_retries)),
            Arc::new(DefaultClassifierCondition::new(Arc::clone(&self.classifier))),
        ];
        if let Some(extra) = self.extra_condition {
            conditions.push(extra);
        }

        let capacity = self.capacity.unwrap_or_else(|| {
            Arc::new(TokenBucketCapacity::new(
                DEFAULT_INITIAL_CAPACITY,
                ExceptionCostCalculator::for_mode(self.mode, Arc::clone(&self.classifier)),
            ))
        });

        RetryPolicy {
            num_retries,
            retry_condition: Arc::new(And::new(conditions)),
            backoff: self.backoff.unwrap_or_else(|| Arc::new(FullJitterBackoff::default_retry())),
            throttling_backoff: self
                .throttling_backoff
                .unwrap_or_else(|| Arc::new(FullJitterBackoff::default_throttling_retry())),
            capacity,
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_defaults_match_mode() {
        let policy = RetryPolicy::builder(RetryMode::Legacy).build();
        assert_eq!(policy.num_retries(), 3);
        assert_eq!(policy.mode(), RetryMode::Legacy);
    }

    #[test]
    fn standard_defaults_match_mode() {
        let policy = RetryPolicy::builder(RetryMode::Standard).build();
        assert_eq!(policy.num_retries(), 2);
        assert_eq!(policy.mode(), RetryMode::Standard);
    }

    #[test]
    fn num_retries_override_is_honored() {
        let policy = RetryPolicy::builder(RetryMode::Standard).num_retries(10).build();
        assert_eq!(policy.num_retries(), 10);
    }

    #[test]
    fn none_policy_never_retries() {
        let policy = RetryPolicy::none();
        let mut ctx = crate::context::AttemptContext::new();
        ctx.begin_next_attempt();
        assert!(!policy.retry_condition().should_retry(&ctx));
        // Capacity is unlimited, not closed: `none()` stops retries via its condition, not by
        // refusing admission. A single attempt is always admitted.
        assert!(policy.capacity().should_attempt_request(&mut ctx));
    }

    #[test]
    fn equality_compares_scalar_configuration_only() {
        let a = RetryPolicy::builder(RetryMode::Standard).build();
        let b = RetryPolicy::builder(RetryMode::Standard).build();
        assert_eq!(a, b);
        let c = RetryPolicy::builder(RetryMode::Standard).num_retries(9).build();
        assert_ne!(a, c);
    }
}
