/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Whether a failed attempt should be retried at all, independent of admission control.

use crate::context::AttemptContext;
use crate::failure::FailureClassifier;
use std::fmt::Debug;
use std::sync::Arc;

/// A predicate deciding whether a failed request should be retried.
///
/// Composed via [`And`] rather than inheritance: the set of conditions a policy can express is
/// closed over conjunction of the variants this crate ships.
pub trait RetryCondition: Debug + Send + Sync {
    /// True if the request described by `ctx` (whose most recent attempt has already failed)
    /// should be retried.
    fn should_retry(&self, ctx: &AttemptContext) -> bool;

    /// Called once a request completes successfully, in case a condition tracks state across
    /// attempts. The default implementation does nothing.
    fn request_succeeded(&self, _ctx: &AttemptContext) {}
}

/// Retries until a fixed number of retries have been attempted.
#[derive(Debug, Clone, Copy)]
pub struct MaxNumberOfRetries(pub u32);

impl RetryCondition for MaxNumberOfRetries {
    fn should_retry(&self, ctx: &AttemptContext) -> bool {
        ctx.retries_attempted() < self.0
    }
}

/// Retries based on [`FailureClassifier::is_retryable`].
#[derive(Debug, Clone)]
pub struct DefaultClassifierCondition {
    classifier: Arc<dyn FailureClassifier>,
}

impl DefaultClassifierCondition {
    /// Build a condition delegating to `classifier`.
    pub fn new(classifier: Arc<dyn FailureClassifier>) -> Self {
        Self { classifier }
    }
}

impl RetryCondition for DefaultClassifierCondition {
    fn should_retry(&self, ctx: &AttemptContext) -> bool {
        ctx.last_failure()
            .is_some_and(|failure| self.classifier.is_retryable(failure))
    }
}

/// The conjunction of a list of conditions, short-circuiting on the first that refuses.
///
/// An empty list retries nothing, matching the behavior of [`Never`].
#[derive(Debug, Clone)]
pub struct And(pub Vec<Arc<dyn RetryCondition>>);

impl And {
    /// Build a conjunction over `conditions`, evaluated in order.
    pub fn new(conditions: Vec<Arc<dyn RetryCondition>>) -> Self {
        Self(conditions)
    }
}

impl RetryCondition for And {
    fn should_retry(&self, ctx: &AttemptContext) -> bool {
        !self.0.is_empty() && self.0.iter().all(|condition| condition.should_retry(ctx))
    }

    fn request_succeeded(&self, ctx: &AttemptContext) {
        for condition in &self.0 {
            condition.request_succeeded(ctx);
        }
    }
}

/// Never retries. Used by [`RetryPolicy::none`](crate::policy::RetryPolicy::none).
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl RetryCondition for Never {
    fn should_retry(&self, _ctx: &AttemptContext) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{DefaultFailureClassifier, Failure, FailureKind};

    #[test]
    fn max_number_of_retries_stops_at_the_limit() {
        let condition = MaxNumberOfRetries(2);
        let mut ctx = AttemptContext::new();
        assert!(condition.should_retry(&ctx));
        ctx.begin_next_attempt();
        assert!(condition.should_retry(&ctx));
        ctx.begin_next_attempt();
        assert!(!condition.should_retry(&ctx));
    }

    #[test]
    fn default_classifier_condition_defers_to_classifier() {
        let condition = DefaultClassifierCondition::new(Arc::new(DefaultFailureClassifier::new()));
        let mut ctx = AttemptContext::new();
        ctx.record_failure(Failure::new(FailureKind::ClientNonRetryable, "bad request"));
        assert!(!condition.should_retry(&ctx));

        ctx.record_failure(Failure::new(FailureKind::ServiceTransient, "try again"));
        assert!(condition.should_retry(&ctx));
    }

    #[test]
    fn and_short_circuits_and_requires_nonempty() {
        let always = Arc::new(MaxNumberOfRetries(u32::MAX));
        let never = Arc::new(Never);
        let combined = And::new(vec![always, never]);
        let ctx = AttemptContext::new();
        assert!(!combined.should_retry(&ctx));

        let empty = And::new(vec![]);
        assert!(!empty.should_retry(&ctx));
    }

    #[test]
    fn never_never_retries() {
        let ctx = AttemptContext::new();
        assert!(!Never.should_retry(&ctx));
    }
}
