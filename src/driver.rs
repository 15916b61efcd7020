/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Orchestrates a single request across attempts: dispatch, classify, decide, back off, repeat.

use crate::context::AttemptContext;
use crate::failure::{Failure, FailureKind};
use crate::policy::RetryPolicy;
use crate::sleep::{AsyncSleep, TokioSleep};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Dispatches a single attempt. Implemented by whatever layer above this crate actually knows
/// how to serialize, sign, and send a request over the wire.
pub trait AttemptExecutor<Response>: Debug + Send + Sync {
    /// Execute one attempt, given the per-attempt state accumulated so far.
    fn execute<'a>(
        &'a self,
        ctx: &'a AttemptContext,
    ) -> Pin<Box<dyn Future<Output = Result<Response, Failure>> + Send + 'a>>;
}

/// An optional collaborator that tracks clock skew between the caller and the service and
/// corrects backoff delays for it. The default implementation observes nothing and adjusts
/// nothing; clock-skew detection itself lives outside this crate.
pub trait ClockSkewAdjuster: Debug + Send + Sync {
    /// Inspect the attempt that was just completed (successful or not) and update whatever
    /// internal skew estimate this adjuster maintains.
    fn observe_response(&self, _ctx: &AttemptContext) {}

    /// Adjust a freshly computed backoff delay in light of the current skew estimate.
    fn adjust_delay(&self, delay: std::time::Duration) -> std::time::Duration {
        delay
    }
}

/// The no-op [`ClockSkewAdjuster`] used when no collaborator is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClockSkewAdjustment;

impl ClockSkewAdjuster for NoClockSkewAdjustment {}

/// The result of successfully driving a request to completion.
#[derive(Debug)]
pub struct DriverOutcome<Response> {
    /// The successful response.
    pub response: Response,
    /// The `<ttt>/<bbb>/<ccc>` retry-info header value for the attempt that succeeded.
    pub retry_info_header: String,
}

/// Runs the attempt loop for a single request against a fixed [`RetryPolicy`].
pub struct AttemptDriver {
    policy: Arc<RetryPolicy>,
    sleeper: Arc<dyn AsyncSleep>,
    clock_skew: Arc<dyn ClockSkewAdjuster>,
    cancellation: Option<CancellationToken>,
}

impl AttemptDriver {
    /// Build a driver over `policy`, sleeping via the tokio runtime and performing no clock-skew
    /// adjustment.
    pub fn new(policy: Arc<RetryPolicy>) -> Self {
        Self {
            policy,
            sleeper: Arc::new(TokioSleep),
            clock_skew: Arc::new(NoClockSkewAdjustment),
            cancellation: None,
        }
    }

    /// Override the sleep implementation, e.g. with a test double.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn AsyncSleep>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Supply a clock-skew adjustment collaborator.
    pub fn with_clock_skew_adjuster(mut self, adjuster: Arc<dyn ClockSkewAdjuster>) -> Self {
        self.clock_skew = adjuster;
        self
    }

    /// Supply a cancellation token; a backoff sleep in progress is aborted when it fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Drive `executor` through as many attempts as the policy allows, returning either the
    /// first successful response or the terminal failure.
    pub async fn run<Response>(
        &self,
        executor: &dyn AttemptExecutor<Response>,
    ) -> Result<DriverOutcome<Response>, Failure> {
        let mut ctx = AttemptContext::new();

        loop {
            if !self.policy.capacity().should_attempt_request(&mut ctx) {
                let cause = ctx
                    .last_failure()
                    .map(|f| Failure::new(f.kind(), f.to_string()))
                    .unwrap_or_else(|| Failure::new(FailureKind::ServiceTransient, "no prior failure on record"));
                return Err(cause.into_capacity_exceeded());
            }

            if ctx.attempt_number() > 1 {
                let is_throttling = ctx
                    .last_failure()
                    .is_some_and(|f| f.kind() == FailureKind::ServiceThrottling);
                let backoff = if is_throttling {
                    self.policy.throttling_backoff()
                } else {
                    self.policy.backoff()
                };
                let delay = self.clock_skew.adjust_delay(backoff.compute_delay_before_next_retry(&ctx));
                ctx.set_last_backoff_delay(delay);

                if !self.wait_or_cancel(delay).await {
                    return Err(Failure::new(FailureKind::Cancelled, "request cancelled during backoff"));
                }
            }

            ctx.set_retry_info_header(retry_info_header(&self.policy, &ctx));

            match executor.execute(&ctx).await {
                Ok(response) => {
                    self.clock_skew.observe_response(&ctx);
                    self.policy.capacity().request_succeeded(&ctx);
                    self.policy.retry_condition().request_succeeded(&ctx);
                    return Ok(DriverOutcome {
                        response,
                        retry_info_header: ctx.retry_info_header().to_string(),
                    });
                }
                Err(failure) => {
                    ctx.record_failure(failure);
                    self.clock_skew.observe_response(&ctx);

                    if !self.policy.retry_condition().should_retry(&ctx) {
                        return Err(ctx
                            .last_failure()
                            .map(|f| Failure::new(f.kind(), f.to_string()))
                            .expect("record_failure was just called"));
                    }

                    ctx.begin_next_attempt();
                }
            }
        }
    }

    /// Sleep for `delay`, returning `false` if the cancellation token fired first.
    async fn wait_or_cancel(&self, delay: std::time::Duration) -> bool {
        match &self.cancellation {
            None => {
                self.sleeper.sleep(delay).await;
                true
            }
            Some(token) => {
                tokio::select! {
                    _ = self.sleeper.sleep(delay) => true,
                    _ = token.cancelled() => false,
                }
            }
        }
    }
}

fn retry_info_header(policy: &RetryPolicy, ctx: &AttemptContext) -> String {
    let remaining = policy
        .capacity()
        .remaining_capacity()
        .map(|n| n.to_string())
        .unwrap_or_default();
    format!("{}/{}/{}", ctx.retries_attempted(), ctx.last_backoff_delay().as_millis(), remaining)
}
