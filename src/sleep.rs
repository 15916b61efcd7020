/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! An abstraction over "wait this long," so the driver does not depend on a particular async
//! runtime, plus cancellation support for callers that want to abandon an in-progress backoff.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A future that resolves after its sleep has elapsed. Boxed so [`AsyncSleep`] implementations
/// don't need to name a concrete future type.
pub struct Sleep(Pin<Box<dyn Future<Output = ()> + Send>>);

impl Sleep {
    /// Wrap an arbitrary future as a `Sleep`.
    pub fn new(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Self(Box::pin(future))
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

/// A source of [`Sleep`] futures, abstracting over the async runtime in use.
pub trait AsyncSleep: Debug + Send + Sync {
    /// Produce a future that resolves after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// An [`AsyncSleep`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

impl AsyncSleep for TokioSleep {
    fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::new(tokio::time::sleep(duration))
    }
}
