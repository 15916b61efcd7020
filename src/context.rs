/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Per-attempt state, threaded through the condition, capacity, and backoff components by the
//! driver. All mutation is explicit: a component reads and writes this struct directly rather
//! than reaching into ambient state shared across attempts.

use crate::failure::Failure;
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

/// The amount of capacity acquired for the current attempt, stashed here by
/// [`RequestCapacity::should_attempt_request`](crate::capacity::RequestCapacity::should_attempt_request)
/// so that `request_succeeded` knows how much to release.
pub(crate) const LAST_ACQUIRED_KEY: &str = "retry_core.last_acquired";

/// A typed side-channel for components to stash per-attempt scratch data.
///
/// This is intentionally a small `HashMap<String, Box<dyn Any>>` rather than a set of dedicated
/// fields on [`AttemptContext`]: the core ships one consumer (the token bucket's last-acquired
/// amount) but the shape needs to stay open for a capacity implementation supplied by a caller.
#[derive(Default)]
pub struct Attributes(HashMap<String, Box<dyn Any + Send + Sync>>);

impl Attributes {
    fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, overwriting any previous value.
    pub fn put<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.0.insert(key.to_string(), Box::new(value));
    }

    /// Retrieve a previously stored value of type `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.0.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Remove and return a previously stored value of type `T`.
    pub fn take<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.0.remove(key).and_then(|v| v.downcast::<T>().ok()).map(|b| *b)
    }
}

impl std::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attributes")
            .field("keys", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-request, per-attempt state. Created before attempt 1 by the
/// [`AttemptDriver`](crate::driver::AttemptDriver), mutated only by the driver, and dropped when
/// the request terminates.
#[derive(Debug)]
pub struct AttemptContext {
    attempt_number: u32,
    last_failure: Option<Failure>,
    last_response_status: Option<u16>,
    last_backoff_delay: Duration,
    retry_info_header: String,
    attributes: Attributes,
}

impl AttemptContext {
    /// Construct the context for the first attempt (`attempt_number == 1`).
    pub fn new() -> Self {
        Self {
            attempt_number: 1,
            last_failure: None,
            last_response_status: None,
            last_backoff_delay: Duration::ZERO,
            retry_info_header: String::new(),
            attributes: Attributes::new(),
        }
    }

    /// The current attempt number; `1` for the first attempt.
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// The number of retries attempted so far: `max(0, attempt_number - 1)`.
    pub fn retries_attempted(&self) -> u32 {
        self.attempt_number.saturating_sub(1)
    }

    /// The most recent failure, if any attempt has failed yet.
    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    /// The status code of the most recent response, if one was received.
    pub fn last_response_status(&self) -> Option<u16> {
        self.last_response_status
    }

    /// The backoff delay computed before the current attempt (`0` on the first attempt).
    pub fn last_backoff_delay(&self) -> Duration {
        self.last_backoff_delay
    }

    /// The `<retries>/<backoff-ms>/<remaining-capacity>` value computed for the current attempt,
    /// to be attached to the outgoing request before dispatch.
    pub fn retry_info_header(&self) -> &str {
        &self.retry_info_header
    }

    /// The per-attempt attribute side-channel.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Mutable access to the per-attempt attribute side-channel.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub(crate) fn begin_next_attempt(&mut self) {
        self.attempt_number += 1;
    }

    pub(crate) fn record_failure(&mut self, failure: Failure) {
        self.last_response_status = failure.status_code();
        self.last_failure = Some(failure);
    }

    pub(crate) fn record_success(&mut self, status: Option<u16>) {
        self.last_failure = None;
        self.last_response_status = status;
    }

    pub(crate) fn set_last_backoff_delay(&mut self, delay: Duration) {
        self.last_backoff_delay = delay;
    }

    pub(crate) fn set_retry_info_header(&mut self, header: String) {
        self.retry_info_header = header;
    }
}

impl Default for AttemptContext {
    fn default() -> Self {
        Self::new()
    }
}
