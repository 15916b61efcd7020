/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Client-side retry and admission control.
//!
//! This crate decides, for a single logical request, how many times to retry it, how long to
//! wait between attempts, and whether a retry should be admitted at all given a shared capacity
//! budget. It does not send requests, sign them, or parse responses — an [`driver::AttemptExecutor`]
//! supplied by the caller does that.
//!
//! The pieces, roughly bottom-up:
//!
//! - [`capacity`]: a lock-free bounded counter and the policies built on it.
//! - [`failure`]: the closed set of failure kinds the core reasons about, and the classifier
//!   interface that turns a protocol-specific error into one.
//! - [`mode`]: `LEGACY` vs `STANDARD`, and how the effective mode is resolved.
//! - [`backoff`]: delay computation between attempts.
//! - [`condition`]: whether a failed attempt should be retried at all.
//! - [`policy`]: bundles the above into one immutable, shareable [`policy::RetryPolicy`].
//! - [`sleep`]: a runtime-agnostic sleep abstraction.
//! - [`driver`]: the attempt loop itself.

pub mod backoff;
pub mod capacity;
pub mod condition;
pub mod context;
pub mod driver;
pub mod error;
pub mod failure;
pub mod mode;
pub mod policy;
pub mod sleep;

pub use context::AttemptContext;
pub use driver::{AttemptDriver, AttemptExecutor, DriverOutcome};
pub use error::RetryCoreError;
pub use failure::{DefaultFailureClassifier, Failure, FailureClassifier, FailureKind};
pub use mode::RetryMode;
pub use policy::{RetryPolicy, RetryPolicyBuilder};
