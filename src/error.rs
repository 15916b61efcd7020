/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error types for the retry and admission-control core.

use crate::failure::Failure;
use thiserror::Error;

/// Errors raised by the retry core.
///
/// `InvalidArgument` and `InvalidConfig` are programmer errors: they are raised synchronously
/// at the offending call (a negative token amount, an unrecognized retry mode string) and are
/// never retried. `Failed` is the terminal, caller-facing error returned once a request's
/// [`AttemptDriver`](crate::driver::AttemptDriver) gives up, whether due to retry exhaustion,
/// an unretryable classification, or admission-control rejection.
#[derive(Debug, Error)]
pub enum RetryCoreError {
    /// A negative amount was passed to `try_acquire` or `release`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A retry mode string did not match a known `RetryMode` variant.
    #[error("invalid retry configuration: {0}")]
    InvalidConfig(String),

    /// The request terminated without success; carries the failure the caller should see.
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl RetryCoreError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
