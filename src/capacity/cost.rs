/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Maps a classified failure onto the number of capacity units a retry for it should cost.
//!
//! Throttling failures are charged differently from everything else: `LEGACY` mode charges
//! nothing for them (so a sustained stream of throttling responses never drains the bucket),
//! while `STANDARD` mode charges the same flat cost as any other retryable failure.

use crate::failure::{Failure, FailureClassifier};
use crate::mode::RetryMode;
use std::sync::Arc;

const DEFAULT_COST: u64 = 5;

/// Computes the capacity cost of retrying after a given failure.
#[derive(Clone)]
pub struct ExceptionCostCalculator {
    throttling_cost: Option<u64>,
    default_cost: u64,
    classifier: Arc<dyn FailureClassifier>,
}

impl std::fmt::Debug for ExceptionCostCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionCostCalculator")
            .field("throttling_cost", &self.throttling_cost)
            .field("default_cost", &self.default_cost)
            .finish()
    }
}

impl ExceptionCostCalculator {
    /// Build a calculator with explicit costs and classifier.
    pub fn new(
        throttling_cost: Option<u64>,
        default_cost: u64,
        classifier: Arc<dyn FailureClassifier>,
    ) -> Self {
        Self {
            throttling_cost,
            default_cost,
            classifier,
        }
    }

    /// Build the calculator matching `mode`'s defaults.
    ///
    /// `LEGACY` sets `throttling_cost` to `0` so a sustained stream of throttling failures never
    /// drains the bucket; `STANDARD` leaves `throttling_cost` unset, so throttling failures cost
    /// the same as any other retryable failure.
    pub fn for_mode(mode: RetryMode, classifier: Arc<dyn FailureClassifier>) -> Self {
        match mode {
            RetryMode::Legacy => Self::new(Some(0), DEFAULT_COST, classifier),
            RetryMode::Standard => Self::new(None, DEFAULT_COST, classifier),
        }
    }

    /// Compute the cost of retrying after `failure`.
    pub fn cost_of(&self, failure: &Failure) -> u64 {
        if self.classifier.is_throttling(failure) {
            if let Some(throttling_cost) = self.throttling_cost {
                return throttling_cost;
            }
        }
        self.default_cost
    }
}
