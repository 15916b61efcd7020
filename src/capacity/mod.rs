/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Admission control: the bounded counter, the cost function over failures, and the policies
//! that combine them.

mod atomic;
mod cost;
mod request_capacity;

pub use atomic::{validate_amount, Acquisition, AtomicCapacity};
pub use cost::ExceptionCostCalculator;
pub use request_capacity::{RequestCapacity, TokenBucketCapacity, UnlimitedCapacity};
