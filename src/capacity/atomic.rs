/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A lock-free, bounded integer capacity counter.
//!
//! Capacity is held in a single `AtomicU64` cell and mutated only through a
//! load/compute/`compare_exchange` retry loop: no mutex, no semaphore, no held permits. A caller
//! that cannot currently be admitted simply sees `Ok(None)` and never blocks waiting for one that
//! can.

use crate::error::RetryCoreError;
use std::sync::atomic::{AtomicU64, Ordering};

/// The result of a successful [`AtomicCapacity::try_acquire`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    /// The amount actually acquired (equal to the requested amount unless it was `0`).
    pub acquired: u64,
    /// The capacity remaining immediately after this acquisition.
    pub remaining: u64,
}

/// A process-local, bounded counter in `[0, max]`, mutated only via compare-and-swap.
///
/// All mutations are linearizable: concurrent `try_acquire` calls for the same amount succeed
/// independently up to the point capacity is exhausted, at which point the first call that would
/// cross zero fails without decrementing anything. `release` saturates at `max`. Neither method
/// blocks; under contention both simply retry the CAS loop.
#[derive(Debug)]
pub struct AtomicCapacity {
    current: AtomicU64,
    max: u64,
}

impl AtomicCapacity {
    /// Create a new capacity starting (and capped) at `max`.
    pub fn new(max: u64) -> Self {
        Self {
            current: AtomicU64::new(max),
            max,
        }
    }

    /// The configured maximum capacity.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// The current capacity. Observational only: the value may change concurrently.
    pub fn current_capacity(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Attempt to acquire `n` units of capacity.
    ///
    /// `n == 0` always succeeds and reports the current capacity without mutating anything.
    /// Otherwise, returns `Ok(Some(acquisition))` if `n` units were available and have been
    /// deducted, or `Ok(None)` if fewer than `n` units were available (nothing is deducted in
    /// that case).
    pub fn try_acquire(&self, n: u64) -> Result<Option<Acquisition>, RetryCoreError> {
        if n == 0 {
            return Ok(Some(Acquisition {
                acquired: 0,
                remaining: self.current_capacity(),
            }));
        }

        let mut current = self.current.load(Ordering::SeqCst);
        loop {
            if current < n {
                return Ok(None);
            }
            let next = current - n;
            match self.current.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Ok(Some(Acquisition {
                        acquired: n,
                        remaining: next,
                    }))
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Release `n` units of capacity back, saturating at `max`.
    pub fn release(&self, n: u64) -> Result<(), RetryCoreError> {
        if n == 0 {
            return Ok(());
        }

        let mut current = self.current.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(n).min(self.max);
            if next == current {
                return Ok(());
            }
            match self.current.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }
}

/// Validate that a signed amount from a caller is a non-negative `u64`, rejecting negative
/// acquire/release amounts with `InvalidArgument`.
pub fn validate_amount(n: i64) -> Result<u64, RetryCoreError> {
    u64::try_from(n).map_err(|_| {
        RetryCoreError::invalid_argument(format!("amount must be non-negative, got {n}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_zero_never_mutates() {
        let capacity = AtomicCapacity::new(10);
        let before = capacity.current_capacity();
        let acquisition = capacity.try_acquire(0).unwrap().unwrap();
        assert_eq!(acquisition.acquired, 0);
        assert_eq!(acquisition.remaining, before);
        assert_eq!(capacity.current_capacity(), before);
    }

    #[test]
    fn acquire_and_release_round_trip() {
        let capacity = AtomicCapacity::new(10);
        let acquisition = capacity.try_acquire(4).unwrap().unwrap();
        assert_eq!(acquisition, Acquisition { acquired: 4, remaining: 6 });
        capacity.release(4).unwrap();
        assert_eq!(capacity.current_capacity(), 10);
    }

    #[test]
    fn acquire_beyond_capacity_fails_without_mutating() {
        let capacity = AtomicCapacity::new(3);
        assert!(capacity.try_acquire(5).unwrap().is_none());
        assert_eq!(capacity.current_capacity(), 3);
    }

    #[test]
    fn release_saturates_at_max() {
        let capacity = AtomicCapacity::new(10);
        capacity.release(1000).unwrap();
        assert_eq!(capacity.current_capacity(), 10);
    }

    #[test]
    fn release_at_max_is_a_no_op() {
        let capacity = AtomicCapacity::new(10);
        capacity.release(5).unwrap();
        assert_eq!(capacity.current_capacity(), 10);
    }

    #[test]
    fn validate_amount_rejects_negative() {
        assert!(validate_amount(-1).is_err());
        assert_eq!(validate_amount(7).unwrap(), 7);
    }

    #[test]
    fn concurrent_acquisitions_never_exceed_capacity() {
        const MAX: u64 = 5;
        const WORKERS: usize = 10;
        let capacity = Arc::new(AtomicCapacity::new(MAX));
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let capacity = Arc::clone(&capacity);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if let Some(acquisition) = capacity.try_acquire(1).unwrap() {
                            assert!(capacity.current_capacity() <= MAX);
                            thread::yield_now();
                            capacity.release(acquisition.acquired).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(capacity.current_capacity(), MAX);
    }

    #[test]
    fn never_observes_negative_or_over_max() {
        let capacity = Arc::new(AtomicCapacity::new(20));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let capacity = Arc::clone(&capacity);
                thread::spawn(move || {
                    for _ in 0..500 {
                        if i % 2 == 0 {
                            let _ = capacity.try_acquire(3);
                        } else {
                            capacity.release(3).unwrap();
                        }
                        let current = capacity.current_capacity();
                        assert!(current <= 20);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
