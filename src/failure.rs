/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The closed set of failure kinds the core reasons about, and the classifier interface an
//! external collaborator uses to turn a wire response or transport exception into one.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;

/// The essential kinds of failure the retry core distinguishes.
///
/// This is a closed set by design (see the "interface-capability composition" design note):
/// new kinds are not meant to be added by downstream crates, only mapped onto from richer,
/// protocol-specific error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureKind {
    /// A transport-level I/O failure (connection reset, DNS failure, TLS handshake failure, ...).
    NetworkIo,
    /// The service signaled that the client is exceeding its allowed rate.
    ServiceThrottling,
    /// A transient server-side failure, not a throttling signal.
    ServiceTransient,
    /// A server-side failure the service has modeled as not worth retrying.
    ServiceNonRetryable,
    /// A client-side failure caused by the request itself (bad input, auth failure, ...).
    ClientNonRetryable,
    /// Admission control rejected the attempt before it was dispatched.
    CapacityExceeded,
    /// The caller cancelled the request while a retry was backing off.
    Cancelled,
}

/// A classified failure, opaque to the driver beyond its [`FailureKind`] and the classification
/// predicates in [`FailureClassifier`].
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    status_code: Option<u16>,
    error_code: Option<String>,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Failure {
    /// Construct a new failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            error_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the HTTP (or HTTP-like) status code the failure was derived from, if any.
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach the service-modeled error code the failure was derived from, if any.
    pub fn with_error_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    /// Attach the underlying cause, e.g. an I/O error from the transport.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wrap `self` as the cause of a `CAPACITY_EXCEEDED` failure.
    pub fn into_capacity_exceeded(self) -> Self {
        Failure {
            kind: FailureKind::CapacityExceeded,
            status_code: None,
            error_code: None,
            message: format!("insufficient retry capacity (last failure: {})", self.message),
            source: Some(Box::new(self)),
        }
    }

    /// The failure's kind.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The HTTP status code the failure was derived from, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// The service-modeled error code the failure was derived from, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

/// Classification predicates over a [`Failure`], supplied by an external collaborator that
/// understands the wire protocol well enough to map a response onto a [`FailureKind`].
pub trait FailureClassifier: fmt::Debug + Send + Sync {
    /// True if this failure is a server-side throttling signal.
    fn is_throttling(&self, failure: &Failure) -> bool;
    /// True if this failure should be retried.
    fn is_retryable(&self, failure: &Failure) -> bool;
    /// True if this failure is known to never be worth retrying.
    fn is_non_retryable(&self, failure: &Failure) -> bool {
        !self.is_retryable(failure)
    }
}

const DEFAULT_RETRYABLE_STATUS_CODES: &[u16] = &[500, 502, 503, 504];

/// The default classifier: retryable if the failure's kind is one of
/// `NETWORK_IO`, `SERVICE_THROTTLING`, `SERVICE_TRANSIENT`, or the status code is one of the
/// standard transient HTTP codes, or the error code is in the caller-supplied retryable list.
#[derive(Debug, Clone, Default)]
pub struct DefaultFailureClassifier {
    retryable_error_codes: HashSet<String>,
}

impl DefaultFailureClassifier {
    /// Create a classifier with no extra service-specific retryable error codes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier that additionally treats the given service error codes as retryable.
    pub fn with_retryable_error_codes(codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            retryable_error_codes: codes.into_iter().collect(),
        }
    }
}

impl FailureClassifier for DefaultFailureClassifier {
    fn is_throttling(&self, failure: &Failure) -> bool {
        failure.kind == FailureKind::ServiceThrottling
    }

    fn is_retryable(&self, failure: &Failure) -> bool {
        matches!(
            failure.kind,
            FailureKind::NetworkIo | FailureKind::ServiceThrottling | FailureKind::ServiceTransient
        ) || failure
            .status_code
            .is_some_and(|code| DEFAULT_RETRYABLE_STATUS_CODES.contains(&code))
            || failure
                .error_code
                .as_deref()
                .is_some_and(|code| self.retryable_error_codes.contains(code))
    }

    fn is_non_retryable(&self, failure: &Failure) -> bool {
        matches!(
            failure.kind,
            FailureKind::ServiceNonRetryable
                | FailureKind::ClientNonRetryable
                | FailureKind::CapacityExceeded
                | FailureKind::Cancelled
        ) || !self.is_retryable(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classifier_retries_known_kinds() {
        let classifier = DefaultFailureClassifier::new();
        for kind in [
            FailureKind::NetworkIo,
            FailureKind::ServiceThrottling,
            FailureKind::ServiceTransient,
        ] {
            let failure = Failure::new(kind, "boom");
            assert!(classifier.is_retryable(&failure), "{kind:?} should be retryable");
        }
    }

    #[test]
    fn default_classifier_retries_transient_status_codes() {
        let classifier = DefaultFailureClassifier::new();
        for code in [500, 502, 503, 504] {
            let failure = Failure::new(FailureKind::ServiceNonRetryable, "boom").with_status_code(code);
            assert!(classifier.is_retryable(&failure), "status {code} should be retryable");
        }
        let failure = Failure::new(FailureKind::ServiceNonRetryable, "boom").with_status_code(404);
        assert!(!classifier.is_retryable(&failure));
    }

    #[test]
    fn default_classifier_honors_custom_error_codes() {
        let classifier =
            DefaultFailureClassifier::with_retryable_error_codes(["ThrottledException".to_string()]);
        let failure = Failure::new(FailureKind::ServiceNonRetryable, "boom")
            .with_error_code("ThrottledException");
        assert!(classifier.is_retryable(&failure));
    }

    #[test]
    fn is_throttling_only_for_throttling_kind() {
        let classifier = DefaultFailureClassifier::new();
        assert!(classifier.is_throttling(&Failure::new(FailureKind::ServiceThrottling, "x")));
        assert!(!classifier.is_throttling(&Failure::new(FailureKind::ServiceTransient, "x")));
    }

    #[test]
    fn capacity_exceeded_wraps_cause() {
        let original = Failure::new(FailureKind::ServiceThrottling, "too fast");
        let wrapped = original.into_capacity_exceeded();
        assert_eq!(wrapped.kind(), FailureKind::CapacityExceeded);
        assert!(std::error::Error::source(&wrapped).is_some());
    }
}
