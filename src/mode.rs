/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Resolution of the retry mode: `LEGACY` or `STANDARD`, each carrying its own default attempt
//! budget and backoff/capacity behavior.

use crate::error::RetryCoreError;
use std::sync::OnceLock;

const ENV_VAR_NAME: &str = "AWS_RETRY_MODE";

/// The retry mode in effect for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryMode {
    /// The original, conservative retry behavior: a fixed attempt budget, full-jitter backoff,
    /// and throttling failures exempt from capacity cost.
    Legacy,
    /// The newer behavior: a smaller default attempt budget, separate throttling backoff bounds,
    /// and throttling failures charged the same capacity cost as any other retryable failure.
    Standard,
}

impl RetryMode {
    /// Total attempts (including the first) before giving up, absent an explicit override.
    pub fn default_max_attempts(self) -> u32 {
        match self {
            RetryMode::Legacy => 4,
            RetryMode::Standard => 3,
        }
    }

    /// `default_max_attempts() - 1`.
    pub fn default_max_retries(self) -> u32 {
        self.default_max_attempts() - 1
    }

    /// Parse a mode name, case-insensitively. Returns `InvalidConfig` for anything else.
    pub fn parse(raw: &str) -> Result<Self, RetryCoreError> {
        match raw.to_ascii_lowercase().as_str() {
            "legacy" => Ok(RetryMode::Legacy),
            "standard" => Ok(RetryMode::Standard),
            other => Err(RetryCoreError::invalid_config(format!(
                "unrecognized retry mode {other:?}, expected \"legacy\" or \"standard\""
            ))),
        }
    }

    /// Resolve the mode in effect, given an optional explicit override and an optional profile
    /// file collaborator, following the order: explicit override, `AWS_RETRY_MODE` environment
    /// variable, profile file, `LEGACY`.
    ///
    /// Unlike [`resolved_default`](Self::resolved_default), this does not cache its result and
    /// consults the environment fresh on every call, which is what test code wants.
    pub fn resolve(
        explicit: Option<RetryMode>,
        profile_source: Option<&dyn ProfileRetryModeSource>,
    ) -> Result<Self, RetryCoreError> {
        if let Some(mode) = explicit {
            return Ok(mode);
        }
        if let Ok(raw) = std::env::var(ENV_VAR_NAME) {
            return Self::parse(&raw);
        }
        if let Some(source) = profile_source {
            if let Some(raw) = source.retry_mode() {
                return Self::parse(&raw);
            }
        }
        Ok(RetryMode::Legacy)
    }

    /// The process-wide default, resolved once from the environment on first use and memoized.
    ///
    /// No profile-file collaborator is consulted here: the lookup is deliberately limited to the
    /// one environment variable named in scope, since profile-file parsing lives outside this
    /// crate.
    pub fn resolved_default() -> RetryMode {
        static RESOLVED: OnceLock<RetryMode> = OnceLock::new();
        *RESOLVED.get_or_init(|| Self::resolve(None, None).unwrap_or(RetryMode::Legacy))
    }
}

impl Default for RetryMode {
    fn default() -> Self {
        RetryMode::Legacy
    }
}

/// An external collaborator capable of reading a retry mode out of a shared profile file.
///
/// Profile-file parsing itself is out of scope here; a caller that has already parsed one
/// implements this trait over whatever representation it holds.
pub trait ProfileRetryModeSource: std::fmt::Debug + Send + Sync {
    /// The raw retry mode string configured for the active profile, if any.
    fn retry_mode(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedProfile(Option<&'static str>);

    impl ProfileRetryModeSource for FixedProfile {
        fn retry_mode(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn default_max_attempts_match_modes() {
        assert_eq!(RetryMode::Legacy.default_max_attempts(), 4);
        assert_eq!(RetryMode::Legacy.default_max_retries(), 3);
        assert_eq!(RetryMode::Standard.default_max_attempts(), 3);
        assert_eq!(RetryMode::Standard.default_max_retries(), 2);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RetryMode::parse("Standard").unwrap(), RetryMode::Standard);
        assert_eq!(RetryMode::parse("LEGACY").unwrap(), RetryMode::Legacy);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(RetryMode::parse("adaptive").is_err());
    }

    #[test]
    fn explicit_override_wins_over_everything() {
        let resolved = RetryMode::resolve(Some(RetryMode::Standard), Some(&FixedProfile(Some("legacy"))))
            .unwrap();
        assert_eq!(resolved, RetryMode::Standard);
    }

    #[test]
    fn profile_source_used_when_no_explicit_or_env() {
        std::env::remove_var(ENV_VAR_NAME);
        let resolved = RetryMode::resolve(None, Some(&FixedProfile(Some("standard")))).unwrap();
        assert_eq!(resolved, RetryMode::Standard);
    }

    #[test]
    fn falls_back_to_legacy_with_no_sources() {
        std::env::remove_var(ENV_VAR_NAME);
        let resolved = RetryMode::resolve(None, None).unwrap();
        assert_eq!(resolved, RetryMode::Legacy);
    }
}
