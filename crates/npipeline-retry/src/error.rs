//! Errors for the retry-delay subsystem.

/// Errors raised while validating a [`crate::RetryDelayConfig`] at factory
/// time (spec §4.5 "Validation").
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A configuration field failed validation. `param` names the offending
    /// field so callers can report it without re-deriving which check
    /// failed.
    #[error("invalid retry-delay argument: {param} ({reason})")]
    InvalidArgument {
        /// Name of the offending field, e.g. `"backoff.base"`.
        param: &'static str,
        /// Human-readable reason, e.g. `"must be > 0"`.
        reason: &'static str,
    },
}
