//! Errors a pipe's enumeration can fail with (spec §4.1, §7).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A type-erased, cloneable error from an upstream producer or node, so a
/// `Counting` or `Multicast` pipe can deliver the same failure to multiple
/// observers without the framework needing to know the producer's concrete
/// error type.
#[derive(Clone)]
pub struct SharedError(Arc<dyn StdError + Send + Sync>);

impl SharedError {
    /// Wraps an arbitrary error for sharing across pipe observers.
    pub fn new<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self(Arc::new(error))
    }

    /// Wraps an already-shared error without re-allocating.
    #[must_use]
    pub fn from_arc(error: Arc<dyn StdError + Send + Sync>) -> Self {
        Self(error)
    }

    /// Gives back the inner `Arc`, e.g. to stash into a
    /// [`npipeline_context::PipelineContext`] parameter.
    #[must_use]
    pub fn into_inner(self) -> Arc<dyn StdError + Send + Sync> {
        self.0
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for SharedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Errors surfaced while enumerating or disposing a pipe (spec §4.1, §7).
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The pipe has already been disposed, or (for a non-restartable
    /// `Streaming` pipe) has already been enumerated once.
    #[error("pipe '{0}' has been disposed")]
    Disposed(String),

    /// The run's cancellation token fired while this pipe was suspended.
    #[error("pipe '{0}' observed cancellation")]
    Cancelled(String),

    /// A `CappedReplayable` pipe tried to materialise more items than its
    /// configured cap.
    #[error("pipe '{0}' exceeded its materialization cap of {1}")]
    MaterializationOverflow(String, i64),

    /// A `Multicast` pipe was asked for more subscriber views than its
    /// declared subscriber count.
    #[error("pipe '{0}' has no remaining multicast subscriber slots")]
    TooManySubscribers(String),

    /// A resilient wrapper around node execution exhausted its configured
    /// retry attempts (spec §7, §8 scenario 7). Recognised specifically by
    /// `Counting` so it can stash the cause into the run context under the
    /// well-known `lastRetryExhaustedException` key before re-raising.
    #[error("retries exhausted: {0}")]
    RetryExhausted(SharedError),

    /// The wrapped producer, upstream pipe, or node raised an error.
    #[error(transparent)]
    Upstream(#[from] SharedError),
}

impl Error {
    /// True for the terminal "no more items will ever come" family
    /// (`Disposed`, `Cancelled`) as opposed to a data-carrying failure.
    #[must_use]
    pub fn is_terminal_control(&self) -> bool {
        matches!(self, Error::Disposed(_) | Error::Cancelled(_))
    }
}
