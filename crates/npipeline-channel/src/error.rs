//! Errors for the channels.
//!
//! It is important not to use `!Send` data types in these errors (e.g. `Rc`)
//! so that they can surface from both single-threaded and multi-threaded
//! contexts without forcing a specific executor model on callers.

/// Errors that can occur sending a value into a channel.
#[derive(thiserror::Error, Debug)]
pub enum SendError<T> {
    /// The channel is at capacity and the value could not be queued.
    #[error("channel is full")]
    Full(T),

    /// The channel has no live receiver and the value could not be delivered.
    #[error("channel is closed")]
    Closed(T),
}

impl<T> SendError<T> {
    /// Returns the value that failed to send, regardless of the reason.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(v) => v,
            Self::Closed(v) => v,
        }
    }
}

/// Errors that can occur receiving a value from a channel.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// The channel is closed and drained; no further values will arrive.
    #[error("channel is closed")]
    Closed,

    /// The channel has no value ready right now (non-blocking probe only).
    #[error("channel is empty")]
    Empty,
}
