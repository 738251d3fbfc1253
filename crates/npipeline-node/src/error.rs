//! The node-level error type (spec §7: "user-defined error").

use std::error::Error as StdError;
use std::fmt;

/// A type-erased user error returned by a node's lifecycle call. The
/// framework never inspects its shape; it only needs `Send + Sync` so it
/// can be wrapped in an [`npipeline_pipe::SharedError`] and delivered to
/// every observer of a failed pipe (spec §7: "Errors in a multicast pump
/// propagate to every subscriber").
///
/// Mirrors the teacher's receiver/processor/exporter traits, which bound
/// their associated error type just as loosely and convert at the crate
/// boundary rather than forcing user code into a framework-defined error
/// enum.
pub type NodeError = Box<dyn StdError + Send + Sync>;

/// Wraps a plain string as a [`NodeError`], for nodes (and tests) that do
/// not need a richer error type.
#[derive(Debug)]
pub struct Message(pub String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

impl Message {
    /// Boxes `text` as a [`NodeError`].
    #[must_use]
    pub fn boxed(text: impl Into<String>) -> NodeError {
        Box::new(Message(text.into()))
    }
}
