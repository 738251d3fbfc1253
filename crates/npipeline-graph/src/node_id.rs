//! Stable node identity (spec §3 "Node. Identity: stable string id assigned
//! at builder time"; invariant 3: unique within a pipeline).

use std::fmt;
use std::sync::Arc;

/// A node's stable identity within a pipeline. Cheap to clone (backed by an
/// `Arc<str>`) since every edge, the topological order, and every runner
/// diagnostic carries a copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// Wraps `id` as a node identity.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The id as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
