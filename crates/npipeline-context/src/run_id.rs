//! Opaque per-run identity (spec §3: "a run id, opaque unique token").

use std::fmt;
use uuid::Uuid;

/// A unique token identifying one run of a pipeline. Carries no meaning
/// beyond identity and ordering by creation time (backed by a UUIDv7, which
/// is monotonically sortable — useful when runs end up in the same log
/// stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh, process-unique run id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RunId::generate(), RunId::generate());
    }
}
