//! Runtime descriptor for a pipe's element type (spec §4.1 `ElementType()`),
//! used by the builder and by type-erased bridging between pipes.

use std::any::TypeId;
use std::fmt;

/// Identifies the Rust type a pipe yields, without requiring callers to know
/// it at compile time (e.g. the graph builder's edge-compatibility check,
/// §4.3).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ElementType {
    /// Builds the descriptor for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The human-readable type name, for diagnostics only — never compared
    /// for equality (use the `PartialEq` impl, which is `TypeId`-based).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
