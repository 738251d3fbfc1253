#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! The `Node` contract (spec §2, §4.2): the four node kinds — source,
//! transform, aggregate, sink — plus the attributes every node carries
//! regardless of kind (error policy, execution strategy).
//!
//! Generalises the teacher's receiver/processor/exporter trait family
//! (each bound to a fixed `PData` envelope and a `Local`/`Shared`
//! sendability split) into kind-specific traits over an arbitrary,
//! caller-chosen element type, dropping the `Local`/`Shared` duality since
//! every pipe in this framework is `!Send` by design (spec §5's
//! single-process cooperative scheduler never needs cross-thread
//! handoff).

mod aggregate;
mod error;
mod kind;
mod policy;
mod retry;
mod source;
mod sink;
mod strategy;
mod transform;
mod window;

#[cfg(feature = "testing")]
pub mod testing;

pub use aggregate::Aggregate;
pub use error::{Message, NodeError};
pub use kind::NodeKind;
pub use policy::ErrorPolicy;
pub use retry::RetryPolicy;
pub use sink::Sink;
pub use source::Source;
pub use strategy::{ExecutionStrategy, HIGH_PARALLELISM_REORDER_WARN_THRESHOLD};
pub use transform::Transform;
pub use window::{LateDataPolicy, WatermarkTracker, WindowSpec};
