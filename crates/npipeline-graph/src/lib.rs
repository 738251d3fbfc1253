#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! The typed DAG layer (spec §4.3, "Graph / Builder"): a fluent builder that
//! registers kind-erased nodes behind typed handles, records edges, and
//! validates and freezes an acyclic, weakly-connected topology with a fixed
//! topological order.
//!
//! Generalises the teacher's pipeline-config graph validator (node registry
//! plus `detect_cycles`) from its fixed receiver/processor/exporter roles to
//! the four kinds spec.md defines, and adds the compile-time-checked typed
//! handles spec §4.3 asks for.

mod builder;
mod edge;
mod entry;
pub mod erased;
mod error;
mod graph;
mod handle;
mod node_id;

pub use builder::GraphBuilder;
pub use edge::{roles, Edge};
pub use entry::{NodeEntry, NodeOptions, NodePayload};
pub use erased::AnyItem;
pub use error::Error;
pub use graph::Graph;
pub use handle::{AggregateHandle, HasInput, HasOutput, SideChannelSource, SinkHandle, SourceHandle, TransformHandle};
pub use node_id::NodeId;
