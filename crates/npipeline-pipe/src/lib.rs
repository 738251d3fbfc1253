#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! The `DataPipe` abstraction (spec §4.1): a lazy, typed, asynchronously
//! enumerable sequence with explicit disposal, its five variants
//! (`InMemory`, `Streaming`, `Counting`, `CappedReplayable`, `Multicast`),
//! and the fan-in merge strategies (`Interleave`, `Concatenate`, `Zip`)
//! the runner uses to compose multiple inbound pipes into one.
//!
//! Modelled after the teacher's channel/message-passing layer, generalised
//! from a fixed pdata envelope to an arbitrary, caller-chosen element type
//! `T` per spec.md's lazy-sequence contract.

mod capped_replayable;
mod counting;
mod element_type;
mod error;
mod in_memory;
mod merge;
mod multicast;
mod pipe;
mod streaming;

pub use capped_replayable::CappedReplayablePipe;
pub use counting::CountingPipe;
pub use element_type::ElementType;
pub use error::{Error, SharedError};
pub use in_memory::InMemoryPipe;
pub use merge::{merge, MergeStrategy, MergedPipe};
pub use multicast::{BranchMetrics, MulticastPipe};
pub use pipe::{Item, Pipe, PipeStream};
pub use streaming::{Producer, StreamingPipe};
