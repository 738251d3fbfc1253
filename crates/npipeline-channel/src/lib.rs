#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! Single-threaded bounded channel primitives used by `npipeline-pipe` to
//! implement backpressure (spec §5) and multicast fan-out (spec §4.1).
//!
//! These are intentionally minimal compared to `tokio::sync::mpsc`: pipes
//! run on a cooperative, single-threaded async executor per
//! `PipelineContext`, so an `Rc`-based, non-`Send` channel is sufficient and
//! avoids the synchronization overhead of a thread-safe queue.

pub mod bounded;
pub mod error;
pub mod fanout;

pub use bounded::{channel, Receiver, Sender};
pub use error::{RecvError, SendError};
pub use fanout::{fanout, FanOutSender};
