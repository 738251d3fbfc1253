//! Adapts an [`npipeline_channel::Receiver`] into a [`Pipe`], the input
//! side of a dead-letter edge (spec §3 `roles::DEAD_LETTER`, §7
//! `ErrorPolicy::DeadLetter`: "route to a declared dead-letter edge if
//! present"). The failing node's [`crate::transform_pipe::TransformExecPipe`]
//! owns the matching sender.

use npipeline_channel::Receiver;
use npipeline_graph::AnyItem;
use npipeline_pipe::{ElementType, Error as PipeError, Pipe, PipeStream};
use std::cell::Cell;
use tokio_util::sync::CancellationToken;

/// A one-shot-enumerable pipe over a side channel. Not restartable:
/// dead-letter/late-data edges are drained exactly once, by the one node
/// that declared them as an inbound edge.
pub struct ChannelPipe {
    name: String,
    element_type: ElementType,
    receiver: Receiver<AnyItem>,
    enumerated: Cell<bool>,
}

impl ChannelPipe {
    /// Wraps `receiver`, reporting `element_type` as the type flowing
    /// through it (the dead-letter/late-data edge's declared element type).
    #[must_use]
    pub fn new(name: impl Into<String>, element_type: ElementType, receiver: Receiver<AnyItem>) -> Self {
        Self {
            name: name.into(),
            element_type,
            receiver,
            enumerated: Cell::new(false),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl Pipe<AnyItem> for ChannelPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, AnyItem>, PipeError> {
        if self.enumerated.replace(true) {
            return Err(PipeError::Disposed(self.name.clone()));
        }

        let name = self.name.clone();
        let stream = futures::stream::unfold((&self.receiver, cancel, false), move |(receiver, cancel, done)| {
            let name = name.clone();
            async move {
                if done {
                    return None;
                }
                if cancel.is_cancelled() {
                    return Some((Err(PipeError::Cancelled(name)), (receiver, cancel, true)));
                }
                match receiver.recv().await {
                    Ok(item) => Some((Ok(item), (receiver, cancel, false))),
                    Err(_closed) => None,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn dispose(&self) {}
}
