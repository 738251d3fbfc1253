//! Lets one materialised node output feed more than one downstream
//! consumer (spec §4.4 step 3: a node's produced output can both feed a
//! `Multicast` wrapper and, with no fan-out at all, a single downstream
//! edge) without handing out ownership of the underlying pipe — only the
//! [`crate::plan`] module disposes the real pipe, once, during teardown.

use npipeline_graph::AnyItem;
use npipeline_pipe::{ElementType, Error as PipeError, Pipe, PipeStream};
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

/// A non-owning view onto an `Rc`-shared pipe. `dispose` is a no-op here by
/// design: the real pipe is disposed exactly once, by whoever holds the
/// `Rc` in the run's keepalive list (spec §4.4 step 6: "the runner disposes
/// all pipes in reverse topological order").
pub struct SharedPipe {
    inner: Rc<dyn Pipe<AnyItem>>,
}

impl SharedPipe {
    /// Wraps a clone of `inner`'s `Rc` handle.
    #[must_use]
    pub fn new(inner: Rc<dyn Pipe<AnyItem>>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait(?Send)]
impl Pipe<AnyItem> for SharedPipe {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        self.inner.element_type()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, AnyItem>, PipeError> {
        self.inner.enumerate(cancel)
    }

    async fn dispose(&self) {}
}
