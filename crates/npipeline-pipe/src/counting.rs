//! The `Counting` pipe variant (spec §4.1): wraps an inner pipe, counts
//! delivered items, and stashes retry-exhaustion causes into the run
//! context (spec §6, §8 scenario 7).

use crate::element_type::ElementType;
use crate::error::Error;
use crate::pipe::{Pipe, PipeStream};
use futures::stream::StreamExt;
use npipeline_context::PipelineContext;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Wraps `inner`, counting every item it delivers and, on a
/// [`Error::RetryExhausted`] failure, stashing the cause into `context`
/// under [`npipeline_context::keys::LAST_RETRY_EXHAUSTED_EXCEPTION`] before
/// re-raising it unchanged.
pub struct CountingPipe<T, P: Pipe<T>> {
    inner: P,
    context: PipelineContext,
    delivered: AtomicU64,
    _marker: std::marker::PhantomData<T>,
}

impl<T, P: Pipe<T>> CountingPipe<T, P> {
    /// Wraps `inner`, reporting retry exhaustion into `context`.
    pub fn new(inner: P, context: PipelineContext) -> Self {
        Self {
            inner,
            context,
            delivered: AtomicU64::new(0),
            _marker: std::marker::PhantomData,
        }
    }

    /// Number of items successfully delivered to the consumer so far.
    #[must_use]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }
}

#[async_trait::async_trait(?Send)]
impl<T: 'static, P: Pipe<T>> Pipe<T> for CountingPipe<T, P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        self.inner.element_type()
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, T>, Error> {
        let inner = self.inner.enumerate(cancel)?;
        let context = self.context.clone();
        let delivered = &self.delivered;
        let name = self.inner.name().to_string();

        let stream = inner.map(move |item| match item {
            Ok(value) => {
                let _ = delivered.fetch_add(1, Ordering::AcqRel);
                Ok(value)
            }
            Err(Error::RetryExhausted(cause)) => {
                context.set_last_retry_exhausted(cause.clone().into_inner());
                tracing::warn!(pipe = %name, error = %cause, "retry exhaustion observed; stashed into context");
                Err(Error::RetryExhausted(cause))
            }
            Err(other) => Err(other),
        });
        Ok(Box::pin(stream))
    }

    async fn dispose(&self) {
        self.inner.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SharedError;
    use crate::in_memory::InMemoryPipe;
    use crate::streaming::StreamingPipe;
    use futures::stream;

    #[derive(thiserror::Error, Debug)]
    #[error("transient failure")]
    struct Transient;

    #[tokio::test]
    async fn counts_every_delivered_item() {
        let ctx = PipelineContext::new();
        let counting = CountingPipe::new(InMemoryPipe::new("src", vec![1, 2, 3]), ctx);

        let mut stream = counting.enumerate(CancellationToken::new()).unwrap();
        while stream.next().await.is_some() {}
        drop(stream);

        assert_eq!(counting.delivered_count(), 3);
    }

    #[tokio::test]
    async fn stashes_retry_exhausted_cause_before_reraising() {
        let ctx = PipelineContext::new();
        let failing = StreamingPipe::new(
            "flaky",
            true,
            Box::new(|| {
                Box::pin(stream::once(async {
                    Err(Error::RetryExhausted(SharedError::new(Transient)))
                }))
            }),
        );
        let counting = CountingPipe::new(failing, ctx.clone());

        let mut stream = counting.enumerate(CancellationToken::new()).unwrap();
        let failure = stream.next().await.unwrap();
        assert!(matches!(failure, Err(Error::RetryExhausted(_))));

        assert!(ctx.last_retry_exhausted().is_some());
    }
}
