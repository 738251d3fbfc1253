//! The pipe a `Transform` node's output is produced from, lazily, per its
//! input pipe (spec §4.4 step 4: "Transform/aggregate nodes produce their
//! output pipe lazily from their input pipe"). Applies the node's
//! execution strategy (§4.6), retry policy (§4.5) and error policy (§7)
//! around every item.

use crate::retry_exec::call_with_retry;
use futures::future;
use futures::stream::{Stream, StreamExt};
use npipeline_channel::Sender;
use npipeline_context::PipelineContext;
use npipeline_graph::{erased::ErasedTransform, AnyItem};
use npipeline_node::ErrorPolicy;
use npipeline_pipe::{ElementType, Error as PipeError, Item, Pipe, PipeStream};
use npipeline_retry::DelayFn;
use tokio_util::sync::CancellationToken;

/// Wraps a `Transform` node behind its input pipe, producing its output
/// pipe on demand.
pub struct TransformExecPipe {
    name: String,
    input: Box<dyn Pipe<AnyItem>>,
    transform: Box<dyn ErasedTransform>,
    output_type: ElementType,
    context: PipelineContext,
    error_policy: ErrorPolicy,
    max_attempts: u32,
    delay_fn: Option<DelayFn>,
    execution_strategy: npipeline_node::ExecutionStrategy,
    dead_letter_tx: Option<Sender<AnyItem>>,
}

impl TransformExecPipe {
    /// Builds the pipe. `delay_fn` and `max_attempts` come from the node's
    /// declared [`npipeline_node::RetryPolicy`], if any; `dead_letter_tx`
    /// is `Some` only when `error_policy` is [`ErrorPolicy::DeadLetter`]
    /// and a matching dead-letter edge was declared.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        input: Box<dyn Pipe<AnyItem>>,
        transform: Box<dyn ErasedTransform>,
        output_type: ElementType,
        context: PipelineContext,
        error_policy: ErrorPolicy,
        max_attempts: u32,
        delay_fn: Option<DelayFn>,
        execution_strategy: npipeline_node::ExecutionStrategy,
        dead_letter_tx: Option<Sender<AnyItem>>,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            transform,
            output_type,
            context,
            error_policy,
            max_attempts,
            delay_fn,
            execution_strategy,
            dead_letter_tx,
        }
    }

    async fn process_one(&self, item: Item<AnyItem>, cancel: CancellationToken) -> Result<Vec<AnyItem>, PipeError> {
        let item = item?;
        let dead_letter_copy = item.clone();

        let transform = &self.transform;
        let context = &self.context;
        let result = call_with_retry(
            &self.name,
            self.delay_fn.as_ref(),
            self.max_attempts,
            &cancel,
            |_attempt| {
                let item = item.clone();
                let call_cancel = cancel.clone();
                async move { transform.execute(item, context, call_cancel).await }
            },
        )
        .await;

        match result {
            Ok(Some(out)) => Ok(vec![out]),
            Ok(None) => Ok(vec![]),
            Err(PipeError::RetryExhausted(cause)) => {
                // Retry exhaustion always cancels the run regardless of the
                // node's declared error policy (spec §8 scenario 7).
                self.context.cancel();
                Err(PipeError::RetryExhausted(cause))
            }
            Err(PipeError::Upstream(cause)) => match self.error_policy {
                ErrorPolicy::Fail => {
                    self.context.cancel();
                    Err(PipeError::Upstream(cause))
                }
                ErrorPolicy::Skip => {
                    tracing::warn!(pipe = %self.name, error = %cause, "dropping item after transform failure");
                    Ok(vec![])
                }
                ErrorPolicy::DeadLetter => {
                    if let Some(tx) = &self.dead_letter_tx {
                        if tx.send(dead_letter_copy).await.is_err() {
                            tracing::warn!(pipe = %self.name, "dead-letter edge closed; item dropped");
                        }
                    } else {
                        tracing::warn!(pipe = %self.name, error = %cause, "no dead-letter edge declared; dropping item");
                    }
                    Ok(vec![])
                }
            },
            Err(other) => Err(other),
        }
    }
}

fn finish<'a, S>(mapped: S) -> PipeStream<'a, AnyItem>
where
    S: Stream<Item = Result<Vec<AnyItem>, PipeError>> + 'a,
{
    let scanned = mapped.scan(false, |stopped, result| {
        if *stopped {
            return future::ready(None);
        }
        if result.is_err() {
            *stopped = true;
        }
        future::ready(Some(result))
    });
    Box::pin(scanned.flat_map(|result| {
        let items: Vec<Item<AnyItem>> = match result {
            Ok(items) => items.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        futures::stream::iter(items)
    }))
}

#[async_trait::async_trait(?Send)]
impl Pipe<AnyItem> for TransformExecPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type(&self) -> ElementType {
        self.output_type
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, AnyItem>, PipeError> {
        self.execution_strategy
            .warn_if_reorder_buffer_likely_harmful(&self.name);

        let input_stream = self.input.enumerate(cancel.clone())?;

        let main = match self.execution_strategy {
            npipeline_node::ExecutionStrategy::Sequential => {
                let mapped = input_stream.then(move |item| self.process_one(item, cancel.clone()));
                finish(mapped)
            }
            npipeline_node::ExecutionStrategy::BoundedParallel {
                parallelism,
                preserve_ordering,
            } => {
                let mapped = input_stream.map(move |item| self.process_one(item, cancel.clone()));
                if preserve_ordering {
                    finish(mapped.buffered(parallelism.max(1)))
                } else {
                    finish(mapped.buffer_unordered(parallelism.max(1)))
                }
            }
        };

        // Close the dead-letter edge as soon as this node's own enumeration
        // is exhausted (normally or after an upstream error), rather than
        // waiting for `dispose` at end-of-run teardown: a dead-letter sink
        // reads this channel to completion and must see it close while the
        // rest of the graph is still draining, not only after every sink
        // has already finished.
        let dead_letter_tx = &self.dead_letter_tx;
        let closer = future::lazy(move |_| {
            if let Some(tx) = dead_letter_tx {
                tx.close();
            }
            Ok(Vec::new())
        });
        Ok(Box::pin(main.chain(finish(futures::stream::once(closer)))))
    }

    async fn dispose(&self) {
        self.input.dispose().await;
        if let Some(tx) = &self.dead_letter_tx {
            tx.close();
        }
    }
}
