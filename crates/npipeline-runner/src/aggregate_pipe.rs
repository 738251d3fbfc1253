//! The pipe an `Aggregate` node's output is produced from, lazily, per its
//! merged input pipe (spec §4.4 step 4, §4.2). Folds each item into its
//! key's accumulator via [`npipeline_graph::erased::ErasedAggregate`],
//! emits whatever a closing window produces, routes late items to the
//! node's declared late-data edge, and flushes every still-open window
//! once the input is exhausted (spec §4.2: "finalised on window close";
//! `SPEC_FULL.md` §5 resolves exact lateness/merge semantics to the
//! accumulator's own concern).

use crate::retry_exec::call_with_retry;
use futures::stream::{self, Stream, StreamExt};
use npipeline_channel::Sender;
use npipeline_context::PipelineContext;
use npipeline_graph::{erased::ErasedAggregate, AnyItem};
use npipeline_node::{ErrorPolicy, LateDataPolicy};
use npipeline_pipe::{ElementType, Error as PipeError, Item, Pipe, PipeStream};
use npipeline_retry::DelayFn;
use tokio_util::sync::CancellationToken;

/// Wraps an `Aggregate` node behind its merged input pipe, producing its
/// output pipe on demand.
pub struct AggregateExecPipe {
    name: String,
    input: Box<dyn Pipe<AnyItem>>,
    aggregate: Box<dyn ErasedAggregate>,
    output_type: ElementType,
    context: PipelineContext,
    error_policy: ErrorPolicy,
    max_attempts: u32,
    delay_fn: Option<DelayFn>,
    dead_letter_tx: Option<Sender<AnyItem>>,
    late_data_tx: Option<Sender<AnyItem>>,
}

impl AggregateExecPipe {
    /// Builds the pipe. `dead_letter_tx` is used the same way a
    /// transform's is (spec §7 `DeadLetter` policy); `late_data_tx` is
    /// used only when the aggregate's [`LateDataPolicy`] is `Route` and a
    /// late-data edge was declared.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        input: Box<dyn Pipe<AnyItem>>,
        aggregate: Box<dyn ErasedAggregate>,
        output_type: ElementType,
        context: PipelineContext,
        error_policy: ErrorPolicy,
        max_attempts: u32,
        delay_fn: Option<DelayFn>,
        dead_letter_tx: Option<Sender<AnyItem>>,
        late_data_tx: Option<Sender<AnyItem>>,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            aggregate,
            output_type,
            context,
            error_policy,
            max_attempts,
            delay_fn,
            dead_letter_tx,
            late_data_tx,
        }
    }

    async fn process_one(&self, item: Item<AnyItem>, cancel: CancellationToken) -> Result<Vec<AnyItem>, PipeError> {
        let item = item?;
        let dead_letter_copy = item.clone();

        let aggregate = &self.aggregate;
        let context = &self.context;
        let result = call_with_retry(
            &self.name,
            self.delay_fn.as_ref(),
            self.max_attempts,
            &cancel,
            |_attempt| {
                let item = item.clone();
                async move { aggregate.process(item, context).await }
            },
        )
        .await;

        match result {
            Ok(step) => {
                if let Some(late) = step.late_item {
                    debug_assert!(matches!(self.aggregate.late_data_policy(), LateDataPolicy::Route));
                    if let Some(tx) = &self.late_data_tx {
                        if tx.send(late).await.is_err() {
                            tracing::warn!(pipe = %self.name, "late-data edge closed; item dropped");
                        }
                    } else {
                        tracing::warn!(pipe = %self.name, "no late-data edge declared; dropping late item");
                    }
                }
                Ok(step.emitted)
            }
            Err(PipeError::RetryExhausted(cause)) => {
                self.context.cancel();
                Err(PipeError::RetryExhausted(cause))
            }
            Err(PipeError::Upstream(cause)) => match self.error_policy {
                ErrorPolicy::Fail => {
                    self.context.cancel();
                    Err(PipeError::Upstream(cause))
                }
                ErrorPolicy::Skip => {
                    tracing::warn!(pipe = %self.name, error = %cause, "dropping item after aggregate fold failure");
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
            return futures::future::ready(None);
        }
        if result.is_err() {
            *stopped = true;
        }
        futures::future::ready(Some(result))
    });
    Box::pin(scanned.flat_map(|result| {
        let items: Vec<Item<AnyItem>> = match result {
            Ok(items) => items.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    }))
}

#[async_trait::async_trait(?Send)]
impl Pipe<AnyItem> for AggregateExecPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn element_type(&self) -> ElementType {
        self.output_type
    }

    fn enumerate(&self, cancel: CancellationToken) -> Result<PipeStream<'_, AnyItem>, PipeError> {
        let input_stream = self.input.enumerate(cancel.clone())?;
        // Folding is always key-serial from this pipe's point of view — the
        // erased adapter owns one accumulator map per node, so concurrent
        // folds of the same key would race it. Items for distinct keys are
        // still logically independent; spec §4.2 only promises "within a
        // single key, items are folded in receive order", which `.then`
        // (strictly sequential) trivially satisfies.
        let mapped = input_stream.then(move |item| self.process_one(item, cancel.clone()));
        let folded = finish(mapped);

        // Once the merged input is exhausted, finalize every still-open
        // window (spec §4.2 "finalised on window close"; end-of-input is
        // the last window boundary every key will ever see).
        let flushed = stream::once(async move {
            let items = self.aggregate.flush();
            Ok(items)
        });

        // Close the dead-letter/late-data edges as soon as this node's own
        // enumeration is exhausted, rather than waiting for `dispose` at
        // end-of-run teardown: a dead-letter or late-data sink reads these
        // channels to completion and must see them close while the rest of
        // the graph is still draining.
        let dead_letter_tx = &self.dead_letter_tx;
        let late_data_tx = &self.late_data_tx;
        let closer = futures::future::lazy(move |_| {
            if let Some(tx) = dead_letter_tx {
                tx.close();
            }
            if let Some(tx) = late_data_tx {
                tx.close();
            }
            Ok(Vec::new())
        });

        Ok(Box::pin(
            folded
                .chain(finish(flushed))
                .chain(finish(stream::once(closer))),
        ))
    }

    async fn dispose(&self) {
        self.input.dispose().await;
        if let Some(tx) = &self.dead_letter_tx {
            tx.close();
        }
        if let Some(tx) = &self.late_data_tx {
            tx.close();
        }
    }
}
