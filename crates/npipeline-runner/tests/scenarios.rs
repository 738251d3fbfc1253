//! End-to-end coverage of the scenarios spec.md §8 enumerates, driven
//! through the real builder + runner rather than unit-testing a single
//! pipe or node in isolation. Each test builds a small graph, runs it to
//! completion (or to its expected failure), and asserts on what the
//! sinks actually received.

use npipeline_context::PipelineContext;
use npipeline_graph::{roles, GraphBuilder, NodeOptions};
use npipeline_node::testing::{MapTransform, VecSink, VecSource};
use npipeline_node::{Aggregate, ErrorPolicy, NodeError, RetryPolicy, Source, Transform, WindowSpec};
use npipeline_pipe::{MergeStrategy, Pipe};
use npipeline_retry::{BackoffStrategy, RetryDelayConfig};
use npipeline_runner::Runner;
use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Spec §8 scenario 1: `Source[1,2,3]` -> `x*x` -> sink, in order.
#[tokio::test]
async fn linear_pipeline_delivers_items_in_order() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source("numbers", VecSource::new("numbers", vec![1, 2, 3]), NodeOptions::default())
        .unwrap();
    let square = builder
        .add_transform("square", MapTransform::new(|x: i32| Some(x * x)), NodeOptions::default())
        .unwrap();
    let sink = VecSink::new();
    let sink_handle = sink.handle();
    let sink_id = builder.add_sink("sink", sink, NodeOptions::default()).unwrap();

    builder.connect(&source, &square);
    builder.connect(&square, &sink_id);

    let graph = builder.build().unwrap();
    Runner::new("linear").run(graph, PipelineContext::new()).await.unwrap();

    assert_eq!(sink_handle.received(), vec![1, 4, 9]);
}

/// Spec §8 scenario 2: sources `[A1,A2]` and `[B1,B2]` concatenated must
/// produce exactly `[A1,A2,B1,B2]`.
#[tokio::test]
async fn fan_in_concatenate_preserves_declared_edge_order() {
    let mut builder = GraphBuilder::new();
    let a = builder
        .add_source("a", VecSource::new("a", vec!["A1", "A2"]), NodeOptions::default())
        .unwrap();
    let b = builder
        .add_source("b", VecSource::new("b", vec!["B1", "B2"]), NodeOptions::default())
        .unwrap();

    let sink = VecSink::new();
    let sink_handle = sink.handle();
    let sink_id = builder
        .add_sink(
            "joined",
            sink,
            NodeOptions::default().with_merge_strategy(MergeStrategy::Concatenate),
        )
        .unwrap();

    builder.connect(&a, &sink_id);
    builder.connect(&b, &sink_id);

    let graph = builder.build().unwrap();
    Runner::new("fan-in-concatenate").run(graph, PipelineContext::new()).await.unwrap();

    assert_eq!(sink_handle.received(), vec!["A1", "A2", "B1", "B2"]);
}

/// Spec §8 scenario 3: sources `[1,2]` and `[3,4]` interleaved must
/// preserve each source's intra-stream order while making no promise
/// about inter-stream interleaving — so the sink's multiset must be
/// exactly `{1,2,3,4}` and `1` must precede `2`, `3` must precede `4`.
#[tokio::test]
async fn fan_in_interleave_preserves_intra_source_order() {
    let mut builder = GraphBuilder::new();
    let a = builder
        .add_source("a", VecSource::new("a", vec![1, 2]), NodeOptions::default())
        .unwrap();
    let b = builder
        .add_source("b", VecSource::new("b", vec![3, 4]), NodeOptions::default())
        .unwrap();

    let sink = VecSink::new();
    let sink_handle = sink.handle();
    // Interleave is the default merge strategy.
    let sink_id = builder.add_sink("merged", sink, NodeOptions::default()).unwrap();

    builder.connect(&a, &sink_id);
    builder.connect(&b, &sink_id);

    let graph = builder.build().unwrap();
    Runner::new("fan-in-interleave").run(graph, PipelineContext::new()).await.unwrap();

    let received = sink_handle.received();
    let mut sorted = received.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2, 3, 4]);

    let pos = |v: i32| received.iter().position(|&x| x == v).unwrap();
    assert!(pos(1) < pos(2), "source a's items must stay in order: {received:?}");
    assert!(pos(3) < pos(4), "source b's items must stay in order: {received:?}");
}

/// Spec §8 scenario 4: source `[1,2,3]` fanned out to two sinks via
/// multicast must deliver the full sequence, in order, to both.
#[tokio::test]
async fn multicast_fan_out_delivers_the_same_sequence_to_every_subscriber() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source(
            "numbers",
            VecSource::new("numbers", vec![1, 2, 3]),
            NodeOptions::default().with_fan_out(2, None),
        )
        .unwrap();

    let first = VecSink::new();
    let first_handle = first.handle();
    let first_id = builder.add_sink("first", first, NodeOptions::default()).unwrap();

    let second = VecSink::new();
    let second_handle = second.handle();
    let second_id = builder.add_sink("second", second, NodeOptions::default()).unwrap();

    builder.connect(&source, &first_id);
    builder.connect(&source, &second_id);

    let graph = builder.build().unwrap();
    Runner::new("fan-out-multicast").run(graph, PipelineContext::new()).await.unwrap();

    assert_eq!(first_handle.received(), vec![1, 2, 3]);
    assert_eq!(second_handle.received(), vec![1, 2, 3]);
}

/// A node left at the default `fan_out` of 1 but wired to two plain
/// outbound edges must be rejected at build/validation time rather than
/// silently handing one consumer an already-exhausted pipe (spec §3
/// invariant 5: a plain, non-multicast pipe may be enumerated at most
/// once).
#[tokio::test]
async fn default_fan_out_with_two_plain_consumers_is_rejected() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source("numbers", VecSource::new("numbers", vec![1, 2, 3]), NodeOptions::default())
        .unwrap();

    let first = VecSink::new();
    let first_id = builder.add_sink("first", first, NodeOptions::default()).unwrap();

    let second = VecSink::new();
    let second_id = builder.add_sink("second", second, NodeOptions::default()).unwrap();

    builder.connect(&source, &first_id);
    builder.connect(&source, &second_id);

    let graph = builder.build().unwrap();
    let err = Runner::new("fan-out-default")
        .run(graph, PipelineContext::new())
        .await
        .expect_err("two plain consumers on a fan_out: 1 node must be rejected, not silently under-deliver");

    assert!(
        matches!(err, npipeline_runner::Error::FanOutMismatch { outbound_edges: 2, fan_out: 1, .. }),
        "expected a FanOutMismatch(fan_out: 1, outbound_edges: 2), got: {err:?}"
    );
}

/// A source whose pipe fails on every enumeration attempt, used to drive
/// retry exhaustion (spec §8 scenario 7) through the real retry-wrapped
/// transform execution path rather than calling `call_with_retry` directly.
struct AlwaysFailingSource;

#[async_trait::async_trait(?Send)]
impl Source<i32> for AlwaysFailingSource {
    async fn initialize(
        &self,
        _context: &PipelineContext,
        _cancel: CancellationToken,
    ) -> Result<Box<dyn Pipe<i32>>, NodeError> {
        Ok(Box::new(npipeline_pipe::InMemoryPipe::new("flaky-source", vec![1])))
    }
}

/// A transform that fails on every attempt, so a retry policy around it
/// is guaranteed to exhaust.
struct AlwaysFailingTransform {
    attempts: AtomicU32,
}

#[async_trait::async_trait(?Send)]
impl Transform<i32, i32> for AlwaysFailingTransform {
    async fn execute(
        &self,
        _item: i32,
        _context: &PipelineContext,
        _cancel: CancellationToken,
    ) -> Result<Option<i32>, NodeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(npipeline_node::Message::boxed("transient failure"))
    }
}

/// Spec §8 scenario 7: a transform that fails on every attempt with
/// `maxAttempts=3` must exhaust its retries, fail the run, and stash the
/// cause under `lastRetryExhaustedException` before the runner cancels.
#[tokio::test]
async fn retry_exhaustion_surfaces_through_context_and_fails_the_run() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source("flaky-source", AlwaysFailingSource, NodeOptions::default())
        .unwrap();

    let delay = RetryDelayConfig::new(
        BackoffStrategy::Fixed {
            delay: Duration::from_millis(1),
        },
        None,
    )
    .unwrap();
    let transform = builder
        .add_transform(
            "flaky-transform",
            AlwaysFailingTransform { attempts: AtomicU32::new(0) },
            NodeOptions::default()
                .with_error_policy(ErrorPolicy::Fail)
                .with_retry_policy(RetryPolicy::new(delay, 3)),
        )
        .unwrap();

    let sink = VecSink::new();
    let sink_id = builder.add_sink("sink", sink, NodeOptions::default()).unwrap();

    builder.connect(&source, &transform);
    builder.connect(&transform, &sink_id);

    let graph = builder.build().unwrap();
    let context = PipelineContext::new();
    let result = Runner::new("retry-exhaustion").run(graph, context.clone()).await;

    assert!(result.is_err(), "a node whose retries are exhausted under Fail must fail the run");
    assert!(
        context.last_retry_exhausted().is_some(),
        "the counting pipe must stash the retry-exhausted cause before re-raising it"
    );
}

/// A minimal per-key running-total aggregate, exercising the `Aggregate`
/// contract end-to-end through the graph and runner rather than only at
/// the `AggregateAdapter` unit level.
struct RunningTotal;

#[async_trait::async_trait(?Send)]
impl Aggregate<(String, i64, i64), String, i64, (String, i64)> for RunningTotal {
    fn extract_key(&self, item: &(String, i64, i64)) -> String {
        item.0.clone()
    }

    fn event_time_millis(&self, item: &(String, i64, i64)) -> i64 {
        item.1
    }

    fn window(&self) -> WindowSpec {
        WindowSpec::Tumbling { size_millis: 1000 }
    }

    fn seed(&self, _key: &String) -> i64 {
        0
    }

    async fn fold(
        &self,
        accumulator: i64,
        item: (String, i64, i64),
        _context: &PipelineContext,
    ) -> Result<i64, NodeError> {
        Ok(accumulator + item.2)
    }

    fn finalize(&self, key: String, accumulator: i64) -> Vec<(String, i64)> {
        vec![(key, accumulator)]
    }
}

/// A `Source` double producing a fixed vector of timestamped events,
/// parallel to `VecSource` but over the tuple shape `RunningTotal` needs.
struct EventSource {
    events: Cell<Option<Vec<(String, i64, i64)>>>,
}

#[async_trait::async_trait(?Send)]
impl Source<(String, i64, i64)> for EventSource {
    async fn initialize(
        &self,
        _context: &PipelineContext,
        _cancel: CancellationToken,
    ) -> Result<Box<dyn Pipe<(String, i64, i64)>>, NodeError> {
        let events = self.events.take().expect("initialized at most once per run");
        Ok(Box::new(npipeline_pipe::InMemoryPipe::new("events", events)))
    }
}

/// Exercises the `Aggregate` node contract through the full builder and
/// runner: two keys, two tumbling windows each, asserting both the
/// mid-stream window close and the end-of-stream flush reach the sink.
#[tokio::test]
async fn aggregate_node_closes_tumbling_windows_end_to_end() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source(
            "events",
            EventSource {
                events: Cell::new(Some(vec![
                    ("a".to_string(), 0, 1),
                    ("a".to_string(), 500, 2),
                    ("a".to_string(), 1000, 100),
                    ("b".to_string(), 0, 10),
                ])),
            },
            NodeOptions::default(),
        )
        .unwrap();

    let aggregate = builder
        .add_aggregate("totals", RunningTotal, 0, NodeOptions::default())
        .unwrap();

    let sink = VecSink::new();
    let sink_handle = sink.handle();
    let sink_id = builder.add_sink("sink", sink, NodeOptions::default()).unwrap();

    builder.connect(&source, &aggregate);
    builder.connect(&aggregate, &sink_id);

    let graph = builder.build().unwrap();
    Runner::new("aggregate").run(graph, PipelineContext::new()).await.unwrap();

    let mut received = sink_handle.received();
    received.sort();
    assert_eq!(
        received,
        vec![("a".to_string(), 3), ("a".to_string(), 100), ("b".to_string(), 10)],
        "both a's first window (closed mid-stream) and its second window \
         (closed by end-of-stream flush) must reach the sink, alongside b's \
         single flushed window"
    );
}

/// A transform that rejects even items, so its failures exercise
/// `ErrorPolicy::DeadLetter` without needing a retry policy.
struct RejectEvens;

#[async_trait::async_trait(?Send)]
impl Transform<i32, i32> for RejectEvens {
    async fn execute(
        &self,
        item: i32,
        _context: &PipelineContext,
        _cancel: CancellationToken,
    ) -> Result<Option<i32>, NodeError> {
        if item % 2 == 0 {
            Err(npipeline_node::Message::boxed("even items are rejected"))
        } else {
            Ok(Some(item * 10))
        }
    }
}

/// Spec §7 `ErrorPolicy::DeadLetter`: a rejected item must reach the
/// declared dead-letter sink rather than hanging the run, while items
/// the node accepts still reach the primary sink. This is the end-to-end
/// coverage for the dead-letter close-on-exhaustion fix in
/// `TransformExecPipe::enumerate` — before that fix this test would hang
/// forever waiting for the dead-letter sink to observe channel closure.
#[tokio::test]
async fn dead_letter_policy_routes_rejected_items_without_hanging() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source("numbers", VecSource::new("numbers", vec![1, 2, 3, 4, 5]), NodeOptions::default())
        .unwrap();

    let dead_letter_sink = VecSink::new();
    let dead_letter_handle = dead_letter_sink.handle();
    let dead_letter_id = builder
        .add_sink("dead-letters", dead_letter_sink, NodeOptions::default())
        .unwrap();

    let transform = builder
        .add_transform(
            "reject-evens",
            RejectEvens,
            NodeOptions::default()
                .with_error_policy(ErrorPolicy::DeadLetter)
                .with_dead_letter_target(dead_letter_id.id().clone()),
        )
        .unwrap();

    let sink = VecSink::new();
    let sink_handle = sink.handle();
    let sink_id = builder.add_sink("sink", sink, NodeOptions::default()).unwrap();

    builder.connect(&source, &transform);
    builder.connect(&transform, &sink_id);
    builder.connect_with(&transform.dead_letter_source(), &dead_letter_id, |e| e.with_role(roles::DEAD_LETTER));

    let graph = builder.build().unwrap();
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        Runner::new("dead-letter").run(graph, PipelineContext::new()),
    )
    .await
    .expect("run must complete instead of hanging on the dead-letter channel")
    .unwrap();

    assert_eq!(report.completed_nodes.len(), 4);
    assert_eq!(sink_handle.received(), vec![10, 30, 50]);
    assert_eq!(dead_letter_handle.received(), vec![2, 4]);
}

/// An aggregate whose watermark never advances relative to its window
/// size, so every event after the first in a key arrives "late" and is
/// routed rather than folded (spec §4.2 `LateDataPolicy::Route`).
struct AlwaysLate;

#[async_trait::async_trait(?Send)]
impl Aggregate<(String, i64, i64), String, i64, (String, i64)> for AlwaysLate {
    fn extract_key(&self, item: &(String, i64, i64)) -> String {
        item.0.clone()
    }

    fn event_time_millis(&self, item: &(String, i64, i64)) -> i64 {
        item.1
    }

    fn window(&self) -> WindowSpec {
        WindowSpec::Tumbling { size_millis: 1 }
    }

    fn late_data_policy(&self) -> npipeline_node::LateDataPolicy {
        npipeline_node::LateDataPolicy::Route
    }

    fn seed(&self, _key: &String) -> i64 {
        0
    }

    async fn fold(
        &self,
        accumulator: i64,
        item: (String, i64, i64),
        _context: &PipelineContext,
    ) -> Result<i64, NodeError> {
        Ok(accumulator + item.2)
    }

    fn finalize(&self, key: String, accumulator: i64) -> Vec<(String, i64)> {
        vec![(key, accumulator)]
    }
}

/// Spec §4.2 `LateDataPolicy::Route`: a late item must reach the declared
/// late-data sink without hanging the run, sharing the same
/// close-on-exhaustion fix as the dead-letter path in
/// `AggregateExecPipe::enumerate`.
#[tokio::test]
async fn late_data_policy_routes_late_items_without_hanging() {
    let mut builder = GraphBuilder::new();
    let source = builder
        .add_source(
            "events",
            EventSource {
                events: Cell::new(Some(vec![
                    ("a".to_string(), 100, 1),
                    ("a".to_string(), 0, 2),
                    ("a".to_string(), 0, 3),
                ])),
            },
            NodeOptions::default(),
        )
        .unwrap();

    let late_data_sink = VecSink::new();
    let late_data_handle = late_data_sink.handle();
    let late_data_id = builder
        .add_sink("late-data", late_data_sink, NodeOptions::default())
        .unwrap();

    let aggregate = builder
        .add_aggregate(
            "totals",
            AlwaysLate,
            0,
            NodeOptions::default().with_late_data_target(late_data_id.id().clone()),
        )
        .unwrap();

    let sink = VecSink::new();
    let sink_handle = sink.handle();
    let sink_id = builder.add_sink("sink", sink, NodeOptions::default()).unwrap();

    builder.connect(&source, &aggregate);
    builder.connect(&aggregate, &sink_id);
    builder.connect_with(&aggregate.late_data_source(), &late_data_id, |e| e.with_role(roles::LATE_DATA));

    let graph = builder.build().unwrap();
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        Runner::new("late-data").run(graph, PipelineContext::new()),
    )
    .await
    .expect("run must complete instead of hanging on the late-data channel")
    .unwrap();

    assert_eq!(report.completed_nodes.len(), 4);
    assert_eq!(sink_handle.received(), vec![("a".to_string(), 1)]);
    assert_eq!(late_data_handle.received(), vec![("a".to_string(), 0, 2), ("a".to_string(), 0, 3)]);
}
