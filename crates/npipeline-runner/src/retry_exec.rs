//! The resilient-execution wrapper around a single node call (spec §4.5
//! "Contract", §7 "Runtime-transient": "the resilient wrapper retries with
//! a delay from the retry-delay subsystem until exhausted, then escalates
//! to `RetryExhausted`"). Shared by [`crate::transform_pipe::TransformExecPipe`]
//! and [`crate::aggregate_pipe::AggregateExecPipe`] since both wrap a
//! single fallible async call the same way.

use npipeline_node::NodeError;
use npipeline_pipe::{Error as PipeError, SharedError};
use npipeline_retry::DelayFn;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Calls `attempt` up to `max_attempts` times (1-based attempt numbers),
/// waiting `delay_fn`'s computed delay between failures. `delay_fn` is
/// `None` when the node declared no retry policy, which makes this a
/// single unretried call.
///
/// - Success on any attempt returns `Ok`.
/// - A failure on the final attempt when retries were configured escalates
///   to [`PipeError::RetryExhausted`] (spec §8 scenario 7).
/// - A failure with no retry policy configured surfaces as a plain
///   [`PipeError::Upstream`], letting the caller apply its error policy.
/// - Cancellation observed while waiting out a retry delay short-circuits
///   with [`PipeError::Cancelled`] (spec §5: "every suspension point
///   observes the run's cancellation token").
pub async fn call_with_retry<F, Fut, O>(
    name: &str,
    delay_fn: Option<&DelayFn>,
    max_attempts: u32,
    cancel: &CancellationToken,
    mut attempt_call: F,
) -> Result<O, PipeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<O, NodeError>>,
{
    let mut attempt = 1u32;
    loop {
        match attempt_call(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retrying = delay_fn.is_some() && attempt < max_attempts;
                if !retrying {
                    return Err(if delay_fn.is_some() {
                        PipeError::RetryExhausted(SharedError::new(err))
                    } else {
                        PipeError::Upstream(SharedError::new(err))
                    });
                }

                let delay = delay_fn.expect("retrying implies a delay fn").delay(attempt);
                tracing::debug!(pipe = name, attempt, ?delay, "retrying after node failure");
                tokio::select! {
                    () = cancel.cancelled() => return Err(PipeError::Cancelled(name.to_string())),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}
