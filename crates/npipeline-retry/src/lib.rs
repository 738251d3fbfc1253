#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! Composable backoff x jitter retry-delay subsystem (spec §4.5).
//!
//! This is the cleanest algorithmic core of the framework: given an attempt
//! number, compute how long a resilient wrapper around node execution
//! should wait before retrying. A [`RetryDelayConfig`] is validated once at
//! construction (`RetryDelayConfig::new`); [`RetryDelayConfig::build`]
//! produces a [`DelayFn`] — the long-lived, possibly-stateful
//! delay-computing function spec §4.5's "Contract" describes.

mod backoff;
mod error;
mod jitter;
mod units;

pub use backoff::BackoffStrategy;
pub use error::Error;
pub use jitter::JitterStrategy;

use jitter::JitterState;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::Duration;

/// Immutable, validated configuration of a retry delay: a backoff strategy
/// plus an optional jitter strategy (spec §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryDelayConfig {
    backoff: BackoffStrategy,
    jitter: Option<JitterStrategy>,
}

impl RetryDelayConfig {
    /// Validates `backoff` and `jitter` and returns a usable configuration.
    /// A `None` jitter is always valid and means "no jitter" (spec §4.5).
    pub fn new(backoff: BackoffStrategy, jitter: Option<JitterStrategy>) -> Result<Self, Error> {
        backoff.validate()?;
        if let Some(jitter) = jitter {
            jitter.validate()?;
        }
        Ok(Self { backoff, jitter })
    }

    /// The configured backoff strategy.
    #[must_use]
    pub fn backoff(&self) -> BackoffStrategy {
        self.backoff
    }

    /// The configured jitter strategy, if any.
    #[must_use]
    pub fn jitter(&self) -> Option<JitterStrategy> {
        self.jitter
    }

    /// Builds a [`DelayFn`] from this configuration, using a
    /// non-deterministic RNG.
    #[must_use]
    pub fn build(self) -> DelayFn {
        self.build_seeded(None)
    }

    /// Builds a [`DelayFn`] seeded for reproducible tests (spec §8 scenario
    /// 5: "RNG seeded to 42").
    #[must_use]
    pub fn build_seeded(self, seed: Option<u64>) -> DelayFn {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        DelayFn {
            config: self,
            rng: RefCell::new(rng),
            jitter_state: JitterState::new(),
        }
    }
}

/// A validated, ready-to-call delay function (spec §4.5 "Contract").
///
/// Safe to call concurrently only when the underlying jitter is stateless;
/// [`JitterStrategy::Decorrelated`]'s previous-delay state is guarded by an
/// internal mutex so concurrent callers still get a correct, serialised
/// update, but the sequence of delays handed out then depends on call
/// interleaving — callers needing a deterministic sequence under
/// `Decorrelated` jitter should call from a single task, as the resilient
/// wrapper around a single node does.
pub struct DelayFn {
    config: RetryDelayConfig,
    rng: RefCell<SmallRng>,
    jitter_state: JitterState,
}

impl DelayFn {
    /// Computes the delay to wait before retrying attempt `attempt`
    /// (1-based). The result is always clamped into `[0, max_delay]`
    /// per spec invariant 7.
    #[tracing::instrument(level = "trace", skip(self), fields(attempt))]
    pub fn delay(&self, attempt: u32) -> Duration {
        assert!(attempt >= 1, "attempt numbers are 1-based");

        let backoff = self.config.backoff.compute(attempt);
        let delay = match self.config.jitter {
            None => backoff,
            Some(strategy) => {
                let base = self.config.backoff.base_delay();
                let mut rng = self.rng.borrow_mut();
                self.jitter_state.apply(strategy, backoff, base, &mut *rng)
            }
        };
        tracing::trace!(?backoff, ?delay, "computed retry delay");
        delay
    }

    /// Upper bound on any delay this function can return.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        match self.config.jitter {
            Some(JitterStrategy::Decorrelated { max, .. }) => {
                self.config.backoff.max_delay().max(max)
            }
            _ => self.config.backoff.max_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_monotonic_without_jitter() {
        let config = RetryDelayConfig::new(
            BackoffStrategy::Exponential {
                base: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(30),
            },
            None,
        )
        .unwrap();
        let delay_fn = config.build_seeded(Some(1));

        let mut previous = Duration::ZERO;
        for attempt in 1..=5 {
            let d = delay_fn.delay(attempt);
            assert!(d >= previous);
            assert!(d <= delay_fn.max_delay());
            previous = d;
        }
    }

    #[test]
    fn full_jitter_bounded_by_backoff_each_attempt() {
        let config = RetryDelayConfig::new(
            BackoffStrategy::Exponential {
                base: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(30),
            },
            Some(JitterStrategy::Full),
        )
        .unwrap();
        let delay_fn = config.build_seeded(Some(42));

        for attempt in 1..=5u32 {
            let backoff = BackoffStrategy::Exponential {
                base: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(30),
            }
            .compute(attempt);
            let d = delay_fn.delay(attempt);
            assert!(d <= backoff, "attempt {attempt}: {d:?} > {backoff:?}");
        }
    }

    #[test]
    fn rejects_invalid_config_before_any_delay_is_computed() {
        let err = RetryDelayConfig::new(
            BackoffStrategy::Fixed {
                delay: Duration::ZERO,
            },
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn decorrelated_jitter_sequence_is_reproducible_given_a_seed() {
        let config = RetryDelayConfig::new(
            BackoffStrategy::Exponential {
                base: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(30),
            },
            Some(JitterStrategy::Decorrelated {
                max: Duration::from_secs(30),
                multiplier: 3.0,
            }),
        )
        .unwrap();

        let run = || {
            let delay_fn = config.clone().build_seeded(Some(7));
            (1..=5).map(|n| delay_fn.delay(n)).collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RetryDelayConfig::new(
            BackoffStrategy::Linear {
                base: Duration::from_millis(200),
                increment: Duration::from_millis(50),
                max: Duration::from_secs(2),
            },
            Some(JitterStrategy::Equal),
        )
        .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: RetryDelayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
