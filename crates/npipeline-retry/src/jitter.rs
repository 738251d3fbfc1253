//! Randomised perturbation of a backoff delay (spec §4.5).

use crate::error::Error;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Jitter configuration, as declared by a caller. Stateless variants
/// ([`JitterStrategy::None`], [`JitterStrategy::Full`],
/// [`JitterStrategy::Equal`]) are `Copy`; [`JitterStrategy::Decorrelated`]
/// carries only its parameters here — the mutable "previous delay" state
/// lives in [`crate::DelayFn`], one instance per factory call, not here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter; the backoff delay is used unchanged.
    None,
    /// Uniform in `[0, backoff(n)]`.
    Full,
    /// `backoff(n)/2 + uniform(0, backoff(n)/2)`.
    Equal,
    /// Stateful: `min(uniform(base, previous * multiplier), max)`, where
    /// `previous` is the delay returned by the prior call (or the backoff
    /// value itself on the first call).
    Decorrelated {
        /// Upper bound on the computed delay.
        #[serde(with = "crate::units::duration_millis")]
        max: Duration,
        /// Growth multiplier applied to the previous delay.
        multiplier: f64,
    },
}

impl JitterStrategy {
    /// Validates the strategy's parameters per spec §4.5: a null jitter is
    /// always valid; `decorrelated.max > 0` and `decorrelated.mul ≥ 1.0`.
    pub fn validate(&self) -> Result<(), Error> {
        if let JitterStrategy::Decorrelated { max, multiplier } = *self {
            if max.is_zero() {
                return Err(Error::InvalidArgument {
                    param: "jitter.max",
                    reason: "must be > 0",
                });
            }
            if multiplier < 1.0 {
                return Err(Error::InvalidArgument {
                    param: "jitter.multiplier",
                    reason: "must be >= 1.0",
                });
            }
        }
        Ok(())
    }
}

/// Per-factory-instance mutable state needed to apply jitter. Stored
/// separately from [`JitterStrategy`] so that the strategy itself stays
/// `Copy` and config values (e.g. loaded from [`crate::RetryDelayConfig`])
/// can be freely cloned without dragging state along.
pub(crate) struct JitterState {
    /// `previous` delay for `Decorrelated`; unused by the other variants.
    previous: Mutex<Option<Duration>>,
}

impl JitterState {
    pub(crate) fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }

    /// Applies `strategy` to the deterministic `backoff` delay for this
    /// attempt, using `rng` for randomness and `base`/`max` as the
    /// decorrelated seed/cap.
    pub(crate) fn apply(
        &self,
        strategy: JitterStrategy,
        backoff: Duration,
        base: Duration,
        rng: &mut impl Rng,
    ) -> Duration {
        match strategy {
            JitterStrategy::None => backoff,
            JitterStrategy::Full => {
                let upper = backoff.as_secs_f64();
                Duration::from_secs_f64(rng.gen_range(0.0..=upper.max(0.0)))
            }
            JitterStrategy::Equal => {
                let half = backoff.as_secs_f64() / 2.0;
                Duration::from_secs_f64(half + rng.gen_range(0.0..=half.max(0.0)))
            }
            JitterStrategy::Decorrelated { max, multiplier } => {
                let mut previous = self.previous.lock();
                let delay = match *previous {
                    None => backoff,
                    Some(prev) => {
                        let upper = (prev.as_secs_f64() * multiplier).max(base.as_secs_f64());
                        let sampled = rng.gen_range(base.as_secs_f64()..=upper);
                        Duration::from_secs_f64(sampled).min(max)
                    }
                };
                *previous = Some(delay);
                delay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn none_is_identity() {
        let state = JitterState::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let d = Duration::from_millis(250);
        assert_eq!(state.apply(JitterStrategy::None, d, d, &mut rng), d);
    }

    #[test]
    fn full_stays_within_backoff_bound() {
        let state = JitterState::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let backoff = Duration::from_millis(800);
        for _ in 0..100 {
            let d = state.apply(JitterStrategy::Full, backoff, backoff, &mut rng);
            assert!(d <= backoff);
        }
    }

    #[test]
    fn equal_stays_within_half_to_full_bound() {
        let state = JitterState::new();
        let mut rng = SmallRng::seed_from_u64(7);
        let backoff = Duration::from_millis(800);
        for _ in 0..100 {
            let d = state.apply(JitterStrategy::Equal, backoff, backoff, &mut rng);
            assert!(d >= backoff / 2);
            assert!(d <= backoff);
        }
    }

    #[test]
    fn decorrelated_is_stateful_and_capped() {
        let state = JitterState::new();
        let mut rng = SmallRng::seed_from_u64(9);
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(5);
        let strategy = JitterStrategy::Decorrelated {
            max,
            multiplier: 3.0,
        };

        let first = state.apply(strategy, base, base, &mut rng);
        assert_eq!(first, base); // first call returns the backoff unchanged

        for _ in 0..50 {
            let d = state.apply(strategy, base, base, &mut rng);
            assert!(d <= max);
            assert!(d >= base);
        }
    }
}
