//! Deterministic part of a retry delay (spec §4.5).

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The deterministic component of a retry delay, before jitter is applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Always wait the same amount of time.
    Fixed {
        /// The constant delay.
        #[serde(with = "crate::units::duration_millis")]
        delay: Duration,
    },
    /// Delay grows by a fixed increment per attempt, capped at `max`.
    Linear {
        /// Delay used for the first attempt.
        #[serde(with = "crate::units::duration_millis")]
        base: Duration,
        /// Amount added per additional attempt.
        #[serde(with = "crate::units::duration_millis")]
        increment: Duration,
        /// Upper bound on the computed delay.
        #[serde(with = "crate::units::duration_millis")]
        max: Duration,
    },
    /// Delay grows multiplicatively per attempt, capped at `max`.
    Exponential {
        /// Delay used for the first attempt.
        #[serde(with = "crate::units::duration_millis")]
        base: Duration,
        /// Multiplier applied per additional attempt.
        multiplier: f64,
        /// Upper bound on the computed delay.
        #[serde(with = "crate::units::duration_millis")]
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Validates the strategy's parameters per spec §4.5: `base > 0`,
    /// `incr ≥ 0`, `max ≥ base`, `mul ≥ 1.0`.
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            BackoffStrategy::Fixed { delay } => {
                if delay.is_zero() {
                    return Err(Error::InvalidArgument {
                        param: "backoff.delay",
                        reason: "must be > 0",
                    });
                }
            }
            BackoffStrategy::Linear { base, max, .. } => {
                if base.is_zero() {
                    return Err(Error::InvalidArgument {
                        param: "backoff.base",
                        reason: "must be > 0",
                    });
                }
                if max < base {
                    return Err(Error::InvalidArgument {
                        param: "backoff.max",
                        reason: "must be >= base",
                    });
                }
            }
            BackoffStrategy::Exponential {
                base, multiplier, max,
            } => {
                if base.is_zero() {
                    return Err(Error::InvalidArgument {
                        param: "backoff.base",
                        reason: "must be > 0",
                    });
                }
                if max < base {
                    return Err(Error::InvalidArgument {
                        param: "backoff.max",
                        reason: "must be >= base",
                    });
                }
                if multiplier < 1.0 {
                    return Err(Error::InvalidArgument {
                        param: "backoff.multiplier",
                        reason: "must be >= 1.0",
                    });
                }
            }
        }
        Ok(())
    }

    /// The `base` delay used as the seed for decorrelated jitter (spec
    /// §4.5: "`base` is the backoff's base delay"). For `Fixed`, the fixed
    /// delay itself plays that role.
    pub(crate) fn base_delay(&self) -> Duration {
        match *self {
            BackoffStrategy::Fixed { delay } => delay,
            BackoffStrategy::Linear { base, .. } => base,
            BackoffStrategy::Exponential { base, .. } => base,
        }
    }

    /// The configured cap on the computed delay.
    pub(crate) fn max_delay(&self) -> Duration {
        match *self {
            BackoffStrategy::Fixed { delay } => delay,
            BackoffStrategy::Linear { max, .. } => max,
            BackoffStrategy::Exponential { max, .. } => max,
        }
    }

    /// Computes the backoff delay for 1-based `attempt`, per spec §4.5.
    pub(crate) fn compute(&self, attempt: u32) -> Duration {
        debug_assert!(attempt >= 1, "attempt is 1-based");
        let n = attempt.saturating_sub(1);

        match *self {
            BackoffStrategy::Fixed { delay } => delay,
            BackoffStrategy::Linear {
                base,
                increment,
                max,
            } => (base + increment.saturating_mul(n)).min(max),
            BackoffStrategy::Exponential {
                base,
                multiplier,
                max,
            } => {
                let scaled = base.as_secs_f64() * multiplier.powi(n as i32);
                if !scaled.is_finite() || scaled > max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(scaled)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_never_changes() {
        let s = BackoffStrategy::Fixed {
            delay: Duration::from_millis(100),
        };
        assert_eq!(s.compute(1), Duration::from_millis(100));
        assert_eq!(s.compute(5), Duration::from_millis(100));
    }

    #[test]
    fn linear_grows_then_caps() {
        let s = BackoffStrategy::Linear {
            base: Duration::from_millis(100),
            increment: Duration::from_millis(50),
            max: Duration::from_millis(220),
        };
        assert_eq!(s.compute(1), Duration::from_millis(100));
        assert_eq!(s.compute(2), Duration::from_millis(150));
        assert_eq!(s.compute(3), Duration::from_millis(200));
        assert_eq!(s.compute(4), Duration::from_millis(220)); // would be 250, capped
    }

    #[test]
    fn exponential_grows_then_caps() {
        let s = BackoffStrategy::Exponential {
            base: Duration::from_millis(100),
            multiplier: 2.0,
            max: Duration::from_secs(30),
        };
        assert_eq!(s.compute(1), Duration::from_millis(100));
        assert_eq!(s.compute(2), Duration::from_millis(200));
        assert_eq!(s.compute(3), Duration::from_millis(400));
        assert_eq!(s.compute(9), Duration::from_millis(25_600)); // 100ms * 2^8 = 25.6s
        assert_eq!(s.compute(20), Duration::from_secs(30)); // overflow clamps to max
    }

    #[test]
    fn validation_rejects_zero_base() {
        let s = BackoffStrategy::Exponential {
            base: Duration::ZERO,
            multiplier: 2.0,
            max: Duration::from_secs(1),
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn validation_rejects_max_below_base() {
        let s = BackoffStrategy::Linear {
            base: Duration::from_secs(1),
            increment: Duration::from_millis(1),
            max: Duration::from_millis(500),
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn validation_rejects_sub_unity_multiplier() {
        let s = BackoffStrategy::Exponential {
            base: Duration::from_millis(100),
            multiplier: 0.5,
            max: Duration::from_secs(1),
        };
        assert!(s.validate().is_err());
    }
}
