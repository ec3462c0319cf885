//! Backoff policies
//!
//! Every policy makes an immediate first attempt: attempt 0 always maps to a
//! zero delay. For a seed delay of 5 seconds:
//!
//! | attempt | constant | linear | exponential |
//! |---------|----------|--------|-------------|
//! | 0       | 0s       | 0s     | 0s          |
//! | 1       | 5s       | 5s     | 5s          |
//! | 2       | 5s       | 10s    | 10s         |
//! | 3       | 5s       | 15s    | 20s         |

use std::time::Duration;

use delayq_domain::{BackoffConfig, BackoffKind};

/// Maps a retry attempt to the delay before that attempt may run.
#[derive(Debug, Clone, Copy)]
pub enum BackoffPolicy {
    /// `seed` between every retry
    Constant(Duration),
    /// `seed × attempt`
    Linear(Duration),
    /// `seed × 2^(attempt − 1)`
    Exponential(Duration),
    /// Caller-supplied mapping, consulted for attempts ≥ 1
    Custom(fn(u32) -> Duration),
}

impl BackoffPolicy {
    /// Delay before `attempt` may run.
    ///
    /// Growth saturates at `Duration::MAX` instead of overflowing; the
    /// reconciler rejects schedules that cannot be represented.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        match self {
            Self::Constant(seed) => *seed,
            Self::Linear(seed) => seed.saturating_mul(attempt),
            Self::Exponential(seed) => {
                let nanos = seed.as_nanos();
                let exponent = attempt - 1;
                if nanos == 0 {
                    Duration::ZERO
                } else if exponent >= nanos.leading_zeros() {
                    Duration::MAX
                } else {
                    saturating_from_nanos(nanos << exponent)
                }
            }
            Self::Custom(delay) => delay(attempt),
        }
    }
}

fn saturating_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let subsec = u32::try_from(nanos % NANOS_PER_SEC).unwrap_or(0);
    u64::try_from(nanos / NANOS_PER_SEC).map_or(Duration::MAX, |secs| Duration::new(secs, subsec))
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffConfig::default().into()
    }
}

impl From<BackoffConfig> for BackoffPolicy {
    fn from(config: BackoffConfig) -> Self {
        let seed = Duration::from_secs(config.seed_secs);
        match config.kind {
            BackoffKind::Constant => Self::Constant(seed),
            BackoffKind::Linear => Self::Linear(seed),
            BackoffKind::Exponential => Self::Exponential(seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);
    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);

    fn odd_seed() -> Duration {
        HOUR * 7 + MINUTE * 3 + SECOND * 33
    }

    fn stock(seed: Duration) -> [BackoffPolicy; 3] {
        [
            BackoffPolicy::Constant(seed),
            BackoffPolicy::Linear(seed),
            BackoffPolicy::Exponential(seed),
        ]
    }

    #[test]
    fn attempt_zero_is_always_immediate() {
        for seed in [SECOND, MINUTE, HOUR * 6 + MINUTE * 9] {
            for policy in stock(seed) {
                assert_eq!(policy.delay_for(0), Duration::ZERO, "{policy:?}");
            }
        }
        assert_eq!(BackoffPolicy::Custom(|_| HOUR).delay_for(0), Duration::ZERO);
    }

    #[test]
    fn exponential_doubles_from_seed() {
        assert_eq!(BackoffPolicy::Exponential(SECOND).delay_for(1), SECOND);
        assert_eq!(BackoffPolicy::Exponential(MINUTE * 3).delay_for(2), MINUTE * 6);
        assert_eq!(BackoffPolicy::Exponential(MINUTE * 3).delay_for(3), MINUTE * 12);
        assert_eq!(
            BackoffPolicy::Exponential(odd_seed()).delay_for(9),
            HOUR * 1807 + MINUTE * 8 + SECOND * 48
        );
    }

    #[test]
    fn linear_grows_by_seed() {
        assert_eq!(BackoffPolicy::Linear(SECOND).delay_for(1), SECOND);
        assert_eq!(BackoffPolicy::Linear(MINUTE * 3).delay_for(2), MINUTE * 6);
        assert_eq!(BackoffPolicy::Linear(MINUTE * 3).delay_for(3), MINUTE * 9);
        assert_eq!(
            BackoffPolicy::Linear(odd_seed()).delay_for(9),
            HOUR * 63 + MINUTE * 31 + SECOND * 57
        );
    }

    #[test]
    fn constant_repeats_seed() {
        assert_eq!(BackoffPolicy::Constant(SECOND).delay_for(1), SECOND);
        assert_eq!(BackoffPolicy::Constant(MINUTE * 3).delay_for(2), MINUTE * 3);
        assert_eq!(BackoffPolicy::Constant(MINUTE * 3).delay_for(3), MINUTE * 3);
        assert_eq!(BackoffPolicy::Constant(odd_seed()).delay_for(9), odd_seed());
    }

    #[test]
    fn growth_saturates_instead_of_overflowing() {
        assert_eq!(BackoffPolicy::Exponential(SECOND).delay_for(65), Duration::MAX);
        assert_eq!(BackoffPolicy::Exponential(Duration::MAX).delay_for(2), Duration::MAX);
        assert_eq!(BackoffPolicy::Linear(Duration::MAX).delay_for(3), Duration::MAX);
        assert_eq!(BackoffPolicy::Exponential(Duration::ZERO).delay_for(90), Duration::ZERO);
    }

    #[test]
    fn sub_second_seeds_double_past_thirty_two_steps() {
        assert_eq!(
            BackoffPolicy::Exponential(Duration::from_nanos(1)).delay_for(40),
            Duration::from_nanos(549_755_813_888)
        );
        assert_eq!(
            BackoffPolicy::Exponential(Duration::from_millis(1)).delay_for(33),
            Duration::from_millis(4_294_967_296)
        );
        assert_eq!(
            BackoffPolicy::Exponential(Duration::from_millis(500)).delay_for(64),
            Duration::from_secs(1 << 62)
        );
    }

    #[test]
    fn custom_policy_sees_attempt_number() {
        let policy = BackoffPolicy::Custom(|attempt| SECOND * (attempt * attempt));
        assert_eq!(policy.delay_for(3), SECOND * 9);
    }

    #[test]
    fn builds_from_config() {
        let policy: BackoffPolicy =
            BackoffConfig { kind: BackoffKind::Linear, seed_secs: 4 }.into();
        assert_eq!(policy.delay_for(2), SECOND * 8);

        let default = BackoffPolicy::default();
        assert_eq!(default.delay_for(3), SECOND * 20);
    }
}
