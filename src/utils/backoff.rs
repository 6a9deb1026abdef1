// src/utils/backoff.rs

//! Exponential backoff for repeated login attempts.
//!
//! The delay doubles after every failure with a small random jitter added,
//! capped at one hour. There is no attempt limit; callers retry until the
//! operation succeeds.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed value for the delay sequence in seconds.
pub const INITIAL_DELAY_SECS: f64 = 1.0;

/// Upper bound on any single delay in seconds.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Compute the delay that follows `current`, given a jitter sample in [0, 1).
pub fn next_delay(current: f64, jitter: f64, cap: f64) -> f64 {
    (current * 2.0 + jitter).min(cap)
}

/// Stateful delay sequence for login retries.
#[derive(Debug)]
pub struct Backoff {
    current: f64,
    cap: f64,
    rng: StdRng,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            current: INITIAL_DELAY_SECS,
            cap: MAX_DELAY_SECS,
            rng: StdRng::from_entropy(),
        }
    }

    /// Advance the sequence after a failure and return the delay to sleep.
    ///
    /// The seed value is doubled before the first sleep, so the first wait
    /// lands between 2 and 3 seconds.
    pub fn after_failure(&mut self) -> Duration {
        let jitter = self.rng.gen_range(0.0..1.0);
        self.current = next_delay(self.current, jitter, self.cap);
        Duration::from_secs_f64(self.current)
    }

    /// Return to the seed value after a success.
    pub fn reset(&mut self) {
        self.current = INITIAL_DELAY_SECS;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn next_delay_doubles_and_adds_jitter() {
        assert_eq!(next_delay(1.0, 0.5, MAX_DELAY_SECS), 2.5);
        assert_eq!(next_delay(4.0, 0.0, MAX_DELAY_SECS), 8.0);
    }

    #[test]
    fn next_delay_caps_at_one_hour() {
        assert_eq!(next_delay(3000.0, 0.9, MAX_DELAY_SECS), 3600.0);
        assert_eq!(next_delay(3600.0, 0.9, MAX_DELAY_SECS), 3600.0);
    }

    #[test]
    fn first_delay_is_between_two_and_three_seconds() {
        let mut backoff = Backoff::new();
        let first = backoff.after_failure();
        assert!(first >= Duration::from_secs(2));
        assert!(first < Duration::from_secs(3));
    }

    #[test]
    fn delays_grow_until_capped() {
        let mut backoff = Backoff::new();
        let mut previous = backoff.after_failure();
        for _ in 0..20 {
            let delay = backoff.after_failure();
            assert!(delay >= previous);
            assert!(delay.as_secs_f64() <= previous.as_secs_f64() * 2.0 + 1.0);
            assert!(delay <= Duration::from_secs(3600));
            previous = delay;
        }
        // 2^12 already exceeds the cap, so 20 failures pin the delay there.
        assert_eq!(previous, Duration::from_secs(3600));
    }

    #[test]
    fn reset_returns_to_seed() {
        let mut backoff = Backoff::new();
        for _ in 0..10 {
            backoff.after_failure();
        }
        backoff.reset();
        let first = backoff.after_failure();
        assert!(first < Duration::from_secs(3));
    }

    proptest! {
        #[test]
        fn delay_never_exceeds_cap(
            current in 0.0f64..10_000.0,
            jitter in 0.0f64..1.0,
        ) {
            prop_assert!(next_delay(current, jitter, MAX_DELAY_SECS) <= MAX_DELAY_SECS);
        }

        #[test]
        fn delay_below_cap_is_twice_plus_jitter(
            current in 1.0f64..1_700.0,
            jitter in 0.0f64..1.0,
        ) {
            let next = next_delay(current, jitter, MAX_DELAY_SECS);
            prop_assert!(next >= current * 2.0);
            prop_assert!(next <= current * 2.0 + 1.0);
        }
    }
}
