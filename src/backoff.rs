//! Retry Backoff Policy
//!
//! Pure computation of the delay to sleep before a retry attempt:
//! exponential growth capped at a maximum, with uniform jitter so many
//! clients recovering together do not retry in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::config::Config;

/// Computes the delay preceding the given retry attempt.
///
/// Attempt 0 is the first try and gets the configured initial delay with
/// no jitter. Later attempts grow by `retry_multiplier^attempt`, are
/// capped at `max_retry_delay`, and are jittered by a uniformly random
/// offset in ±`jitter_fraction` of the delay. Jitter never pushes a delay
/// below the initial delay.
pub fn delay_for_attempt(config: &Config, attempt: u32) -> Duration {
    if attempt == 0 {
        return config.retry_delay;
    }

    let mut delay = config.retry_delay.as_secs_f64();
    for _ in 0..attempt {
        delay *= config.retry_multiplier;
    }

    let max_delay = config.max_retry_delay.as_secs_f64();
    if delay > max_delay {
        delay = max_delay;
    }

    if config.jitter_fraction > 0.0 {
        let jitter = delay * config.jitter_fraction;
        delay += (rand::thread_rng().gen::<f64>() * 2.0 - 1.0) * jitter;
    }

    let delay = Duration::from_secs_f64(delay.max(0.0));
    delay.max(config.retry_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config() -> Config {
        Config {
            retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
            retry_multiplier: 2.0,
            jitter_fraction: 0.1,
            ..Config::default()
        }
    }

    #[test]
    fn first_attempt_gets_initial_delay_unjittered() {
        let config = retry_config();
        assert_eq!(delay_for_attempt(&config, 0), Duration::from_millis(100));
    }

    #[test]
    fn delays_never_undercut_initial_delay() {
        let config = retry_config();
        for attempt in 1..8 {
            assert!(delay_for_attempt(&config, attempt) >= config.retry_delay);
        }
    }

    #[test]
    fn delays_respect_jittered_ceiling() {
        let config = retry_config();
        let ceiling = Duration::from_secs_f64(5.0 * 1.1);
        for attempt in 1..16 {
            assert!(delay_for_attempt(&config, attempt) <= ceiling);
        }
    }

    #[test]
    fn growth_is_exponential_without_jitter() {
        let config = Config {
            jitter_fraction: 0.0,
            ..retry_config()
        };
        assert_eq!(delay_for_attempt(&config, 1), Duration::from_millis(200));
        assert_eq!(delay_for_attempt(&config, 2), Duration::from_millis(400));
        assert_eq!(delay_for_attempt(&config, 3), Duration::from_millis(800));
    }

    #[test]
    fn growth_caps_at_max_delay() {
        let config = Config {
            jitter_fraction: 0.0,
            ..retry_config()
        };
        assert_eq!(delay_for_attempt(&config, 20), Duration::from_secs(5));
    }
}
