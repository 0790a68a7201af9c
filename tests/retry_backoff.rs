// tests/retry_backoff.rs

use std::time::Duration;

use taskdag::dag::RetryConfig;
use taskdag::exec::backoff_delay;
use taskdag::types::BackoffStrategy;

fn config(strategy: BackoffStrategy, initial_ms: u64) -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        backoff_strategy: strategy,
        initial_delay: Duration::from_millis(initial_ms),
    }
}

fn delays_ms(cfg: &RetryConfig) -> Vec<u128> {
    (1..=3).map(|n| backoff_delay(cfg, n).as_millis()).collect()
}

#[test]
fn exponential_doubles_each_attempt() {
    assert_eq!(delays_ms(&config(BackoffStrategy::Exponential, 100)), vec![100, 200, 400]);
}

#[test]
fn linear_grows_by_initial_delay() {
    assert_eq!(delays_ms(&config(BackoffStrategy::Linear, 100)), vec![100, 200, 300]);
}

#[test]
fn fixed_never_changes() {
    assert_eq!(delays_ms(&config(BackoffStrategy::Fixed, 100)), vec![100, 100, 100]);
}

#[test]
fn zero_initial_delay_means_immediate_retry() {
    let cfg = config(BackoffStrategy::Exponential, 0);
    assert_eq!(cfg.delay_for(5), Duration::ZERO);
}

#[test]
fn attempt_zero_has_no_delay() {
    assert_eq!(backoff_delay(&config(BackoffStrategy::Linear, 100), 0), Duration::ZERO);
}

#[test]
fn huge_attempt_numbers_saturate() {
    let cfg = config(BackoffStrategy::Exponential, 100);
    // Must not panic on overflow.
    let delay = cfg.delay_for(u32::MAX);
    assert!(delay >= Duration::from_secs(3600));
}

#[test]
fn max_attempts_includes_the_first_try() {
    assert_eq!(config(BackoffStrategy::Fixed, 1).max_attempts(), 4);
    assert_eq!(RetryConfig::default().max_attempts(), 1);
}

#[test]
fn strategy_names_parse() {
    assert_eq!("Linear".parse::<BackoffStrategy>().unwrap(), BackoffStrategy::Linear);
    assert!("random".parse::<BackoffStrategy>().is_err());
}
