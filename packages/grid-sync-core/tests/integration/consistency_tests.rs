//! Consistency waiter timing at second granularity.

use std::cell::Cell;
use std::time::{Duration, Instant};

use grid_sync_core::consistency::wait;

#[test]
fn test_constant_signal_returns_false_after_timeout() {
    let start = Instant::now();
    let changed: Result<bool, ()> = wait(
        || Ok("2024-07-24T10:00:00"),
        Duration::from_secs(2),
        Duration::from_secs(1),
    );
    let elapsed = start.elapsed();

    assert_eq!(changed, Ok(false));
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3) + Duration::from_millis(500));
}

#[test]
fn test_signal_change_returns_true_after_one_interval() {
    let calls = Cell::new(0);
    let start = Instant::now();
    let changed: Result<bool, ()> = wait(
        || {
            calls.set(calls.get() + 1);
            Ok(if calls.get() == 1 { 'A' } else { 'B' })
        },
        Duration::from_secs(10),
        Duration::from_secs(1),
    );
    let elapsed = start.elapsed();

    assert_eq!(changed, Ok(true));
    assert_eq!(calls.get(), 2);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
}
