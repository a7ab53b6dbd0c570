//! Integration tests for the tick scheduler and the mutation queue.
//!
//! Uses paused tokio time so `sleep_until` resolves as soon as the runtime
//! is otherwise idle.

use std::time::Duration;

use lodestone_tick::{TickConfig, TickScheduler, mutation_queue};

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_twenty_hz() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 20);
    assert_eq!(cfg.tick_duration(), Some(Duration::from_millis(50)));
}

#[test]
fn test_zero_rate_is_event_driven() {
    assert_eq!(TickConfig::with_rate(0).tick_duration(), None);
    assert!(TickScheduler::with_rate(0).is_event_driven());
}

#[test]
fn test_validated_clamps_rate_and_threshold() {
    let cfg = TickConfig {
        tick_rate_hz: 10_000,
        budget_warn_threshold: 3.0,
    }
    .validated();

    assert_eq!(cfg.tick_rate_hz, TickConfig::MAX_TICK_RATE_HZ);
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_with_fixed_dt() {
    let mut s = TickScheduler::with_rate(20);

    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(info.dt, Duration::from_millis(50));
        assert!(!info.overrun);
    }
    assert_eq!(s.tick_count(), 5);
    assert_eq!(s.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_late_tick_skips_ahead() {
    let mut s = TickScheduler::with_rate(20);
    s.wait_for_tick().await;

    // The owner blocks for 3.5 ticks' worth of time.
    tokio::time::advance(Duration::from_millis(225)).await;
    let info = s.wait_for_tick().await;

    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 3);
    assert_eq!(s.metrics().total_overruns, 1);

    // The next tick is a full period later, not a catch-up burst.
    let before = tokio::time::Instant::now();
    s.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_event_driven_never_fires() {
    let mut s = TickScheduler::with_rate(0);

    let result = tokio::time::timeout(Duration::from_secs(5), s.wait_for_tick()).await;
    assert!(result.is_err(), "event-driven scheduler should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_tick_is_noop() {
    let mut s = TickScheduler::with_rate(20);
    s.record_tick_end();
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

// =========================================================================
// Integration: the owner loop pattern
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_owner_loop_drains_queue_each_tick_until_shutdown() {
    let mut s = TickScheduler::with_rate(20);
    let (tx, mut queue) = mutation_queue::<Vec<u64>>();

    let producer = tx.clone();
    tokio::spawn(async move {
        for n in 0..3 {
            producer.submit(move |v| v.push(n)).unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
        producer.request_shutdown().unwrap();
    });

    let mut state = Vec::new();
    loop {
        let info = s.wait_for_tick().await;
        let outcome = queue.drain(&mut state);
        s.record_tick_end();
        if outcome.shutdown_requested {
            assert!(info.tick >= 4);
            break;
        }
    }

    assert_eq!(state, vec![0, 1, 2]);
}
