//! Supervisor reconnect policy, driven on tokio's paused clock.

use std::time::Duration;

use tokio::time::Instant;

use channel_relay::supervisor::{supervise, RetryPolicy, SupervisorExit};

fn policy(max_attempts: Option<u32>) -> RetryPolicy {
    RetryPolicy {
        delay: Duration::from_secs(5),
        max_attempts,
    }
}

async fn fail(reason: &'static str) -> anyhow::Result<()> {
    Err(anyhow::anyhow!(reason))
}

async fn close() -> anyhow::Result<()> {
    Ok(())
}

#[test]
fn default_policy_retries_forever_every_five_seconds() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay, Duration::from_secs(5));
    assert_eq!(policy.max_attempts, None);
}

#[tokio::test(start_paused = true)]
async fn failed_connections_retry_after_fixed_delay() {
    let start = Instant::now();
    let mut offsets = Vec::new();

    let exit = supervise(
        policy(None),
        |_| {
            offsets.push(start.elapsed());
            fail("gateway closed")
        },
        tokio::time::sleep(Duration::from_secs(12)),
    )
    .await;

    assert_eq!(exit, SupervisorExit::Interrupted);
    assert_eq!(
        offsets,
        vec![
            Duration::from_secs(0),
            Duration::from_secs(5),
            Duration::from_secs(10)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn bounded_attempts_stop_without_a_final_sleep() {
    let start = Instant::now();
    let mut attempts = Vec::new();

    let exit = supervise(
        policy(Some(3)),
        |attempt| {
            attempts.push(attempt);
            fail("invalid session")
        },
        std::future::pending(),
    )
    .await;

    assert_eq!(exit, SupervisorExit::AttemptsExhausted { attempts: 3 });
    assert_eq!(attempts, vec![1, 2, 3]);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn clean_disconnect_also_reconnects() {
    let mut calls = 0u32;

    let exit = supervise(
        policy(Some(2)),
        |_| {
            calls = calls.saturating_add(1);
            close()
        },
        std::future::pending(),
    )
    .await;

    assert_eq!(exit, SupervisorExit::AttemptsExhausted { attempts: 2 });
    assert_eq!(calls, 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_live_connection() {
    let mut calls = 0u32;

    let exit = supervise(
        policy(None),
        |_| {
            calls = calls.saturating_add(1);
            std::future::pending::<anyhow::Result<()>>()
        },
        tokio::time::sleep(Duration::from_secs(1)),
    )
    .await;

    assert_eq!(exit, SupervisorExit::Interrupted);
    assert_eq!(calls, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_retry_sleep() {
    let start = Instant::now();

    let exit = supervise(
        policy(None),
        |_| fail("network unreachable"),
        tokio::time::sleep(Duration::from_secs(2)),
    )
    .await;

    assert_eq!(exit, SupervisorExit::Interrupted);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}
