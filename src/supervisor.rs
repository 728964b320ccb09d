//! Connection supervisor: reconnect with a fixed delay until interrupted.
//!
//! Each connection attempt is a future produced by the caller. When it fails
//! or ends, the supervisor logs the reason, sleeps for the configured delay,
//! and starts the next attempt. There is no backoff growth. Work is never
//! buffered here, so a reconnect cannot replay anything.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

/// Reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Attempt limit; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// Why the supervisor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The shutdown signal fired.
    Interrupted,
    /// `max_attempts` connection attempts were made.
    AttemptsExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Run `connect` repeatedly until `shutdown` resolves or attempts run out.
///
/// `connect` receives the 1-based attempt number. `shutdown` is polled both
/// while connected and while waiting to reconnect.
pub async fn supervise<C, Fut, S>(policy: RetryPolicy, mut connect: C, shutdown: S) -> SupervisorExit
where
    C: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        info!(attempt, "connecting");

        tokio::select! {
            result = connect(attempt) => match result {
                Ok(()) => warn!(attempt, "connection closed"),
                Err(e) => error!(attempt, error = %format!("{e:#}"), "connection failed"),
            },
            () = &mut shutdown => {
                info!("received shutdown signal, stopping");
                return SupervisorExit::Interrupted;
            }
        }

        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            error!(attempts = attempt, "connection attempts exhausted");
            return SupervisorExit::AttemptsExhausted { attempts: attempt };
        }

        info!(
            attempt,
            delay_secs = policy.delay.as_secs_f64(),
            "reconnecting after delay"
        );
        tokio::select! {
            () = tokio::time::sleep(policy.delay) => {}
            () = &mut shutdown => {
                info!("received shutdown signal, stopping");
                return SupervisorExit::Interrupted;
            }
        }
    }
}
