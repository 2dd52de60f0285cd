use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries, the first one included.
    pub attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(1),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = self.factor.max(1).saturating_pow(retry);
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Whether an operation may be replayed after an ambiguous failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Idempotent,
    /// Only failures that happened before the statement reached the server
    /// are retried.
    NonIdempotent,
}

/// Runs `op` until it succeeds, fails with an error `retryable` rejects, or
/// the policy runs out of attempts.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    name: &'static str,
    retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retry + 1 < attempts && retryable(&err) => {
                let delay = policy.delay_for(retry);
                warn!(
                    operation = name,
                    attempt = retry + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient storage failure, retrying"
                );
                sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Failures worth retrying for `mode`.
pub fn is_transient(err: &sqlx::Error, mode: Retry) -> bool {
    match mode {
        Retry::NonIdempotent => matches!(err, sqlx::Error::PoolTimedOut),
        Retry::Idempotent => match err {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
            _ => false,
        },
    }
}

fn is_transient_sqlstate(code: &str) -> bool {
    // 08xxx connection exceptions, serialization failure, deadlock, cannot connect now.
    code.starts_with("08") || matches!(code, "40001" | "40P01" | "57P03")
}
