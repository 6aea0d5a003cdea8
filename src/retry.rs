//! Bounded retry with an explicit attempt count and backoff strategy

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay strategy between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        factor: u32,
        max: Duration,
    },
}

impl Backoff {
    /// Pause after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                factor,
                max,
            } => {
                let exp = attempt.saturating_sub(1).min(31);
                let scale = factor.max(1).saturating_pow(exp);
                initial.saturating_mul(scale).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Run `op` until it succeeds or attempts run out. Sleeps only between
    /// attempts, never after the last one. Returns the last error.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    warn!(
                        "{} failed: {} ({}/{})",
                        operation, e, attempt, self.max_attempts
                    );
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                }
            }
        }
    }

    /// Poll `probe` until it yields a value. `None` and errors both count as
    /// a miss; errors are not surfaced.
    pub async fn poll<T, E, F, Fut>(&self, mut probe: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        for attempt in 1..=self.max_attempts {
            if let Ok(Some(value)) = probe(attempt).await {
                return Some(value);
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff.delay(attempt)).await;
            }
        }
        None
    }
}
