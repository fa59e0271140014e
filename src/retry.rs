//! Bounded retries for transient API failures.

use crate::Error;
use std::fmt::Display;
use std::thread::sleep;
use std::time::Duration;

/// Classifies an error as transient (worth another attempt) or permanent.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Dropped connections surface as request errors, cut-off bodies
            // as body errors.
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Error::Status(status) => status.is_server_error() || status.as_u16() == 429,
            Error::Api { code, .. } => matches!(&**code, "maxlag" | "ratelimited" | "readonly"),
            // A truncated body looks like bad JSON.
            Error::Parse(e) => e.is_eof(),
            Error::Io(_)
            | Error::Json(_)
            | Error::InvalidDate(_)
            | Error::InvalidLanguage(_)
            | Error::Unavailable(_) => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub delay: Duration,
    /// Added to the delay after every failed attempt.
    pub increment: Duration,
}
impl RetryPolicy {
    /// Same pause between every attempt.
    pub fn fixed(attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay,
            increment: Duration::ZERO,
        }
    }
    /// Pause grows by `delay` after each failure: 1x, 2x, 3x...
    pub fn incremental(attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay,
            increment: delay,
        }
    }
    fn delay_after(&self, failures: u32) -> Duration {
        self.delay + self.increment * failures.saturating_sub(1)
    }
    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Retryable + Display,
    {
        let attempts = self.attempts.max(1);
        let mut failures = 0;
        loop {
            match op() {
                Ok(value) => {
                    if failures > 0 {
                        tracing::info!(what, attempts = failures + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && failures + 1 < attempts => {
                    failures += 1;
                    let delay = self.delay_after(failures);
                    tracing::warn!(
                        what,
                        error = %e,
                        attempt = failures,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "request failed, retrying"
                    );
                    sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
