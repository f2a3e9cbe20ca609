//! Bounded retry for connection establishment.
//!
//! Retries only cover opening and authenticating a session. Once a session
//! is up, request/reply failures go straight to the caller.

use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{ClientError, ClientResult};

/// How many times, how often, and for how long to try connecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made).
    pub attempts: u32,
    /// Pause after the first failed attempt.
    pub delay: Duration,
    /// Factor applied to the pause after each failed attempt.
    pub backoff: f64,
    /// Overall wall-clock budget. No new attempt starts once it is spent.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Creates a policy with `attempts` tries and no pause between them.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
            backoff: 1.0,
            timeout: None,
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1)
    }

    /// Sets the pause after the first failure.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the multiplicative backoff factor.
    #[must_use]
    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the overall wall-clock budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes the wall-clock budget.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// budget runs out.
    ///
    /// `op` receives the 1-based attempt number. A non-retryable error is
    /// returned as `Err` immediately.
    pub fn run<T>(&self, mut op: impl FnMut(u32) -> ClientResult<T>) -> ClientResult<RetryOutcome<T>> {
        let start = Instant::now();
        let max_attempts = self.attempts.max(1);
        let mut delay = self.delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match op(attempt) {
                Ok(value) => {
                    return Ok(RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    });
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            let elapsed = start.elapsed();
            let remaining = self.timeout.map(|t| t.saturating_sub(elapsed));
            if attempt >= max_attempts || remaining.is_some_and(|r| r.is_zero()) {
                return Ok(RetryOutcome::Exhausted {
                    attempts: attempt,
                    elapsed,
                    last_error: error,
                });
            }

            warn!(
                attempt,
                max_attempts,
                error = %error,
                delay = ?delay,
                "connection attempt failed, retrying"
            );

            let pause = remaining.map_or(delay, |r| delay.min(r));
            if !pause.is_zero() {
                thread::sleep(pause);
            }
            delay = scale(delay, self.backoff);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(100),
            backoff: 1.0,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Result of a retried operation that did not hit a non-retryable error.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// An attempt succeeded.
    Success {
        /// The value produced.
        value: T,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// The attempt count or time budget ran out.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Wall-clock time spent.
        elapsed: Duration,
        /// Error from the final attempt.
        last_error: ClientError,
    },
}

impl<T> RetryOutcome<T> {
    /// Converts exhaustion into [`ClientError::RetriesExhausted`].
    pub fn into_result(self) -> ClientResult<T> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Exhausted {
                attempts,
                elapsed,
                last_error,
            } => Err(ClientError::RetriesExhausted {
                attempts,
                elapsed,
                source: Box::new(last_error),
            }),
        }
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    if !factor.is_finite() || factor < 0.0 {
        return delay;
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn refused() -> ClientError {
        ClientError::Connection(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
    }

    #[test]
    fn test_success_on_first_attempt() {
        let outcome = RetryPolicy::new(3).run(|_| Ok(7)).unwrap();
        assert!(matches!(outcome, RetryOutcome::Success { value: 7, attempts: 1 }));
    }

    #[test]
    fn test_success_after_failures() {
        let outcome = RetryPolicy::new(5)
            .run(|attempt| if attempt < 3 { Err(refused()) } else { Ok(attempt) })
            .unwrap();
        assert!(matches!(outcome, RetryOutcome::Success { value: 3, attempts: 3 }));
    }

    #[test]
    fn test_exhausts_after_exact_attempt_count() {
        let mut calls = 0;
        let outcome = RetryPolicy::new(3)
            .run(|_| -> ClientResult<()> {
                calls += 1;
                Err(refused())
            })
            .unwrap();

        assert_eq!(calls, 3);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.is_connection_error());
            }
            RetryOutcome::Success { .. } => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn test_non_retryable_error_stops_immediately() {
        let mut calls = 0;
        let result = RetryPolicy::new(5).run(|_| -> ClientResult<()> {
            calls += 1;
            Err(ClientError::Authentication {
                message: "invalid user name or password".into(),
            })
        });

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ClientError::Authentication { .. })));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = RetryPolicy::new(0).run(|_| -> ClientResult<()> {
            calls += 1;
            Err(refused())
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_spent_timeout_stops_retrying() {
        let mut calls = 0;
        let outcome = RetryPolicy::new(100)
            .with_timeout(Duration::ZERO)
            .run(|_| -> ClientResult<()> {
                calls += 1;
                Err(refused())
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 1, .. }));
    }

    #[test]
    fn test_into_result_wraps_last_error() {
        let outcome: RetryOutcome<()> = RetryOutcome::Exhausted {
            attempts: 2,
            elapsed: Duration::from_millis(5),
            last_error: refused(),
        };
        match outcome.into_result() {
            Err(ClientError::RetriesExhausted { attempts, source, .. }) => {
                assert_eq!(attempts, 2);
                assert!(source.is_connection_error());
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_backoff_scales_delay() {
        assert_eq!(
            scale(Duration::from_millis(100), 2.0),
            Duration::from_millis(200)
        );
        assert_eq!(
            scale(Duration::from_millis(100), f64::NAN),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_default_matches_appliance_tooling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.delay, Duration::from_millis(100));
        assert_eq!(policy.timeout, Some(Duration::from_secs(30)));
    }
}
