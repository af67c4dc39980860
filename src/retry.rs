//! Retry policy shared by the blocking and async clients.
//!
//! The policy is expressed as pure functions ([`classify`] and
//! [`RetryConfig::delay_for_attempt`]) plus a small state machine,
//! [`RetryState`], that consumes the outcome of each attempt and says what to
//! do next. The two clients only perform I/O and sleep; every decision about
//! retrying is made here, so both calling conventions behave identically.

use crate::request::Call;
use crate::response::Expect;
use crate::{Error, Result};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff settings for transient failures.
///
/// The delay before retry `n` (0-indexed) is
/// `min(base_delay_ms * 2^n, max_delay_ms)`. There is no jitter, so delays are
/// reproducible.
///
/// # Examples
///
/// ```
/// use ucotron::RetryConfig;
/// use std::time::Duration;
///
/// let retry = RetryConfig::default();
/// assert_eq!(retry.max_attempts(), 4);
/// assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(100));
/// assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(800));
/// assert_eq!(retry.delay_for_attempt(10), Duration::from_millis(5000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Creates a new `RetryConfig`.
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// A configuration that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Total number of HTTP attempts per logical call.
    pub fn max_attempts(&self) -> usize {
        self.max_retries as usize + 1
    }

    /// Returns the delay to wait after the failed attempt with the given
    /// 0-based index.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(Error::Configuration(
                "base_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Configuration(format!(
                "max_delay_ms ({}) must be at least base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

/// How a response status is treated by the retry engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Below 400: decode the body and return it.
    Success,
    /// 400 to 499: surface the error without retrying.
    Terminal,
    /// 500 and above: record the error and retry if budget remains.
    Transient,
}

/// Classifies a response status code.
///
/// This boundary is fixed for every endpoint.
pub fn classify(status: StatusCode) -> Disposition {
    match status.as_u16() {
        0..=399 => Disposition::Success,
        400..=499 => Disposition::Terminal,
        _ => Disposition::Transient,
    }
}

/// What a client loop must do after an attempt.
#[derive(Debug)]
pub(crate) enum Step<T> {
    /// Stop and hand this result to the caller.
    Finish(Result<T>),
    /// Sleep for the given delay, then make another attempt.
    Backoff(Duration),
}

/// Attempt accounting for one logical call.
pub(crate) struct RetryState<'a> {
    config: RetryConfig,
    call: &'a Call,
    attempt: u32,
}

impl<'a> RetryState<'a> {
    pub(crate) fn new(config: RetryConfig, call: &'a Call) -> Self {
        Self {
            config,
            call,
            attempt: 0,
        }
    }

    /// The 0-based index of the attempt about to be made.
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Consumes the outcome of the current attempt.
    ///
    /// `exchange` is either the status and body the server sent, or the
    /// connection error raised by the transport.
    pub(crate) fn advance<E: Expect>(
        &mut self,
        exchange: Result<(StatusCode, String)>,
    ) -> Step<E::Output> {
        let error = match exchange {
            Ok((status, body)) => match classify(status) {
                Disposition::Success => {
                    let decoded = E::decode(status, body);
                    if let Err(e) = &decoded {
                        tracing::error!(
                            error = %e,
                            method = %self.call.method,
                            path = %self.call.path,
                            "Failed to decode response"
                        );
                    }
                    return Step::Finish(decoded);
                }
                Disposition::Terminal => {
                    let error = Error::server(status, body);
                    tracing::error!(
                        status = status.as_u16(),
                        method = %self.call.method,
                        path = %self.call.path,
                        error = %error,
                        "Client error (4xx)"
                    );
                    return Step::Finish(Err(error));
                }
                Disposition::Transient => Error::server(status, body),
            },
            Err(e) if e.is_retryable() => e,
            Err(e) => return Step::Finish(Err(e)),
        };

        let attempts = self.attempt as usize + 1;
        tracing::warn!(
            error = %error,
            attempt = attempts,
            max_attempts = self.config.max_attempts(),
            method = %self.call.method,
            path = %self.call.path,
            "Request failed"
        );

        if attempts >= self.config.max_attempts() {
            return Step::Finish(Err(Error::RetriesExhausted {
                attempts: self.config.max_attempts(),
                last_error: Box::new(error),
            }));
        }

        let delay = self.config.delay_for_attempt(self.attempt);
        self.attempt += 1;
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            attempt = attempts,
            "Retrying request after delay"
        );
        Step::Backoff(delay)
    }
}
