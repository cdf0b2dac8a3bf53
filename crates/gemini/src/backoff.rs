//! Exponential-backoff retry around remote vision calls.
//!
//! Transient failures are retried with a delay that doubles from
//! [`RetryPolicy::initial_delay`] up to [`RetryPolicy::max_delay`], for at
//! most [`RetryPolicy::max_attempts`] attempts. Fatal failures return
//! immediately. Each job retries independently; the policy itself is
//! shared read-only.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::detector::VisionError;

/// Env var overriding [`RetryPolicy::max_attempts`].
pub const MAX_ATTEMPTS_ENV: &str = "BRUSHSCAN_MAX_ATTEMPTS";

/// Env var overriding [`RetryPolicy::initial_delay`], in seconds.
pub const BASE_DELAY_ENV: &str = "BRUSHSCAN_RETRY_BASE_SECS";

/// Env var overriding [`RetryPolicy::max_delay`], in seconds.
pub const MAX_DELAY_ENV: &str = "BRUSHSCAN_RETRY_MAX_SECS";

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Fraction (0..=1) of each delay that may be randomly shaved off.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Defaults overridden by [`MAX_ATTEMPTS_ENV`], [`BASE_DELAY_ENV`] and
    /// [`MAX_DELAY_ENV`] when they hold valid numbers.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_u64 = |key: &str| std::env::var(key).ok().and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            max_attempts: env_u64(MAX_ATTEMPTS_ENV)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_attempts),
            initial_delay: env_u64(BASE_DELAY_ENV)
                .map(Duration::from_secs)
                .unwrap_or(defaults.initial_delay),
            max_delay: env_u64(MAX_DELAY_ENV)
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_delay),
            ..defaults
        }
    }

    /// Disable jitter, making delays exactly the nominal sequence.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Nominal delay before the first retry, already clamped to the cap.
    pub fn first_delay(&self) -> Duration {
        self.initial_delay.min(self.max_delay)
    }
}

/// Calculate the next backoff delay from the current delay and policy.
///
/// The result is clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

/// Pick the actual sleep for a nominal delay.
///
/// The result lies in `[max(floor, nominal * (1 - jitter)), nominal]`, so
/// with `floor` set to the previous sleep the sequence never decreases and
/// never exceeds the cap.
pub fn jittered_delay(nominal: Duration, floor: Duration, jitter: f64) -> Duration {
    let high = nominal.as_millis() as u64;
    let shaved = (high as f64 * (1.0 - jitter.clamp(0.0, 1.0))) as u64;
    let low = shaved.max(floor.as_millis() as u64);
    if low >= high {
        return nominal;
    }
    Duration::from_millis(rand::rng().random_range(low..=high))
}

/// Failure of a remote operation after the retry policy was applied.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("{operation} gave up after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        last_error: VisionError,
    },

    #[error("{operation} failed on attempt {attempt}: {error}")]
    Fatal {
        operation: &'static str,
        attempt: u32,
        error: VisionError,
    },
}

impl DetectionError {
    /// The underlying remote error.
    pub fn vision_error(&self) -> &VisionError {
        match self {
            Self::Exhausted { last_error, .. } => last_error,
            Self::Fatal { error, .. } => error,
        }
    }
}

/// Bookkeeping for one in-flight call; discarded when it resolves.
struct RetryState {
    attempt_count: u32,
    last_error: Option<VisionError>,
    next_delay: Duration,
    last_sleep: Duration,
}

/// Run `op` under `policy`, retrying transient failures.
///
/// `operation` and `video` only label log lines and errors.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    video: &str,
    mut op: F,
) -> Result<T, DetectionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VisionError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut state = RetryState {
        attempt_count: 0,
        last_error: None,
        next_delay: policy.first_delay(),
        last_sleep: Duration::ZERO,
    };

    while state.attempt_count < max_attempts {
        state.attempt_count += 1;

        match op().await {
            Ok(value) => {
                if state.attempt_count > 1 {
                    tracing::info!(video, operation, attempt = state.attempt_count, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if !error.is_transient() => {
                tracing::error!(video, operation, attempt = state.attempt_count, error = %error, "Fatal error, not retrying");
                return Err(DetectionError::Fatal {
                    operation,
                    attempt: state.attempt_count,
                    error,
                });
            }
            Err(error) => {
                if state.attempt_count < max_attempts {
                    let sleep = jittered_delay(state.next_delay, state.last_sleep, policy.jitter);
                    tracing::warn!(
                        video,
                        operation,
                        attempt = state.attempt_count,
                        max_attempts,
                        delay_ms = sleep.as_millis() as u64,
                        error = %error,
                        "Transient error, retrying",
                    );
                    tokio::time::sleep(sleep).await;
                    state.last_sleep = sleep;
                    state.next_delay = next_delay(state.next_delay, policy);
                }
                state.last_error = Some(error);
            }
        }
    }

    let last_error = state
        .last_error
        .unwrap_or_else(|| VisionError::Transient("no attempt was made".into()));
    tracing::error!(video, operation, attempts = state.attempt_count, error = %last_error, "Retries exhausted");
    Err(DetectionError::Exhausted {
        operation,
        attempts: state.attempt_count,
        last_error,
    })
}
