//! Opt-in retries with exponential backoff for transient probe failures.
//!
//! Probes report failures as values, so the executor retries on outcomes
//! rather than on `Err`. The default policy makes a single attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::probe::ProbeResult;

const MAX_EXPONENT: usize = 20;

/// How many attempts to make and how long to wait between them
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
    /// Randomize each delay to 50-100% of its value.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Worst-case time spent sleeping between attempts
    pub fn max_total_delay(&self) -> Duration {
        let retries = self.max_attempts.saturating_sub(1);
        let growing = retries.min(MAX_EXPONENT);
        let head = (0..growing).fold(Duration::ZERO, |total, retry| {
            total.saturating_add(self.base_delay(retry))
        });
        // Past the exponent cap every delay is the same
        let flat = u32::try_from(retries - growing).unwrap_or(u32::MAX);
        let tail = self
            .base_delay(MAX_EXPONENT)
            .checked_mul(flat)
            .unwrap_or(Duration::MAX);
        head.saturating_add(tail)
    }

    /// Delay before retry number `retry` (0-indexed)
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let delay = self.base_delay(retry);
        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }

    fn base_delay(&self, retry: usize) -> Duration {
        // Exponent capped so powi can't overflow; max_delay caps the result anyway
        let exponent = retry.min(MAX_EXPONENT) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.min(self.max_delay.as_millis() as f64) as u64)
    }
}

/// Decides whether an outcome is worth another attempt
pub trait RetryClassifier<T>: Send + Sync {
    fn should_retry(&self, outcome: &T) -> bool;
}

/// Retries timeouts, DNS and connection failures. TLS failures and any HTTP
/// response, whatever its status, are final.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientProbeFailures;

impl RetryClassifier<ProbeResult> for TransientProbeFailures {
    fn should_retry(&self, outcome: &ProbeResult) -> bool {
        outcome.failure().is_some_and(|f| f.is_transient())
    }
}

/// Runs an operation until it yields a final outcome or attempts run out
#[derive(Debug, Clone)]
pub struct RetryExecutor<C> {
    policy: RetryPolicy,
    classifier: C,
}

impl RetryExecutor<TransientProbeFailures> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: TransientProbeFailures,
        }
    }
}

impl<C> RetryExecutor<C> {
    pub fn with_classifier(policy: RetryPolicy, classifier: C) -> Self {
        Self { policy, classifier }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation`, returning the first final outcome or the last attempt's
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> T
    where
        C: RetryClassifier<T>,
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut attempt = 1;
        loop {
            let outcome = operation().await;
            if attempt >= self.policy.max_attempts || !self.classifier.should_retry(&outcome) {
                return outcome;
            }

            let delay = self.policy.delay_for_retry(attempt - 1);
            debug!(
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying after transient failure"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
