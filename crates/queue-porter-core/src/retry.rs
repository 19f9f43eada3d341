//! Retry policies for remote storage calls.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use storage_runtime::StorageError;

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

/// Bounded exponential back-off policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,

    /// Whether to randomize delays to avoid thundering herds
    pub use_jitter: bool,

    /// Jitter magnitude as a fraction of the computed delay (0.0 to 1.0)
    pub jitter_percent: f64,
}

impl RetryPolicy {
    /// Create policy with jitter enabled at the default 25%
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }

    /// Policy for transient server faults: a handful of quick retries
    /// with bounded growth
    pub fn transient_server_backoff() -> Self {
        Self::new(5, Duration::from_millis(500), Duration::from_secs(16), 2.0)
    }

    /// Patient policy for eventual-consistency windows, such as a queue
    /// that was just created and is not yet available
    pub fn slow_instantiation() -> Self {
        Self::new(8, Duration::from_secs(1), Duration::from_secs(30), 2.0)
    }

    /// Disable jitter (useful for deterministic tests)
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Set jitter magnitude, clamped to [0.0, 1.0]
    pub fn with_jitter_percent(mut self, percent: f64) -> Self {
        self.jitter_percent = percent.clamp(0.0, 1.0);
        self
    }

    /// Delay before the retry following the given zero-based attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let millis = if self.use_jitter && self.jitter_percent > 0.0 {
            let jitter_range = capped * self.jitter_percent;
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped + jitter).max(1.0)
        } else {
            capped.max(1.0)
        };

        Duration::from_millis(millis as u64)
    }

    /// Whether another retry is allowed after the given zero-based attempt
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Total attempts including the initial one
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts + 1
    }

    /// Run `operation` until it succeeds, fails with a non-retriable error,
    /// or exhausts the policy
    ///
    /// `is_retriable` classifies errors; anything it rejects propagates
    /// immediately. Exhausted retries propagate the last error.
    pub async fn run<T, F, Fut, C>(
        &self,
        is_retriable: C,
        operation: F,
    ) -> Result<T, StorageError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
        C: Fn(&StorageError) -> bool,
    {
        let mut state = RetryState::new();
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if is_retriable(&error) && state.can_retry(self) => {
                    let delay = state.get_delay(self);
                    debug!(
                        attempt = state.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying storage operation"
                    );
                    tokio::time::sleep(delay).await;
                    state.next_attempt();
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::transient_server_backoff()
    }
}

/// Progress through a retry loop
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Zero-based retry attempt about to be made
    pub attempt: u32,

    /// Attempts made so far, counting the initial one
    pub total_attempts: u32,
}

impl RetryState {
    /// Start tracking, with the initial attempt counted
    pub fn new() -> Self {
        Self {
            attempt: 0,
            total_attempts: 1,
        }
    }

    /// Record that another attempt is being made
    pub fn next_attempt(&mut self) {
        self.attempt += 1;
        self.total_attempts += 1;
    }

    /// Whether this is the first retry
    pub fn is_first_retry(&self) -> bool {
        self.attempt == 0
    }

    /// Delay to apply before the next attempt
    pub fn get_delay(&self, policy: &RetryPolicy) -> Duration {
        policy.calculate_delay(self.attempt)
    }

    /// Whether the policy allows another retry
    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        policy.should_retry(self.attempt)
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}
