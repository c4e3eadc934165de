//! Bounded exponential-backoff retry for flaky provider calls.
//!
//! The policy is a plain value so tests can exercise the schedule with an
//! injected sleeper instead of real waiting. Exhausting the attempts
//! surfaces the last error to the caller; it never aborts the whole run.

use std::time::Duration;

use crate::provider::ProviderError;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Lower bound on the computed wait.
    pub min_wait: Duration,
    /// Upper bound on the computed wait.
    pub max_wait: Duration,
    /// Scale applied to the exponential term.
    pub multiplier: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_wait: Duration::from_secs(4),
            max_wait: Duration::from_secs(20),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry following failure number `failed_attempts`
    /// (1-based): `multiplier * 2^failed_attempts` seconds, clamped to
    /// `[min_wait, max_wait]`. With the defaults: 4s, 8s, 16s, 20s.
    pub fn wait_for(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.min(32);
        let secs = self.multiplier.saturating_mul(1u64 << exp);
        Duration::from_secs(secs).clamp(self.min_wait, self.max_wait)
    }

    /// Run `op` until it succeeds or the attempts are exhausted, sleeping
    /// with `std::thread::sleep` between attempts.
    pub fn run<T, F>(&self, what: &str, op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Result<T, ProviderError>,
    {
        self.run_with_sleeper(what, op, std::thread::sleep)
    }

    /// Like `run`, but with an injectable sleeper for tests.
    pub fn run_with_sleeper<T, F, S>(
        &self,
        what: &str,
        mut op: F,
        mut sleep: S,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Result<T, ProviderError>,
        S: FnMut(Duration),
    {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    let wait = self.wait_for(attempt);
                    log::warn!(
                        "{what} failed (attempt {attempt}/{}): {err}; retrying in {:?}",
                        self.max_attempts,
                        wait
                    );
                    sleep(wait);
                    attempt += 1;
                }
                Err(err) => {
                    log::error!("{what} failed after {} attempts: {err}", self.max_attempts);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_times(failures: usize) -> impl FnMut() -> Result<u32, ProviderError> {
        let mut calls = 0;
        move || {
            calls += 1;
            if calls <= failures {
                Err(ProviderError::Http(format!("boom {calls}")))
            } else {
                Ok(42)
            }
        }
    }

    #[test]
    fn wait_schedule_matches_defaults() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (1..=4).map(|n| policy.wait_for(n).as_secs()).collect();
        assert_eq!(waits, vec![4, 8, 16, 20]);
        // The cap holds from the fourth failure on.
        assert_eq!(policy.wait_for(5).as_secs(), 20);
        assert_eq!(policy.wait_for(30).as_secs(), 20);
    }

    #[test]
    fn succeeds_without_retrying() {
        let policy = RetryPolicy::default();
        let mut slept = Vec::new();
        let result = policy.run_with_sleeper("op", failing_times(0), |d| slept.push(d));
        assert_eq!(result.unwrap(), 42);
        assert!(slept.is_empty());
    }

    #[test]
    fn retries_until_success() {
        let policy = RetryPolicy::default();
        let mut slept = Vec::new();
        let result = policy.run_with_sleeper("op", failing_times(2), |d| slept.push(d));
        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            slept,
            vec![Duration::from_secs(4), Duration::from_secs(8)]
        );
    }

    #[test]
    fn exhaustion_surfaces_last_error() {
        let policy = RetryPolicy::default();
        let mut slept = Vec::new();
        let result: Result<u32, _> =
            policy.run_with_sleeper("op", failing_times(10), |d| slept.push(d));
        let err = result.unwrap_err();
        // Five attempts total, so the last error is from call number five.
        assert!(err.to_string().contains("boom 5"));
        assert_eq!(slept.len(), 4);
        assert_eq!(slept[3], Duration::from_secs(20));
    }
}
