use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::config::RetryConfig;
use crate::error::RetryExhausted;

/// Bounded retry with a fixed delay between attempts.
///
/// This is the only fault-tolerance mechanism in the pipeline: every
/// externally-fallible step runs through [`RetryPolicy::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds or `max_attempts` is reached.
    ///
    /// `operation` labels every log line. A policy of zero attempts still
    /// makes one.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max {
            info!("{operation}: attempt {attempt}/{max}");

            match op().await {
                Ok(value) => {
                    info!("{operation} succeeded on attempt {attempt}");
                    return Ok(value);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < max {
                        error!(
                            "{operation} failed on attempt {attempt}/{max}: {last_error}. Retrying in {}s...",
                            self.delay.as_secs_f64()
                        );
                        tokio::time::sleep(self.delay).await;
                    } else {
                        error!("{operation} failed on attempt {attempt}/{max}: {last_error}");
                    }
                }
            }
        }

        error!("{operation} failed after {max} attempts: {last_error}");
        Err(RetryExhausted {
            operation: operation.to_string(),
            attempts: max,
            last_error,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::logging::capture::capture;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        for n in 1..=5u32 {
            let (logs, _guard) = capture();
            let counter = AtomicU32::new(0);
            let calls = &counter;

            let result = fast(5)
                .run("Flaky step", move || async move {
                    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if call < n {
                        Err(format!("transient #{call}"))
                    } else {
                        Ok(call)
                    }
                })
                .await;

            assert_eq!(result, Ok(n));
            assert_eq!(calls.load(Ordering::SeqCst), n);
            assert_eq!(logs.count("Flaky step: attempt"), n as usize);
            assert_eq!(logs.count("Flaky step failed on attempt"), (n - 1) as usize);
            assert_eq!(logs.count(&format!("Flaky step succeeded on attempt {n}")), 1);
        }
    }

    #[tokio::test]
    async fn exhaustion_carries_last_error() {
        let (logs, _guard) = capture();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let err = fast(3)
            .run("Always broken", move || async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(format!("boom {call}"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, "boom 3");
        assert_eq!(err.operation, "Always broken");
        assert_eq!(logs.count("Always broken: attempt"), 3);
        assert_eq!(logs.count("Retrying in"), 2);
        assert_eq!(logs.count("Always broken failed after 3 attempts: boom 3"), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast(0)
            .run("Once", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("nope")
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_from_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(10));
    }
}
