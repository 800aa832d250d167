//! Polling and retry helpers for eventually consistent APIs
//!
//! `StateChangeConf` polls a refresh function until the object reaches one of
//! the target statuses. `retry_when` re-runs an operation while its error is
//! one of a known list of transient failures.

use crate::context::Context;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{debug, trace};

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
const RETRY_MIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryError {
    #[error("couldn't find resource ({retries} retries){}", suffix(.last_error))]
    NotFound {
        retries: u32,
        last_error: Option<String>,
    },

    #[error("unexpected state '{state}', wanted target '{expected}'{}", suffix(.last_error))]
    UnexpectedState {
        state: String,
        expected: String,
        last_error: Option<String>,
    },

    #[error("timeout while waiting for state to become '{expected}' (last state: '{last_state}', timeout: {timeout:?}){}", suffix(.last_error))]
    Timeout {
        last_state: String,
        expected: String,
        timeout: Duration,
        last_error: Option<String>,
    },

    #[error("wait cancelled")]
    Cancelled,

    #[error("{0}")]
    Refresh(String),
}

fn suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(err) if !err.is_empty() => format!(". last error: {}", err),
        _ => String::new(),
    }
}

impl RetryError {
    /// Attaches a status reason reported by the API, such as a Kendra `ErrorMessage`
    pub fn with_last_error(self, error: impl Into<String>) -> Self {
        let error = Some(error.into());
        match self {
            RetryError::NotFound { retries, .. } => RetryError::NotFound {
                retries,
                last_error: error,
            },
            RetryError::UnexpectedState {
                state, expected, ..
            } => RetryError::UnexpectedState {
                state,
                expected,
                last_error: error,
            },
            RetryError::Timeout {
                last_state,
                expected,
                timeout,
                ..
            } => RetryError::Timeout {
                last_state,
                expected,
                timeout,
                last_error: error,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RetryError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }
}

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// Lower bound for the back-off between refreshes
    pub min_timeout: Duration,
    /// Fixed wait between refreshes, replacing the back-off when in (0, 180s)
    pub poll_interval: Duration,
    /// Consecutive "not found" refreshes tolerated while a target is expected
    pub not_found_checks: u32,
    /// Consecutive target observations required before the wait succeeds
    pub continuous_target_occurence: u32,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            not_found_checks: 20,
            continuous_target_occurence: 1,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurence(mut self, occurences: u32) -> Self {
        self.continuous_target_occurence = occurences.max(1);
        self
    }

    fn next_wait(&self, wait: Duration, target_occurence: u32) -> Duration {
        let wait = if target_occurence == 0 { wait * 2 } else { wait };
        if self.poll_interval > Duration::ZERO && self.poll_interval < MAX_POLL_INTERVAL {
            self.poll_interval
        } else if wait < self.min_timeout {
            self.min_timeout
        } else if wait > MAX_WAIT {
            MAX_WAIT
        } else {
            wait
        }
    }

    /// Polls `refresh` until the object reaches a target status.
    ///
    /// `refresh` returns the object (or `None` when it does not exist) and its
    /// status. With an empty target list a missing object is success, which is
    /// how deletion waits are expressed; the result is then `None`.
    pub async fn wait_for_state<T, E, F, Fut>(
        &self,
        ctx: &Context,
        mut refresh: F,
    ) -> Result<Option<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(Option<T>, String), E>>,
        E: Display,
    {
        let deadline = Instant::now() + self.timeout;
        let expected = self.target.join(", ");
        let mut last_state = String::new();
        let mut wait = INITIAL_WAIT;
        let mut not_found_tick = 0u32;
        let mut target_occurence = 0u32;

        debug!(
            pending = ?self.pending,
            target = ?self.target,
            timeout = ?self.timeout,
            "Waiting for state"
        );

        if !self.delay.is_zero() && !sleep_or_cancel(ctx, self.delay, deadline).await? {
            return Err(self.timeout_error(last_state, expected));
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout_error(last_state, expected));
            }

            let refreshed = tokio::select! {
                res = time::timeout(remaining, refresh()) => res,
                _ = ctx.cancelled() => return Err(RetryError::Cancelled),
            };
            let (object, status) = match refreshed {
                Ok(result) => result.map_err(|e| RetryError::Refresh(e.to_string()))?,
                Err(_) => return Err(self.timeout_error(last_state, expected)),
            };

            match object {
                None => {
                    if self.target.is_empty() {
                        return Ok(None);
                    }
                    target_occurence = 0;
                    not_found_tick += 1;
                    if not_found_tick > self.not_found_checks {
                        return Err(RetryError::NotFound {
                            retries: not_found_tick,
                            last_error: None,
                        });
                    }
                }
                Some(object) => {
                    not_found_tick = 0;
                    last_state = status.clone();
                    trace!(status = %status, "Refreshed state");

                    if self.target.iter().any(|t| *t == status) {
                        target_occurence += 1;
                        if target_occurence >= self.continuous_target_occurence {
                            return Ok(Some(object));
                        }
                    } else if self.pending.iter().any(|p| *p == status) {
                        target_occurence = 0;
                    } else {
                        return Err(RetryError::UnexpectedState {
                            state: status,
                            expected,
                            last_error: None,
                        });
                    }
                }
            }

            wait = self.next_wait(wait, target_occurence);
            if !sleep_or_cancel(ctx, wait, deadline).await? {
                return Err(self.timeout_error(last_state, expected));
            }
        }
    }

    fn timeout_error(&self, last_state: String, expected: String) -> RetryError {
        RetryError::Timeout {
            last_state,
            expected,
            timeout: self.timeout,
            last_error: None,
        }
    }
}

/// Sleeps for `wait`, bounded by `deadline`. Returns false when the deadline passed.
async fn sleep_or_cancel(
    ctx: &Context,
    wait: Duration,
    deadline: Instant,
) -> Result<bool, RetryError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    let capped = wait.min(remaining);
    tokio::select! {
        _ = time::sleep(capped) => Ok(capped == wait || Instant::now() < deadline),
        _ = ctx.cancelled() => Err(RetryError::Cancelled),
    }
}

/// Re-runs `op` while `is_retryable` accepts its error and `timeout` has not
/// elapsed, then makes one final attempt.
pub async fn retry_when<T, E, F, Fut, P>(
    ctx: &Context,
    timeout: Duration,
    mut op: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let deadline = Instant::now() + timeout;
    let mut wait = INITIAL_WAIT;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        if Instant::now() >= deadline || ctx.is_cancelled() {
            debug!(error = %err, "Retry window elapsed, making final attempt");
            return op().await;
        }

        debug!(error = %err, ?wait, "Retrying after transient error");
        wait = (wait * 2).clamp(RETRY_MIN_TIMEOUT, MAX_WAIT);
        let capped = wait.min(deadline.saturating_duration_since(Instant::now()));
        tokio::select! {
            _ = time::sleep(capped) => {}
            _ = ctx.cancelled() => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(pending: &[&str], target: &[&str]) -> StateChangeConf {
        StateChangeConf::new(pending, target, Duration::from_secs(5))
            .poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn waits_through_pending_to_target() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast(&["CREATING"], &["ACTIVE"])
            .wait_for_state(&Context::new(), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    let status = if n < 2 { "CREATING" } else { "ACTIVE" };
                    Ok::<_, String>((Some(n), status.to_string()))
                }
            })
            .await
            .unwrap();

        assert_eq!(result, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_object_with_empty_target_is_done() {
        let result = fast(&["DELETING"], &[])
            .wait_for_state(&Context::new(), || async {
                Ok::<(Option<()>, String), String>((None, String::new()))
            })
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unexpected_status_fails_fast() {
        let err = fast(&["CREATING"], &["ACTIVE"])
            .wait_for_state(&Context::new(), || async {
                Ok::<_, String>((Some(()), "FAILED".to_string()))
            })
            .await
            .unwrap_err()
            .with_last_error("role cannot be assumed");

        assert!(matches!(err, RetryError::UnexpectedState { ref state, .. } if state == "FAILED"));
        assert_eq!(
            err.to_string(),
            "unexpected state 'FAILED', wanted target 'ACTIVE'. last error: role cannot be assumed"
        );
    }

    #[tokio::test]
    async fn not_found_checks_are_bounded() {
        let err = fast(&["CREATING"], &["ACTIVE"])
            .not_found_checks(2)
            .wait_for_state(&Context::new(), || async {
                Ok::<(Option<()>, String), String>((None, String::new()))
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RetryError::NotFound {
                retries: 3,
                last_error: None
            }
        );
    }

    #[tokio::test]
    async fn continuous_target_occurence_requires_repeats() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        fast(&["CREATING"], &["ACTIVE"])
            .continuous_target_occurence(2)
            .wait_for_state(&Context::new(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>((Some(()), "ACTIVE".to_string())) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn timeout_reports_last_state() {
        let err = StateChangeConf::new(&["UPDATING"], &["ACTIVE"], Duration::from_millis(50))
            .poll_interval(Duration::from_millis(5))
            .wait_for_state(&Context::new(), || async {
                Ok::<_, String>((Some(()), "UPDATING".to_string()))
            })
            .await
            .unwrap_err();

        match err {
            RetryError::Timeout {
                last_state,
                expected,
                ..
            } => {
                assert_eq!(last_state, "UPDATING");
                assert_eq!(expected, "ACTIVE");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_errors_propagate() {
        let err = fast(&["CREATING"], &["ACTIVE"])
            .wait_for_state(&Context::new(), || async {
                Err::<(Option<()>, String), _>("AccessDeniedException")
            })
            .await
            .unwrap_err();

        assert_eq!(err, RetryError::Refresh("AccessDeniedException".to_string()));
    }

    #[tokio::test]
    async fn cancelled_context_stops_wait() {
        let ctx = Context::new();
        ctx.cancel();

        let err = fast(&["CREATING"], &["ACTIVE"])
            .wait_for_state(&ctx, || async {
                Ok::<_, String>((Some(()), "CREATING".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(err, RetryError::Cancelled);
    }

    #[test]
    fn back_off_doubles_and_clamps() {
        let conf = StateChangeConf::new(&[], &["ACTIVE"], Duration::from_secs(60))
            .min_timeout(Duration::from_secs(1));
        assert_eq!(conf.next_wait(INITIAL_WAIT, 0), Duration::from_secs(1));
        assert_eq!(
            conf.next_wait(Duration::from_secs(4), 0),
            Duration::from_secs(8)
        );
        assert_eq!(conf.next_wait(Duration::from_secs(8), 0), MAX_WAIT);
        assert_eq!(
            conf.next_wait(Duration::from_secs(4), 1),
            Duration::from_secs(4)
        );
    }

    #[tokio::test]
    async fn retry_when_retries_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let value = retry_when(
            &Context::new(),
            Duration::from_secs(5),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("The passed role has not propagated yet".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            |e: &String| e.contains("has not propagated"),
        )
        .await
        .unwrap();

        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn retry_when_returns_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = retry_when(
            &Context::new(),
            Duration::from_secs(5),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("ValidationException: bad name".to_string()) }
            },
            |e: &String| e.contains("has not propagated"),
        )
        .await
        .unwrap_err();

        assert!(err.contains("bad name"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_when_makes_final_attempt_after_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = retry_when(
            &Context::new(),
            Duration::ZERO,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("Authentication error".to_string()) }
            },
            |_: &String| true,
        )
        .await
        .unwrap_err();

        assert_eq!(err, "Authentication error");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
