//! Activity execution: the only place side effects (DB, CSG, GHG, the
//! filesystem) happen. Workflows call [`run_activity`] instead of
//! doing I/O themselves, so that retries, timeouts, and heartbeats are
//! applied uniformly (§4.5, §9 "directed, side-effect-free workflows").

use std::future::Future;
use std::time::Duration;

use computor_core::error::ComputorError;
use computor_core::retry::RetryPolicy;
use tokio::sync::watch;

/// Cooperative cancellation signal a long activity should poll
/// between steps (§5 "cancellation propagates ... via a cooperative
/// cancel channel").
#[derive(Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    pub fn is_canceled(&self) -> bool {
        *self.0.borrow()
    }
}

pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

/// Context passed into an activity body: its timeout budget, a
/// heartbeat emitter, and the cooperative cancel token.
pub struct ActivityContext {
    pub timeout: Duration,
    pub heartbeat_interval: Duration,
    cancel: CancelToken,
}

impl ActivityContext {
    pub fn new(timeout: Duration, heartbeat_interval: Duration, cancel: CancelToken) -> Self {
        Self {
            timeout,
            heartbeat_interval,
            cancel,
        }
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.is_canceled()
    }
}

/// Runs `body` under `policy`, retrying on retryable [`ComputorError`]
/// kinds up to `policy.max_attempts`, sleeping the backoff between
/// attempts, and enforcing `ctx.timeout` as the `start_to_close`
/// budget per attempt.
pub async fn run_activity<F, Fut, T>(
    name: &str,
    ctx: &ActivityContext,
    policy: &RetryPolicy,
    mut body: F,
) -> Result<T, ComputorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ComputorError>>,
{
    let mut attempt: u32 = 0;
    loop {
        if ctx.cancel_requested() {
            return Err(ComputorError::CancelRequested(name.to_string()));
        }

        attempt += 1;
        let outcome = tokio::time::timeout(ctx.timeout, body()).await;

        let result = match outcome {
            Ok(inner) => inner,
            Err(_) => Err(ComputorError::TimeoutExceeded(format!(
                "activity `{name}` exceeded {:?}",
                ctx.timeout
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if err.non_retryable() || policy.exhausted(attempt) => {
                tracing::warn!(activity = name, attempt, error = %err, "activity failed, not retrying");
                return Err(err);
            }
            Err(err) => {
                let backoff = policy.backoff_for(attempt);
                tracing::info!(activity = name, attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "activity failed, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let (_handle, cancel) = cancel_pair();
        let ctx = ActivityContext::new(Duration::from_secs(1), Duration::from_secs(1), cancel);
        let policy = RetryPolicy {
            initial_interval: Duration::from_millis(1),
            coefficient: 1.0,
            max_interval: Duration::from_millis(1),
            max_attempts: 3,
        };
        let calls = AtomicU32::new(0);

        let result = run_activity("flaky", &ctx, &policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ComputorError::ProviderTransient("not yet".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let (_handle, cancel) = cancel_pair();
        let ctx = ActivityContext::new(Duration::from_secs(1), Duration::from_secs(1), cancel);
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), ComputorError> = run_activity("bad-input", &ctx, &policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ComputorError::Validation("nope".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_is_observed_before_the_next_attempt() {
        let (handle, cancel) = cancel_pair();
        handle.cancel();
        let ctx = ActivityContext::new(Duration::from_secs(1), Duration::from_secs(1), cancel);
        let policy = RetryPolicy::default();

        let result: Result<(), ComputorError> =
            run_activity("canceled", &ctx, &policy, || async { Ok(()) }).await;

        assert!(matches!(result, Err(ComputorError::CancelRequested(_))));
    }
}
