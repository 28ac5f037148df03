use crate::shutdown::ShutdownToken;
use replyflow_core::AutomationError;
use replyflow_core::automation::AutomationResult;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// A stop was requested while waiting between attempts.
    Cancelled,
    Exhausted {
        attempts: u32,
        last: AutomationError,
    },
}

/// Runs `call` until it succeeds, the attempts run out, or `stop` fires
/// during a backoff wait.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    stop: &ShutdownToken,
    operation: &str,
    target: &str,
    mut call: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AutomationResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(last) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last,
                });
            }
            Err(e) => {
                debug!(operation, target = %target, attempt, error = %e, "attempt failed, retrying");
            }
        }

        tokio::select! {
            () = tokio::time::sleep(policy.delay) => {}
            () = stop.cancelled() => return Err(RetryError::Cancelled),
        }
        attempt += 1;
    }
}

/// Maps an `Ok(false)` answer to [`AutomationError::Rejected`].
pub fn accepted(operation: &str, target: &str, ok: bool) -> AutomationResult<()> {
    if ok {
        Ok(())
    } else {
        Err(AutomationError::rejected(operation, target))
    }
}
