//! Caller-side retry of deliveries.
//!
//! The dispatcher tries one provider per call. Retrying a retryable error
//! after a pause lets the scores shift, so the next attempt may go to a
//! different provider.

use std::time::Duration;

use mailroute_core::{Dispatcher, Email, MailError, SendResult};

/// Fixed-delay retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    /// Total attempts including the first; 0 is treated as 1.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

/// Send `email`, retrying retryable failures per `schedule`.
///
/// Non-retryable errors come back after the first attempt. When attempts
/// run out the last error is returned.
pub async fn deliver(
    dispatcher: &Dispatcher,
    email: &Email,
    schedule: RetrySchedule,
) -> Result<SendResult, MailError> {
    let attempts = schedule.attempts.max(1);
    let mut attempt = 1;
    loop {
        match dispatcher.send(email).await {
            Ok(result) => {
                tracing::info!(provider = %result.provider, attempt, "email delivered");
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < attempts => {
                tracing::warn!(
                    attempt,
                    attempts,
                    kind = %e.kind(),
                    error = %e,
                    retry_in_ms = schedule.delay.as_millis() as u64,
                    "delivery failed, retrying"
                );
                tokio::time::sleep(schedule.delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempt, kind = %e.kind(), error = %e, "delivery failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailroute_core::{ErrorKind, MailProvider, StubBehavior, StubProvider};
    use std::sync::Arc;

    fn email() -> Email {
        Email::new("a@b.com", "from@b.com", "Subj", "Body").unwrap()
    }

    fn quick(attempts: u32) -> RetrySchedule {
        RetrySchedule {
            attempts,
            delay: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_move_to_next_provider() {
        let flaky = Arc::new(StubProvider::new("flaky", 50.0).with_behavior(StubBehavior::Fail(
            MailError::ServerFailure("down".into()),
        )));
        let backup = Arc::new(StubProvider::new("backup", 49.0));
        let providers: Vec<Arc<dyn MailProvider>> = vec![flaky.clone(), backup.clone()];
        let dispatcher = Dispatcher::with_providers(providers);

        let result = deliver(&dispatcher, &email(), quick(5)).await.unwrap();
        assert_eq!(result.provider, "backup");
        assert_eq!(flaky.calls(), 1);
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempts() {
        let stub = Arc::new(StubProvider::new("only", 50.0).with_behavior(StubBehavior::Fail(
            MailError::NetworkFailure("refused".into()),
        )));
        let dispatcher = Dispatcher::new();
        dispatcher.register(stub.clone());

        let err = deliver(&dispatcher, &email(), quick(3)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_returns_immediately() {
        let stub = Arc::new(StubProvider::new("strict", 50.0).with_behavior(StubBehavior::Fail(
            MailError::Unauthorized("bad key".into()),
        )));
        let dispatcher = Dispatcher::new();
        dispatcher.register(stub.clone());

        let err = deliver(&dispatcher, &email(), quick(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_sends_once() {
        let stub = Arc::new(StubProvider::new("only", 50.0));
        let dispatcher = Dispatcher::new();
        dispatcher.register(stub.clone());

        deliver(&dispatcher, &email(), quick(0)).await.unwrap();
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn empty_dispatcher_is_not_retried() {
        let err = deliver(&Dispatcher::new(), &email(), quick(5)).await.unwrap_err();
        assert_eq!(err, MailError::NoProvidersRegistered);
    }
}
