//! In-process provider for tests and dry runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::clock::Clock;
use crate::error::MailError;
use crate::message::Email;
use crate::policy::{BackoffConfig, BackoffScore, Outcome, ScorePolicy};
use crate::provider::MailProvider;
use crate::result::SendResult;

/// What a [`StubProvider`] does when asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubBehavior {
    Succeed,
    Fail(MailError),
}

/// Provider that never leaves the process.
///
/// Plays back a script of behaviors, then falls back to a default one.
/// Scores itself with a [`BackoffScore`] unless given another policy.
pub struct StubProvider {
    name: String,
    policy: Arc<dyn ScorePolicy>,
    fallback: StubBehavior,
    script: Mutex<VecDeque<StubBehavior>>,
    calls: AtomicUsize,
}

impl StubProvider {
    /// Always-succeeding stub with an adaptive score on the system clock.
    pub fn new(name: impl Into<String>, base_score: f64) -> Self {
        Self::with_policy(
            name,
            Arc::new(BackoffScore::new(BackoffConfig::with_base_score(base_score))),
        )
    }

    /// Always-succeeding stub with an adaptive score on `clock`.
    pub fn with_clock(name: impl Into<String>, base_score: f64, clock: Arc<dyn Clock>) -> Self {
        Self::with_policy(
            name,
            Arc::new(BackoffScore::with_clock(
                BackoffConfig::with_base_score(base_score),
                clock,
            )),
        )
    }

    /// Always-succeeding stub scored by `policy`.
    pub fn with_policy(name: impl Into<String>, policy: Arc<dyn ScorePolicy>) -> Self {
        Self {
            name: name.into(),
            policy,
            fallback: StubBehavior::Succeed,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Behavior once the script is exhausted.
    pub fn with_behavior(mut self, behavior: StubBehavior) -> Self {
        self.fallback = behavior;
        self
    }

    /// Behaviors to play, in order, before the fallback.
    pub fn with_script(self, script: Vec<StubBehavior>) -> Self {
        *self.script.lock().unwrap_or_else(|e| e.into_inner()) = script.into();
        self
    }

    /// Queue one more scripted behavior.
    pub fn push(&self, behavior: StubBehavior) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(behavior);
    }

    /// Number of vendor calls made (validation failures are not calls).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_behavior(&self) -> StubBehavior {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl MailProvider for StubProvider {
    async fn send(&self, email: &Email) -> Result<SendResult, MailError> {
        email.is_valid()?;

        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = match self.next_behavior() {
            StubBehavior::Succeed => Ok(SendResult::all_delivered(
                &self.name,
                email,
                json!({ "status": "sent" }),
            )),
            StubBehavior::Fail(err) => Err(err),
        };
        self.policy.record(Outcome::from(&result));
        result
    }

    fn score(&self) -> f64 {
        self.policy.score()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn reset_score(&self) {
        self.policy.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::policy::StaticScore;

    fn email() -> Email {
        Email::new("a@b.com", "from@b.com", "Subj", "Body").unwrap()
    }

    #[tokio::test]
    async fn success_maps_recipient_to_true() {
        let stub = StubProvider::new("stub", 50.0);
        let result = stub.send(&email()).await.unwrap();
        assert_eq!(result.provider, "stub");
        assert_eq!(result.delivered.get("a@b.com"), Some(&true));
    }

    #[tokio::test]
    async fn script_then_fallback() {
        let stub = StubProvider::new("stub", 50.0)
            .with_script(vec![StubBehavior::Fail(MailError::ServerFailure("x".into()))]);
        assert!(stub.send(&email()).await.is_err());
        assert!(stub.send(&email()).await.is_ok());
        assert!(stub.send(&email()).await.is_ok());
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn invalid_email_is_not_sent_or_scored() {
        let clock = Arc::new(ManualClock::new());
        let stub = StubProvider::with_clock("stub", 50.0, clock)
            .with_behavior(StubBehavior::Fail(MailError::ServerFailure("x".into())));

        let mut bad = email();
        bad.add_recipient("nope", None);
        let err = stub.send(&bad).await.unwrap_err();
        assert!(matches!(err, MailError::InvalidArgument(_)));
        assert_eq!(stub.calls(), 0);
        assert_eq!(stub.score(), 50.0);
    }

    #[tokio::test]
    async fn reset_score_restores_base() {
        let clock = Arc::new(ManualClock::new());
        let stub = StubProvider::with_clock("stub", 50.0, clock)
            .with_behavior(StubBehavior::Fail(MailError::TooManyRequests("slow".into())));
        let _ = stub.send(&email()).await;
        assert!(stub.score() < 50.0);
        stub.reset_score();
        assert_eq!(stub.score(), 50.0);
    }

    #[tokio::test]
    async fn static_policy_ignores_failures() {
        let stub = StubProvider::with_policy("fixed", Arc::new(StaticScore::new(30.0)))
            .with_behavior(StubBehavior::Fail(MailError::ServerFailure("x".into())));
        let _ = stub.send(&email()).await;
        assert_eq!(stub.score(), 30.0);
    }
}
