//! End-to-end routing scenarios over stub providers.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use mailroute_core::{
    Dispatcher, Email, ErrorKind, MailError, MailProvider, ManualClock, StubBehavior, StubProvider,
};

fn email() -> Email {
    Email::new("a@b.com", "from@b.com", "Subj", "Body").unwrap()
}

// ─── Basic delivery ───────────────────────────────────────────────────────────

#[tokio::test]
async fn always_succeeding_stub_delivers() {
    let dispatcher = Dispatcher::new();
    dispatcher.register(Arc::new(StubProvider::new("stub", 50.0)));

    let result = dispatcher.send(&email()).await.unwrap();
    assert_eq!(result.delivered.get("a@b.com"), Some(&true));
    assert_eq!(result.provider, "stub");
}

#[tokio::test]
async fn invalid_email_rejected_before_any_call() {
    let stub = Arc::new(StubProvider::new("stub", 50.0));
    let dispatcher = Dispatcher::new();
    dispatcher.register(stub.clone());

    let mut email = email();
    email.add_recipient("broken", None);
    let err = dispatcher.send(&email).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(stub.calls(), 0);
    assert_eq!(stub.score(), 50.0);
}

// ─── Failover through scores ──────────────────────────────────────────────────

#[tokio::test]
async fn preferred_provider_recovers_after_window() {
    let clock = Arc::new(ManualClock::new());
    let preferred = Arc::new(
        StubProvider::with_clock("preferred", 50.0, clock.clone()).with_script(vec![
            StubBehavior::Fail(MailError::ServerFailure("outage".into())),
        ]),
    );
    let secondary = Arc::new(StubProvider::with_clock("secondary", 49.0, clock.clone()));

    let dispatcher = Dispatcher::new();
    dispatcher.register(secondary.clone());
    dispatcher.register(preferred.clone());

    assert!(dispatcher.send(&email()).await.is_err());

    // The caller retries: secondary now wins.
    let retry = dispatcher.send(&email()).await.unwrap();
    assert_eq!(retry.provider, "secondary");

    // Five minutes without failures puts preferred back on top.
    clock.advance(Duration::from_secs(300));
    let later = dispatcher.send(&email()).await.unwrap();
    assert_eq!(later.provider, "preferred");
}

#[tokio::test]
async fn rate_limited_provider_loses_score() {
    let stub = StubProvider::new("limited", 50.0).with_behavior(StubBehavior::Fail(
        MailError::from_status(429, "Too Many Requests"),
    ));
    let err = stub.send(&email()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyRequests);
    assert!(stub.score() < 50.0);
}

#[tokio::test]
async fn network_failure_is_not_scored() {
    let stub = StubProvider::new("flaky", 50.0).with_behavior(StubBehavior::Fail(
        MailError::NetworkFailure("connection refused".into()),
    ));
    let err = stub.send(&email()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(stub.score(), 50.0);
}

// ─── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_share_dispatcher() {
    let clock = Arc::new(ManualClock::new());
    let failing = Arc::new(
        StubProvider::with_clock("failing", 50.0, clock.clone()).with_behavior(
            StubBehavior::Fail(MailError::ServerFailure("down".into())),
        ),
    );
    let healthy = Arc::new(StubProvider::with_clock("healthy", 40.0, clock.clone()));

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register(failing.clone());
    dispatcher.register(healthy.clone());

    let tasks = (0..64).map(|_| {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.send(&email()).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let failures = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(failures + healthy.calls(), 64);
    assert_eq!(failing.calls(), failures);

    // Each failure multiplies health by 0.9; 50 * 0.9^3 < 40, so at most a
    // handful of sends can reach the failing provider once it is scored.
    assert!(failing.score() < healthy.score());
    assert!(healthy.calls() > 0);
}
