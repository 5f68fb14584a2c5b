//! Health-weighted score that backs off after failures and recovers with time.
//!
//! State:
//! - `health` ∈ [0, 1]: moving average of outcomes (1 = success, 0 = failure)
//! - `last_failure`: instant of the most recent penalized failure, if any
//!
//! Transitions (one attempt at a time, under the provider's lock):
//! - success:           `health ← health * decay + (1 - decay)`
//! - penalized failure: `health ← health * decay`, `last_failure ← now`
//!
//! Score:
//! ```text
//! weight = clamp((now - last_failure) / recovery_window, 0, 1)   // 1 if never failed
//! score  = clamp(base_score * (weight + (1 - weight) * health), 0, 100)
//! ```
//! Right after a failure the score follows health alone, so repeated failures
//! keep pushing it down. Once `recovery_window` passes without a failure the
//! score is back at `base_score`, whatever health is.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::error::{ErrorKind, MailError};
use crate::policy::failure::FailurePolicy;

/// Upper bound of any score.
pub const MAX_SCORE: f64 = 100.0;

/// Clamp into `[0, MAX_SCORE]`. NaN and infinities become 0.
pub(crate) fn bound_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

/// Outcome of one delivery attempt, as seen by a score policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
}

impl<T> From<&Result<T, MailError>> for Outcome {
    fn from(result: &Result<T, MailError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::Failure(e.kind()),
        }
    }
}

/// Something that produces a provider's preference score.
///
/// Providers hold one of these behind an `Arc` and feed it every outcome.
pub trait ScorePolicy: Send + Sync + 'static {
    /// Current score in `[0, 100]`. Never mutates state.
    fn score(&self) -> f64;

    /// Record the outcome of one attempt.
    fn record(&self, _outcome: Outcome) {}

    /// Return to the initial state.
    fn reset(&self) {}
}

/// Fixed score for providers that opt out of adaptive scoring.
#[derive(Debug, Clone, Copy)]
pub struct StaticScore(f64);

impl StaticScore {
    pub fn new(score: f64) -> Self {
        Self(bound_score(score))
    }
}

impl ScorePolicy for StaticScore {
    fn score(&self) -> f64 {
        self.0
    }
}

/// Configuration for [`BackoffScore`].
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Score reported when the provider is fully healthy or fully recovered.
    pub base_score: f64,
    /// Weight of the previous health in each update, in `[0, 1]`.
    /// Out-of-range values are clamped when the score is built.
    pub decay: f64,
    /// Time after the last failure at which the score is back at `base_score`.
    pub recovery_window: Duration,
    /// Failure kinds that lower health.
    pub failures: FailurePolicy,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            decay: 0.9,
            recovery_window: Duration::from_secs(300),
            failures: FailurePolicy::default(),
        }
    }
}

impl BackoffConfig {
    /// Default configuration with a different base score.
    pub fn with_base_score(base_score: f64) -> Self {
        Self {
            base_score,
            ..Default::default()
        }
    }

    fn normalized(mut self) -> Self {
        self.decay = if self.decay.is_finite() {
            self.decay.clamp(0.0, 1.0)
        } else {
            Self::default().decay
        };
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct ScoreState {
    health: f64,
    last_failure: Option<Instant>,
}

impl ScoreState {
    const INITIAL: Self = Self {
        health: 1.0,
        last_failure: None,
    };
}

/// Thread-safe adaptive score.
pub struct BackoffScore {
    config: BackoffConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<ScoreState>,
}

impl BackoffScore {
    /// Create a score on the system clock, starting fully healthy.
    pub fn new(config: BackoffConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a score that reads time from `clock`.
    pub fn with_clock(config: BackoffConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: config.normalized(),
            clock,
            state: Mutex::new(ScoreState::INITIAL),
        }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Current health in `[0, 1]`.
    pub fn health(&self) -> f64 {
        self.snapshot().health
    }

    /// Instant of the most recent penalized failure.
    pub fn last_failure(&self) -> Option<Instant> {
        self.snapshot().last_failure
    }

    /// Record a successful attempt.
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.health = state.health * self.config.decay + (1.0 - self.config.decay);
    }

    /// Record a failed attempt. Kinds the failure policy ignores leave the
    /// state untouched; returns whether the failure was counted.
    pub fn record_failure(&self, kind: ErrorKind) -> bool {
        if !self.config.failures.penalizes(kind) {
            return false;
        }
        let now = self.clock.now();
        let new_score = {
            let mut state = self.lock();
            state.health *= self.config.decay;
            state.last_failure = Some(now);
            self.compute(*state, now)
        };
        tracing::warn!(
            kind = %kind,
            score = new_score,
            "provider failure, lowering score"
        );
        true
    }

    fn snapshot(&self) -> ScoreState {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn compute(&self, state: ScoreState, now: Instant) -> f64 {
        let weight = match state.last_failure {
            None => 1.0,
            Some(_) if self.config.recovery_window.is_zero() => 1.0,
            Some(at) => {
                let elapsed = now.saturating_duration_since(at).as_secs_f64();
                (elapsed / self.config.recovery_window.as_secs_f64()).clamp(0.0, 1.0)
            }
        };
        bound_score(self.config.base_score * (weight + (1.0 - weight) * state.health))
    }
}

impl ScorePolicy for BackoffScore {
    fn score(&self) -> f64 {
        let state = self.snapshot();
        self.compute(state, self.clock.now())
    }

    fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.record_success(),
            Outcome::Failure(kind) => {
                self.record_failure(kind);
            }
        }
    }

    fn reset(&self) {
        *self.lock() = ScoreState::INITIAL;
        tracing::info!(base_score = self.config.base_score, "provider score reset");
    }
}

impl std::fmt::Debug for BackoffScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("BackoffScore")
            .field("base_score", &self.config.base_score)
            .field("health", &state.health)
            .field("last_failure", &state.last_failure)
            .finish()
    }
}
