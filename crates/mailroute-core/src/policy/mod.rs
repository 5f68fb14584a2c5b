//! Scoring policies: how a provider turns its recent outcomes into a
//! preference score.
//!
//! ```text
//! send outcome → [FailurePolicy: does this kind count?] → [BackoffScore] → score()
//! ```

pub mod failure;
pub mod scoring;

pub use failure::FailurePolicy;
pub use scoring::{BackoffConfig, BackoffScore, Outcome, ScorePolicy, StaticScore};
