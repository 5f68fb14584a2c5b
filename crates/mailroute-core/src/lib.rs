//! mailroute-core — provider abstraction, adaptive scoring and dispatch.
//!
//! # Overview
//!
//! MailRoute delivers email through one of several interchangeable
//! providers, sending each message to whichever provider currently looks
//! healthiest. The core crate defines:
//!
//! - [`Email`] — the validated message value
//! - [`MailError`] — the failure taxonomy every provider maps onto
//! - [`MailProvider`] — the trait every vendor integration implements
//! - [`policy`] module — adaptive and static score policies
//! - [`Dispatcher`] — picks the best-scoring provider for each send

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod policy;
pub mod provider;
pub mod result;
pub mod stub;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, MailError};
pub use message::{ContentType, Email, Mailbox};
pub use policy::{BackoffConfig, BackoffScore, FailurePolicy, Outcome, ScorePolicy, StaticScore};
pub use provider::MailProvider;
pub use result::SendResult;
pub use stub::{StubBehavior, StubProvider};
