//! The `MailProvider` trait — the core abstraction for every vendor integration.

use async_trait::async_trait;

use crate::error::MailError;
use crate::message::Email;
use crate::result::SendResult;

/// A vendor integration able to deliver an [`Email`] and rank itself.
///
/// # Contract
/// `send` must call [`Email::is_valid`] first and return its
/// `InvalidArgument` unchanged, without touching score state. It then makes
/// exactly one vendor call, classifies any failure into a [`MailError`] and
/// records the outcome against its score policy.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance serves every
/// concurrent delivery. The trait is object-safe and is stored as
/// `Arc<dyn MailProvider>`.
#[async_trait]
pub trait MailProvider: Send + Sync + 'static {
    /// Deliver one email.
    async fn send(&self, email: &Email) -> Result<SendResult, MailError>;

    /// Current preference in `[0, 100]`. Side-effect free.
    fn score(&self) -> f64;

    /// Stable identifier used in logs and in [`SendResult::provider`].
    fn name(&self) -> &str;

    /// Reinitialize the score state. Providers with a fixed score ignore this.
    fn reset_score(&self) {}
}
