//! Score-based provider selection.

use std::sync::{Arc, RwLock};

use crate::error::MailError;
use crate::message::Email;
use crate::provider::MailProvider;
use crate::result::SendResult;

/// Routes each email to the highest-scoring registered provider.
///
/// The dispatcher tries exactly one provider per call. Errors come back
/// unchanged; retrying (and so picking another provider once scores shift)
/// is the caller's job.
#[derive(Default)]
pub struct Dispatcher {
    providers: RwLock<Vec<Arc<dyn MailProvider>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dispatcher from providers in registration order.
    pub fn with_providers(providers: Vec<Arc<dyn MailProvider>>) -> Self {
        Self {
            providers: RwLock::new(providers),
        }
    }

    /// Add a provider. Later registrations lose score ties.
    pub fn register(&self, provider: Arc<dyn MailProvider>) {
        tracing::info!(provider = provider.name(), score = provider.score(), "registered mail provider");
        self.providers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(provider);
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name and current score of each provider, in registration order.
    pub fn scores(&self) -> Vec<(String, f64)> {
        self.snapshot()
            .iter()
            .map(|p| (p.name().to_string(), p.score()))
            .collect()
    }

    /// Pick the provider the next send would use.
    pub fn select(&self) -> Result<Arc<dyn MailProvider>, MailError> {
        let providers = self.snapshot();

        let mut best: Option<(&Arc<dyn MailProvider>, f64)> = None;
        for provider in &providers {
            // A NaN score ranks below every real one.
            let score = match provider.score() {
                s if s.is_nan() => f64::NEG_INFINITY,
                s => s,
            };
            match best {
                // Strictly greater, so the first registered wins ties.
                Some((_, top)) if score <= top => {}
                _ => best = Some((provider, score)),
            }
        }

        let (provider, score) = best.ok_or(MailError::NoProvidersRegistered)?;
        tracing::debug!(provider = provider.name(), score, "selected mail provider");
        Ok(Arc::clone(provider))
    }

    /// Deliver `email` through the best-scoring provider.
    pub async fn send(&self, email: &Email) -> Result<SendResult, MailError> {
        let provider = self.select()?;
        provider.send(email).await
    }

    fn snapshot(&self) -> Vec<Arc<dyn MailProvider>> {
        self.providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("providers", &self.scores())
            .finish()
    }
}
