//! Generic HTTP mail provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailroute_core::{
    BackoffConfig, BackoffScore, Email, MailError, MailProvider, Outcome, ScorePolicy, SendResult,
};
use serde_json::Value;

use crate::classify::classify_transport;
use crate::vendor::VendorApi;

/// Configuration for [`HttpMailProvider`].
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Client-side timeout for the whole request; expiry is a `NetworkFailure`.
    pub request_timeout: Duration,
    /// Adaptive score parameters.
    pub scoring: BackoffConfig,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            scoring: BackoffConfig::default(),
        }
    }
}

/// A [`MailProvider`] that speaks to a vendor's HTTP API.
pub struct HttpMailProvider<V> {
    vendor: V,
    http: reqwest::Client,
    policy: Arc<dyn ScorePolicy>,
}

impl<V: VendorApi> HttpMailProvider<V> {
    /// Create a provider with an adaptive score.
    pub fn new(vendor: V, config: HttpProviderConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let policy = Arc::new(BackoffScore::new(config.scoring));
        Ok(Self::with_parts(vendor, http, policy))
    }

    /// Create a provider from an existing client and score policy.
    pub fn with_parts(vendor: V, http: reqwest::Client, policy: Arc<dyn ScorePolicy>) -> Self {
        Self {
            vendor,
            http,
            policy,
        }
    }

    pub fn vendor(&self) -> &V {
        &self.vendor
    }

    async fn post(&self, email: &Email, body: &Value) -> Result<SendResult, MailError> {
        let request = self.http.post(self.vendor.endpoint()).json(body);
        let response = self
            .vendor
            .authorize(request)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| classify_transport(&e))?;

        if !(200..=299).contains(&status) {
            return Err(self.vendor.classify_failure(status, text));
        }
        self.vendor.parse_success(email, &text)
    }
}

#[async_trait]
impl<V: VendorApi> MailProvider for HttpMailProvider<V> {
    async fn send(&self, email: &Email) -> Result<SendResult, MailError> {
        email.is_valid()?;

        let body = self.vendor.request_body(email);
        tracing::debug!(
            provider = self.vendor.name(),
            recipients = email.recipients().len(),
            "sending email"
        );

        let result = self.post(email, &body).await;
        if let Err(e) = &result {
            tracing::debug!(provider = self.vendor.name(), error = %e, "send failed");
        }
        self.policy.record(Outcome::from(&result));
        result
    }

    fn score(&self) -> f64 {
        self.policy.score()
    }

    fn name(&self) -> &str {
        self.vendor.name()
    }

    fn reset_score(&self) {
        self.policy.reset();
    }
}
