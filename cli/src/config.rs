//! `mailroute` configuration: optional YAML file plus environment overrides.
//!
//! ```yaml
//! sender:
//!   email: no-reply@example.com
//!   name: Example
//! sendgrid:
//!   api_key: SG.xxxx
//!   base_score: 50
//! mandrill:
//!   api_key: md-xxxx
//!   base_score: 50
//! request_timeout_secs: 30
//! retry:
//!   attempts: 5
//!   delay_secs: 10
//! log:
//!   level: info
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mailroute_core::{BackoffConfig, Dispatcher, Mailbox};
use mailroute_http::HttpProviderConfig;
use mailroute_providers::{mandrill, sendgrid};
use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::retry::RetrySchedule;

pub const ENV_SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
pub const ENV_MANDRILL_API_KEY: &str = "MANDRILL_API_KEY";
pub const ENV_SENDER_EMAIL: &str = "MAILROUTE_SENDER_EMAIL";
pub const ENV_SENDER_NAME: &str = "MAILROUTE_SENDER_NAME";

/// Default `From` used when a command does not name a sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderConfig {
    #[serde(default = "default_sender_email")]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_sender_email() -> String {
    "no-reply@localhost".to_string()
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            email: default_sender_email(),
            name: None,
        }
    }
}

impl SenderConfig {
    pub fn mailbox(&self) -> Mailbox {
        Mailbox {
            address: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Credentials and starting score of one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorConfig {
    /// The vendor is registered only when a key is present.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_score")]
    pub base_score: f64,
}

fn default_base_score() -> f64 {
    50.0
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_score: default_base_score(),
        }
    }
}

/// Caller-side retry of retryable delivery errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

fn default_attempts() -> u32 {
    5
}

fn default_delay_secs() -> u64 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn schedule(&self) -> RetrySchedule {
        RetrySchedule {
            attempts: self.attempts,
            delay: Duration::from_secs(self.delay_secs),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailrouteConfig {
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub sendgrid: VendorConfig,
    #[serde(default)]
    pub mandrill: VendorConfig,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for MailrouteConfig {
    fn default() -> Self {
        Self {
            sender: SenderConfig::default(),
            sendgrid: VendorConfig::default(),
            mandrill: VendorConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl MailrouteConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("invalid mailroute config")
    }

    /// Read `path` if given, defaults otherwise, then apply the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .with_context(|| format!("read config file '{}'", path.display()))?;
                Self::from_yaml(&yaml)
                    .with_context(|| format!("parse config file '{}'", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override settings from environment variables. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(ENV_SENDGRID_API_KEY) {
            self.sendgrid.api_key = Some(key);
        }
        if let Some(key) = var(ENV_MANDRILL_API_KEY) {
            self.mandrill.api_key = Some(key);
        }
        if let Some(email) = var(ENV_SENDER_EMAIL) {
            self.sender.email = email;
        }
        if let Some(name) = var(ENV_SENDER_NAME) {
            self.sender.name = Some(name);
        }
    }

    fn http_config(&self, vendor: &VendorConfig) -> HttpProviderConfig {
        HttpProviderConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            scoring: BackoffConfig::with_base_score(vendor.base_score),
        }
    }

    /// Register every vendor that has an API key, SendGrid first.
    pub fn build_dispatcher(&self) -> Result<Dispatcher> {
        let dispatcher = Dispatcher::new();

        if let Some(key) = &self.sendgrid.api_key {
            let provider = sendgrid::provider_with(key, self.http_config(&self.sendgrid))
                .context("build sendgrid client")?;
            dispatcher.register(Arc::new(provider));
        }
        if let Some(key) = &self.mandrill.api_key {
            let provider = mandrill::provider_with(key, self.http_config(&self.mandrill))
                .context("build mandrill client")?;
            dispatcher.register(Arc::new(provider));
        }

        if dispatcher.is_empty() {
            tracing::warn!(
                "no provider configured; set {} or {}",
                ENV_SENDGRID_API_KEY,
                ENV_MANDRILL_API_KEY
            );
        }
        Ok(dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = MailrouteConfig::default();
        assert_eq!(config.sender.email, "no-reply@localhost");
        assert_eq!(config.sendgrid.base_score, 50.0);
        assert_eq!(config.mandrill.base_score, 50.0);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.retry.schedule().attempts, 5);
        assert_eq!(config.retry.schedule().delay, Duration::from_secs(10));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = MailrouteConfig::from_yaml(
            "sendgrid:\n  api_key: SG.test\nmandrill:\n  base_score: 40\nretry:\n  attempts: 2\n",
        )
        .unwrap();
        assert_eq!(config.sendgrid.api_key.as_deref(), Some("SG.test"));
        assert_eq!(config.sendgrid.base_score, 50.0);
        assert_eq!(config.mandrill.api_key, None);
        assert_eq!(config.mandrill.base_score, 40.0);
        assert_eq!(config.retry.attempts, 2);
        assert_eq!(config.retry.delay_secs, 10);
        assert_eq!(config.sender.email, "no-reply@localhost");
    }

    #[test]
    fn empty_yaml_is_default() {
        // serde_yaml reads an empty document as unit, so use an empty map.
        assert_eq!(MailrouteConfig::from_yaml("{}").unwrap(), MailrouteConfig::default());
    }

    #[test]
    fn env_overrides_file() {
        let mut config =
            MailrouteConfig::from_yaml("sendgrid:\n  api_key: from-file\n").unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_SENDGRID_API_KEY, "from-env"),
            (ENV_MANDRILL_API_KEY, ""),
            (ENV_SENDER_EMAIL, "ops@example.com"),
            (ENV_SENDER_NAME, "Ops"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.sendgrid.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.mandrill.api_key, None);
        assert_eq!(
            config.sender.mailbox(),
            Mailbox::named("ops@example.com", "Ops")
        );
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(MailrouteConfig::from_yaml("retry: [1, 2]").is_err());
    }

    #[tokio::test]
    async fn dispatcher_registers_configured_vendors() {
        let mut config = MailrouteConfig::default();
        assert!(config.build_dispatcher().unwrap().is_empty());

        config.sendgrid.api_key = Some("sg".into());
        config.mandrill.api_key = Some("md".into());
        config.mandrill.base_score = 40.0;
        let dispatcher = config.build_dispatcher().unwrap();
        assert_eq!(
            dispatcher.scores(),
            vec![("sendgrid".to_string(), 50.0), ("mandrill".to_string(), 40.0)]
        );
    }
}
