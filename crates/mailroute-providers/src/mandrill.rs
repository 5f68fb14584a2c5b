//! Mandrill (Mailchimp Transactional) provider profile.
//!
//! The API key travels in the JSON body. A 2xx reply lists one status per
//! recipient; `sent`, `queued` and `scheduled` count as delivered, while
//! `rejected` and `invalid` do not. Error replies carry a JSON object whose
//! `name` refines the HTTP status.
//! <https://mailchimp.com/developer/transactional/api/messages/send-new-message/>

use mailroute_core::{ContentType, Email, MailError, SendResult};
use mailroute_http::{classify_decode, HttpMailProvider, HttpProviderConfig, VendorApi};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Messages send endpoint.
pub const API_URL: &str = "https://mandrillapp.com/api/1.0/messages/send.json";

pub const NAME: &str = "mandrill";

/// Recipient statuses that mean the message was accepted.
pub const DELIVERED_STATUSES: &[&str] = &["sent", "queued", "scheduled"];

/// Mandrill wire format.
#[derive(Debug, Clone)]
pub struct Mandrill {
    api_key: String,
    endpoint: String,
}

impl Mandrill {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: API_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// One entry of a successful send reply.
#[derive(Debug, Deserialize)]
struct RecipientStatus {
    email: String,
    status: String,
    #[serde(default)]
    reject_reason: Option<String>,
}

/// Body of a non-2xx reply.
#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl VendorApi for Mandrill {
    fn name(&self) -> &str {
        NAME
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, email: &Email) -> Value {
        let to: Vec<Value> = email
            .recipients()
            .iter()
            .map(|r| {
                let mut entry = Map::new();
                entry.insert("email".into(), Value::String(r.address.clone()));
                if let Some(name) = &r.name {
                    entry.insert("name".into(), Value::String(name.clone()));
                }
                entry.insert("type".into(), Value::String("to".into()));
                Value::Object(entry)
            })
            .collect();

        let content_field = match email.content_type() {
            ContentType::Html => "html",
            ContentType::Plain => "text",
        };
        let mut message = Map::new();
        message.insert(content_field.into(), Value::String(email.body().to_string()));
        message.insert("subject".into(), Value::String(email.subject().to_string()));
        message.insert(
            "from_email".into(),
            Value::String(email.sender().address.clone()),
        );
        if let Some(name) = &email.sender().name {
            message.insert("from_name".into(), Value::String(name.clone()));
        }
        message.insert("to".into(), Value::Array(to));

        json!({
            "key": self.api_key,
            "async": false,
            "message": message,
        })
    }

    fn parse_success(&self, email: &Email, body: &str) -> Result<SendResult, MailError> {
        let statuses: Vec<RecipientStatus> =
            serde_json::from_str(body).map_err(|e| classify_decode(NAME, &e))?;

        // Recipients Mandrill did not report on are not delivered.
        let mut result = SendResult::all_delivered(NAME, email, Value::Null);
        for flag in result.delivered.values_mut() {
            *flag = false;
        }
        for entry in &statuses {
            let delivered = DELIVERED_STATUSES.contains(&entry.status.as_str());
            if !delivered {
                tracing::debug!(
                    recipient = %entry.email,
                    status = %entry.status,
                    reason = entry.reject_reason.as_deref().unwrap_or("none"),
                    "mandrill did not accept recipient"
                );
            }
            result.delivered.insert(entry.email.clone(), delivered);
        }
        result.response = serde_json::from_str(body).unwrap_or(Value::Null);
        Ok(result)
    }

    fn classify_failure(&self, status: u16, body: String) -> MailError {
        match serde_json::from_str::<ErrorReply>(&body) {
            Ok(reply) if reply.name == "Invalid_Key" => MailError::Unauthorized(reply.message),
            Ok(reply) if reply.name == "ValidationError" => MailError::BadRequest(reply.message),
            _ => MailError::from_status(status, body),
        }
    }
}

/// Build a Mandrill provider with default timeout and scoring.
pub fn provider(api_key: &str) -> reqwest::Result<HttpMailProvider<Mandrill>> {
    provider_with(api_key, HttpProviderConfig::default())
}

/// Build a Mandrill provider with custom timeout and scoring.
pub fn provider_with(
    api_key: &str,
    config: HttpProviderConfig,
) -> reqwest::Result<HttpMailProvider<Mandrill>> {
    HttpMailProvider::new(Mandrill::new(api_key), config)
}
