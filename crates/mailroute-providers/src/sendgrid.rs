//! SendGrid v3 provider profile.
//!
//! Bearer-token auth, one personalization per recipient. A 2xx reply
//! (usually `202 Accepted` with an empty body) means SendGrid took the
//! message for every recipient.
//! <https://docs.sendgrid.com/api-reference/mail-send/mail-send>

use mailroute_core::{Email, MailError, Mailbox, SendResult};
use mailroute_http::{HttpMailProvider, HttpProviderConfig, VendorApi};
use serde_json::{json, Map, Value};

/// Mail send endpoint.
pub const API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub const NAME: &str = "sendgrid";

/// SendGrid wire format.
#[derive(Debug, Clone)]
pub struct SendGrid {
    api_key: String,
    endpoint: String,
}

impl SendGrid {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: API_URL.to_string(),
        }
    }

    /// Point at a different endpoint (EU region, a proxy, a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn address(mailbox: &Mailbox) -> Value {
    let mut out = Map::new();
    out.insert("email".into(), Value::String(mailbox.address.clone()));
    if let Some(name) = &mailbox.name {
        out.insert("name".into(), Value::String(name.clone()));
    }
    Value::Object(out)
}

impl VendorApi for SendGrid {
    fn name(&self) -> &str {
        NAME
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, email: &Email) -> Value {
        let personalizations: Vec<Value> = email
            .recipients()
            .iter()
            .map(|to| json!({ "to": [address(to)] }))
            .collect();
        json!({
            "personalizations": personalizations,
            "subject": email.subject(),
            "from": address(email.sender()),
            "content": [{
                "type": email.content_type().as_mime(),
                "value": email.body(),
            }],
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.api_key)
    }

    fn parse_success(&self, email: &Email, body: &str) -> Result<SendResult, MailError> {
        let response = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
        };
        Ok(SendResult::all_delivered(NAME, email, response))
    }
}

/// Build a SendGrid provider with default timeout and scoring.
pub fn provider(api_key: &str) -> reqwest::Result<HttpMailProvider<SendGrid>> {
    provider_with(api_key, HttpProviderConfig::default())
}

/// Build a SendGrid provider with custom timeout and scoring.
pub fn provider_with(
    api_key: &str,
    config: HttpProviderConfig,
) -> reqwest::Result<HttpMailProvider<SendGrid>> {
    HttpMailProvider::new(SendGrid::new(api_key), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new("valid@email.com", "anothervalid@email.com", "Subject", "Content").unwrap()
    }

    fn email_to(name: &str) -> Email {
        Email::compose(
            Mailbox::new("anothervalid@email.com"),
            vec![Mailbox::named("valid@email.com", name)],
            "Subject",
            "Content",
            "text/plain",
        )
        .unwrap()
    }

    #[test]
    fn body_has_one_personalization_per_recipient() {
        let mut email = email();
        email.add_recipient("second@email.com", Some("Second".into()));
        let body = SendGrid::new("api").request_body(&email);

        let personalizations = body["personalizations"].as_array().unwrap();
        assert_eq!(personalizations.len(), 2);
        assert_eq!(personalizations[0]["to"][0]["email"], "valid@email.com");
        assert!(personalizations[0]["to"][0].get("name").is_none());
        assert_eq!(personalizations[1]["to"][0]["name"], "Second");
        assert_eq!(body["subject"], "Subject");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][0]["value"], "Content");
        assert_eq!(body["from"], json!({ "email": "anothervalid@email.com" }));
    }

    #[test]
    fn recipient_name_is_sent() {
        let body = SendGrid::new("api").request_body(&email_to("John"));
        assert_eq!(body["personalizations"][0]["to"][0]["name"], "John");
    }

    #[test]
    fn sender_name_and_html() {
        let email = Email::compose(
            Mailbox::named("news@email.com", "Newsroom"),
            vec![Mailbox::new("valid@email.com")],
            "Subject",
            "<p>Content</p>",
            "html",
        )
        .unwrap();
        let body = SendGrid::new("api").request_body(&email);
        assert_eq!(body["from"]["name"], "Newsroom");
        assert_eq!(body["content"][0]["type"], "text/html");
    }

    #[test]
    fn empty_accept_marks_everyone_delivered() {
        let result = SendGrid::new("api").parse_success(&email(), "").unwrap();
        assert_eq!(result.provider, "sendgrid");
        assert!(result.is_delivered("valid@email.com"));
        assert_eq!(result.response, Value::Null);
    }

    #[test]
    fn custom_endpoint() {
        let vendor = SendGrid::new("api").with_endpoint("http://127.0.0.1:1/send");
        assert_eq!(vendor.endpoint(), "http://127.0.0.1:1/send");
        assert_eq!(SendGrid::new("api").endpoint(), API_URL);
    }
}
