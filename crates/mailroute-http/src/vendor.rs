//! Vendor-specific request shape and response parsing.

use mailroute_core::{Email, MailError, SendResult};
use serde_json::Value;

/// Wire format of one email vendor.
///
/// Implementations stay free of I/O: they build the JSON body, decorate the
/// request with credentials and read a 2xx response body.
pub trait VendorApi: Send + Sync + 'static {
    /// Provider name reported in logs and results.
    fn name(&self) -> &str;

    /// URL the send request is POSTed to.
    fn endpoint(&self) -> &str;

    /// JSON body for `email`.
    fn request_body(&self, email: &Email) -> Value;

    /// Attach credentials. The default sends the request as is.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
    }

    /// Turn a 2xx response body into a [`SendResult`].
    fn parse_success(&self, email: &Email, body: &str) -> Result<SendResult, MailError>;

    /// Classify a non-2xx response. Vendors that encode the failure in the
    /// body can refine the status-based default.
    fn classify_failure(&self, status: u16, body: String) -> MailError {
        MailError::from_status(status, body)
    }
}
