//! Mapping of `reqwest` failures onto the delivery error taxonomy.

use mailroute_core::MailError;

/// Classify a transport-level `reqwest` error.
///
/// Connect failures and timeouts become `NetworkFailure`: the request may
/// never have reached the provider. Anything else that breaks the exchange
/// is treated as a provider-side `ServerFailure`.
pub fn classify_transport(err: &reqwest::Error) -> MailError {
    if err.is_connect() || err.is_timeout() {
        MailError::NetworkFailure(err.to_string())
    } else {
        MailError::ServerFailure(err.to_string())
    }
}

/// Classify an unreadable 2xx body.
pub fn classify_decode(provider: &str, err: &serde_json::Error) -> MailError {
    MailError::ServerFailure(format!("{provider}: unreadable response: {err}"))
}
