//! Delivery error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that a single delivery attempt can produce.
///
/// Providers classify every failure into exactly one of the first six
/// variants. `NoProvidersRegistered` is only raised by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    /// The message was malformed; caught before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider rejected the request as malformed (4xx other than 401/429).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The provider rejected the credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider rate-limited the caller (429).
    #[error("too many requests: {0}")]
    TooManyRequests(String),

    /// The provider failed internally (5xx) or answered with an unexpected status.
    #[error("server failure: {0}")]
    ServerFailure(String),

    /// The provider could not be reached (connect error or timeout).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The dispatcher has no providers to choose from.
    #[error("no mail providers registered")]
    NoProvidersRegistered,
}

/// Fieldless discriminant of [`MailError`], used by policies and callers
/// that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    BadRequest,
    Unauthorized,
    TooManyRequests,
    ServerFailure,
    NetworkFailure,
    NoProvidersRegistered,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::TooManyRequests => "too_many_requests",
            Self::ServerFailure => "server_failure",
            Self::NetworkFailure => "network_failure",
            Self::NoProvidersRegistered => "no_providers_registered",
        };
        f.write_str(s)
    }
}

impl MailError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::TooManyRequests(_) => ErrorKind::TooManyRequests,
            Self::ServerFailure(_) => ErrorKind::ServerFailure,
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::NoProvidersRegistered => ErrorKind::NoProvidersRegistered,
        }
    }

    /// Returns `true` if a caller may retry this error after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TooManyRequests(_) | Self::ServerFailure(_) | Self::NetworkFailure(_)
        )
    }

    /// Human-readable detail attached to the error.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidArgument(d)
            | Self::BadRequest(d)
            | Self::Unauthorized(d)
            | Self::TooManyRequests(d)
            | Self::ServerFailure(d)
            | Self::NetworkFailure(d) => d,
            Self::NoProvidersRegistered => "no mail providers registered",
        }
    }

    /// Classify a non-2xx HTTP status returned by a provider.
    ///
    /// `body` is the raw response text and becomes the error detail.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 => Self::Unauthorized(body),
            429 => Self::TooManyRequests(body),
            400..=499 => Self::BadRequest(body),
            500..=599 => Self::ServerFailure(body),
            other => Self::ServerFailure(format!("unexpected status code {other}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(MailError::from_status(401, "no").kind(), ErrorKind::Unauthorized);
        assert_eq!(MailError::from_status(429, "slow").kind(), ErrorKind::TooManyRequests);
        assert_eq!(MailError::from_status(400, "bad").kind(), ErrorKind::BadRequest);
        assert_eq!(MailError::from_status(413, "big").kind(), ErrorKind::BadRequest);
        assert_eq!(MailError::from_status(503, "down").kind(), ErrorKind::ServerFailure);
    }

    #[test]
    fn unrecognized_status_embeds_code() {
        let err = MailError::from_status(302, "moved");
        assert_eq!(err.kind(), ErrorKind::ServerFailure);
        assert!(err.detail().contains("302"));
        assert!(err.detail().contains("moved"));
    }

    #[test]
    fn retryable_kinds() {
        assert!(MailError::TooManyRequests(String::new()).is_retryable());
        assert!(MailError::ServerFailure(String::new()).is_retryable());
        assert!(MailError::NetworkFailure(String::new()).is_retryable());
        assert!(!MailError::InvalidArgument(String::new()).is_retryable());
        assert!(!MailError::BadRequest(String::new()).is_retryable());
        assert!(!MailError::Unauthorized(String::new()).is_retryable());
        assert!(!MailError::NoProvidersRegistered.is_retryable());
    }

    #[test]
    fn display_includes_detail() {
        let err = MailError::BadRequest("missing subject".into());
        assert_eq!(err.to_string(), "bad request: missing subject");
    }
}
