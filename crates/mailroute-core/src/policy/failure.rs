//! Which failure kinds count against a provider's health.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Set of error kinds that lower a provider's health.
///
/// The default penalizes provider-side failures only: `ServerFailure`,
/// `Unauthorized` and `TooManyRequests`. `BadRequest` and `NetworkFailure`
/// count only when added. `InvalidArgument` and `NoProvidersRegistered` never count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailurePolicy {
    penalized: Vec<ErrorKind>,
}

impl FailurePolicy {
    pub fn new(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        let mut policy = Self { penalized: Vec::new() };
        for kind in kinds {
            policy = policy.penalize(kind);
        }
        policy
    }

    /// Penalize every failure the provider could be blamed for, including
    /// transport failures and rejected requests.
    pub fn strict() -> Self {
        Self::default()
            .penalize(ErrorKind::NetworkFailure)
            .penalize(ErrorKind::BadRequest)
    }

    /// Add `kind` to the penalized set.
    pub fn penalize(mut self, kind: ErrorKind) -> Self {
        if !self.penalized.contains(&kind) {
            self.penalized.push(kind);
        }
        self
    }

    /// Remove `kind` from the penalized set.
    pub fn forgive(mut self, kind: ErrorKind) -> Self {
        self.penalized.retain(|k| *k != kind);
        self
    }

    /// Returns `true` if a failure of `kind` should lower health.
    pub fn penalizes(&self, kind: ErrorKind) -> bool {
        match kind {
            ErrorKind::InvalidArgument | ErrorKind::NoProvidersRegistered => false,
            other => self.penalized.contains(&other),
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            penalized: vec![
                ErrorKind::ServerFailure,
                ErrorKind::Unauthorized,
                ErrorKind::TooManyRequests,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_penalizes_provider_side_failures() {
        let p = FailurePolicy::default();
        assert!(p.penalizes(ErrorKind::ServerFailure));
        assert!(p.penalizes(ErrorKind::Unauthorized));
        assert!(p.penalizes(ErrorKind::TooManyRequests));
        assert!(!p.penalizes(ErrorKind::BadRequest));
        assert!(!p.penalizes(ErrorKind::NetworkFailure));
        assert!(!p.penalizes(ErrorKind::InvalidArgument));
    }

    #[test]
    fn strict_adds_network_and_bad_request() {
        let p = FailurePolicy::strict();
        assert!(p.penalizes(ErrorKind::NetworkFailure));
        assert!(p.penalizes(ErrorKind::BadRequest));
    }

    #[test]
    fn invalid_argument_never_counts() {
        let p = FailurePolicy::new([ErrorKind::InvalidArgument, ErrorKind::NoProvidersRegistered]);
        assert!(!p.penalizes(ErrorKind::InvalidArgument));
        assert!(!p.penalizes(ErrorKind::NoProvidersRegistered));
    }

    #[test]
    fn forgive_removes_kind() {
        let p = FailurePolicy::default().forgive(ErrorKind::Unauthorized);
        assert!(!p.penalizes(ErrorKind::Unauthorized));
        assert!(p.penalizes(ErrorKind::ServerFailure));
    }

    #[test]
    fn deserializes_from_kind_list() {
        let p: FailurePolicy =
            serde_json::from_str(r#"["server_failure", "network_failure"]"#).unwrap();
        assert!(p.penalizes(ErrorKind::NetworkFailure));
        assert!(!p.penalizes(ErrorKind::TooManyRequests));
    }
}
