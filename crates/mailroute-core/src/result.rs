//! Normalized success payload returned by providers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Email;

/// Outcome of a successful delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    /// Name of the provider that accepted the message.
    pub provider: String,
    /// Recipient address → whether the provider reports it as delivered.
    pub delivered: BTreeMap<String, bool>,
    /// Raw vendor response, kept for audit.
    #[serde(default)]
    pub response: Value,
}

impl SendResult {
    /// A result that marks every recipient of `email` as delivered.
    pub fn all_delivered(provider: impl Into<String>, email: &Email, response: Value) -> Self {
        let delivered = email
            .recipients()
            .iter()
            .map(|m| (m.address.clone(), true))
            .collect();
        Self {
            provider: provider.into(),
            delivered,
            response,
        }
    }

    /// Returns `true` if the provider reported `address` as delivered.
    pub fn is_delivered(&self, address: &str) -> bool {
        self.delivered.get(address).copied().unwrap_or(false)
    }

    /// Recipients the provider did not accept.
    pub fn rejected(&self) -> impl Iterator<Item = &str> {
        self.delivered
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(addr, _)| addr.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_delivered_covers_every_recipient() {
        let mut email = Email::new("a@b.com", "from@b.com", "Subj", "Body").unwrap();
        email.add_recipient("c@d.com", None);
        let result = SendResult::all_delivered("stub", &email, Value::Null);
        assert_eq!(result.provider, "stub");
        assert!(result.is_delivered("a@b.com"));
        assert!(result.is_delivered("c@d.com"));
        assert!(!result.is_delivered("x@y.com"));
        assert_eq!(result.rejected().count(), 0);
    }

    #[test]
    fn rejected_lists_failed_recipients() {
        let result = SendResult {
            provider: "mandrill".into(),
            delivered: [("a@b.com".to_string(), true), ("c@d.com".to_string(), false)]
                .into_iter()
                .collect(),
            response: Value::Null,
        };
        assert_eq!(result.rejected().collect::<Vec<_>>(), vec!["c@d.com"]);
    }
}
