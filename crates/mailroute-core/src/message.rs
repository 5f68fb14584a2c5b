//! The email value that providers deliver.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// Body format of an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "text/plain")]
    Plain,
    #[serde(rename = "text/html")]
    Html,
}

impl ContentType {
    /// MIME type string, as sent to providers.
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Plain => "text/plain",
            Self::Html => "text/html",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

impl FromStr for ContentType {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text/plain" | "plain" => Ok(Self::Plain),
            "text/html" | "html" => Ok(Self::Html),
            other => Err(MailError::InvalidArgument(format!(
                "content type has to be text/plain or text/html, got {other:?}"
            ))),
        }
    }
}

/// An address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Mailbox {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn named(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// `local@label.rest`: the local part allows ASCII letters, digits and
/// `_.+-`; the domain is a label of letters, digits and `-`, a dot, then
/// letters, digits, `-` and dots.
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$")
        .expect("address pattern compiles")
});

/// Syntactic address check. Accepts some addresses no mail server would.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

/// One email to deliver.
///
/// Constructors validate. A value obtained some other way (deserialized from
/// a job payload, for instance) is validated again by every provider before
/// it is sent, see [`Email::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    to: Vec<Mailbox>,
    from: Mailbox,
    subject: String,
    body: String,
    #[serde(default)]
    content_type: ContentType,
}

impl Email {
    /// Single-recipient plain-text email.
    pub fn new(
        to: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, MailError> {
        let email = Self {
            to: vec![Mailbox::new(to)],
            from: Mailbox::new(from),
            subject: subject.into(),
            body: body.into(),
            content_type: ContentType::Plain,
        };
        email.is_valid()?;
        Ok(email)
    }

    /// Build an email from all of its parts.
    ///
    /// `content_type` accepts `text/plain`, `text/html`, `plain` or `html`.
    pub fn compose(
        from: Mailbox,
        to: Vec<Mailbox>,
        subject: impl Into<String>,
        body: impl Into<String>,
        content_type: &str,
    ) -> Result<Self, MailError> {
        let mut email = Self {
            to,
            from,
            subject: subject.into(),
            body: body.into(),
            content_type: ContentType::default(),
        };
        // Content type is the last check, after every field.
        email.is_valid()?;
        email.content_type = content_type.parse()?;
        Ok(email)
    }

    /// Append a recipient. Not validated until [`Email::is_valid`] runs.
    pub fn add_recipient(&mut self, address: impl Into<String>, name: Option<String>) {
        self.to.push(Mailbox {
            address: address.into(),
            name,
        });
    }

    /// Run every check and return the first violation.
    ///
    /// Order: recipients present, recipient addresses, sender address,
    /// subject, body, content type.
    pub fn is_valid(&self) -> Result<(), MailError> {
        if self.to.is_empty() {
            return Err(MailError::InvalidArgument("no recipient supplied".into()));
        }
        if let Some(bad) = self.to.iter().find(|m| !is_valid_address(&m.address)) {
            return Err(MailError::InvalidArgument(format!(
                "recipient {:?} is invalid",
                bad.address
            )));
        }
        if !is_valid_address(&self.from.address) {
            return Err(MailError::InvalidArgument(format!(
                "sender {:?} is invalid",
                self.from.address
            )));
        }
        if self.subject.is_empty() {
            return Err(MailError::InvalidArgument("subject is missing".into()));
        }
        if self.body.is_empty() {
            return Err(MailError::InvalidArgument("body is missing".into()));
        }
        // `content_type` is typed; unknown values are rejected when parsed.
        Ok(())
    }

    pub fn recipients(&self) -> &[Mailbox] {
        &self.to
    }

    pub fn sender(&self) -> &Mailbox {
        &self.from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}
