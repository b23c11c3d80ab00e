use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string cannot be parsed as an email address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{0}` is not a valid email address")]
pub struct AddressError(pub String);

/// A syntactically validated email address.
///
/// Construction is the only validation point: any `EmailAddress` in the
/// system is known to be well formed, so payloads cannot be built around
/// an unparseable recipient.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// The local part, before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(local, _)| local)
    }

    /// The domain part, after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EmailAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError(s.to_string());

        let (local, domain) = s.rsplit_once('@').ok_or_else(invalid)?;

        if local.is_empty() || local.contains('@') || domain.is_empty() {
            return Err(invalid());
        }

        if s.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        // Bare hostnames are rejected; a deliverable domain has at least
        // one label separator and no empty labels.
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(invalid());
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
