//! Validated-name types for backend servers and workflow steps.

use super::FederationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a backend server name.
const MAX_SERVER_NAME_LENGTH: usize = 100;

/// Validated backend server name.
///
/// Server names prefix every namespaced tool (`<server>.<tool>`) and resource
/// (`<server>://<uri>`), so they never contain `.` or `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerName(String);

impl ServerName {
    /// Creates a validated server name.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9_-]`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, FederationDomainError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(FederationDomainError::EmptyServerName);
        }

        let is_valid = normalized.chars().all(|character| {
            character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || character == '_'
                || character == '-'
        });
        if !is_valid {
            return Err(FederationDomainError::InvalidServerName(normalized));
        }

        if normalized.len() > MAX_SERVER_NAME_LENGTH {
            return Err(FederationDomainError::ServerNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the server name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for ServerName {
    type Error = FederationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServerName> for String {
    fn from(value: ServerName) -> Self {
        value.0
    }
}

/// Identifier of a step within a workflow plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);

impl StepId {
    /// Creates a step identifier usable in argument templates.
    ///
    /// Identifiers start with an ASCII letter or `_` and continue with ASCII
    /// alphanumerics or `_`.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError`] when the value is empty or contains
    /// other characters.
    pub fn new(value: impl Into<String>) -> Result<Self, FederationDomainError> {
        let normalized = value.into().trim().to_owned();
        let mut characters = normalized.chars();
        let Some(first) = characters.next() else {
            return Err(FederationDomainError::EmptyStepId);
        };
        let is_valid = (first.is_ascii_alphabetic() || first == '_')
            && characters.all(|character| character.is_ascii_alphanumeric() || character == '_');
        if !is_valid {
            return Err(FederationDomainError::InvalidStepId(normalized));
        }
        Ok(Self(normalized))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for StepId {
    type Error = FederationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepId> for String {
    fn from(value: StepId) -> Self {
        value.0
    }
}
