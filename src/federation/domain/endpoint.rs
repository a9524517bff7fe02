//! Backend endpoint addresses and stored credentials.

use super::FederationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated HTTP(S) address of a backend's JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackendEndpoint(String);

impl BackendEndpoint {
    /// Creates a validated endpoint address.
    ///
    /// The address must use the `http` or `https` scheme, name a host, carry
    /// a numeric port when one is given and contain no whitespace. A trailing
    /// `/` is removed.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::InvalidEndpoint`] when the address is
    /// malformed.
    pub fn new(address: impl Into<String>) -> Result<Self, FederationDomainError> {
        let raw = address.into();
        let trimmed = raw.trim();
        let invalid = |reason: &str| FederationDomainError::InvalidEndpoint {
            address: trimmed.to_owned(),
            reason: reason.to_owned(),
        };

        if trimmed.is_empty() {
            return Err(invalid("address must not be empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("address must not contain whitespace"));
        }

        let rest = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .ok_or_else(|| invalid("scheme must be http or https"))?;

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let host_and_port = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host)| host);
        let (host, port) = split_host_port(host_and_port);

        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if port.is_some_and(|port_text| port_text.parse::<u16>().is_err()) {
            return Err(invalid("port must be a number between 0 and 65535"));
        }

        Ok(Self(trimmed.trim_end_matches('/').to_owned()))
    }

    /// Returns the endpoint address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        return authority.split_once("]:").map_or((authority, None), |(host, port)| {
            (host.trim_start_matches('['), Some(port))
        });
    }
    authority
        .rsplit_once(':')
        .map_or((authority, None), |(host, port)| (host, Some(port)))
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for BackendEndpoint {
    type Error = FederationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BackendEndpoint> for String {
    fn from(value: BackendEndpoint) -> Self {
        value.0
    }
}

/// Credential the gateway presents when calling a backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "auth_type")]
pub enum Credential {
    /// Sent as `Authorization: Bearer <token>`.
    Bearer {
        /// Bearer token.
        token: String,
    },
    /// Sent as HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Sent as an `X-API-Key` header.
    ApiKey {
        /// API key value.
        key: String,
    },
}

impl Credential {
    /// Parses a credential from an auth type and token.
    ///
    /// Accepted types are `bearer`, `basic` (token `user:password`) and
    /// `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError`] for unknown types, empty tokens or a
    /// malformed basic token.
    pub fn parse(auth_type: &str, token: &str) -> Result<Self, FederationDomainError> {
        let normalized_type = auth_type.trim().to_ascii_lowercase();
        let normalized_token = token.trim();
        if normalized_token.is_empty() {
            return Err(FederationDomainError::MissingAuthToken(normalized_type));
        }

        match normalized_type.as_str() {
            "bearer" => Ok(Self::Bearer {
                token: normalized_token.to_owned(),
            }),
            "basic" => {
                let (username, password) = normalized_token
                    .split_once(':')
                    .filter(|(username, _)| !username.is_empty())
                    .ok_or(FederationDomainError::MalformedBasicCredential)?;
                Ok(Self::Basic {
                    username: username.to_owned(),
                    password: password.to_owned(),
                })
            }
            "api_key" | "apikey" => Ok(Self::ApiKey {
                key: normalized_token.to_owned(),
            }),
            _ => Err(FederationDomainError::UnsupportedAuthType(normalized_type)),
        }
    }

    /// Returns the canonical auth type name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bearer { .. } => "bearer",
            Self::Basic { .. } => "basic",
            Self::ApiKey { .. } => "api_key",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credential")
            .field("kind", &self.kind())
            .field("secret", &"<redacted>")
            .finish()
    }
}
