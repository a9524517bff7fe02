//! Backend resource metadata and its namespaced form.

use super::{FederationDomainError, ServerName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the owning server and the original resource URI.
const RESOURCE_SEPARATOR: &str = "://";

/// Resource metadata exactly as a backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResource {
    uri: String,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
}

impl BackendResource {
    /// Creates resource metadata; an empty name falls back to the URI.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::EmptyResourceUri`] when the URI is
    /// empty after trimming.
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, FederationDomainError> {
        let normalized_uri = uri.into().trim().to_owned();
        if normalized_uri.is_empty() {
            return Err(FederationDomainError::EmptyResourceUri);
        }
        let normalized_name = name.into().trim().to_owned();
        let resolved_name = if normalized_name.is_empty() {
            normalized_uri.clone()
        } else {
            normalized_name
        };

        Ok(Self {
            uri: normalized_uri,
            name: resolved_name,
            description: None,
            mime_type: None,
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|text| !text.trim().is_empty());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type.filter(|text| !text.trim().is_empty());
        self
    }

    /// Returns the URI as known to its backend.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the optional MIME type.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

/// Resource entry in the aggregated, namespaced catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    uri: String,
    original_uri: String,
    server: ServerName,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
}

impl ResourceDescriptor {
    /// Namespaces a backend resource under its owning server.
    #[must_use]
    pub fn namespaced(server: &ServerName, resource: &BackendResource) -> Self {
        Self {
            uri: format!("{server}{RESOURCE_SEPARATOR}{}", resource.uri()),
            original_uri: resource.uri().to_owned(),
            server: server.clone(),
            name: format!("[{server}] {}", resource.name()),
            description: resource.description().map(str::to_owned),
            mime_type: resource.mime_type().map(str::to_owned),
        }
    }

    /// Returns the namespaced URI (`<server>://<original-uri>`).
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the URI as known to its backend.
    #[must_use]
    pub fn original_uri(&self) -> &str {
        &self.original_uri
    }

    /// Returns the owning server.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the server-tagged name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the optional MIME type.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

/// A namespaced resource URI split into server and original URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedResourceUri {
    server: ServerName,
    uri: String,
}

impl QualifiedResourceUri {
    /// Parses `<server>://<uri>`, splitting at the first `://`.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::MalformedResourceUri`] when there is
    /// no separator, the server part is not a valid name or the URI part is
    /// empty.
    pub fn parse(value: &str) -> Result<Self, FederationDomainError> {
        let trimmed = value.trim();
        let malformed = || FederationDomainError::MalformedResourceUri(trimmed.to_owned());
        let (server_part, uri_part) = trimmed
            .split_once(RESOURCE_SEPARATOR)
            .ok_or_else(malformed)?;
        let server = ServerName::new(server_part).map_err(|_| malformed())?;
        if uri_part.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            server,
            uri: uri_part.to_owned(),
        })
    }

    /// Returns the server part.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the original resource URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for QualifiedResourceUri {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}{RESOURCE_SEPARATOR}{}", self.server, self.uri)
    }
}
