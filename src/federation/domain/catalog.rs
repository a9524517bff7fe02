//! Per-backend capability caches and the aggregated federation catalog.

use super::{
    BackendResource, BackendServer, BackendTool, QualifiedResourceUri, QualifiedToolName,
    ResourceDescriptor, ServerName, ToolDescriptor,
};
use serde::{Deserialize, Serialize};

/// Tools and resources most recently fetched from one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCatalog {
    tools: Vec<BackendTool>,
    resources: Vec<BackendResource>,
}

impl BackendCatalog {
    /// Creates a catalog from fetched tools and resources.
    #[must_use]
    pub const fn new(tools: Vec<BackendTool>, resources: Vec<BackendResource>) -> Self {
        Self { tools, resources }
    }

    /// Returns the cached tools.
    #[must_use]
    pub fn tools(&self) -> &[BackendTool] {
        &self.tools
    }

    /// Returns the cached resources.
    #[must_use]
    pub fn resources(&self) -> &[BackendResource] {
        &self.resources
    }

    /// Finds a cached tool by its backend name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&BackendTool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Finds a cached resource by its backend URI.
    #[must_use]
    pub fn resource(&self, uri: &str) -> Option<&BackendResource> {
        self.resources.iter().find(|resource| resource.uri() == uri)
    }
}

/// A backend contributing to the aggregated catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogServer {
    /// Server name.
    pub name: ServerName,
    /// Human description supplied at registration.
    pub description: String,
    /// Position in registration order, used to break routing ties.
    pub registration_order: u64,
}

/// Union of namespaced capabilities across routable backends.
///
/// Always derived from registry snapshots; never mutated independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCatalog {
    servers: Vec<CatalogServer>,
    tools: Vec<ToolDescriptor>,
    resources: Vec<ResourceDescriptor>,
}

impl AggregatedCatalog {
    /// Builds the catalog from backend snapshots, skipping non-routable ones.
    ///
    /// Servers are kept in registration order. Tools are sorted by server
    /// name then tool name, resources by server name then URI.
    #[must_use]
    pub fn from_servers<'a>(servers: impl IntoIterator<Item = &'a BackendServer>) -> Self {
        let mut catalog = Self::default();
        for server in servers
            .into_iter()
            .filter(|server| server.health().is_routable())
        {
            catalog.servers.push(CatalogServer {
                name: server.name().clone(),
                description: server.description().to_owned(),
                registration_order: server.registration_order(),
            });
            catalog.tools.extend(
                server
                    .catalog()
                    .tools()
                    .iter()
                    .map(|tool| ToolDescriptor::namespaced(server.name(), tool)),
            );
            catalog.resources.extend(
                server
                    .catalog()
                    .resources()
                    .iter()
                    .map(|resource| ResourceDescriptor::namespaced(server.name(), resource)),
            );
        }

        catalog.servers.sort_by_key(|server| server.registration_order);
        catalog.tools.sort_by(|left, right| {
            (left.server(), left.original_name()).cmp(&(right.server(), right.original_name()))
        });
        catalog.resources.sort_by(|left, right| {
            (left.server(), left.original_uri()).cmp(&(right.server(), right.original_uri()))
        });
        catalog
    }

    /// Returns contributing servers in registration order.
    #[must_use]
    pub fn servers(&self) -> &[CatalogServer] {
        &self.servers
    }

    /// Returns the namespaced tools.
    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Returns the namespaced resources.
    #[must_use]
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Returns the tools owned by `server`.
    pub fn tools_of<'a>(
        &'a self,
        server: &'a ServerName,
    ) -> impl Iterator<Item = &'a ToolDescriptor> + 'a {
        self.tools.iter().filter(move |tool| tool.server() == server)
    }

    /// Finds a tool by its qualified reference.
    #[must_use]
    pub fn tool(&self, reference: &QualifiedToolName) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| {
            tool.server() == reference.server() && tool.original_name() == reference.tool()
        })
    }

    /// Finds a resource by its qualified reference.
    #[must_use]
    pub fn resource(&self, reference: &QualifiedResourceUri) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|resource| {
            resource.server() == reference.server() && resource.original_uri() == reference.uri()
        })
    }

    /// Returns whether `server` contributes to this catalog.
    #[must_use]
    pub fn contains_server(&self, server: &ServerName) -> bool {
        self.servers.iter().any(|entry| &entry.name == server)
    }

    /// Returns the registration order of `server`, if it contributes.
    #[must_use]
    pub fn registration_order(&self, server: &ServerName) -> Option<u64> {
        self.servers
            .iter()
            .find(|entry| &entry.name == server)
            .map(|entry| entry.registration_order)
    }
}
