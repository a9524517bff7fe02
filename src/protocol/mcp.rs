//! MCP method payloads exchanged over JSON-RPC.

use crate::federation::domain::{
    BackendResource, BackendTool, FederationDomainError, ResourceDescriptor, ToolDescriptor,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol revision spoken by the gateway.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool entry as it appears in `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolInfo {
    /// Converts a backend's listing entry into domain metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::EmptyToolName`] for a blank name.
    pub fn into_backend_tool(self) -> Result<BackendTool, FederationDomainError> {
        BackendTool::new(
            self.name,
            self.description.unwrap_or_default(),
            self.input_schema,
        )
    }
}

impl From<&ToolDescriptor> for ToolInfo {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name().to_owned(),
            description: Some(descriptor.description().to_owned()),
            input_schema: Some(descriptor.input_schema().clone()),
        }
    }
}

/// Result of `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsListResult {
    /// Listed tools.
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    /// Pagination cursor, unused by the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Resource entry as it appears in `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceInfo {
    /// Converts a backend's listing entry into domain metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::EmptyResourceUri`] for a blank URI.
    pub fn into_backend_resource(self) -> Result<BackendResource, FederationDomainError> {
        Ok(BackendResource::new(self.uri, self.name)?
            .with_description(self.description)
            .with_mime_type(self.mime_type))
    }
}

impl From<&ResourceDescriptor> for ResourceInfo {
    fn from(descriptor: &ResourceDescriptor) -> Self {
        Self {
            uri: descriptor.uri().to_owned(),
            name: descriptor.name().to_owned(),
            description: descriptor.description().map(str::to_owned),
            mime_type: descriptor.mime_type().map(str::to_owned),
        }
    }
}

/// Result of `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesListResult {
    /// Listed resources.
    #[serde(default)]
    pub resources: Vec<ResourceInfo>,
    /// Pagination cursor, unused by the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments; an empty object when omitted.
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

/// Parameters of `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResourceParams {
    /// Resource URI.
    pub uri: String,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
