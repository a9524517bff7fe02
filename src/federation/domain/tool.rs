//! Backend tool metadata and its namespaced, aggregated form.

use super::{FederationDomainError, ServerName};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Tool metadata exactly as a backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTool {
    name: String,
    description: String,
    input_schema: Value,
}

impl BackendTool {
    /// Creates tool metadata.
    ///
    /// A missing schema defaults to an empty object schema.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::EmptyToolName`] when the name is empty
    /// after trimming.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Option<Value>,
    ) -> Result<Self, FederationDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(FederationDomainError::EmptyToolName);
        }

        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            input_schema: input_schema.unwrap_or_else(|| json!({"type": "object"})),
        })
    }

    /// Returns the tool name as known to its backend.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend's description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the JSON input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}

/// Tool entry in the aggregated, namespaced catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: String,
    original_name: String,
    server: ServerName,
    description: String,
    input_schema: Value,
}

impl ToolDescriptor {
    /// Namespaces a backend tool under its owning server.
    #[must_use]
    pub fn namespaced(server: &ServerName, tool: &BackendTool) -> Self {
        let description = if tool.description().is_empty() {
            format!("[{server}]")
        } else {
            format!("[{server}] {}", tool.description())
        };
        Self {
            name: format!("{server}.{}", tool.name()),
            original_name: tool.name().to_owned(),
            server: server.clone(),
            description,
            input_schema: tool.input_schema().clone(),
        }
    }

    /// Returns the namespaced name (`<server>.<tool>`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool name as known to its backend.
    #[must_use]
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Returns the owning server.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the server-tagged description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the JSON input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the argument names listed in the schema's `required` array.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the property names declared by the schema.
    #[must_use]
    pub fn argument_names(&self) -> Vec<&str> {
        self.input_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| properties.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the required argument names missing from `arguments`.
    #[must_use]
    pub fn missing_arguments(&self, arguments: &Value) -> Vec<String> {
        self.required_arguments()
            .into_iter()
            .filter(|name| arguments.get(name).is_none_or(Value::is_null))
            .map(str::to_owned)
            .collect()
    }
}

/// A namespaced tool reference split into server and original tool name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedToolName {
    server: ServerName,
    tool: String,
}

impl QualifiedToolName {
    /// Creates a reference from its parts.
    #[must_use]
    pub const fn new(server: ServerName, tool: String) -> Self {
        Self { server, tool }
    }

    /// Parses `<server>.<tool>`, splitting at the first `.`.
    ///
    /// The tool part may itself contain dots.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::MalformedToolName`] when there is no
    /// separator, the server part is not a valid name or the tool part is
    /// empty.
    pub fn parse(value: &str) -> Result<Self, FederationDomainError> {
        let trimmed = value.trim();
        let malformed = || FederationDomainError::MalformedToolName(trimmed.to_owned());
        let (server_part, tool_part) = trimmed.split_once('.').ok_or_else(malformed)?;
        let server = ServerName::new(server_part).map_err(|_| malformed())?;
        if tool_part.trim().is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            server,
            tool: tool_part.trim().to_owned(),
        })
    }

    /// Returns the server part.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the original tool name.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }
}

impl fmt::Display for QualifiedToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}", self.server, self.tool)
    }
}
