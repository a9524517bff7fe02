//! Error types for federation domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing federation domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FederationDomainError {
    /// The server name is empty after trimming.
    #[error("server name must not be empty")]
    EmptyServerName,

    /// The server name contains characters outside `[a-z0-9_-]`.
    #[error(
        "server name '{0}' contains invalid characters (only lowercase alphanumeric, '_' and '-' allowed)"
    )]
    InvalidServerName(String),

    /// The server name exceeds the 100-character limit.
    #[error("server name exceeds 100 character limit: {0}")]
    ServerNameTooLong(String),

    /// The endpoint address is not a well-formed HTTP(S) URL.
    #[error("invalid endpoint '{address}': {reason}")]
    InvalidEndpoint {
        /// Address as supplied.
        address: String,
        /// Why the address was rejected.
        reason: String,
    },

    /// The authentication type is not one of `bearer`, `basic`, `api_key`.
    #[error("unsupported auth type '{0}' (expected bearer, basic or api_key)")]
    UnsupportedAuthType(String),

    /// An authentication type was given without a token.
    #[error("auth type '{0}' requires a non-empty auth token")]
    MissingAuthToken(String),

    /// Basic credentials must be given as `user:password`.
    #[error("basic auth token must have the form 'user:password'")]
    MalformedBasicCredential,

    /// A backend tool name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// A backend resource URI is empty after trimming.
    #[error("resource URI must not be empty")]
    EmptyResourceUri,

    /// A namespaced tool name lacks the `<server>.<tool>` shape.
    #[error("'{0}' is not a namespaced tool name of the form <server>.<tool>")]
    MalformedToolName(String),

    /// A namespaced resource URI lacks the `<server>://<uri>` shape.
    #[error("'{0}' is not a namespaced resource URI of the form <server>://<uri>")]
    MalformedResourceUri(String),

    /// A confidence score fell outside `[0, 1]` or was not a number.
    #[error("confidence {0} is outside the range [0, 1]")]
    ConfidenceOutOfRange(String),

    /// A workflow step identifier is empty after trimming.
    #[error("workflow step id must not be empty")]
    EmptyStepId,

    /// A workflow step identifier is not a template-safe identifier.
    #[error(
        "workflow step id '{0}' must start with a letter or '_' and contain only alphanumerics or '_'"
    )]
    InvalidStepId(String),

    /// A workflow step references a step that does not run before it.
    #[error("workflow step '{step}' references '{reference}', which is not an earlier step")]
    UnresolvableStepReference {
        /// Step containing the reference.
        step: String,
        /// Referenced step identifier.
        reference: String,
    },

    /// Two workflow steps share an identifier.
    #[error("workflow step id '{0}' is used more than once")]
    DuplicateStepId(String),

    /// A workflow plan contains no steps.
    #[error("workflow plan must contain at least one step")]
    EmptyWorkflow,

    /// The routing request text is empty after trimming.
    #[error("routing request must not be empty")]
    EmptyRoutingRequest,
}
