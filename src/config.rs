//! Gateway configuration read from environment variables.
//!
//! Every setting has a default except the optional secrets. Values are read
//! through an injectable lookup so that tests never touch process state.

use crate::federation::{
    adapters::http::ChatCompletionsConfig,
    domain::HealthPolicy,
    services::{FederationSettings, RegisterServerRequest},
};
use axum::http::{HeaderValue, Method, header};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;
const DEFAULT_REASONING_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_REASONING_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_REASONING_TIMEOUT_MS: u64 = 15_000;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },

    /// A variable that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The bootstrap file could not be read.
    #[error("failed to read bootstrap servers from {path}: {source}")]
    BootstrapRead {
        /// File path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The bootstrap file is not valid JSON of the expected shape.
    #[error("failed to parse bootstrap servers in {path}: {source}")]
    BootstrapParse {
        /// File path.
        path: PathBuf,
        /// Underlying parse failure.
        source: serde_json::Error,
    },
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin (`*`).
    Any,
    /// An explicit origin list.
    List(Vec<HeaderValue>),
}

impl AllowedOrigins {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let origins: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect();
        if origins.is_empty() || origins.contains(&"*") {
            return Ok(Self::Any);
        }
        origins
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|err| ConfigError::Invalid {
                    name: "ALLOWED_ORIGINS",
                    value: origin.to_owned(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::List)
    }

    /// Builds the CORS layer for these origins.
    #[must_use]
    pub fn layer(&self) -> CorsLayer {
        let base = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-api-key"),
            ]);
        match self {
            Self::Any => base.allow_origin(Any),
            Self::List(origins) => base.allow_origin(origins.clone()),
        }
    }
}

/// Fully resolved gateway configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Secret guarding the protocol and administration routes.
    pub api_key: Option<String>,
    /// CORS origins.
    pub allowed_origins: AllowedOrigins,
    /// Timing and policy knobs for the federation services.
    pub federation: FederationSettings,
    /// Reasoning service settings; `None` disables the reasoning strategy.
    pub reasoning: Option<ChatCompletionsConfig>,
    /// JSON file listing backends to register at startup.
    pub servers_file: Option<PathBuf>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("allowed_origins", &self.allowed_origins)
            .field("federation", &self.federation)
            .field("reasoning", &self.reasoning)
            .field("servers_file", &self.servers_file)
            .finish()
    }
}

impl GatewayConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is malformed or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is malformed or out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let probe_interval_secs =
            env.positive("HEALTH_CHECK_INTERVAL_SECS", DEFAULT_PROBE_INTERVAL_SECS)?;
        let failure_threshold =
            env.positive("HEALTH_FAILURE_THRESHOLD", DEFAULT_FAILURE_THRESHOLD)?;
        let federation = FederationSettings {
            health_policy: HealthPolicy::new(failure_threshold),
            probe_interval: Duration::from_secs(probe_interval_secs),
            probe_timeout: env.millis("PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS)?,
            call_timeout: env.millis("CALL_TIMEOUT_MS", DEFAULT_CALL_TIMEOUT_MS)?,
            retry_backoff: Duration::from_millis(
                env.parsed("RETRY_BACKOFF_MS", DEFAULT_RETRY_BACKOFF_MS)?,
            ),
            reasoning_timeout: env
                .millis("REASONING_TIMEOUT_MS", DEFAULT_REASONING_TIMEOUT_MS)?,
        };

        let reasoning = env
            .get("REASONING_API_KEY")
            .or_else(|| env.get("GROQ_API_KEY"))
            .map(|api_key| ChatCompletionsConfig {
                base_url: env
                    .get("REASONING_API_URL")
                    .unwrap_or_else(|| DEFAULT_REASONING_URL.to_owned()),
                api_key,
                model: env
                    .get("REASONING_MODEL")
                    .unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_owned()),
            });

        Ok(Self {
            host: env
                .get("SWITCHBOARD_HOST")
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: env.parsed("PORT", DEFAULT_PORT)?,
            api_key: env.get("SWITCHBOARD_API_KEY"),
            allowed_origins: env
                .get("ALLOWED_ORIGINS")
                .map_or(Ok(AllowedOrigins::Any), |raw| AllowedOrigins::parse(&raw))?,
            federation,
            reasoning,
            servers_file: env.get("SWITCHBOARD_SERVERS_FILE").map(PathBuf::from),
        })
    }

    /// Returns the `host:port` listen address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Loads the bootstrap backends, if a file is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BootstrapRead`] or
    /// [`ConfigError::BootstrapParse`] when the file is unusable.
    pub fn bootstrap_servers(&self) -> Result<Vec<RegisterServerRequest>, ConfigError> {
        self.servers_file
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), load_bootstrap_file)
    }
}

/// Bootstrap files hold either a bare list or `{"servers": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BootstrapFile {
    List(Vec<RegisterServerRequest>),
    Wrapped { servers: Vec<RegisterServerRequest> },
}

fn load_bootstrap_file(path: &Path) -> Result<Vec<RegisterServerRequest>, ConfigError> {
    let raw = std::fs::read(path).map_err(|source| ConfigError::BootstrapRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bootstrap(&raw).map_err(|source| ConfigError::BootstrapParse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_bootstrap(raw: &[u8]) -> Result<Vec<RegisterServerRequest>, serde_json::Error> {
    let file: BootstrapFile = serde_json::from_slice(raw)?;
    Ok(match file {
        BootstrapFile::List(servers) | BootstrapFile::Wrapped { servers } => servers,
    })
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(name).map_or(Ok(default), |raw| {
            raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
                name,
                reason: err.to_string(),
                value: raw,
            })
        })
    }

    fn positive<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialEq + Default,
        T::Err: fmt::Display,
    {
        let value = self.parsed(name, default)?;
        if value == T::default() {
            return Err(ConfigError::Zero(name));
        }
        Ok(value)
    }

    fn millis(&self, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.positive(name, default).map(Duration::from_millis)
    }
}
