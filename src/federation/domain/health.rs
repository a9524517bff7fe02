//! Backend health states and the circuit-breaker policy.

use super::ServerName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of consecutive probe failures before a backend is excluded.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Liveness state of a registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Registered but never successfully probed.
    Unknown,
    /// Last probe succeeded.
    Healthy,
    /// Failed at least `failure_threshold` consecutive probes.
    Unhealthy,
}

impl HealthState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// Returns whether the backend may receive routed calls.
    #[must_use]
    pub const fn is_routable(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Circuit-breaker configuration applied to probe results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    failure_threshold: u32,
}

impl HealthPolicy {
    /// Creates a policy; a zero threshold is raised to one.
    #[must_use]
    pub const fn new(failure_threshold: u32) -> Self {
        let threshold = if failure_threshold == 0 {
            1
        } else {
            failure_threshold
        };
        Self {
            failure_threshold: threshold,
        }
    }

    /// Returns the number of consecutive failures that marks a backend unhealthy.
    #[must_use]
    pub const fn failure_threshold(self) -> u32 {
        self.failure_threshold
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

/// Result of a single liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The backend answered within the probe timeout.
    Success,
    /// The backend failed or timed out.
    Failure {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl ProbeOutcome {
    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// A change of health state produced by a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthTransition {
    /// Backend whose state changed.
    pub server: ServerName,
    /// State before the probe.
    pub from: HealthState,
    /// State after the probe.
    pub to: HealthState,
    /// When the probe completed.
    pub at: DateTime<Utc>,
}
