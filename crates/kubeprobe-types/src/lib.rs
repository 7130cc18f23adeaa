//! Shared types for kubeprobe
//!
//! This crate contains the request vocabulary (actions, resources, cache keys)
//! and the error taxonomy used across the kubeprobe crates.

use std::fmt;
use std::str::FromStr;

// ============================================================================
// Request Types
// ============================================================================

/// What the probe should do with the fetched data
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// List all resource names (Zabbix low-level discovery)
    Discover,
    /// Print one status field of a named resource
    Get,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::Discover, Action::Get];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Get => "get",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ProbeError::Validation {
                kind: "action",
                value: s.to_string(),
                known: known_list(Self::ALL.iter().map(|a| a.as_str())),
            })
    }
}

/// Kubernetes resource kinds the probe knows about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Deployments,
    /// Accepted by validation, but no check is wired for it
    Services,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Deployments, Resource::Services];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployments => "deployments",
            Self::Services => "services",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ProbeError::Validation {
                kind: "resource",
                value: s.to_string(),
                known: known_list(Self::ALL.iter().map(|r| r.as_str())),
            })
    }
}

fn known_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// Identifies one cached API response: one file per (config, resource) pair
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub config_name: String,
    pub resource: Resource,
}

impl CacheKey {
    pub fn new(config_name: impl Into<String>, resource: Resource) -> Self {
        Self {
            config_name: config_name.into(),
            resource,
        }
    }

    /// File name of the cache entry, e.g. `prod__deployments.json`
    pub fn file_name(&self) -> String {
        format!("{}__{}.json", self.config_name, self.resource)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}", self.config_name, self.resource)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Every failure is terminal for the one-shot probe process
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("config '{name}' could not be loaded: {reason}")]
    ConfigLoad { name: String, reason: String },

    #[error("{kind} '{value}' not found in known list ({known})")]
    Validation {
        kind: &'static str,
        value: String,
        known: String,
    },

    #[error("action '{action}' is not supported for resource '{resource}'")]
    UnsupportedCombination { action: Action, resource: Resource },

    #[error("failed to build Kubernetes client: {0}")]
    Client(String),

    #[error("resource '{0}' cannot be fetched")]
    UnsupportedResource(Resource),

    #[error("failed to fetch {resource} from the API server: {reason}")]
    Fetch { resource: Resource, reason: String },

    #[error("failed to read cache entry {key}: {reason}")]
    CacheRead { key: CacheKey, reason: String },

    #[error("failed to write cache entry {key}: {reason}")]
    CacheWrite { key: CacheKey, reason: String },

    #[error("{resource} '{name}' not found")]
    NotFound { resource: Resource, name: String },

    #[error("key '{key}' not found in status of '{name}'")]
    KeyNotFound { name: String, key: String },

    #[error("malformed {resource} data: {reason}")]
    MalformedData { resource: Resource, reason: String },
}
