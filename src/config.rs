//! Probe configuration
//!
//! Each monitored cluster has its own TOML file, selected on the command line
//! by name: `kubeprobe prod ...` reads `<config-dir>/prod.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use kubeprobe_k8s::ClusterConfig;
use kubeprobe_types::ProbeError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection and caching settings for one cluster
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    pub host: String,
    /// Accepts either `6443` or `"6443"`
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    /// Bearer token of a service account allowed to list deployments
    pub token: String,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Seconds a cached API response stays fresh
    pub cache_time: u64,
    /// Connect and read timeout for API requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
    }
}

impl ProbeConfig {
    /// Location of the config file for `name`
    pub fn path_for(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.toml", name))
    }

    /// Load and validate the config named `name` from `dir`
    pub fn load(dir: &Path, name: &str) -> Result<Self, ProbeError> {
        check_name(name)?;

        let path = Self::path_for(dir, name);
        let content = fs::read_to_string(&path).map_err(|e| ProbeError::ConfigLoad {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

        Self::from_toml(name, &content)
    }

    pub fn from_toml(name: &str, content: &str) -> Result<Self, ProbeError> {
        let config: Self = toml::from_str(content).map_err(|e| ProbeError::ConfigLoad {
            name: name.to_string(),
            reason: e.message().to_string(),
        })?;
        config.validate(name)?;
        Ok(config)
    }

    fn validate(&self, name: &str) -> Result<(), ProbeError> {
        let invalid = |reason: &str| ProbeError::ConfigLoad {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port must be between 1 and 65535"));
        }
        if self.token.trim().is_empty() {
            return Err(invalid("token must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be at least 1"));
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_time)
    }

    pub fn cluster(&self) -> ClusterConfig {
        ClusterConfig {
            host: self.host.trim().to_string(),
            port: self.port,
            token: self.token.trim().to_string(),
            verify_ssl: self.verify_ssl,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// The name becomes part of file paths, so it must be a plain file stem
fn check_name(name: &str) -> Result<(), ProbeError> {
    let is_plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\']);

    if is_plain {
        Ok(())
    } else {
        Err(ProbeError::ConfigLoad {
            name: name.to_string(),
            reason: "config name must not contain path separators".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
        host = "k8s.example.com"
        port = 6443
        token = "abc123"
        verify_ssl = false
        cache_time = 60
        timeout_secs = 5
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = ProbeConfig::from_toml("prod", FULL).unwrap();
        assert_eq!(config.host, "k8s.example.com");
        assert_eq!(config.port, 6443);
        assert!(!config.verify_ssl);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));

        let cluster = config.cluster();
        assert_eq!(cluster.server_url(), "https://k8s.example.com:6443");
        assert_eq!(cluster.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::from_toml(
            "prod",
            r#"
            host = "10.0.0.1"
            port = "443"
            token = "abc123"
            cache_time = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 443);
        assert!(config.verify_ssl);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProbeConfig::from_toml("prod", &format!("{FULL}\nnamespace = \"default\"\n"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::ConfigLoad { .. }));
        assert!(err.to_string().contains("namespace"));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = ProbeConfig::from_toml("prod", "host = \"a\"\nport = 1\ncache_time = 5\n")
            .unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for bad in [
            FULL.replace("k8s.example.com", " "),
            FULL.replace("abc123", ""),
            FULL.replace("6443", "0"),
            FULL.replace("6443", "\"https\""),
            FULL.replace("timeout_secs = 5", "timeout_secs = 0"),
        ] {
            assert!(ProbeConfig::from_toml("prod", &bad).is_err(), "accepted: {bad}");
        }
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prod.toml"), FULL).unwrap();

        let config = ProbeConfig::load(dir.path(), "prod").unwrap();
        assert_eq!(config.token, "abc123");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ProbeConfig::load(dir.path(), "staging").unwrap_err();
        assert!(matches!(err, ProbeError::ConfigLoad { ref name, .. } if name == "staging"));
    }

    #[test]
    fn test_load_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        for name in ["", "..", "../prod", "a/b"] {
            assert!(ProbeConfig::load(dir.path(), name).is_err(), "accepted: {name}");
        }
    }
}
