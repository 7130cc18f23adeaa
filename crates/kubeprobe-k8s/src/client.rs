use std::time::Duration;

use http::Uri;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube::api::ListParams;
use kube::config::AuthInfo;
use serde_json::{Map, Value};
use tracing::{debug, info};

use kubeprobe_types::{ProbeError, Resource};

/// Fields of a deployment's `status` that are always present in fetched data,
/// set to `null` when the API server omits them
pub const DEPLOYMENT_STATUS_FIELDS: [&str; 9] = [
    "availableReplicas",
    "collisionCount",
    "conditions",
    "observedGeneration",
    "readyReplicas",
    "replicas",
    "terminatingReplicas",
    "unavailableReplicas",
    "updatedReplicas",
];

/// Connection settings for one API server
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub host: String,
    pub port: u16,
    pub token: String,
    pub verify_ssl: bool,
    pub timeout: Duration,
}

impl ClusterConfig {
    pub fn server_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    /// Build a kube config with bearer-token auth for this server
    pub fn kube_config(&self) -> Result<kube::Config, ProbeError> {
        let cluster_url: Uri = self.server_url().parse().map_err(|e| {
            ProbeError::Client(format!("invalid server url {}: {}", self.server_url(), e))
        })?;

        let mut config = kube::Config::new(cluster_url);
        config.accept_invalid_certs = !self.verify_ssl;
        config.connect_timeout = Some(self.timeout);
        config.read_timeout = Some(self.timeout);
        config.auth_info = AuthInfo {
            token: Some(self.token.clone().into()),
            ..Default::default()
        };

        Ok(config)
    }
}

/// Kubernetes client wrapper
pub struct KubeClient {
    client: kube::Client,
    server: String,
}

impl KubeClient {
    /// Create a client for the configured server
    ///
    /// No request is made until a fetch is issued.
    pub fn new(cluster: &ClusterConfig) -> Result<Self, ProbeError> {
        let config = cluster.kube_config()?;
        let client = kube::Client::try_from(config).map_err(|e| {
            ProbeError::Client(format!(
                "failed to create client for {}: {}",
                cluster.server_url(),
                e
            ))
        })?;

        if !cluster.verify_ssl {
            debug!(server = %cluster.server_url(), "TLS certificate verification disabled");
        }

        Ok(Self {
            client,
            server: cluster.server_url(),
        })
    }

    /// Fetch the full list for a resource as a JSON tree
    pub async fn fetch(&self, resource: Resource) -> Result<Value, ProbeError> {
        match resource {
            Resource::Deployments => self.fetch_deployments().await,
            Resource::Services => Err(ProbeError::UnsupportedResource(resource)),
        }
    }

    /// Fetch all deployments across namespaces
    pub async fn fetch_deployments(&self) -> Result<Value, ProbeError> {
        let deployments: Api<Deployment> = Api::all(self.client.clone());
        let list = deployments
            .list(&ListParams::default())
            .await
            .map_err(|e| ProbeError::Fetch {
                resource: Resource::Deployments,
                reason: e.to_string(),
            })?;

        info!(
            server = %self.server,
            count = list.items.len(),
            "fetched deployments"
        );

        deployment_list_value(list.items, list.metadata.resource_version)
    }
}

/// Convert fetched deployments into the cached JSON document
///
/// The document is a `DeploymentList` with `metadata` and `items`. Timestamps
/// are RFC 3339 strings, and each item's `status` carries every field of
/// [`DEPLOYMENT_STATUS_FIELDS`].
pub fn deployment_list_value(
    items: Vec<Deployment>,
    resource_version: Option<String>,
) -> Result<Value, ProbeError> {
    let items = items
        .into_iter()
        .map(|d| {
            let mut value = serde_json::to_value(d).map_err(|e| ProbeError::MalformedData {
                resource: Resource::Deployments,
                reason: e.to_string(),
            })?;
            complete_status(&mut value);
            Ok(value)
        })
        .collect::<Result<Vec<_>, ProbeError>>()?;

    let mut metadata = Map::new();
    if let Some(version) = resource_version {
        metadata.insert("resourceVersion".to_string(), Value::String(version));
    }

    Ok(serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "DeploymentList",
        "metadata": metadata,
        "items": items,
    }))
}

fn complete_status(deployment: &mut Value) {
    let Some(object) = deployment.as_object_mut() else {
        return;
    };

    let status = object
        .entry("status")
        .or_insert_with(|| Value::Object(Map::new()));
    if status.is_null() {
        *status = Value::Object(Map::new());
    }

    if let Some(status) = status.as_object_mut() {
        for field in DEPLOYMENT_STATUS_FIELDS {
            status.entry(field).or_insert(Value::Null);
        }
    }
}
